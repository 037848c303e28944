//! Dynamic value tree held by stores.
//!
//! Every leaf utility (diff, clone, freeze, hydration) works on [`Value`].
//! Containers are reference counted and copy-on-write: cloning a `Value` is
//! shallow, mutating one through [`Value::set_field`] and friends never leaks
//! into other holders, and a frozen container rejects mutation outright.

mod json;

use crate::error::{Result, StateError};
use chrono::{DateTime, SecondsFormat, Utc};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Field map of objects and error properties.
pub type Fields = BTreeMap<String, Value>;

/// A node in a state tree.
#[derive(Clone, Debug)]
pub enum Value {
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    /// UTC instant. Compared by epoch milliseconds.
    Date(DateTime<Utc>),
    /// Wrapped date. Compared by its inner date.
    Moment(Moment),
    /// Opaque callable. All functions compare equal.
    Function(Function),
    Array(Array),
    Object(Object),
    Error(ErrorValue),
}

/// Wrapped date with an optional display format.
#[derive(Clone, Debug)]
pub struct Moment {
    date: DateTime<Utc>,
    format: Option<String>,
}

impl Moment {
    pub fn new(date: DateTime<Utc>) -> Self {
        Self { date, format: None }
    }

    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.format = Some(format.into());
        self
    }

    /// Parse an RFC 3339 timestamp.
    pub fn parse(s: &str) -> Option<Self> {
        DateTime::parse_from_rfc3339(s)
            .ok()
            .map(|d| Self::new(d.with_timezone(&Utc)))
    }

    pub fn date(&self) -> DateTime<Utc> {
        self.date
    }

    pub fn format(&self) -> Option<&str> {
        self.format.as_deref()
    }

    /// Render with the display format, falling back to RFC 3339.
    pub fn display(&self) -> String {
        match &self.format {
            Some(f) => self.date.format(f).to_string(),
            None => self.date.to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }
}

type Callable = dyn Fn(&[Value]) -> Value + Send + Sync;

/// Opaque function value.
#[derive(Clone)]
pub struct Function {
    name: Arc<str>,
    call: Arc<Callable>,
}

impl Function {
    pub fn new<F>(name: &str, f: F) -> Self
    where
        F: Fn(&[Value]) -> Value + Send + Sync + 'static,
    {
        Self {
            name: Arc::from(name),
            call: Arc::new(f),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn call(&self, args: &[Value]) -> Value {
        (self.call)(args)
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Function({})", self.name)
    }
}

#[derive(Clone, Debug)]
struct ArrayNode {
    items: Vec<Value>,
    frozen: bool,
}

/// Shared, copy-on-write array.
#[derive(Clone, Debug)]
pub struct Array(Arc<ArrayNode>);

impl Array {
    pub fn new(items: Vec<Value>) -> Self {
        Self(Arc::new(ArrayNode {
            items,
            frozen: false,
        }))
    }

    pub(crate) fn frozen(items: Vec<Value>) -> Self {
        Self(Arc::new(ArrayNode {
            items,
            frozen: true,
        }))
    }

    pub fn items(&self) -> &[Value] {
        &self.0.items
    }

    pub fn len(&self) -> usize {
        self.0.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.items.is_empty()
    }

    pub fn is_frozen(&self) -> bool {
        self.0.frozen
    }

    /// True if both handles point at the same allocation.
    pub fn ptr_eq(a: &Array, b: &Array) -> bool {
        Arc::ptr_eq(&a.0, &b.0)
    }

    fn items_mut(&mut self) -> Result<&mut Vec<Value>> {
        if self.0.frozen {
            return Err(StateError::Frozen);
        }
        Ok(&mut Arc::make_mut(&mut self.0).items)
    }
}

#[derive(Clone, Debug)]
struct ObjectNode {
    class: Option<String>,
    fields: Fields,
    frozen: bool,
}

/// Shared, copy-on-write object. Untagged objects are plain data, tagged
/// objects are class instances.
#[derive(Clone, Debug)]
pub struct Object(Arc<ObjectNode>);

impl Object {
    pub fn plain(fields: Fields) -> Self {
        Self::with_class(None, fields)
    }

    pub fn instance(class: impl Into<String>, fields: Fields) -> Self {
        Self::with_class(Some(class.into()), fields)
    }

    pub(crate) fn with_class(class: Option<String>, fields: Fields) -> Self {
        Self(Arc::new(ObjectNode {
            class,
            fields,
            frozen: false,
        }))
    }

    pub(crate) fn frozen(class: Option<String>, fields: Fields) -> Self {
        Self(Arc::new(ObjectNode {
            class,
            fields,
            frozen: true,
        }))
    }

    pub fn class(&self) -> Option<&str> {
        self.0.class.as_deref()
    }

    pub fn fields(&self) -> &Fields {
        &self.0.fields
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.fields.get(key)
    }

    pub fn is_frozen(&self) -> bool {
        self.0.frozen
    }

    pub fn ptr_eq(a: &Object, b: &Object) -> bool {
        Arc::ptr_eq(&a.0, &b.0)
    }

    fn fields_mut(&mut self) -> Result<&mut Fields> {
        if self.0.frozen {
            return Err(StateError::Frozen);
        }
        Ok(&mut Arc::make_mut(&mut self.0).fields)
    }
}

/// Error value held in a store's error slot or nested inside data.
#[derive(Clone, Debug)]
pub struct ErrorValue {
    kind: String,
    message: String,
    props: Fields,
}

impl ErrorValue {
    pub fn new(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            message: message.into(),
            props: Fields::new(),
        }
    }

    /// Generic error carrying only a message.
    pub fn message_only(message: impl Into<String>) -> Self {
        Self::new("Error", message)
    }

    pub fn from_error(err: &dyn std::error::Error) -> Self {
        Self::message_only(err.to_string())
    }

    pub fn with_prop(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.props.insert(key.into(), value.into());
        self
    }

    pub(crate) fn from_parts(kind: String, message: String, props: Fields) -> Self {
        Self {
            kind,
            message,
            props,
        }
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn props(&self) -> &Fields {
        &self.props
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.props.get(key)
    }
}

impl fmt::Display for ErrorValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl std::error::Error for ErrorValue {}

impl PartialEq for ErrorValue {
    fn eq(&self, other: &Self) -> bool {
        crate::diff::compare(&Value::Error(self.clone()), &Value::Error(other.clone()))
    }
}

impl Value {
    /// Plain object from key/value pairs.
    pub fn object<K, I>(fields: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Value)>,
    {
        Value::Object(Object::plain(
            fields.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        ))
    }

    /// Class instance from key/value pairs.
    pub fn instance<K, I>(class: &str, fields: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Value)>,
    {
        Value::Object(Object::instance(
            class,
            fields.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        ))
    }

    pub fn array<I>(items: I) -> Self
    where
        I: IntoIterator<Item = Value>,
    {
        Value::Array(Array::new(items.into_iter().collect()))
    }

    pub fn date_millis(millis: i64) -> Self {
        match DateTime::<Utc>::from_timestamp_millis(millis) {
            Some(d) => Value::Date(d),
            None => Value::Null,
        }
    }

    pub fn function<F>(name: &str, f: F) -> Self
    where
        F: Fn(&[Value]) -> Value + Send + Sync + 'static,
    {
        Value::Function(Function::new(name, f))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self, Value::Undefined)
    }

    pub fn is_nullish(&self) -> bool {
        matches!(self, Value::Null | Value::Undefined)
    }

    /// Objects, instances, arrays and errors: everything with identity.
    pub fn is_container(&self) -> bool {
        matches!(self, Value::Array(_) | Value::Object(_) | Value::Error(_))
    }

    pub fn is_plain_object(&self) -> bool {
        matches!(self, Value::Object(o) if o.class().is_none())
    }

    pub fn is_instance(&self) -> bool {
        matches!(self, Value::Object(o) if o.class().is_some())
    }

    /// Short name of the variant, used in log output and ordering.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Undefined => "undefined",
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Date(_) => "date",
            Value::Moment(_) => "moment",
            Value::Function(_) => "function",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
            Value::Error(_) => "error",
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(a) => Some(a.items()),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&Object> {
        match self {
            Value::Object(o) => Some(o),
            _ => None,
        }
    }

    pub fn as_error(&self) -> Option<&ErrorValue> {
        match self {
            Value::Error(e) => Some(e),
            _ => None,
        }
    }

    /// Field lookup on objects and error properties.
    pub fn get(&self, key: &str) -> Option<&Value> {
        match self {
            Value::Object(o) => o.get(key),
            Value::Error(e) => e.get(key),
            _ => None,
        }
    }

    /// Dotted path lookup (`"address.city"`); numeric segments index arrays.
    pub fn get_path(&self, path: &str) -> Option<&Value> {
        path.split('.').try_fold(self, |current, segment| match current {
            Value::Array(a) => segment.parse::<usize>().ok().and_then(|i| a.items().get(i)),
            other => other.get(segment),
        })
    }

    pub fn index(&self, i: usize) -> Option<&Value> {
        self.as_array().and_then(|items| items.get(i))
    }

    /// True if this node is a frozen container. Scalars report false.
    pub fn is_frozen(&self) -> bool {
        match self {
            Value::Array(a) => a.is_frozen(),
            Value::Object(o) => o.is_frozen(),
            _ => false,
        }
    }

    pub fn set_field(&mut self, key: impl Into<String>, value: Value) -> Result<()> {
        self.object_fields_mut()?.insert(key.into(), value);
        Ok(())
    }

    pub fn remove_field(&mut self, key: &str) -> Result<Option<Value>> {
        Ok(self.object_fields_mut()?.remove(key))
    }

    /// Mutable access to a field. Fails on frozen objects.
    pub fn field_mut(&mut self, key: &str) -> Result<Option<&mut Value>> {
        Ok(self.object_fields_mut()?.get_mut(key))
    }

    pub fn push(&mut self, value: Value) -> Result<()> {
        self.array_items_mut()?.push(value);
        Ok(())
    }

    pub fn set_index(&mut self, index: usize, value: Value) -> Result<()> {
        let items = self.array_items_mut()?;
        let len = items.len();
        match items.get_mut(index) {
            Some(slot) => {
                *slot = value;
                Ok(())
            }
            None => Err(StateError::InvalidOperation(format!(
                "index {} out of bounds (len={})",
                index, len
            ))),
        }
    }

    /// Mutable access to an array element. Fails on frozen arrays.
    pub fn index_mut(&mut self, index: usize) -> Result<Option<&mut Value>> {
        Ok(self.array_items_mut()?.get_mut(index))
    }

    fn object_fields_mut(&mut self) -> Result<&mut Fields> {
        match self {
            Value::Object(o) => o.fields_mut(),
            other => Err(StateError::InvalidOperation(format!(
                "expected object, got {}",
                other.type_name()
            ))),
        }
    }

    fn array_items_mut(&mut self) -> Result<&mut Vec<Value>> {
        match self {
            Value::Array(a) => a.items_mut(),
            other => Err(StateError::InvalidOperation(format!(
                "expected array, got {}",
                other.type_name()
            ))),
        }
    }

    /// Human-readable key used by identifier checks and log output.
    pub fn display_key(&self) -> String {
        match self {
            Value::String(s) => s.clone(),
            Value::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => format!("{}", *n as i64),
            other => self::json::to_json(other).to_string(),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        crate::diff::compare(self, other)
    }
}

impl Default for Value {
    fn default() -> Self {
        Value::Null
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(n as f64)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n as f64)
    }
}

impl From<usize> for Value {
    fn from(n: usize) -> Self {
        Value::Number(n as f64)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(d: DateTime<Utc>) -> Self {
        Value::Date(d)
    }
}

impl From<Moment> for Value {
    fn from(m: Moment) -> Self {
        Value::Moment(m)
    }
}

impl From<ErrorValue> for Value {
    fn from(e: ErrorValue) -> Self {
        Value::Error(e)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::Array(Array::new(items))
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}
