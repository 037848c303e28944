//! Query contexts and projections.

use super::channel::Observable;
use crate::value::{Fields, Value};
use parking_lot::Mutex;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

/// Unique identifier for a query context.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct QueryId(pub u64);

/// Bookkeeping for one active subscription pipeline.
pub struct QueryContext {
    id: QueryId,
    observable: Mutex<Option<Observable<Value>>>,
    disposed: AtomicBool,
    /// Bumped by a hard reset. Every subscription compares it against the
    /// epoch of its last emission and skips one change check on mismatch.
    reset_epoch: AtomicU64,
}

impl QueryContext {
    pub(crate) fn new(id: QueryId) -> Self {
        Self {
            id,
            observable: Mutex::new(None),
            disposed: AtomicBool::new(false),
            reset_epoch: AtomicU64::new(0),
        }
    }

    pub fn id(&self) -> QueryId {
        self.id
    }

    pub fn observable(&self) -> Option<Observable<Value>> {
        self.observable.lock().clone()
    }

    pub(crate) fn set_observable(&self, observable: Observable<Value>) {
        *self.observable.lock() = Some(observable);
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }

    pub(crate) fn dispose(&self) {
        self.disposed.store(true, Ordering::SeqCst);
        self.observable.lock().take();
    }

    /// Force the next emission through even if it equals the previous one.
    pub fn skip_next_change_check(&self) {
        self.reset_epoch.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn reset_epoch(&self) -> u64 {
        self.reset_epoch.load(Ordering::SeqCst)
    }
}

impl fmt::Debug for QueryContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryContext")
            .field("id", &self.id)
            .field("is_disposed", &self.is_disposed())
            .field("reset_epoch", &self.reset_epoch())
            .finish()
    }
}

pub type ProjectionFn = Arc<dyn Fn(&Value) -> Value + Send + Sync>;

/// What a subscriber sees of a store's value.
#[derive(Clone, Default)]
pub enum Projection {
    #[default]
    Identity,
    Map(ProjectionFn),
    /// Several projections, emitted together as an array.
    Tuple(Vec<ProjectionFn>),
    Key(String),
    /// Picked keys, emitted as an object.
    Keys(Vec<String>),
}

impl Projection {
    pub fn map(f: impl Fn(&Value) -> Value + Send + Sync + 'static) -> Self {
        Projection::Map(Arc::new(f))
    }

    pub fn tuple(fs: Vec<ProjectionFn>) -> Self {
        Projection::Tuple(fs)
    }

    pub fn key(key: impl Into<String>) -> Self {
        Projection::Key(key.into())
    }

    pub fn keys<I, K>(keys: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<String>,
    {
        Projection::Keys(keys.into_iter().map(Into::into).collect())
    }

    pub fn apply(&self, value: &Value) -> Value {
        match self {
            Projection::Identity => value.clone(),
            Projection::Map(f) => f(value),
            Projection::Tuple(fs) => Value::array(fs.iter().map(|f| f(value))),
            Projection::Key(key) => pick(value, key),
            Projection::Keys(keys) => {
                let fields: Fields = keys.iter().map(|k| (k.clone(), pick(value, k))).collect();
                Value::Object(crate::value::Object::plain(fields))
            }
        }
    }
}

fn pick(value: &Value, key: &str) -> Value {
    value.get_path(key).cloned().unwrap_or(Value::Undefined)
}

impl fmt::Debug for Projection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Projection::Identity => f.write_str("Identity"),
            Projection::Map(_) => f.write_str("Map"),
            Projection::Tuple(fs) => write!(f, "Tuple({})", fs.len()),
            Projection::Key(k) => write!(f, "Key({})", k),
            Projection::Keys(ks) => write!(f, "Keys({:?})", ks),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> Value {
        Value::object([
            ("name", Value::from("ann")),
            ("age", Value::from(30)),
            ("address", Value::object([("city", Value::from("Oslo"))])),
        ])
    }

    #[test]
    fn test_key_projections() {
        assert_eq!(Projection::key("name").apply(&user()), Value::from("ann"));
        assert_eq!(Projection::key("address.city").apply(&user()), Value::from("Oslo"));
        assert!(Projection::key("missing").apply(&user()).is_undefined());
        assert_eq!(
            Projection::keys(["name", "age"]).apply(&user()),
            Value::object([("name", Value::from("ann")), ("age", Value::from(30))])
        );
    }

    #[test]
    fn test_tuple_projection() {
        let name: ProjectionFn = Arc::new(|v: &Value| v.get("name").cloned().unwrap_or_default());
        let age: ProjectionFn = Arc::new(|v: &Value| v.get("age").cloned().unwrap_or_default());
        assert_eq!(
            Projection::tuple(vec![name, age]).apply(&user()),
            Value::array([Value::from("ann"), Value::from(30)])
        );
    }
}
