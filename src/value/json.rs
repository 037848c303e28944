//! Conversion between [`Value`] and JSON.

use super::{Fields, Value};
use crate::error::Result;
use chrono::SecondsFormat;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Render a value as JSON the way a JSON stringifier would see it.
pub(crate) fn to_json(value: &Value) -> serde_json::Value {
    match value {
        Value::Undefined | Value::Null | Value::Function(_) => serde_json::Value::Null,
        Value::Bool(b) => serde_json::Value::Bool(*b),
        Value::Number(n) => number_to_json(*n),
        Value::String(s) => serde_json::Value::String(s.clone()),
        Value::Date(d) => {
            serde_json::Value::String(d.to_rfc3339_opts(SecondsFormat::Millis, true))
        }
        Value::Moment(m) => serde_json::Value::String(
            m.date().to_rfc3339_opts(SecondsFormat::Millis, true),
        ),
        Value::Array(a) => serde_json::Value::Array(a.items().iter().map(to_json).collect()),
        Value::Object(o) => serde_json::Value::Object(fields_to_json(o.fields())),
        Value::Error(e) => {
            let mut map = fields_to_json(e.props());
            map.insert("name".into(), serde_json::Value::String(e.kind().to_string()));
            map.insert(
                "message".into(),
                serde_json::Value::String(e.message().to_string()),
            );
            serde_json::Value::Object(map)
        }
    }
}

fn fields_to_json(fields: &Fields) -> serde_json::Map<String, serde_json::Value> {
    fields
        .iter()
        .filter(|(_, v)| !matches!(v, Value::Undefined | Value::Function(_)))
        .map(|(k, v)| (k.clone(), to_json(v)))
        .collect()
}

fn number_to_json(n: f64) -> serde_json::Value {
    if n.fract() == 0.0 && n.abs() < 9_007_199_254_740_992.0 {
        serde_json::Value::from(n as i64)
    } else {
        serde_json::Number::from_f64(n)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null)
    }
}

/// Plain data from JSON. Strings stay strings; hydration recovers dates.
pub(crate) fn from_json(json: serde_json::Value) -> Value {
    match json {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Bool(b),
        serde_json::Value::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
        serde_json::Value::String(s) => Value::String(s),
        serde_json::Value::Array(items) => Value::array(items.into_iter().map(from_json)),
        serde_json::Value::Object(map) => {
            Value::object(map.into_iter().map(|(k, v)| (k, from_json(v))))
        }
    }
}

impl Value {
    pub fn to_json(&self) -> serde_json::Value {
        to_json(self)
    }

    pub fn from_json(json: serde_json::Value) -> Self {
        from_json(json)
    }

    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string(&to_json(self))?)
    }

    pub fn from_json_str(s: &str) -> Result<Self> {
        Ok(from_json(serde_json::from_str(s)?))
    }

    /// Plain data from any serializable Rust value.
    pub fn from_serialize<T: Serialize>(data: &T) -> Result<Self> {
        Ok(from_json(serde_json::to_value(data)?))
    }

    /// Typed Rust value from this tree.
    pub fn deserialize_into<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_value(to_json(self))?)
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        to_json(self).serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        serde_json::Value::deserialize(deserializer).map(from_json)
    }
}
