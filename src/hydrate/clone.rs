//! Deep clone and deep freeze.

use super::registry::ClassRegistry;
use crate::value::{Array, ErrorValue, Fields, Object, Value};

/// Deep clone. Every container in the result is a fresh, unfrozen allocation.
pub fn deep_clone(value: &Value) -> Value {
    clone_value(value, None)
}

/// Deep clone that rebuilds class instances through `registry`.
pub fn deep_clone_with(value: &Value, registry: &ClassRegistry) -> Value {
    clone_value(value, Some(registry))
}

/// Clone an error, keeping its kind and deep-copying its properties.
pub fn clone_error(error: &ErrorValue) -> ErrorValue {
    ErrorValue::from_parts(
        error.kind().to_string(),
        error.message().to_string(),
        clone_fields(error.props(), None),
    )
}

fn clone_value(value: &Value, registry: Option<&ClassRegistry>) -> Value {
    match value {
        Value::Array(a) => Value::Array(Array::new(
            a.items().iter().map(|v| clone_value(v, registry)).collect(),
        )),
        Value::Object(o) => match (o.class(), registry) {
            (Some(class), Some(registry)) => clone_instance(class, o, registry),
            _ => Value::Object(Object::with_class(
                o.class().map(str::to_string),
                clone_fields(o.fields(), registry),
            )),
        },
        Value::Error(e) => Value::Error(clone_error(e)),
        scalar => scalar.clone(),
    }
}

fn clone_instance(class: &str, source: &Object, registry: &ClassRegistry) -> Value {
    let descriptor = registry.resolve(class);
    let seed = Value::Object(source.clone());
    let mut fields = match descriptor.construct(Some(&seed)) {
        Value::Object(base) => base.fields().clone(),
        _ => Fields::new(),
    };
    fields.extend(clone_fields(source.fields(), Some(registry)));
    Value::Object(Object::with_class(Some(class.to_string()), fields))
}

fn clone_fields(fields: &Fields, registry: Option<&ClassRegistry>) -> Fields {
    fields
        .iter()
        .map(|(k, v)| (k.clone(), clone_value(v, registry)))
        .collect()
}

/// Deep freeze. Mutating any container in the result fails with
/// `StateError::Frozen`. Freezing a frozen value returns it unchanged.
pub fn freeze(value: &Value) -> Value {
    match value {
        Value::Array(a) if a.is_frozen() => value.clone(),
        Value::Object(o) if o.is_frozen() => value.clone(),
        Value::Array(a) => Value::Array(Array::frozen(a.items().iter().map(freeze).collect())),
        Value::Object(o) => Value::Object(Object::frozen(
            o.class().map(str::to_string),
            freeze_fields(o.fields()),
        )),
        Value::Error(e) => Value::Error(ErrorValue::from_parts(
            e.kind().to_string(),
            e.message().to_string(),
            freeze_fields(e.props()),
        )),
        scalar => scalar.clone(),
    }
}

fn freeze_fields(fields: &Fields) -> Fields {
    fields.iter().map(|(k, v)| (k.clone(), freeze(v))).collect()
}

/// True if every container reachable from `value` is frozen.
pub fn is_deep_frozen(value: &Value) -> bool {
    match value {
        Value::Array(a) => a.is_frozen() && a.items().iter().all(is_deep_frozen),
        Value::Object(o) => o.is_frozen() && o.fields().values().all(is_deep_frozen),
        Value::Error(e) => e.props().values().all(is_deep_frozen),
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StateError;
    use crate::hydrate::registry::ClassDescriptor;

    fn sample() -> Value {
        Value::object([
            ("list", Value::array([Value::object([("x", Value::from(1))])])),
            ("user", Value::instance("User", [("name", Value::from("ann"))])),
        ])
    }

    #[test]
    fn test_clone_shares_no_containers() {
        let original = sample();
        let copy = deep_clone(&original);
        assert_eq!(copy, original);

        let (Value::Object(a), Value::Object(b)) = (&original, &copy) else {
            panic!("expected objects");
        };
        assert!(!Object::ptr_eq(a, b));
        match (a.get("list"), b.get("list")) {
            (Some(Value::Array(x)), Some(Value::Array(y))) => assert!(!Array::ptr_eq(x, y)),
            _ => panic!("expected arrays"),
        }
    }

    #[test]
    fn test_clone_preserves_class() {
        let copy = deep_clone(&sample());
        assert!(copy.get("user").unwrap().is_instance());
    }

    #[test]
    fn test_clone_with_registry_runs_constructor() {
        let registry = ClassRegistry::new().with_class(
            "User",
            ClassDescriptor::new(|| Value::instance("User", [("role", Value::from("guest"))])),
        );
        let copy = deep_clone_with(&sample(), &registry);
        let user = copy.get("user").unwrap();
        assert_eq!(user.get("role").and_then(Value::as_str), Some("guest"));
        assert_eq!(user.get("name").and_then(Value::as_str), Some("ann"));
    }

    #[test]
    fn test_clone_error_keeps_kind_and_nested_errors() {
        let inner = ErrorValue::new("IoError", "disk");
        let outer = ErrorValue::new("HttpError", "failed")
            .with_prop("cause", inner)
            .with_prop("codes", Value::array([Value::from(1)]));
        let copy = clone_error(&outer);
        assert_eq!(copy.kind(), "HttpError");
        assert_eq!(copy.get("cause").and_then(Value::as_error).unwrap().kind(), "IoError");
        assert_eq!(copy, outer);
    }

    #[test]
    fn test_freeze_blocks_nested_mutation() {
        let mut frozen = freeze(&sample());
        assert!(is_deep_frozen(&frozen));
        assert!(matches!(
            frozen.set_field("other", Value::Null),
            Err(StateError::Frozen)
        ));

        let mut list = frozen.get("list").unwrap().clone();
        assert!(matches!(list.push(Value::Null), Err(StateError::Frozen)));
        let mut item = list.index(0).unwrap().clone();
        assert!(matches!(item.set_field("x", Value::from(2)), Err(StateError::Frozen)));
    }

    #[test]
    fn test_freeze_is_idempotent() {
        let once = freeze(&sample());
        let twice = freeze(&once);
        match (&once, &twice) {
            (Value::Object(a), Value::Object(b)) => assert!(Object::ptr_eq(a, b)),
            _ => panic!("expected objects"),
        }
    }

    #[test]
    fn test_clone_of_frozen_is_mutable() {
        let mut copy = deep_clone(&freeze(&sample()));
        assert!(copy.set_field("other", Value::Null).is_ok());
    }
}
