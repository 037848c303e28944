//! Structural diff engine: deep equality, change counting and deep merge.
//!
//! Comparison is structural. Class tags are not part of the structure, so a
//! hydrated instance equals the plain data it was built from.

use crate::value::{Array, ErrorValue, Fields, Object, Value};
use std::collections::BTreeSet;

/// Deep structural equality.
pub fn compare(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Undefined, Value::Undefined) | (Value::Null, Value::Null) => true,
        (Value::Bool(x), Value::Bool(y)) => x == y,
        (Value::Number(x), Value::Number(y)) => numbers_equal(*x, *y),
        (Value::String(x), Value::String(y)) => x == y,
        (Value::Date(x), Value::Date(y)) => x.timestamp_millis() == y.timestamp_millis(),
        (Value::Moment(x), Value::Moment(y)) => {
            x.date().timestamp_millis() == y.date().timestamp_millis()
        }
        (Value::Function(_), Value::Function(_)) => true,
        (Value::Array(x), Value::Array(y)) => {
            Array::ptr_eq(x, y)
                || (x.len() == y.len()
                    && x.items().iter().zip(y.items()).all(|(l, r)| compare(l, r)))
        }
        (Value::Object(x), Value::Object(y)) => {
            Object::ptr_eq(x, y) || fields_equal(x.fields(), y.fields())
        }
        (Value::Error(x), Value::Error(y)) => {
            x.kind() == y.kind() && x.message() == y.message() && fields_equal(x.props(), y.props())
        }
        _ => false,
    }
}

fn numbers_equal(x: f64, y: f64) -> bool {
    x == y || (x.is_nan() && y.is_nan())
}

fn fields_equal(a: &Fields, b: &Fields) -> bool {
    a.len() == b.len()
        && a.iter()
            .all(|(k, v)| b.get(k).map(|other| compare(v, other)).unwrap_or(false))
}

/// Number of differing leaf positions between two values.
///
/// Array length mismatches count the length difference on top of the
/// overlapping prefix; keys present on one side only count one each.
pub fn count_changes(a: &Value, b: &Value) -> usize {
    if a.is_nullish() || b.is_nullish() {
        return usize::from(!compare(a, b));
    }

    match (a, b) {
        (Value::Function(_), Value::Function(_)) => 0,
        (Value::Array(x), Value::Array(y)) => {
            let overlap: usize = x
                .items()
                .iter()
                .zip(y.items())
                .map(|(l, r)| count_changes(l, r))
                .sum();
            overlap + x.len().abs_diff(y.len())
        }
        (Value::Object(x), Value::Object(y)) => count_field_changes(x.fields(), y.fields()),
        (Value::Error(x), Value::Error(y)) => count_error_changes(x, y),
        _ => usize::from(!compare(a, b)),
    }
}

fn count_field_changes(a: &Fields, b: &Fields) -> usize {
    let keys: BTreeSet<&String> = a.keys().chain(b.keys()).collect();
    keys.into_iter()
        .map(|k| match (a.get(k), b.get(k)) {
            (Some(l), Some(r)) => count_changes(l, r),
            _ => 1,
        })
        .sum()
}

fn count_error_changes(a: &ErrorValue, b: &ErrorValue) -> usize {
    usize::from(a.kind() != b.kind())
        + usize::from(a.message() != b.message())
        + count_field_changes(a.props(), b.props())
}

/// Deep merge of `source` onto `target`.
///
/// Objects merge key by key. Arrays take the source's length and elements,
/// except that positions holding objects on both sides merge recursively.
/// Any other pairing is won by the source.
pub fn merge(target: &Value, source: &Value) -> Value {
    match (target, source) {
        (Value::Object(t), Value::Object(s)) => {
            let mut fields = t.fields().clone();
            for (key, value) in s.fields() {
                let merged = match fields.get(key) {
                    Some(existing) => merge_field(existing, value),
                    None => value.clone(),
                };
                fields.insert(key.clone(), merged);
            }
            Value::Object(Object::with_class(
                t.class().or(s.class()).map(str::to_string),
                fields,
            ))
        }
        (Value::Array(t), Value::Array(s)) => Value::array(
            s.items()
                .iter()
                .enumerate()
                .map(|(i, item)| match (t.items().get(i), item) {
                    (Some(existing @ Value::Object(_)), Value::Object(_)) => merge(existing, item),
                    _ => item.clone(),
                }),
        ),
        _ => source.clone(),
    }
}

fn merge_field(existing: &Value, incoming: &Value) -> Value {
    match (existing, incoming) {
        (Value::Object(_), Value::Object(_)) | (Value::Array(_), Value::Array(_)) => {
            merge(existing, incoming)
        }
        _ => incoming.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Moment;
    use chrono::{TimeZone, Utc};

    fn obj(pairs: &[(&str, Value)]) -> Value {
        Value::object(pairs.iter().map(|(k, v)| (k.to_string(), v.clone())))
    }

    #[test]
    fn test_compare_objects() {
        let a = obj(&[("a", "a".into()), ("b", "b".into())]);
        let b = obj(&[("a", "a".into()), ("b", "c".into())]);
        assert!(!compare(&a, &b));
        assert!(compare(&a, &a.clone()));
    }

    #[test]
    fn test_compare_extra_key_is_unequal() {
        let a = obj(&[("a", 1.into())]);
        let b = obj(&[("a", 1.into()), ("b", Value::Undefined)]);
        assert!(!compare(&a, &b));
        assert!(!compare(&b, &a));
    }

    #[test]
    fn test_compare_dates_and_moments() {
        let d1 = Utc.timestamp_millis_opt(1_000).unwrap();
        let d2 = Utc.timestamp_millis_opt(1_000).unwrap();
        assert!(compare(&Value::Date(d1), &Value::Date(d2)));
        let m1 = Value::Moment(Moment::new(d1).with_format("%Y"));
        let m2 = Value::Moment(Moment::new(d2));
        assert!(compare(&m1, &m2));
        assert!(!compare(&Value::Date(d1), &m2));
    }

    #[test]
    fn test_compare_functions_always_equal() {
        let f = Value::function("a", |_| Value::from(1));
        let g = Value::function("b", |_| Value::from(2));
        assert!(compare(&f, &g));
    }

    #[test]
    fn test_count_changes_array_length() {
        let a = obj(&[("a", Value::array([false.into()]))]);
        let b = obj(&[("a", Value::array([]))]);
        assert_eq!(count_changes(&a, &b), 1);
    }

    #[test]
    fn test_count_changes_nullish_fields() {
        let a = obj(&[("a", Value::Null), ("b", Value::Undefined)]);
        let b = obj(&[("a", Value::Null), ("b", Value::Undefined)]);
        assert_eq!(count_changes(&a, &b), 0);
        assert_eq!(count_changes(&Value::Null, &Value::Undefined), 1);
        assert_eq!(count_changes(&Value::Null, &a), 1);
    }

    #[test]
    fn test_count_changes_keys_and_leaves() {
        let a = obj(&[("a", 1.into()), ("b", 2.into()), ("c", 3.into())]);
        let b = obj(&[("a", 1.into()), ("b", 5.into()), ("d", 3.into())]);
        // b differs, c and d each exist on one side only
        assert_eq!(count_changes(&a, &b), 3);
    }

    #[test]
    fn test_merge_nested() {
        let target = obj(&[
            ("user", obj(&[("name", "ann".into()), ("age", 30.into())])),
            ("tags", Value::array(["a".into(), "b".into()])),
        ]);
        let source = obj(&[
            ("user", obj(&[("age", 31.into())])),
            ("tags", Value::array(["c".into()])),
        ]);
        let merged = merge(&target, &source);
        assert_eq!(
            merged,
            obj(&[
                ("user", obj(&[("name", "ann".into()), ("age", 31.into())])),
                ("tags", Value::array(["c".into()])),
            ])
        );
    }

    #[test]
    fn test_merge_array_of_objects() {
        let target = Value::array([obj(&[("id", 1.into()), ("x", 1.into())])]);
        let source = Value::array([obj(&[("x", 2.into())]), 7.into()]);
        let merged = merge(&target, &source);
        assert_eq!(
            merged,
            Value::array([obj(&[("id", 1.into()), ("x", 2.into())]), 7.into()])
        );
    }

    #[test]
    fn test_merge_keeps_class_tag() {
        let target = Value::instance("User", [("name", Value::from("ann"))]);
        let source = obj(&[("name", "bob".into())]);
        let merged = merge(&target, &source);
        assert_eq!(merged.as_object().and_then(|o| o.class()), Some("User"));
    }
}
