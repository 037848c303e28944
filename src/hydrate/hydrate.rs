//! Rebuild typed values from plain data using a live template.

use super::registry::ClassRegistry;
use crate::value::{ErrorValue, Fields, Moment, Object, Value};
use chrono::{DateTime, Utc};

/// Reconstruct class instances, dates and moments in `plain` by following the
/// shape of `template`.
///
/// `plain` is usually freshly parsed JSON. Null, undefined and empty strings
/// are returned unchanged, as is anything the template has no type
/// information for.
pub fn hydrate(template: &Value, plain: &Value, registry: &ClassRegistry) -> Value {
    if plain.is_nullish() || matches!(plain, Value::String(s) if s.is_empty()) {
        return plain.clone();
    }

    match (template, plain) {
        (Value::Array(t), Value::Array(p)) => match t.items().first() {
            Some(element) => Value::array(
                p.items()
                    .iter()
                    .map(|item| hydrate(element, item, registry)),
            ),
            None => plain.clone(),
        },
        (Value::Date(_), Value::String(s)) => parse_date(s)
            .map(Value::Date)
            .unwrap_or_else(|| plain.clone()),
        (Value::Date(_), Value::Number(n)) => Value::date_millis(*n as i64),
        (Value::Moment(m), Value::String(s)) => match parse_date(s) {
            Some(date) => Value::Moment(rewrap(m, date)),
            None => plain.clone(),
        },
        (Value::Moment(m), Value::Number(n)) => {
            match DateTime::<Utc>::from_timestamp_millis(*n as i64) {
                Some(date) => Value::Moment(rewrap(m, date)),
                None => plain.clone(),
            }
        }
        (Value::Object(t), Value::Object(p)) => match t.class() {
            Some(class) => hydrate_instance(class, t, p, registry),
            None => Value::Object(Object::with_class(
                None,
                hydrate_fields(t.fields(), p.fields().clone(), registry),
            )),
        },
        (Value::Error(t), Value::Object(p)) => Value::Error(hydrate_error(t, p, registry)),
        _ => plain.clone(),
    }
}

fn parse_date(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|d| d.with_timezone(&Utc))
}

fn rewrap(template: &Moment, date: DateTime<Utc>) -> Moment {
    match template.format() {
        Some(format) => Moment::new(date).with_format(format),
        None => Moment::new(date),
    }
}

fn hydrate_instance(
    class: &str,
    template: &Object,
    plain: &Object,
    registry: &ClassRegistry,
) -> Value {
    let descriptor = registry.resolve(class);
    let fields = if descriptor.accepts_initializer() {
        let seed = Value::Object(plain.clone());
        match descriptor.construct(Some(&seed)) {
            Value::Object(built) => built.fields().clone(),
            _ => plain.fields().clone(),
        }
    } else {
        let mut fields = match descriptor.construct(None) {
            Value::Object(built) => built.fields().clone(),
            _ => Fields::new(),
        };
        fields.extend(plain.fields().iter().map(|(k, v)| (k.clone(), v.clone())));
        fields
    };

    Value::Object(Object::with_class(
        Some(class.to_string()),
        hydrate_fields(template.fields(), fields, registry),
    ))
}

/// Recurse into fields of `template` that carry type information.
fn hydrate_fields(template: &Fields, mut fields: Fields, registry: &ClassRegistry) -> Fields {
    for (key, field_template) in template {
        if !carries_type(field_template) {
            continue;
        }
        if let Some(current) = fields.get(key) {
            let hydrated = hydrate(field_template, current, registry);
            fields.insert(key.clone(), hydrated);
        }
    }
    fields
}

fn carries_type(template: &Value) -> bool {
    matches!(
        template,
        Value::Object(_) | Value::Array(_) | Value::Date(_) | Value::Moment(_) | Value::Error(_)
    )
}

fn hydrate_error(template: &ErrorValue, plain: &Object, registry: &ClassRegistry) -> ErrorValue {
    let mut props = plain.fields().clone();
    let kind = match props.remove("name") {
        Some(Value::String(name)) => name,
        _ => template.kind().to_string(),
    };
    let message = match props.remove("message") {
        Some(Value::String(message)) => message,
        _ => String::new(),
    };
    ErrorValue::from_parts(kind, message, hydrate_fields(template.props(), props, registry))
}
