//! Collection edits applied by list stores.

use crate::diff;
use crate::error::{Result, StateError};
use crate::value::Value;

/// One edit to a list value.
#[derive(Clone, Debug)]
pub enum ListOperation {
    /// Add items at the end.
    Append(Vec<Value>),
    /// Remove `start..end`, clamped to the list.
    RemoveRange { start: usize, end: usize },
    /// Replace the item at `index`.
    EditAt { index: usize, value: Value },
    /// Deep-merge `patch` into every item whose id equals `id`.
    UpdateById { id: Value, patch: Value },
    /// Remove every item whose id equals `id`.
    RemoveById(Value),
}

impl ListOperation {
    /// Action name the resulting commit carries.
    pub fn action_name(&self) -> &'static str {
        match self {
            ListOperation::Append(_) => "append",
            ListOperation::RemoveRange { .. } => "removeRange",
            ListOperation::EditAt { .. } => "editAt",
            ListOperation::UpdateById { .. } => "updateById",
            ListOperation::RemoveById(_) => "removeById",
        }
    }
}

/// Apply an operation to a list value.
///
/// A null list is treated as empty. Id-based operations need `id_key`.
pub fn apply_list_operation(
    list: &Value,
    operation: &ListOperation,
    id_key: Option<&str>,
) -> Result<Vec<Value>> {
    let mut items: Vec<Value> = match list {
        Value::Null | Value::Undefined => Vec::new(),
        Value::Array(a) => a.items().to_vec(),
        other => {
            return Err(StateError::InvalidOperation(format!(
                "list operation on {}",
                other.type_name()
            )))
        }
    };

    match operation {
        ListOperation::Append(new_items) => {
            items.extend(new_items.iter().cloned());
        }

        ListOperation::RemoveRange { start, end } => {
            let start = (*start).min(items.len());
            let end = (*end).min(items.len());

            if start < end {
                items.drain(start..end);
            }
        }

        ListOperation::EditAt { index, value } => {
            if *index >= items.len() {
                return Err(StateError::InvalidOperation(format!(
                    "Edit index {} out of bounds (len {})",
                    index,
                    items.len()
                )));
            }
            items[*index] = value.clone();
        }

        ListOperation::UpdateById { id, patch } => {
            let key = require_id_key(id_key)?;
            for item in items.iter_mut() {
                if has_id(item, key, id) {
                    *item = diff::merge(item, patch);
                }
            }
        }

        ListOperation::RemoveById(id) => {
            let key = require_id_key(id_key)?;
            items.retain(|item| !has_id(item, key, id));
        }
    }

    Ok(items)
}

fn require_id_key(id_key: Option<&str>) -> Result<&str> {
    id_key.ok_or_else(|| StateError::MissingConfig("list id key".into()))
}

pub(crate) fn has_id(item: &Value, key: &str, id: &Value) -> bool {
    item.get(key).is_some_and(|v| diff::compare(v, id))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn numbers(values: &[i64]) -> Value {
        Value::array(values.iter().map(|v| Value::from(*v)))
    }

    fn todos() -> Value {
        Value::array([
            Value::object([("id", Value::from(1)), ("done", Value::from(false))]),
            Value::object([("id", Value::from(2)), ("done", Value::from(false))]),
        ])
    }

    #[test]
    fn test_append() {
        let items = apply_list_operation(&Value::Null, &ListOperation::Append(vec![Value::from(1)]), None).unwrap();
        assert_eq!(items, vec![Value::from(1)]);

        let items = apply_list_operation(
            &numbers(&[1]),
            &ListOperation::Append(vec![Value::from(2)]),
            None,
        )
        .unwrap();
        assert_eq!(items, vec![Value::from(1), Value::from(2)]);
    }

    #[test]
    fn test_remove_range() {
        let op = ListOperation::RemoveRange { start: 1, end: 3 };
        let items = apply_list_operation(&numbers(&[1, 2, 3, 4, 5]), &op, None).unwrap();
        assert_eq!(Value::from(items), numbers(&[1, 4, 5]));

        let op = ListOperation::RemoveRange { start: 3, end: 99 };
        let items = apply_list_operation(&numbers(&[1, 2, 3, 4, 5]), &op, None).unwrap();
        assert_eq!(Value::from(items), numbers(&[1, 2, 3]));
    }

    #[test]
    fn test_edit_at() {
        let op = ListOperation::EditAt {
            index: 1,
            value: Value::from(9),
        };
        let items = apply_list_operation(&numbers(&[1, 2, 3]), &op, None).unwrap();
        assert_eq!(Value::from(items), numbers(&[1, 9, 3]));

        let op = ListOperation::EditAt {
            index: 3,
            value: Value::from(9),
        };
        assert!(matches!(
            apply_list_operation(&numbers(&[1, 2, 3]), &op, None),
            Err(StateError::InvalidOperation(_))
        ));
    }

    #[test]
    fn test_id_operations() {
        let op = ListOperation::UpdateById {
            id: Value::from(2),
            patch: Value::object([("done", Value::from(true))]),
        };
        let items = apply_list_operation(&todos(), &op, Some("id")).unwrap();
        assert_eq!(items[1].get("done"), Some(&Value::from(true)));
        assert_eq!(items[0].get("done"), Some(&Value::from(false)));

        let items = apply_list_operation(&todos(), &ListOperation::RemoveById(Value::from(1)), Some("id")).unwrap();
        assert_eq!(items.len(), 1);

        assert!(matches!(
            apply_list_operation(&todos(), &ListOperation::RemoveById(Value::from(1)), None),
            Err(StateError::MissingConfig(_))
        ));
    }
}
