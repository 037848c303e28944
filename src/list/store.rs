//! Stores whose value is a list.

use super::operations::{apply_list_operation, has_id, ListOperation};
use super::query::ListQuery;
use crate::error::{Result, StateError};
use crate::registry::StoreRegistry;
use crate::state::{Action, Store, StoreOptions, Validator};
use crate::value::Value;
use std::collections::HashSet;
use std::ops::Deref;
use std::sync::Arc;

/// A [`Store`] holding an array, with queries and id-aware edits.
///
/// With an id key configured, every committed list must have unique ids
/// under that key. Items without the key are not checked.
#[derive(Clone, Debug)]
pub struct ListStore {
    store: Store,
    id_key: Option<String>,
}

impl ListStore {
    pub fn new(registry: &Arc<StoreRegistry>, options: StoreOptions, initial: Value) -> Result<Self> {
        Self::build(registry, options, initial, None)
    }

    pub fn with_id_key(
        registry: &Arc<StoreRegistry>,
        options: StoreOptions,
        initial: Value,
        id_key: impl Into<String>,
    ) -> Result<Self> {
        Self::build(registry, options, initial, Some(id_key.into()))
    }

    fn build(
        registry: &Arc<StoreRegistry>,
        options: StoreOptions,
        initial: Value,
        id_key: Option<String>,
    ) -> Result<Self> {
        let name = options.name.clone().unwrap_or_default();
        let key = id_key.clone();
        let validator: Validator = Arc::new(move |value: &Value| check_list(&name, key.as_deref(), value));
        let store = Store::build(registry, options, initial, Some(validator))?;
        Ok(Self { store, id_key })
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn id_key(&self) -> Option<&str> {
        self.id_key.as_deref()
    }

    /// Start a query over the current items.
    pub fn query(&self) -> ListQuery {
        ListQuery::new(self.store.clone())
    }

    /// Current items. Empty while the store has no value.
    pub fn items(&self) -> Vec<Value> {
        self.store
            .value()
            .as_array()
            .map(<[Value]>::to_vec)
            .unwrap_or_default()
    }

    pub fn apply(&self, operation: ListOperation) -> Result<()> {
        let id_key = self.id_key.clone();
        let action = Action::custom(operation.action_name());
        self.store.modify(action, move |current| {
            apply_list_operation(current, &operation, id_key.as_deref()).map(Value::from)
        })
    }

    pub fn append(&self, items: Vec<Value>) -> Result<()> {
        self.apply(ListOperation::Append(items))
    }

    pub fn remove_range(&self, start: usize, end: usize) -> Result<()> {
        self.apply(ListOperation::RemoveRange { start, end })
    }

    pub fn edit_at(&self, index: usize, value: Value) -> Result<()> {
        self.apply(ListOperation::EditAt { index, value })
    }

    pub fn update_by_id(&self, id: impl Into<Value>, patch: Value) -> Result<()> {
        self.apply(ListOperation::UpdateById {
            id: id.into(),
            patch,
        })
    }

    pub fn remove_by_id(&self, id: impl Into<Value>) -> Result<()> {
        self.apply(ListOperation::RemoveById(id.into()))
    }

    pub fn find_by_id(&self, id: impl Into<Value>) -> Option<Value> {
        let key = self.id_key.as_deref()?;
        let id = id.into();
        self.items().into_iter().find(|item| has_id(item, key, &id))
    }
}

impl Deref for ListStore {
    type Target = Store;

    fn deref(&self) -> &Store {
        &self.store
    }
}

fn check_list(store: &str, id_key: Option<&str>, value: &Value) -> Result<()> {
    let Some(items) = value.as_array() else {
        return Err(StateError::InvalidOperation(format!(
            "list store {} cannot hold {}",
            store,
            value.type_name()
        )));
    };
    let Some(key) = id_key else {
        return Ok(());
    };

    let mut seen = HashSet::new();
    for item in items {
        let Some(id) = item.get(key).filter(|id| !id.is_nullish()) else {
            continue;
        };
        let id = id.display_key();
        if !seen.insert(id.clone()) {
            return Err(StateError::DuplicateIdentifier {
                store: store.to_string(),
                key: key.to_string(),
                id,
            });
        }
    }
    Ok(())
}
