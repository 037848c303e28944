//! Registry shared by every store of one application (or one test).

use crate::error::{Result, StateError};
use crate::state::{CommitEvent, GlobalDefaults, RuntimeMode, StorageKind, Store, StoreInner};
use crate::storage::{MemoryStorage, StorageBackend};
use crate::subscriptions::{Channel, Observable};
use parking_lot::{Mutex, RwLock};
use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, Weak};
use tracing::debug;

/// Names, storage keys, backends and the commit event channel.
///
/// Store names and storage keys are unique per registry; a store claims
/// both when constructed and releases them when destroyed.
pub struct StoreRegistry {
    mode: RuntimeMode,
    defaults: GlobalDefaults,
    local: Arc<dyn StorageBackend>,
    session: Arc<dyn StorageBackend>,
    names: Mutex<HashSet<String>>,
    storage_keys: Mutex<HashSet<String>>,
    stores: RwLock<BTreeMap<String, Weak<StoreInner>>>,
    commits: Channel<CommitEvent>,
}

/// Builder for [`StoreRegistry`].
#[derive(Default)]
pub struct RegistryBuilder {
    mode: RuntimeMode,
    defaults: GlobalDefaults,
    local: Option<Arc<dyn StorageBackend>>,
    session: Option<Arc<dyn StorageBackend>>,
}

impl RegistryBuilder {
    pub fn mode(mut self, mode: RuntimeMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn defaults(mut self, defaults: GlobalDefaults) -> Self {
        self.defaults = defaults;
        self
    }

    pub fn local_storage(mut self, backend: Arc<dyn StorageBackend>) -> Self {
        self.local = Some(backend);
        self
    }

    pub fn session_storage(mut self, backend: Arc<dyn StorageBackend>) -> Self {
        self.session = Some(backend);
        self
    }

    pub fn build(self) -> Arc<StoreRegistry> {
        Arc::new(StoreRegistry {
            mode: self.mode,
            defaults: self.defaults,
            local: self.local.unwrap_or_else(|| Arc::new(MemoryStorage::new())),
            session: self.session.unwrap_or_else(|| Arc::new(MemoryStorage::new())),
            names: Mutex::new(HashSet::new()),
            storage_keys: Mutex::new(HashSet::new()),
            stores: RwLock::new(BTreeMap::new()),
            commits: Channel::new(),
        })
    }
}

impl StoreRegistry {
    /// Development-mode registry with in-memory storage.
    pub fn new() -> Arc<Self> {
        Self::builder().build()
    }

    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    pub fn mode(&self) -> RuntimeMode {
        self.mode
    }

    pub fn defaults(&self) -> &GlobalDefaults {
        &self.defaults
    }

    /// Backend for a storage kind.
    pub fn storage(&self, kind: &StorageKind) -> Arc<dyn StorageBackend> {
        match kind {
            StorageKind::Local => Arc::clone(&self.local),
            StorageKind::Session => Arc::clone(&self.session),
            StorageKind::Custom(backend) => Arc::clone(backend),
        }
    }

    /// Claim a store name and, optionally, a storage key.
    pub fn register(&self, name: &str, storage_key: Option<&str>) -> Result<()> {
        let mut names = self.names.lock();
        let mut keys = self.storage_keys.lock();

        if names.contains(name) {
            return Err(StateError::DuplicateName(name.to_string()));
        }
        if let Some(key) = storage_key {
            if keys.contains(key) {
                return Err(StateError::DuplicateStorageKey(key.to_string()));
            }
            keys.insert(key.to_string());
        }
        names.insert(name.to_string());
        debug!(store = %name, "registered store");
        Ok(())
    }

    /// Release a name and storage key. Unknown entries are ignored.
    pub fn unregister(&self, name: &str, storage_key: Option<&str>) {
        self.names.lock().remove(name);
        if let Some(key) = storage_key {
            self.storage_keys.lock().remove(key);
        }
        self.stores.write().remove(name);
        debug!(store = %name, "unregistered store");
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.names.lock().contains(name)
    }

    pub(crate) fn attach(&self, name: &str, store: Weak<StoreInner>) {
        self.stores.write().insert(name.to_string(), store);
    }

    /// Live store by name.
    pub fn store(&self, name: &str) -> Option<Store> {
        self.stores
            .read()
            .get(name)
            .and_then(Weak::upgrade)
            .map(Store::from_inner)
    }

    /// Names of live stores, sorted.
    pub fn store_names(&self) -> Vec<String> {
        self.stores
            .read()
            .iter()
            .filter(|(_, store)| store.strong_count() > 0)
            .map(|(name, _)| name.clone())
            .collect()
    }

    /// Every reported commit of every store in this registry.
    pub fn commit_events(&self) -> Observable<CommitEvent> {
        self.commits.observable()
    }

    pub(crate) fn publish(&self, event: CommitEvent) {
        self.commits.emit(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_name_rejected() {
        let registry = StoreRegistry::new();
        registry.register("todos", None).unwrap();
        assert!(matches!(
            registry.register("todos", None),
            Err(StateError::DuplicateName(_))
        ));
    }

    #[test]
    fn test_duplicate_storage_key_rejected_without_claiming_name() {
        let registry = StoreRegistry::new();
        registry.register("a", Some("shared")).unwrap();
        assert!(matches!(
            registry.register("b", Some("shared")),
            Err(StateError::DuplicateStorageKey(_))
        ));
        assert!(!registry.is_registered("b"));
    }

    #[test]
    fn test_unregister_frees_name_and_key() {
        let registry = StoreRegistry::new();
        registry.register("a", Some("k")).unwrap();
        registry.unregister("a", Some("k"));
        registry.register("a", Some("k")).unwrap();
    }
}
