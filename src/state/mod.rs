//! The state container and its lifecycle.
//!
//! A [`Store`] holds one immutable value. Every transition produces a new
//! [`State`] snapshot tagged with the [`Action`] that caused it; snapshots
//! flow to subscribers through the store's query contexts and, unless the
//! write is a devtools replay, to the registry's commit event channel.

mod config;
mod container;
mod hooks;
mod lifecycle;
mod types;

pub use config::{
    resolve_config, CompareStrategy, Config, GlobalDefaults, JsonSerializer, RuntimeMode,
    StorageConfig, StorageKind, StorageOptions, StoreOptions, ValueSerializer,
    DEFAULT_STORAGE_DEBOUNCE,
};
pub use container::Store;
pub(crate) use container::StoreInner;
pub(crate) use container::Validator;
pub use hooks::{FnHooks, LifecycleHooks, NoHooks};
pub use lifecycle::LazyInitContext;
pub use types::{Action, Commit, CommitEvent, State, StateTag};
