//! # Frozen State
//!
//! Reactive, immutable state containers with resettable lifecycles,
//! structural change detection and time-travel debugging.
//!
//! ## Core Concepts
//!
//! - **Stores**: one frozen value per store, replaced on every commit
//! - **Queries**: change-filtered, disposable projections of a store's value
//! - **Hydration**: typed values rebuilt from plain data via a template
//! - **DevTools**: two-way sync with an external time-travel monitor
//!
//! ## Example
//!
//! ```ignore
//! use frozen_state::{Projection, Store, StoreOptions, StoreRegistry, Value};
//!
//! let registry = StoreRegistry::new();
//! let store = Store::new(
//!     &registry,
//!     StoreOptions::new("counter"),
//!     Value::object([("count", Value::from(0))]),
//! )?;
//!
//! // Only emits when `count` changes
//! let _sub = store
//!     .select(Projection::key("count"))
//!     .subscribe(|count| println!("count = {:?}", count));
//!
//! store.update(Value::object([("count", Value::from(1))]))?;
//! store.reset()?;
//! ```

pub mod devtools;
pub mod diff;
pub mod error;
pub mod hydrate;
pub mod list;
pub mod registry;
pub mod state;
pub mod storage;
pub mod subscriptions;
pub mod value;

// Re-exports
pub use devtools::{DevToolsAdapter, DevToolsOptions, Dispatcher, Monitor, MonitorConnector};
pub use diff::{compare, count_changes, merge};
pub use error::{Result, StateError};
pub use hydrate::{
    clone_error, deep_clone, deep_clone_with, freeze, hydrate, ClassDescriptor, ClassRegistry,
};
pub use list::{Direction, EmptySequence, ListQuery, ListStore, OrderSpec, SortAlgorithm};
pub use registry::{RegistryBuilder, StoreRegistry};
pub use state::{
    Action, CompareStrategy, FnHooks, GlobalDefaults, LifecycleHooks, RuntimeMode, State,
    StateTag, StorageOptions, Store, StoreOptions,
};
pub use storage::{FileStorage, MemoryStorage, StorageBackend};
pub use subscriptions::{Observable, Projection, Subscription};
pub use value::{ErrorValue, Moment, Value};
