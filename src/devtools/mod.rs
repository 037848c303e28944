//! Time-travel monitor integration.
//!
//! The [`DevToolsAdapter`] listens to a registry's commit events and keeps
//! the monitor's view of every store current. Jump messages from the monitor
//! are hydrated against each store's template and written back through a
//! host-supplied [`Dispatcher`].

mod adapter;
mod dispatcher;
mod protocol;

pub use adapter::{DevToolsAdapter, DevToolsOptions};
pub use dispatcher::{DirectDispatcher, Dispatcher, Task};
pub use protocol::{
    ConnectOptions, MessagePayload, Monitor, MonitorConnector, MonitorListener, MonitorMessage,
    PayloadKind, DISPATCH,
};
