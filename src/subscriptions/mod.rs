//! Subscription plumbing for live store updates.
//!
//! - [`Channel`]: ordered listeners, synchronous dispatch, optional replay
//! - [`Observable`]: lazily composed stream with `filter`, `map` and
//!   `distinct_until_changed_by`
//! - [`QueryContextManager`]: one [`QueryContext`] per store subscription,
//!   with disposal and the one-shot change-check bypass used by hard resets

mod channel;
mod manager;
mod types;

pub use channel::{Channel, Observable, Subscription};
pub use manager::QueryContextManager;
pub use types::{Projection, ProjectionFn, QueryContext, QueryId};
