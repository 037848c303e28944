//! Type-preserving clone, freeze and hydration.
//!
//! - [`deep_clone`] copies a value without sharing any container.
//! - [`freeze`] makes every nested container reject mutation.
//! - [`hydrate`] turns plain data (typically parsed JSON) back into class
//!   instances, dates and moments by following a live template.
//!
//! Class instances are rebuilt through a [`ClassRegistry`] rather than by
//! inspecting the value at runtime.

mod clone;
#[allow(clippy::module_inception)]
mod hydrate;
mod registry;

pub use clone::{clone_error, deep_clone, deep_clone_with, freeze, is_deep_frozen};
pub use hydrate::hydrate;
pub use registry::{ClassDescriptor, ClassRegistry};
