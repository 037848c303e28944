//! Lifecycle hooks.
//!
//! Every hook is optional. Hooks that return `Some(value)` replace the value
//! they were handed.

use crate::value::{ErrorValue, Value};
use std::fmt;
use std::sync::Arc;

pub trait LifecycleHooks: Send + Sync {
    fn on_before_init(&self, _value: &Value) -> Option<Value> {
        None
    }

    fn on_after_init(&self, _value: &Value) -> Option<Value> {
        None
    }

    fn on_async_init_success(&self, _value: &Value) -> Option<Value> {
        None
    }

    /// Return `None` to absorb the failure, `Some` to reject with it.
    fn on_async_init_error(&self, error: ErrorValue) -> Option<ErrorValue> {
        Some(error)
    }

    fn on_update(&self, _current: &Value, _next: &Value) -> Option<Value> {
        None
    }

    fn on_override(&self, _current: &Value, _next: &Value) -> Option<Value> {
        None
    }

    fn on_reset(&self, _current: &Value, _initial: &Value) -> Option<Value> {
        None
    }
}

/// Hooks that do nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoHooks;

impl LifecycleHooks for NoHooks {}

type ValueHook = Arc<dyn Fn(&Value) -> Option<Value> + Send + Sync>;
type TransitionHook = Arc<dyn Fn(&Value, &Value) -> Option<Value> + Send + Sync>;
type ErrorHook = Arc<dyn Fn(ErrorValue) -> Option<ErrorValue> + Send + Sync>;

/// Closure-backed hooks, built fluently.
#[derive(Default, Clone)]
pub struct FnHooks {
    before_init: Option<ValueHook>,
    after_init: Option<ValueHook>,
    async_success: Option<ValueHook>,
    async_error: Option<ErrorHook>,
    update: Option<TransitionHook>,
    override_: Option<TransitionHook>,
    reset: Option<TransitionHook>,
}

impl FnHooks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn before_init(mut self, f: impl Fn(&Value) -> Option<Value> + Send + Sync + 'static) -> Self {
        self.before_init = Some(Arc::new(f));
        self
    }

    pub fn after_init(mut self, f: impl Fn(&Value) -> Option<Value> + Send + Sync + 'static) -> Self {
        self.after_init = Some(Arc::new(f));
        self
    }

    pub fn async_init_success(
        mut self,
        f: impl Fn(&Value) -> Option<Value> + Send + Sync + 'static,
    ) -> Self {
        self.async_success = Some(Arc::new(f));
        self
    }

    pub fn async_init_error(
        mut self,
        f: impl Fn(ErrorValue) -> Option<ErrorValue> + Send + Sync + 'static,
    ) -> Self {
        self.async_error = Some(Arc::new(f));
        self
    }

    pub fn update(mut self, f: impl Fn(&Value, &Value) -> Option<Value> + Send + Sync + 'static) -> Self {
        self.update = Some(Arc::new(f));
        self
    }

    pub fn override_value(
        mut self,
        f: impl Fn(&Value, &Value) -> Option<Value> + Send + Sync + 'static,
    ) -> Self {
        self.override_ = Some(Arc::new(f));
        self
    }

    pub fn reset(mut self, f: impl Fn(&Value, &Value) -> Option<Value> + Send + Sync + 'static) -> Self {
        self.reset = Some(Arc::new(f));
        self
    }
}

impl fmt::Debug for FnHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnHooks")
            .field("before_init", &self.before_init.is_some())
            .field("after_init", &self.after_init.is_some())
            .field("async_success", &self.async_success.is_some())
            .field("async_error", &self.async_error.is_some())
            .field("update", &self.update.is_some())
            .field("override", &self.override_.is_some())
            .field("reset", &self.reset.is_some())
            .finish()
    }
}

impl LifecycleHooks for FnHooks {
    fn on_before_init(&self, value: &Value) -> Option<Value> {
        self.before_init.as_ref().and_then(|f| f(value))
    }

    fn on_after_init(&self, value: &Value) -> Option<Value> {
        self.after_init.as_ref().and_then(|f| f(value))
    }

    fn on_async_init_success(&self, value: &Value) -> Option<Value> {
        self.async_success.as_ref().and_then(|f| f(value))
    }

    fn on_async_init_error(&self, error: ErrorValue) -> Option<ErrorValue> {
        match &self.async_error {
            Some(f) => f(error),
            None => Some(error),
        }
    }

    fn on_update(&self, current: &Value, next: &Value) -> Option<Value> {
        self.update.as_ref().and_then(|f| f(current, next))
    }

    fn on_override(&self, current: &Value, next: &Value) -> Option<Value> {
        self.override_.as_ref().and_then(|f| f(current, next))
    }

    fn on_reset(&self, current: &Value, initial: &Value) -> Option<Value> {
        self.reset.as_ref().and_then(|f| f(current, initial))
    }
}
