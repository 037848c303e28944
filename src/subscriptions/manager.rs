//! Query context manager: one context per store subscription pipeline.

use super::channel::{Listener, Observable};
use super::types::{QueryContext, QueryId};
use crate::error::{Result, StateError};
use crate::state::{CompareStrategy, LazyInitContext};
use crate::value::Value;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tracing::debug;

/// Tracks the query contexts of one store and mediates lazy initialization.
pub struct QueryContextManager {
    store: String,
    contexts: Mutex<Vec<Arc<QueryContext>>>,
    lazy_init: Mutex<Option<Arc<LazyInitContext>>>,
    next_id: AtomicU64,
}

impl QueryContextManager {
    pub fn new(store: impl Into<String>) -> Self {
        Self {
            store: store.into(),
            contexts: Mutex::new(Vec::new()),
            lazy_init: Mutex::new(None),
            next_id: AtomicU64::new(1),
        }
    }

    /// Register a new context. The first registration releases a pending
    /// lazy initialization.
    pub fn register(&self) -> Arc<QueryContext> {
        let id = QueryId(self.next_id.fetch_add(1, Ordering::SeqCst));
        let context = Arc::new(QueryContext::new(id));
        self.contexts.lock().push(Arc::clone(&context));
        debug!(store = %self.store, query = id.0, "registered query context");

        self.trigger_lazy_init();
        context
    }

    /// Release a pending lazy initialization, if any.
    pub(crate) fn trigger_lazy_init(&self) {
        if let Some(lazy) = self.lazy_init.lock().take() {
            debug!(store = %self.store, "starting lazy initialization");
            lazy.trigger();
        }
    }

    /// Wrap `source` so that emissions equal to the previous one are
    /// dropped, emissions are deep-cloned, and nothing flows once `context`
    /// is disposed.
    pub fn attach(
        &self,
        context: &Arc<QueryContext>,
        source: Observable<Value>,
        compare: CompareStrategy,
    ) -> Observable<Value> {
        let live = Arc::downgrade(context);
        let observable = change_filtered(source, Weak::clone(&live), compare)
            .filter(move |_| is_live(&live))
            .map(|value| crate::hydrate::deep_clone(value));
        context.set_observable(observable.clone());
        observable
    }

    pub fn len(&self) -> usize {
        self.contexts.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.contexts.lock().is_empty()
    }

    pub fn contexts(&self) -> Vec<Arc<QueryContext>> {
        self.contexts.lock().clone()
    }

    /// Dispose the context at `index` in registration order.
    pub fn dispose_by_index(&self, index: usize) -> bool {
        let mut contexts = self.contexts.lock();
        if index >= contexts.len() {
            return false;
        }
        let context = contexts.remove(index);
        context.dispose();
        debug!(store = %self.store, query = context.id().0, "disposed query context");
        true
    }

    /// Dispose the context that produced `observable`.
    pub fn dispose_by_observable(&self, observable: &Observable<Value>) -> bool {
        let mut contexts = self.contexts.lock();
        let position = contexts.iter().position(|c| {
            c.observable()
                .map(|o| Observable::ptr_eq(&o, observable))
                .unwrap_or(false)
        });
        match position {
            Some(index) => {
                let context = contexts.remove(index);
                context.dispose();
                debug!(store = %self.store, query = context.id().0, "disposed query context");
                true
            }
            None => false,
        }
    }

    /// Dispose every context. Idempotent.
    pub fn dispose_all(&self) {
        let drained: Vec<_> = self.contexts.lock().drain(..).collect();
        for context in &drained {
            context.dispose();
        }
        if !drained.is_empty() {
            debug!(store = %self.store, count = drained.len(), "disposed all query contexts");
        }
    }

    /// Let every context re-emit an unchanged value once.
    pub fn skip_next_change_check_all(&self) {
        for context in self.contexts.lock().iter() {
            context.skip_next_change_check();
        }
    }

    pub(crate) fn set_lazy_init(&self, context: Arc<LazyInitContext>) -> Result<()> {
        let mut slot = self.lazy_init.lock();
        if slot.is_some() {
            return Err(StateError::LazyInitPending(self.store.clone()));
        }
        *slot = Some(context);
        Ok(())
    }

    pub fn has_pending_lazy_init(&self) -> bool {
        self.lazy_init.lock().is_some()
    }

    /// Drop a pending lazy initialization without running it.
    pub(crate) fn cancel_lazy_init(&self) {
        if let Some(lazy) = self.lazy_init.lock().take() {
            lazy.cancel();
        }
    }
}

fn is_live(context: &Weak<QueryContext>) -> bool {
    context
        .upgrade()
        .map(|c| !c.is_disposed())
        .unwrap_or(false)
}

fn change_filtered(
    source: Observable<Value>,
    context: Weak<QueryContext>,
    compare: CompareStrategy,
) -> Observable<Value> {
    Observable::new(move |downstream: Arc<Listener<Value>>| {
        let context = Weak::clone(&context);
        let compare = compare.clone();
        let last: Mutex<Option<(Value, u64)>> = Mutex::new(None);
        source.subscribe(move |item: &Value| {
            let Some(ctx) = context.upgrade() else {
                return;
            };
            let epoch = ctx.reset_epoch();
            {
                let mut last = last.lock();
                if let Some((previous, seen)) = last.as_ref() {
                    if *seen == epoch && compare.equals(previous, item) {
                        return;
                    }
                }
                *last = Some((item.clone(), epoch));
            }
            downstream(item);
        })
    })
}
