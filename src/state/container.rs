//! The state container: one store, one value, one lifecycle.

use super::config::{resolve_config, CompareStrategy, Config, RuntimeMode, StoreOptions};
use super::lifecycle::{LazyInitContext, PromiseContext};
use super::types::{Action, Commit, CommitEvent, State, StateTag};
use crate::diff;
use crate::error::{Result, StateError};
use crate::hydrate::{clone_error, deep_clone, deep_clone_with, freeze, hydrate, ClassRegistry};
use crate::registry::StoreRegistry;
use crate::storage::Persister;
use crate::subscriptions::{Channel, Observable, Projection, QueryContextManager};
use crate::value::{ErrorValue, Value};
use futures::future::{self, BoxFuture, FutureExt};
use parking_lot::{Mutex, ReentrantMutex, RwLock};
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, warn};

/// Check run against every non-null value before it is committed.
pub(crate) type Validator = Arc<dyn Fn(&Value) -> Result<()> + Send + Sync>;

struct Core {
    state: State,
    /// Value readers see while the store is paused.
    visible: Option<Value>,
    initial: Value,
    instanced: Option<Value>,
    initialized: bool,
    destroyed: bool,
    promise: Option<Arc<PromiseContext>>,
}

pub(crate) struct StoreInner {
    config: Arc<Config>,
    registry: Arc<StoreRegistry>,
    classes: RwLock<ClassRegistry>,
    core: Mutex<Core>,
    /// Serializes writers so commits reach subscribers in order.
    writer: ReentrantMutex<()>,
    commits: Channel<Commit>,
    queries: QueryContextManager,
    persister: Option<Persister>,
    validator: Option<Validator>,
}

impl StoreInner {
    fn name(&self) -> &str {
        &self.config.name
    }

    fn storage_key(&self) -> Option<&str> {
        self.config.storage.as_ref().map(|s| s.key.as_str())
    }

    /// Operational misuse: an error in development, a logged no-op in
    /// production.
    fn misuse(&self, err: StateError) -> Result<()> {
        match self.registry.mode() {
            RuntimeMode::Development => Err(err),
            RuntimeMode::Production => {
                warn!(store = %self.name(), error = %err, "ignoring invalid operation");
                Ok(())
            }
        }
    }
}

impl Drop for StoreInner {
    fn drop(&mut self) {
        if !self.core.get_mut().destroyed {
            self.registry.unregister(&self.config.name, self.storage_key());
        }
    }
}

/// Handle to a store. Clones share the same store.
#[derive(Clone)]
pub struct Store {
    inner: Arc<StoreInner>,
}

impl Store {
    /// Create a store. A non-null `initial` value initializes it at once;
    /// `Value::Null` leaves it loading until one of the `initialize*` calls.
    pub fn new(registry: &Arc<StoreRegistry>, options: StoreOptions, initial: Value) -> Result<Store> {
        Self::build(registry, options, initial, None)
    }

    pub(crate) fn build(
        registry: &Arc<StoreRegistry>,
        options: StoreOptions,
        initial: Value,
        validator: Option<Validator>,
    ) -> Result<Store> {
        let config = resolve_config(registry.defaults(), options)?;
        if initial.is_undefined() {
            return Err(StateError::UndefinedInitialValue(config.name));
        }
        let storage_key = config.storage.as_ref().map(|s| s.key.clone());
        registry.register(&config.name, storage_key.as_deref())?;

        let persister = config
            .storage
            .as_ref()
            .map(|s| Persister::new(registry.storage(&s.kind), s.key.clone(), s.debounce));

        let mut classes = config.classes.clone();
        let instanced = config.template.as_ref().map(|t| freeze(&deep_clone(t)));
        if let Some(template) = &instanced {
            classes.infer_from(template);
        }

        let inner = Arc::new(StoreInner {
            queries: QueryContextManager::new(config.name.clone()),
            config: Arc::new(config),
            registry: Arc::clone(registry),
            classes: RwLock::new(classes),
            core: Mutex::new(Core {
                state: State::loading(),
                visible: None,
                initial: Value::Null,
                instanced,
                initialized: false,
                destroyed: false,
                promise: None,
            }),
            writer: ReentrantMutex::new(()),
            commits: Channel::with_value(Commit {
                state: State::loading(),
                action: Action::Init,
            }),
            persister,
            validator,
        });
        registry.attach(inner.name(), Arc::downgrade(&inner));
        debug!(store = %inner.name(), "created store");

        let store = Store { inner };
        if !initial.is_null() {
            store.initialize(initial)?;
        }
        Ok(store)
    }

    pub(crate) fn from_inner(inner: Arc<StoreInner>) -> Store {
        Store { inner }
    }

    pub fn name(&self) -> &str {
        self.inner.name()
    }

    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    pub fn registry(&self) -> &Arc<StoreRegistry> {
        &self.inner.registry
    }

    /// Current value. While paused this is the value at the moment of
    /// pausing.
    pub fn value(&self) -> Value {
        let core = self.inner.core.lock();
        match (&core.visible, core.state.is_paused) {
            (Some(visible), true) => visible.clone(),
            _ => core.state.value.clone(),
        }
    }

    /// Current state as observers see it.
    pub fn state(&self) -> State {
        let core = self.inner.core.lock();
        let mut state = core.state.clone();
        if let (Some(visible), true) = (&core.visible, state.is_paused) {
            state.value = visible.clone();
        }
        state
    }

    pub fn tag(&self) -> StateTag {
        let core = self.inner.core.lock();
        StateTag::derive(&core.state, core.destroyed)
    }

    pub fn error(&self) -> Option<ErrorValue> {
        self.inner.core.lock().state.error.clone()
    }

    pub fn is_paused(&self) -> bool {
        self.inner.core.lock().state.is_paused
    }

    pub fn is_loading(&self) -> bool {
        self.inner.core.lock().state.is_loading
    }

    pub fn is_initialized(&self) -> bool {
        self.inner.core.lock().initialized
    }

    pub fn is_destroyed(&self) -> bool {
        self.inner.core.lock().destroyed
    }

    /// Baseline `reset` returns to. Null for unresettable stores.
    pub fn initial_value(&self) -> Value {
        self.inner.core.lock().initial.clone()
    }

    /// Template used to hydrate plain data into this store's types.
    pub fn instanced_value(&self) -> Option<Value> {
        self.inner.core.lock().instanced.clone()
    }

    pub fn queries(&self) -> &QueryContextManager {
        &self.inner.queries
    }

    /// Initialize a loading store.
    pub fn initialize(&self, value: Value) -> Result<()> {
        let _writer = self.inner.writer.lock();
        if let Err(e) = self.check_initializable() {
            return self.inner.misuse(e);
        }
        self.initialize_with(value, Action::Init)
    }

    /// Initialize from an asynchronous source.
    ///
    /// Checks run before the future is returned. A `hard_reset` or `destroy`
    /// issued while `source` is pending discards its result.
    pub fn initialize_async<F>(&self, source: F) -> BoxFuture<'static, Result<()>>
    where
        F: Future<Output = std::result::Result<Value, ErrorValue>> + Send + 'static,
    {
        if let Err(e) = self.check_initializable() {
            return future::ready(self.inner.misuse(e)).boxed();
        }
        let store = self.clone();
        let (context, guard) = PromiseContext::new();
        self.inner.core.lock().promise = Some(Arc::clone(&context));
        debug!(store = %self.name(), "async initialization started");

        async move {
            let _guard = guard;
            let outcome = source.await;
            store.finish_async(&context, outcome, Action::AsyncInit)
        }
        .boxed()
    }

    /// Like [`Store::initialize_async`], but `source` is not polled until the
    /// first query context registers on this store.
    ///
    /// The initialization counts as in flight from the moment this returns,
    /// so a `hard_reset` or `destroy` cancels it whether or not a subscriber
    /// has triggered it yet.
    pub fn initialize_lazily<F>(&self, source: F) -> BoxFuture<'static, Result<()>>
    where
        F: Future<Output = std::result::Result<Value, ErrorValue>> + Send + 'static,
    {
        let _writer = self.inner.writer.lock();
        if self.inner.queries.has_pending_lazy_init() {
            let err = StateError::LazyInitPending(self.name().to_string());
            return future::ready(self.inner.misuse(err)).boxed();
        }
        if let Err(e) = self.check_initializable() {
            return future::ready(self.inner.misuse(e)).boxed();
        }
        let (lazy, triggered) = LazyInitContext::new();
        let lazy = Arc::new(lazy);
        if let Err(e) = self.inner.queries.set_lazy_init(Arc::clone(&lazy)) {
            return future::ready(self.inner.misuse(e)).boxed();
        }
        let (context, guard) = PromiseContext::new();
        self.inner.core.lock().promise = Some(Arc::clone(&context));
        if !self.inner.queries.is_empty() {
            self.inner.queries.trigger_lazy_init();
        }
        let store = self.clone();

        async move {
            let _guard = guard;
            if triggered.await.is_err() || lazy.is_canceled() || context.is_cancelled() {
                debug!(store = %store.name(), "lazy initialization canceled");
                return Ok(());
            }
            let outcome = source.await;
            store.finish_async(&context, outcome, Action::LazyInit)
        }
        .boxed()
    }

    fn finish_async(
        &self,
        context: &Arc<PromiseContext>,
        outcome: std::result::Result<Value, ErrorValue>,
        action: Action,
    ) -> Result<()> {
        let _writer = self.inner.writer.lock();
        if context.is_cancelled() {
            debug!(store = %self.name(), action = %action, "discarding superseded initialization");
            return Ok(());
        }
        {
            let mut core = self.inner.core.lock();
            if core.promise.as_ref().is_some_and(|p| Arc::ptr_eq(p, context)) {
                core.promise = None;
            }
        }

        let hooks = Arc::clone(&self.inner.config.hooks);
        match outcome {
            Ok(value) => {
                let value = hooks.on_async_init_success(&value).unwrap_or(value);
                if let Err(e) = self.check_initializable() {
                    return self.inner.misuse(e);
                }
                self.initialize_with(value, action)
            }
            Err(error) => match hooks.on_async_init_error(error) {
                Some(error) => {
                    debug!(store = %self.name(), error = %error, "async initialization failed");
                    Err(StateError::AsyncInit(error))
                }
                None => {
                    debug!(store = %self.name(), "async initialization failure absorbed");
                    Ok(())
                }
            },
        }
    }

    fn check_initializable(&self) -> Result<()> {
        let core = self.inner.core.lock();
        if core.destroyed {
            return Err(StateError::Destroyed(self.name().to_string()));
        }
        if core.initialized || core.promise.is_some() {
            return Err(StateError::AlreadyInitialized(self.name().to_string()));
        }
        Ok(())
    }

    fn initialize_with(&self, value: Value, action: Action) -> Result<()> {
        if value.is_undefined() {
            return self
                .inner
                .misuse(StateError::UndefinedInitialValue(self.name().to_string()));
        }
        let hooks = Arc::clone(&self.inner.config.hooks);
        let value = hooks.on_before_init(&value).unwrap_or(value);

        let template = self.establish_template(&value);
        let value = self.read_storage(template.as_ref()).unwrap_or(value);
        let prepared = self.prepare(&value);
        if !self.validate(&prepared)? {
            return Ok(());
        }

        let next = {
            let mut core = self.inner.core.lock();
            if core.destroyed {
                return Ok(());
            }
            core.initialized = true;
            if self.inner.config.resettable {
                core.initial = prepared.clone();
            }
            State {
                value: prepared,
                error: None,
                is_loading: false,
                is_paused: core.state.is_paused,
                is_hard_resetting: false,
            }
        };
        self.commit(next, action, true)?;

        let current = self.inner.core.lock().state.value.clone();
        if let Some(replaced) = hooks.on_after_init(&current) {
            let prepared = self.prepare(&replaced);
            let next = State {
                value: prepared,
                ..self.inner.core.lock().state.clone()
            };
            self.commit(next, Action::AfterInit, true)?;
        }
        Ok(())
    }

    fn establish_template(&self, value: &Value) -> Option<Value> {
        let mut core = self.inner.core.lock();
        if core.instanced.is_none() && !value.is_nullish() {
            let template = freeze(&deep_clone(value));
            self.inner.classes.write().infer_from(&template);
            core.instanced = Some(template);
        }
        core.instanced.clone()
    }

    fn read_storage(&self, template: Option<&Value>) -> Option<Value> {
        let persister = self.inner.persister.as_ref()?;
        let raw = match persister.load() {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                warn!(store = %self.name(), error = %e, "failed to read persisted state");
                return None;
            }
        };
        let parsed = match self.inner.config.serializer.parse(&raw) {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!(store = %self.name(), error = %e, "ignoring unreadable persisted state");
                return None;
            }
        };
        debug!(store = %self.name(), key = %persister.key(), "restored persisted state");
        match template {
            Some(template) if self.inner.config.instance_handling => {
                Some(hydrate(template, &parsed, &self.inner.classes.read()))
            }
            _ => Some(parsed),
        }
    }

    /// Detach `value` from its source and freeze it if configured.
    fn prepare(&self, value: &Value) -> Value {
        let cloned = if self.inner.config.instance_handling {
            deep_clone_with(value, &self.inner.classes.read())
        } else {
            deep_clone(value)
        };
        if self.inner.config.immutable {
            freeze(&cloned)
        } else {
            cloned
        }
    }

    /// Deep-merge `partial` into the current value.
    pub fn update(&self, partial: Value) -> Result<()> {
        let _writer = self.inner.writer.lock();
        let current = self.inner.core.lock().state.value.clone();
        let next = diff::merge(&current, &partial);
        let next = self
            .inner
            .config
            .hooks
            .on_update(&current, &next)
            .unwrap_or(next);
        self.write_value(next, Action::Update)
    }

    /// Replace the current value.
    pub fn set(&self, value: Value) -> Result<()> {
        let _writer = self.inner.writer.lock();
        let current = self.inner.core.lock().state.value.clone();
        let next = self
            .inner
            .config
            .hooks
            .on_update(&current, &value)
            .unwrap_or(value);
        self.write_value(next, Action::Set)
    }

    /// Replace the current value and the baseline `reset` returns to.
    pub fn override_value(&self, value: Value) -> Result<()> {
        let _writer = self.inner.writer.lock();
        let current = self.inner.core.lock().state.value.clone();
        let next = self
            .inner
            .config
            .hooks
            .on_override(&current, &value)
            .unwrap_or(value);
        let prepared = self.prepare(&next);
        if self.inner.config.resettable {
            self.inner.core.lock().initial = prepared.clone();
        }
        self.write_prepared(prepared, Action::Override)
    }

    /// Replace the value under a caller-named action. Runs the update hook.
    pub fn dispatch(&self, action: impl Into<String>, value: Value) -> Result<()> {
        let _writer = self.inner.writer.lock();
        let current = self.inner.core.lock().state.value.clone();
        let next = self
            .inner
            .config
            .hooks
            .on_update(&current, &value)
            .unwrap_or(value);
        self.write_value(next, Action::custom(action))
    }

    /// Compute the next value from the current one and commit it under
    /// `action`. Runs the update hook.
    pub(crate) fn modify<F>(&self, action: Action, f: F) -> Result<()>
    where
        F: FnOnce(&Value) -> Result<Value>,
    {
        let _writer = self.inner.writer.lock();
        let current = self.inner.core.lock().state.value.clone();
        let next = f(&current)?;
        let next = self
            .inner
            .config
            .hooks
            .on_update(&current, &next)
            .unwrap_or(next);
        self.write_value(next, action)
    }

    /// Return to the initial value and clear the error.
    pub fn reset(&self) -> Result<()> {
        let _writer = self.inner.writer.lock();
        if !self.inner.config.resettable {
            return self
                .inner
                .misuse(StateError::NotResettable(self.name().to_string()));
        }
        let (current, initial) = {
            let core = self.inner.core.lock();
            if !core.initialized {
                drop(core);
                return self
                    .inner
                    .misuse(StateError::NotInitialized(self.name().to_string()));
            }
            (core.state.value.clone(), core.initial.clone())
        };
        let next = self
            .inner
            .config
            .hooks
            .on_reset(&current, &initial)
            .unwrap_or(initial);
        let prepared = self.prepare(&next);
        let state = State {
            value: prepared,
            error: None,
            ..self.inner.core.lock().state.clone()
        };
        self.commit(state, Action::Reset, true)
    }

    fn write_value(&self, value: Value, action: Action) -> Result<()> {
        let prepared = self.prepare(&value);
        self.write_prepared(prepared, action)
    }

    fn write_prepared(&self, value: Value, action: Action) -> Result<()> {
        let state = State {
            value,
            ..self.inner.core.lock().state.clone()
        };
        self.commit(state, action, true)
    }

    /// Record a state-level error. `None` clears it.
    pub fn set_error(&self, error: Option<ErrorValue>) -> Result<()> {
        let _writer = self.inner.writer.lock();
        let state = State {
            error: error.as_ref().map(clone_error),
            ..self.inner.core.lock().state.clone()
        };
        self.commit(state, Action::Error, true)
    }

    /// Error changes. Repeated equal errors, including repeated `None`, are
    /// emitted once.
    pub fn error_stream(&self) -> Observable<Option<ErrorValue>> {
        self.inner
            .commits
            .observable()
            .map(|commit| commit.state.error.clone())
            .distinct_until_changed_by(|a, b| a == b)
    }

    /// Pause or resume delivery. Writes made while paused are kept and
    /// delivered on resume.
    pub fn set_paused(&self, paused: bool) -> Result<()> {
        let _writer = self.inner.writer.lock();
        let state = {
            let mut core = self.inner.core.lock();
            if core.state.is_paused == paused {
                return Ok(());
            }
            let visible = paused.then(|| core.state.value.clone());
            core.visible = visible;
            State {
                is_paused: paused,
                ..core.state.clone()
            }
        };
        let action = if paused { Action::Pause } else { Action::Resume };
        self.commit(state, action, true)
    }

    /// Write a state directly, bypassing hooks and without reporting the
    /// commit on the registry's event channel.
    pub fn replay_state(&self, state: State) -> Result<()> {
        let _writer = self.inner.writer.lock();
        let state = State {
            value: self.prepare(&state.value),
            error: state.error.as_ref().map(clone_error),
            ..state
        };
        {
            let mut core = self.inner.core.lock();
            core.visible = state.is_paused.then(|| state.value.clone());
            if !state.value.is_nullish() {
                core.initialized = true;
            }
        }
        self.commit(state, Action::Replay, false)
    }

    /// Rebuild a state from a plain snapshot, hydrated against this store's
    /// template when instance handling is on.
    pub fn hydrate_snapshot(&self, snapshot: &Value) -> State {
        let template = if self.inner.config.instance_handling {
            self.instanced_value()
        } else {
            None
        };
        State::from_snapshot(snapshot, template.as_ref(), &self.inner.classes.read())
    }

    /// Clear the store back to loading.
    ///
    /// Everything up to the final loading transition happens before this
    /// returns. A superseded async initialization is cancelled here and its
    /// result is discarded whenever it arrives; the future resolves once
    /// that cancellation has settled, without waiting for the source.
    pub fn hard_reset(&self) -> BoxFuture<'static, Result<Store>> {
        let _writer = self.inner.writer.lock();
        if self.is_destroyed() {
            let result = self
                .inner
                .misuse(StateError::Destroyed(self.name().to_string()));
            return future::ready(result.map(|_| self.clone())).boxed();
        }
        if !self.inner.config.resettable {
            let result = self
                .inner
                .misuse(StateError::NotResettable(self.name().to_string()));
            return future::ready(result.map(|_| self.clone())).boxed();
        }

        let resetting = State {
            is_hard_resetting: true,
            ..self.inner.core.lock().state.clone()
        };
        if let Err(e) = self.commit(resetting, Action::HardReset, true) {
            return future::ready(Err(e)).boxed();
        }
        let settled = self.clear();
        self.inner.queries.skip_next_change_check_all();
        if let Err(e) = self.commit(State::loading(), Action::HardReset, true) {
            return future::ready(Err(e)).boxed();
        }
        debug!(store = %self.name(), "hard reset");

        let store = self.clone();
        async move {
            if let Some(settled) = settled {
                let _ = settled.await;
            }
            Ok(store)
        }
        .boxed()
    }

    /// Cancel pending initialization and drop every value the store holds.
    /// Returns the superseded initialization's settle signal.
    fn clear(&self) -> Option<super::lifecycle::Settled> {
        self.inner.queries.cancel_lazy_init();
        let settled = {
            let mut core = self.inner.core.lock();
            core.initial = Value::Null;
            core.instanced = self
                .inner
                .config
                .template
                .as_ref()
                .map(|t| freeze(&deep_clone(t)));
            core.initialized = false;
            core.visible = None;
            core.promise.take().map(|promise| {
                promise.cancel();
                promise.settled()
            })
        };
        if let Some(persister) = &self.inner.persister {
            if let Err(e) = persister.remove() {
                warn!(store = %self.name(), error = %e, "failed to remove persisted state");
            }
        }
        settled
    }

    /// Tear the store down. Idempotent. Later writes are ignored and the
    /// name and storage key become free again.
    pub fn destroy(&self) -> BoxFuture<'static, Result<Store>> {
        let _writer = self.inner.writer.lock();
        if self.is_destroyed() {
            return future::ready(Ok(self.clone())).boxed();
        }

        let settled = self.clear();
        let last = State {
            is_hard_resetting: true,
            ..State::default()
        };
        if let Err(e) = self.commit(last, Action::Destroy, true) {
            warn!(store = %self.name(), error = %e, "final commit rejected");
        }
        self.inner.core.lock().destroyed = true;
        self.inner.commits.complete();
        self.inner.queries.dispose_all();
        if let Some(persister) = &self.inner.persister {
            persister.flush();
        }
        self.inner
            .registry
            .unregister(self.name(), self.inner.storage_key());
        debug!(store = %self.name(), "destroyed");

        let store = self.clone();
        async move {
            if let Some(settled) = settled {
                let _ = settled.await;
            }
            Ok(store)
        }
        .boxed()
    }

    /// Subscribe to the whole value.
    pub fn select_all(&self) -> Observable<Value> {
        self.select(Projection::Identity)
    }

    /// Subscribe to a projection of the value.
    pub fn select(&self, projection: Projection) -> Observable<Value> {
        self.select_when(projection, Vec::new())
    }

    /// Subscribe to a projection, only for commits made by `actions`. An
    /// empty list accepts every action.
    ///
    /// Loading, hard-resetting and paused states never reach subscribers.
    /// Equal consecutive projections are suppressed, except once after a
    /// hard reset. Every emission is a private deep copy.
    pub fn select_when(&self, projection: Projection, actions: Vec<Action>) -> Observable<Value> {
        self.select_with(projection, actions, self.inner.config.compare.clone())
    }

    /// [`Store::select_when`] with an explicit change check.
    pub fn select_with(
        &self,
        projection: Projection,
        actions: Vec<Action>,
        compare: CompareStrategy,
    ) -> Observable<Value> {
        let context = self.inner.queries.register();
        let source = self
            .inner
            .commits
            .observable()
            .filter(|commit| !commit.state.is_loading && !commit.state.is_hard_resetting)
            .filter(|commit| !commit.state.is_paused)
            .filter(move |commit| actions.is_empty() || actions.contains(&commit.action))
            .map(move |commit| projection.apply(&commit.state.value));
        self.inner.queries.attach(&context, source, compare)
    }

    /// Every commit, unfiltered.
    pub fn commits(&self) -> Observable<Commit> {
        self.inner.commits.observable()
    }

    /// Block until pending storage writes have landed.
    pub fn flush_storage(&self) {
        if let Some(persister) = &self.inner.persister {
            persister.flush();
        }
    }

    /// False when a rejected value should be dropped without error.
    fn validate(&self, value: &Value) -> Result<bool> {
        let Some(validator) = &self.inner.validator else {
            return Ok(true);
        };
        if value.is_nullish() {
            return Ok(true);
        }
        match validator(value) {
            Ok(()) => Ok(true),
            Err(e) => self.inner.misuse(e).map(|_| false),
        }
    }

    /// The shared commit path.
    fn commit(&self, next: State, action: Action, report: bool) -> Result<()> {
        if !self.validate(&next.value)? {
            return Ok(());
        }

        let previous = {
            let mut core = self.inner.core.lock();
            if core.destroyed {
                debug!(store = %self.name(), action = %action, "ignoring commit on destroyed store");
                return Ok(());
            }
            std::mem::replace(&mut core.state, next.clone())
        };
        debug!(
            store = %self.name(),
            action = %action,
            tag = ?StateTag::derive(&next, false),
            "commit"
        );

        self.persist(&previous, &next, &action);
        self.inner.commits.emit(Commit {
            state: next.clone(),
            action: action.clone(),
        });
        if report {
            self.inner.registry.publish(CommitEvent {
                store: self.name().to_string(),
                state: next,
                action,
            });
        }
        Ok(())
    }

    fn persist(&self, previous: &State, next: &State, action: &Action) {
        let Some(persister) = &self.inner.persister else {
            return;
        };
        if next.is_paused || next.is_loading || next.is_hard_resetting {
            return;
        }
        let changed = *action == Action::Resume
            || previous.is_loading
            || !diff::compare(&previous.value, &next.value);
        if !changed {
            return;
        }
        match self.inner.config.serializer.stringify(&next.value) {
            Ok(payload) => persister.schedule(payload),
            Err(e) => warn!(store = %self.name(), error = %e, "failed to serialize state"),
        }
    }
}

impl fmt::Debug for Store {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Store")
            .field("name", &self.name())
            .field("tag", &self.tag())
            .field("value", &self.value())
            .finish()
    }
}
