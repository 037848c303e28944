//! Synchronous publish/subscribe channels and a small operator set.

use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};

pub(crate) type Listener<T> = dyn Fn(&T) + Send + Sync;

struct Slot<T> {
    id: u64,
    active: Arc<AtomicBool>,
    listener: Arc<Listener<T>>,
}

struct ChannelState<T> {
    slots: Vec<Slot<T>>,
    current: Option<T>,
    replay: bool,
    completed: bool,
    next_id: u64,
}

/// Ordered listener list with synchronous dispatch.
///
/// A channel built with [`Channel::with_value`] keeps its latest value and
/// replays it to every new listener.
pub struct Channel<T> {
    state: Arc<Mutex<ChannelState<T>>>,
}

impl<T> Clone for Channel<T> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
        }
    }
}

impl<T: Clone + Send + Sync + 'static> Channel<T> {
    /// Channel without replay.
    pub fn new() -> Self {
        Self::build(None, false)
    }

    /// Channel that replays its latest value to new listeners.
    pub fn with_value(initial: T) -> Self {
        Self::build(Some(initial), true)
    }

    fn build(current: Option<T>, replay: bool) -> Self {
        Self {
            state: Arc::new(Mutex::new(ChannelState {
                slots: Vec::new(),
                current,
                replay,
                completed: false,
                next_id: 1,
            })),
        }
    }

    /// Register a listener. Listeners run in registration order.
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        self.subscribe_arc(Arc::new(listener))
    }

    fn subscribe_arc(&self, listener: Arc<Listener<T>>) -> Subscription {
        let active = Arc::new(AtomicBool::new(true));
        let replayed = {
            let mut state = self.state.lock();
            if state.completed {
                return Subscription::closed();
            }
            let id = state.next_id;
            state.next_id += 1;
            state.slots.push(Slot {
                id,
                active: Arc::clone(&active),
                listener: Arc::clone(&listener),
            });
            let weak: Weak<Mutex<ChannelState<T>>> = Arc::downgrade(&self.state);
            let replayed = if state.replay { state.current.clone() } else { None };
            (replayed, id, weak)
        };

        let (current, id, weak) = replayed;
        let subscription = Subscription::new(Arc::clone(&active), move || {
            if let Some(state) = weak.upgrade() {
                state.lock().slots.retain(|slot| slot.id != id);
            }
        });

        if let Some(value) = current {
            if active.load(Ordering::SeqCst) {
                listener(&value);
            }
        }
        subscription
    }

    /// Deliver `value` to every active listener.
    pub fn emit(&self, value: T) {
        let targets: Vec<(Arc<AtomicBool>, Arc<Listener<T>>)> = {
            let mut state = self.state.lock();
            if state.completed {
                return;
            }
            if state.replay {
                state.current = Some(value.clone());
            }
            state
                .slots
                .iter()
                .map(|slot| (Arc::clone(&slot.active), Arc::clone(&slot.listener)))
                .collect()
        };

        for (active, listener) in targets {
            // Checked per listener so a disposal mid-dispatch takes effect at once.
            if active.load(Ordering::SeqCst) {
                listener(&value);
            }
        }
    }

    /// Stop all delivery and drop every listener. Idempotent.
    pub fn complete(&self) {
        let mut state = self.state.lock();
        state.completed = true;
        for slot in state.slots.drain(..) {
            slot.active.store(false, Ordering::SeqCst);
        }
    }

    pub fn is_completed(&self) -> bool {
        self.state.lock().completed
    }

    /// Latest value of a replaying channel.
    pub fn value(&self) -> Option<T> {
        self.state.lock().current.clone()
    }

    pub fn listener_count(&self) -> usize {
        self.state.lock().slots.len()
    }

    pub fn observable(&self) -> Observable<T> {
        let channel = self.clone();
        Observable::new(move |listener| channel.subscribe_arc(listener))
    }
}

impl<T: Clone + Send + Sync + 'static> Default for Channel<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Handle to one registered listener. Dropping it unsubscribes.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    active: Arc<AtomicBool>,
    teardown: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    fn new<F>(active: Arc<AtomicBool>, teardown: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self {
            active,
            teardown: Some(Box::new(teardown)),
        }
    }

    fn closed() -> Self {
        Self {
            active: Arc::new(AtomicBool::new(false)),
            teardown: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    pub fn unsubscribe(&mut self) {
        self.active.store(false, Ordering::SeqCst);
        if let Some(teardown) = self.teardown.take() {
            teardown();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

type SubscribeFn<T> = dyn Fn(Arc<Listener<T>>) -> Subscription + Send + Sync;

/// Lazily composed stream. Nothing runs until [`Observable::subscribe`].
pub struct Observable<T> {
    source: Arc<SubscribeFn<T>>,
}

impl<T> Clone for Observable<T> {
    fn clone(&self) -> Self {
        Self {
            source: Arc::clone(&self.source),
        }
    }
}

impl<T: Send + Sync + 'static> Observable<T> {
    pub fn new<F>(source: F) -> Self
    where
        F: Fn(Arc<Listener<T>>) -> Subscription + Send + Sync + 'static,
    {
        Self {
            source: Arc::new(source),
        }
    }

    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        (self.source)(Arc::new(listener))
    }

    /// True if both handles are the same stream.
    pub fn ptr_eq(a: &Observable<T>, b: &Observable<T>) -> bool {
        Arc::ptr_eq(&a.source, &b.source)
    }

    pub fn filter<P>(&self, predicate: P) -> Observable<T>
    where
        P: Fn(&T) -> bool + Send + Sync + 'static,
    {
        let upstream = self.clone();
        let predicate = Arc::new(predicate);
        Observable::new(move |downstream: Arc<Listener<T>>| {
            let predicate = Arc::clone(&predicate);
            upstream.subscribe(move |item| {
                if predicate(item) {
                    downstream(item);
                }
            })
        })
    }

    pub fn map<U, F>(&self, f: F) -> Observable<U>
    where
        U: Send + Sync + 'static,
        F: Fn(&T) -> U + Send + Sync + 'static,
    {
        let upstream = self.clone();
        let f = Arc::new(f);
        Observable::new(move |downstream: Arc<Listener<U>>| {
            let f = Arc::clone(&f);
            upstream.subscribe(move |item| downstream(&f(item)))
        })
    }

    /// Suppress items equal to the previous one delivered to the same
    /// listener. Each subscription tracks its own previous item.
    pub fn distinct_until_changed_by<E>(&self, eq: E) -> Observable<T>
    where
        T: Clone,
        E: Fn(&T, &T) -> bool + Send + Sync + 'static,
    {
        let upstream = self.clone();
        let eq = Arc::new(eq);
        Observable::new(move |downstream: Arc<Listener<T>>| {
            let eq = Arc::clone(&eq);
            let last: Mutex<Option<T>> = Mutex::new(None);
            upstream.subscribe(move |item| {
                {
                    let mut last = last.lock();
                    if let Some(prev) = last.as_ref() {
                        if eq(prev, item) {
                            return;
                        }
                    }
                    *last = Some(item.clone());
                }
                downstream(item);
            })
        })
    }
}
