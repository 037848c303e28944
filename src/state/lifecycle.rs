//! Bookkeeping for in-flight asynchronous and lazy initialization.

use futures::channel::oneshot;
use futures::future::{FutureExt, Shared};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Resolves once the owning async initialization has settled: it finished,
/// its future was dropped, or it was cancelled.
pub(crate) type Settled = Shared<oneshot::Receiver<()>>;

/// One in-flight `initialize_async` or `initialize_lazily`.
pub(crate) struct PromiseContext {
    cancelled: AtomicBool,
    signal: Mutex<Option<oneshot::Sender<()>>>,
    settled: Settled,
}

/// Held by the running initialization. Dropping it settles the context.
pub(crate) struct SettleGuard {
    context: Arc<PromiseContext>,
}

impl Drop for SettleGuard {
    fn drop(&mut self) {
        self.context.settle();
    }
}

impl PromiseContext {
    pub(crate) fn new() -> (Arc<Self>, SettleGuard) {
        let (tx, rx) = oneshot::channel();
        let context = Arc::new(Self {
            cancelled: AtomicBool::new(false),
            signal: Mutex::new(Some(tx)),
            settled: rx.shared(),
        });
        let guard = SettleGuard {
            context: Arc::clone(&context),
        };
        (context, guard)
    }

    /// Mark the initialization superseded. Waiters are released at once; a
    /// later completion is discarded.
    pub(crate) fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
        self.settle();
    }

    pub(crate) fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    fn settle(&self) {
        if let Some(tx) = self.signal.lock().take() {
            let _ = tx.send(());
        }
    }

    pub(crate) fn settled(&self) -> Settled {
        self.settled.clone()
    }
}

/// One pending `initialize_lazily`, waiting for its first subscriber.
pub struct LazyInitContext {
    trigger: Mutex<Option<oneshot::Sender<()>>>,
    canceled: AtomicBool,
}

impl LazyInitContext {
    pub(crate) fn new() -> (Self, oneshot::Receiver<()>) {
        let (tx, rx) = oneshot::channel();
        (
            Self {
                trigger: Mutex::new(Some(tx)),
                canceled: AtomicBool::new(false),
            },
            rx,
        )
    }

    /// Release the waiting initialization. Only the first call has effect.
    pub(crate) fn trigger(&self) {
        if let Some(tx) = self.trigger.lock().take() {
            let _ = tx.send(());
        }
    }

    /// Abandon the initialization; the waiting future resolves without
    /// touching state.
    pub(crate) fn cancel(&self) {
        self.canceled.store(true, Ordering::SeqCst);
        self.trigger.lock().take();
    }

    pub fn is_canceled(&self) -> bool {
        self.canceled.load(Ordering::SeqCst)
    }

    pub fn is_triggered(&self) -> bool {
        self.trigger.lock().is_none() && !self.is_canceled()
    }
}
