//! Debounced writer for a single storage key.

use super::StorageBackend;
use crate::error::Result;
use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, error};

enum PersistMessage {
    Write { payload: String, generation: u64 },
    Flush(Sender<()>),
    Shutdown,
}

struct Shared {
    key: String,
    backend: Arc<dyn StorageBackend>,
    /// Bumped by every removal. Writes scheduled under an older generation
    /// are dropped.
    generation: AtomicU64,
    /// Serializes backend writes against removals.
    io_lock: Mutex<()>,
}

impl Shared {
    fn write(&self, payload: &str, generation: u64) {
        let _io = self.io_lock.lock();
        if self.generation.load(Ordering::SeqCst) != generation {
            debug!(key = %self.key, "dropping write scheduled before removal");
            return;
        }
        match self.backend.set_item(&self.key, payload) {
            Ok(()) => debug!(key = %self.key, bytes = payload.len(), "persisted state"),
            Err(e) => error!(key = %self.key, error = %e, "failed to persist state"),
        }
    }
}

/// Fire-and-forget persistence for one store.
///
/// With a zero debounce every write goes straight to the backend. Otherwise
/// a worker thread keeps only the latest payload and writes it once no new
/// payload has arrived for the debounce interval.
pub struct Persister {
    shared: Arc<Shared>,
    sender: Option<Sender<PersistMessage>>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl Persister {
    pub fn new(backend: Arc<dyn StorageBackend>, key: impl Into<String>, debounce: Duration) -> Self {
        let shared = Arc::new(Shared {
            key: key.into(),
            backend,
            generation: AtomicU64::new(0),
            io_lock: Mutex::new(()),
        });

        if debounce.is_zero() {
            return Self {
                shared,
                sender: None,
                worker: Mutex::new(None),
            };
        }

        let (sender, receiver) = unbounded();
        let worker_shared = Arc::clone(&shared);
        let worker = thread::Builder::new()
            .name(format!("persist-{}", worker_shared.key))
            .spawn(move || run_worker(worker_shared, receiver, debounce));

        let worker = match worker {
            Ok(handle) => Some(handle),
            Err(e) => {
                error!(error = %e, "failed to spawn persistence worker, writing synchronously");
                None
            }
        };
        let sender = worker.as_ref().map(|_| sender);

        Self {
            shared,
            sender,
            worker: Mutex::new(worker),
        }
    }

    pub fn key(&self) -> &str {
        &self.shared.key
    }

    /// Read the persisted payload, if any.
    pub fn load(&self) -> Result<Option<String>> {
        self.shared.backend.get_item(&self.shared.key)
    }

    /// Schedule `payload` to be written.
    pub fn schedule(&self, payload: String) {
        let generation = self.shared.generation.load(Ordering::SeqCst);
        match &self.sender {
            Some(sender) => {
                let message = PersistMessage::Write {
                    payload,
                    generation,
                };
                if let Err(e) = sender.send(message) {
                    if let PersistMessage::Write { payload, .. } = e.into_inner() {
                        self.shared.write(&payload, generation);
                    }
                }
            }
            None => self.shared.write(&payload, generation),
        }
    }

    /// Remove the persisted entry and cancel any pending write.
    pub fn remove(&self) -> Result<()> {
        let _io = self.shared.io_lock.lock();
        self.shared.generation.fetch_add(1, Ordering::SeqCst);
        self.shared.backend.remove_item(&self.shared.key)
    }

    /// Block until every scheduled write has reached the backend.
    pub fn flush(&self) {
        if let Some(sender) = &self.sender {
            let (ack, done) = crossbeam_channel::bounded(1);
            if sender.send(PersistMessage::Flush(ack)).is_ok() {
                let _ = done.recv();
            }
        }
    }
}

impl Drop for Persister {
    fn drop(&mut self) {
        if let Some(sender) = self.sender.take() {
            let _ = sender.send(PersistMessage::Shutdown);
        }
        if let Some(handle) = self.worker.lock().take() {
            let _ = handle.join();
        }
    }
}

fn run_worker(shared: Arc<Shared>, receiver: Receiver<PersistMessage>, debounce: Duration) {
    let mut pending: Option<(String, u64)> = None;

    let flush = |pending: &mut Option<(String, u64)>| {
        if let Some((payload, generation)) = pending.take() {
            shared.write(&payload, generation);
        }
    };

    loop {
        let message = if pending.is_some() {
            match receiver.recv_timeout(debounce) {
                Ok(message) => message,
                Err(RecvTimeoutError::Timeout) => {
                    flush(&mut pending);
                    continue;
                }
                Err(RecvTimeoutError::Disconnected) => break,
            }
        } else {
            match receiver.recv() {
                Ok(message) => message,
                Err(_) => break,
            }
        };

        match message {
            PersistMessage::Write {
                payload,
                generation,
            } => pending = Some((payload, generation)),
            PersistMessage::Flush(ack) => {
                flush(&mut pending);
                let _ = ack.send(());
            }
            PersistMessage::Shutdown => break,
        }
    }

    flush(&mut pending);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;

    #[test]
    fn test_immediate_write() {
        let backend = Arc::new(MemoryStorage::new());
        let persister = Persister::new(backend.clone(), "k", Duration::ZERO);
        persister.schedule("1".into());
        assert_eq!(backend.get_item("k").unwrap().as_deref(), Some("1"));
    }

    #[test]
    fn test_debounce_keeps_latest() {
        let backend = Arc::new(MemoryStorage::new());
        let persister = Persister::new(backend.clone(), "k", Duration::from_millis(20));
        persister.schedule("1".into());
        persister.schedule("2".into());
        persister.schedule("3".into());
        persister.flush();
        assert_eq!(backend.get_item("k").unwrap().as_deref(), Some("3"));
    }

    #[test]
    fn test_remove_cancels_pending_write() {
        let backend = Arc::new(MemoryStorage::new());
        let persister = Persister::new(backend.clone(), "k", Duration::from_millis(50));
        persister.schedule("stale".into());
        persister.remove().unwrap();
        persister.flush();
        assert!(backend.get_item("k").unwrap().is_none());
    }

    #[test]
    fn test_drop_flushes() {
        let backend = Arc::new(MemoryStorage::new());
        {
            let persister = Persister::new(backend.clone(), "k", Duration::from_secs(60));
            persister.schedule("final".into());
        }
        assert_eq!(backend.get_item("k").unwrap().as_deref(), Some("final"));
    }
}
