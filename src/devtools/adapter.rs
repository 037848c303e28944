//! Two-way synchronization between a registry's stores and a monitor.

use super::dispatcher::{DirectDispatcher, Dispatcher};
use super::protocol::{ConnectOptions, Monitor, MonitorConnector, MonitorMessage, PayloadKind};
use crate::diff::count_changes;
use crate::error::Result;
use crate::registry::StoreRegistry;
use crate::state::{Action, CommitEvent};
use crate::subscriptions::Subscription;
use crate::value::Value;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::{Arc, Weak};
use tracing::{debug, warn};

/// Adapter settings.
#[derive(Debug, Clone)]
pub struct DevToolsOptions {
    /// Instance name shown by the monitor.
    pub name: String,
    /// Send commits even when nothing changed and the label repeats.
    pub log_equal_states: bool,
}

impl Default for DevToolsOptions {
    fn default() -> Self {
        Self {
            name: "frozen-state".to_string(),
            log_equal_states: false,
        }
    }
}

#[derive(Default)]
struct Mirror {
    /// What the monitor was last told, per store.
    states: BTreeMap<String, Value>,
    last_label: Option<String>,
    recording_paused: bool,
}

impl Mirror {
    fn to_json(&self) -> serde_json::Value {
        serde_json::Value::Object(
            self.states
                .iter()
                .map(|(name, snapshot)| (name.clone(), snapshot.to_json()))
                .collect(),
        )
    }
}

/// Mirrors every reported commit of a registry to a monitor and replays
/// monitor jumps back into the stores.
///
/// Replays write through [`crate::Store::replay_state`], which does not
/// report back, so a jump never echoes to the monitor.
pub struct DevToolsAdapter {
    registry: Arc<StoreRegistry>,
    monitor: Arc<dyn Monitor>,
    dispatcher: Arc<dyn Dispatcher>,
    options: DevToolsOptions,
    mirror: Mutex<Mirror>,
    commits: Mutex<Option<Subscription>>,
}

impl DevToolsAdapter {
    /// Connect with direct dispatch.
    pub fn connect(
        registry: &Arc<StoreRegistry>,
        connector: &dyn MonitorConnector,
        options: DevToolsOptions,
    ) -> Result<Arc<Self>> {
        Self::connect_with(registry, connector, options, Arc::new(DirectDispatcher))
    }

    pub fn connect_with(
        registry: &Arc<StoreRegistry>,
        connector: &dyn MonitorConnector,
        options: DevToolsOptions,
        dispatcher: Arc<dyn Dispatcher>,
    ) -> Result<Arc<Self>> {
        let monitor = connector.connect(&ConnectOptions {
            name: options.name.clone(),
        })?;

        let mut mirror = Mirror::default();
        for name in registry.store_names() {
            if let Some(store) = registry.store(&name) {
                mirror.states.insert(name, store.state().to_snapshot());
            }
        }
        monitor.init(&mirror.to_json());

        let adapter = Arc::new(Self {
            registry: Arc::clone(registry),
            monitor,
            dispatcher,
            options,
            mirror: Mutex::new(mirror),
            commits: Mutex::new(None),
        });

        let weak: Weak<Self> = Arc::downgrade(&adapter);
        let subscription = registry.commit_events().subscribe(move |event| {
            if let Some(adapter) = weak.upgrade() {
                adapter.on_commit(event);
            }
        });
        *adapter.commits.lock() = Some(subscription);

        let weak: Weak<Self> = Arc::downgrade(&adapter);
        adapter.monitor.subscribe(Arc::new(move |message: &MonitorMessage| {
            if let Some(adapter) = weak.upgrade() {
                adapter.handle_message(message);
            }
        }));

        debug!(name = %adapter.options.name, "connected to devtools monitor");
        Ok(adapter)
    }

    /// Stop mirroring commits.
    pub fn disconnect(&self) {
        self.commits.lock().take();
    }

    /// Snapshot per store, as last sent to the monitor.
    pub fn mirror(&self) -> BTreeMap<String, Value> {
        self.mirror.lock().states.clone()
    }

    pub fn is_recording_paused(&self) -> bool {
        self.mirror.lock().recording_paused
    }

    fn on_commit(&self, event: &CommitEvent) {
        let label = format!("[{}] - {}", event.store, event.action);
        let payload = {
            let mut mirror = self.mirror.lock();
            if mirror.recording_paused {
                return;
            }

            if event.action == Action::Destroy {
                mirror.states.remove(&event.store);
            } else {
                let snapshot = event.state.to_snapshot();
                let previous = mirror.states.get(&event.store).unwrap_or(&Value::Undefined);
                let changes = count_changes(previous, &snapshot);
                // Labels carry the store name, so equal actions on two stores differ
                let same_label = mirror.last_label.as_deref() == Some(label.as_str());
                if changes == 0 && same_label && !self.options.log_equal_states {
                    debug!(store = %event.store, action = %event.action, "skipping unchanged state");
                    return;
                }
                mirror.states.insert(event.store.clone(), snapshot);
            }
            mirror.last_label = Some(label.clone());
            mirror.to_json()
        };

        debug!(label = %label, "sending state to monitor");
        self.monitor.send(&label, &payload);
    }

    /// Parse and handle a raw inbound message. Malformed input is reported
    /// to the monitor.
    pub fn handle_raw(&self, raw: &str) {
        match MonitorMessage::parse(raw) {
            Ok(message) => self.handle_message(&message),
            Err(e) => {
                warn!(error = %e, "malformed monitor message");
                self.monitor.error(&format!("malformed message: {}", e));
            }
        }
    }

    pub fn handle_message(&self, message: &MonitorMessage) {
        if !message.is_dispatch() {
            debug!(kind = %message.kind, "ignoring monitor message");
            return;
        }
        let Some(payload) = &message.payload else {
            return;
        };
        if payload.kind.needs_state() && message.state.is_none() {
            if payload.kind == PayloadKind::ToggleAction {
                self.monitor.error("TOGGLE_ACTION is not supported");
            } else {
                debug!(kind = ?payload.kind, "ignoring replay without state");
            }
            return;
        }

        match payload.kind {
            PayloadKind::JumpToState | PayloadKind::JumpToAction | PayloadKind::ToggleAction => {
                if let Some(state) = &message.state {
                    self.replay(state);
                }
            }
            PayloadKind::Commit => {
                let baseline = self.mirror.lock().to_json();
                self.monitor.init(&baseline);
            }
            PayloadKind::PauseRecording => {
                let mut mirror = self.mirror.lock();
                mirror.recording_paused = payload.status.unwrap_or(!mirror.recording_paused);
                debug!(paused = mirror.recording_paused, "devtools recording toggled");
            }
            PayloadKind::Unknown => debug!("ignoring unsupported monitor payload"),
        }
    }

    fn replay(&self, raw: &str) {
        let parsed: serde_json::Value = match serde_json::from_str(raw) {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!(error = %e, "unreadable replay state");
                self.monitor.error(&format!("unreadable state: {}", e));
                return;
            }
        };
        let serde_json::Value::Object(stores) = parsed else {
            self.monitor.error("replay state is not an object");
            return;
        };

        for (name, snapshot) in stores {
            let Some(store) = self.registry.store(&name) else {
                debug!(store = %name, "no such store, skipping replay");
                continue;
            };
            let state = store.hydrate_snapshot(&Value::from_json(snapshot));
            self.mirror
                .lock()
                .states
                .insert(name.clone(), state.to_snapshot());

            let monitor = Arc::clone(&self.monitor);
            self.dispatcher.run(Box::new(move || {
                debug!(store = %store.name(), "replaying monitor state");
                if let Err(e) = store.replay_state(state) {
                    warn!(store = %store.name(), error = %e, "replay rejected");
                    monitor.error(&e.to_string());
                }
            }));
        }
    }
}

impl Drop for DevToolsAdapter {
    fn drop(&mut self) {
        self.disconnect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::devtools::protocol::MonitorListener;
    use crate::state::{Store, StoreOptions};

    #[derive(Default)]
    struct Recorded {
        inits: Vec<serde_json::Value>,
        sends: Vec<(String, serde_json::Value)>,
        errors: Vec<String>,
        listener: Option<MonitorListener>,
    }

    #[derive(Default, Clone)]
    struct MockMonitor(Arc<Mutex<Recorded>>);

    impl Monitor for MockMonitor {
        fn init(&self, state: &serde_json::Value) {
            self.0.lock().inits.push(state.clone());
        }

        fn send(&self, label: &str, state: &serde_json::Value) {
            self.0.lock().sends.push((label.to_string(), state.clone()));
        }

        fn error(&self, message: &str) {
            self.0.lock().errors.push(message.to_string());
        }

        fn subscribe(&self, listener: MonitorListener) {
            self.0.lock().listener = Some(listener);
        }
    }

    impl MonitorConnector for MockMonitor {
        fn connect(&self, _options: &ConnectOptions) -> Result<Arc<dyn Monitor>> {
            Ok(Arc::new(self.clone()))
        }
    }

    fn labels(monitor: &MockMonitor) -> Vec<String> {
        monitor.0.lock().sends.iter().map(|(l, _)| l.clone()).collect()
    }

    #[test]
    fn test_equal_commit_with_same_label_skipped() {
        let registry = StoreRegistry::new();
        let monitor = MockMonitor::default();
        let _adapter = DevToolsAdapter::connect(&registry, &monitor, DevToolsOptions::default()).unwrap();

        let store = Store::new(&registry, StoreOptions::new("count"), Value::from(1)).unwrap();
        store.set(Value::from(2)).unwrap();
        store.set(Value::from(2)).unwrap();
        store.update(Value::from(2)).unwrap();

        assert_eq!(
            labels(&monitor),
            ["[count] - initialize", "[count] - set", "[count] - update"]
        );
    }

    #[test]
    fn test_same_action_on_other_store_is_sent() {
        let registry = StoreRegistry::new();
        let monitor = MockMonitor::default();
        let _adapter = DevToolsAdapter::connect(&registry, &monitor, DevToolsOptions::default()).unwrap();

        let a = Store::new(&registry, StoreOptions::new("a"), Value::from(1)).unwrap();
        let b = Store::new(&registry, StoreOptions::new("b"), Value::from(1)).unwrap();
        a.set(Value::from(1)).unwrap();
        b.set(Value::from(1)).unwrap();
        b.set(Value::from(1)).unwrap();

        assert_eq!(
            labels(&monitor),
            ["[a] - initialize", "[b] - initialize", "[a] - set", "[b] - set"]
        );
    }

    #[test]
    fn test_log_equal_states() {
        let registry = StoreRegistry::new();
        let monitor = MockMonitor::default();
        let options = DevToolsOptions {
            log_equal_states: true,
            ..Default::default()
        };
        let _adapter = DevToolsAdapter::connect(&registry, &monitor, options).unwrap();

        let store = Store::new(&registry, StoreOptions::new("count"), Value::from(1)).unwrap();
        store.set(Value::from(1)).unwrap();
        store.set(Value::from(1)).unwrap();
        assert_eq!(labels(&monitor).len(), 3);
    }

    #[test]
    fn test_toggle_without_state_reports_error() {
        let registry = StoreRegistry::new();
        let monitor = MockMonitor::default();
        let adapter = DevToolsAdapter::connect(&registry, &monitor, DevToolsOptions::default()).unwrap();

        adapter.handle_message(&MonitorMessage::dispatch(PayloadKind::ToggleAction, None));
        adapter.handle_raw("{oops");
        assert_eq!(monitor.0.lock().errors.len(), 2);
    }

    #[test]
    fn test_pause_recording() {
        let registry = StoreRegistry::new();
        let monitor = MockMonitor::default();
        let adapter = DevToolsAdapter::connect(&registry, &monitor, DevToolsOptions::default()).unwrap();
        let store = Store::new(&registry, StoreOptions::new("count"), Value::from(1)).unwrap();

        adapter.handle_message(&MonitorMessage::dispatch(PayloadKind::PauseRecording, None));
        assert!(adapter.is_recording_paused());
        store.set(Value::from(2)).unwrap();
        assert_eq!(labels(&monitor).len(), 1);
    }
}
