//! DevTools adapter tests against a scripted monitor.

use frozen_state::devtools::{
    ConnectOptions, DevToolsAdapter, DevToolsOptions, Monitor, MonitorConnector, MonitorListener,
    MonitorMessage, PayloadKind, Task,
};
use frozen_state::{Projection, Result, Store, StoreOptions, StoreRegistry, Value};
use futures::executor::block_on;
use parking_lot::Mutex;
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

#[derive(Default)]
struct Script {
    connected_as: Option<String>,
    inits: Vec<serde_json::Value>,
    sends: Vec<(String, serde_json::Value)>,
    errors: Vec<String>,
    listener: Option<MonitorListener>,
}

#[derive(Clone, Default)]
struct ScriptedMonitor(Arc<Mutex<Script>>);

impl ScriptedMonitor {
    /// Deliver a raw message as if the monitor sent it.
    fn deliver(&self, raw: &str) {
        let message = MonitorMessage::parse(raw).unwrap();
        let listener = self.0.lock().listener.clone().unwrap();
        listener(&message);
    }

    fn last_sent(&self) -> (String, serde_json::Value) {
        self.0.lock().sends.last().cloned().unwrap()
    }

    fn send_count(&self) -> usize {
        self.0.lock().sends.len()
    }
}

impl Monitor for ScriptedMonitor {
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

impl MonitorConnector for ScriptedMonitor {
    fn connect(&self, options: &ConnectOptions) -> Result<Arc<dyn Monitor>> {
        self.0.lock().connected_as = Some(options.name.clone());
        Ok(Arc::new(self.clone()))
    }
}

fn jump(state: serde_json::Value) -> String {
    json!({
        "type": "DISPATCH",
        "state": state.to_string(),
        "payload": { "type": "JUMP_TO_STATE" }
    })
    .to_string()
}

// --- Outbound ---

#[test]
fn test_initial_mirror_lists_existing_stores() {
    let registry = StoreRegistry::new();
    let _user = Store::new(&registry, StoreOptions::new("user"), Value::from("ann")).unwrap();
    let _cart = Store::new(&registry, StoreOptions::new("cart"), Value::Null).unwrap();

    let monitor = ScriptedMonitor::default();
    let options = DevToolsOptions {
        name: "shop".to_string(),
        ..Default::default()
    };
    let _adapter = DevToolsAdapter::connect(&registry, &monitor, options).unwrap();

    let script = monitor.0.lock();
    assert_eq!(script.connected_as.as_deref(), Some("shop"));
    let init = &script.inits[0];
    assert_eq!(init["user"]["value"], json!("ann"));
    assert_eq!(init["cart"]["isLoading"], json!(true));
}

#[test]
fn test_commits_are_labelled_and_mirrored() {
    let registry = StoreRegistry::new();
    let monitor = ScriptedMonitor::default();
    let _adapter = DevToolsAdapter::connect(&registry, &monitor, DevToolsOptions::default()).unwrap();

    let user = Store::new(&registry, StoreOptions::new("user"), Value::from("ann")).unwrap();
    let cart = Store::new(&registry, StoreOptions::new("cart"), Value::array(Vec::new())).unwrap();
    user.set(Value::from("bob")).unwrap();

    let (label, state) = monitor.last_sent();
    assert_eq!(label, "[user] - set");
    assert_eq!(state["user"]["value"], json!("bob"));
    assert_eq!(state["cart"]["value"], json!([]));

    cart.dispatch("addItem", Value::array([Value::from("apple")])).unwrap();
    assert_eq!(monitor.last_sent().0, "[cart] - addItem");
}

#[test]
fn test_destroyed_store_leaves_mirror() {
    let registry = StoreRegistry::new();
    let monitor = ScriptedMonitor::default();
    let adapter = DevToolsAdapter::connect(&registry, &monitor, DevToolsOptions::default()).unwrap();

    let user = Store::new(&registry, StoreOptions::new("user"), Value::from("ann")).unwrap();
    assert!(adapter.mirror().contains_key("user"));

    block_on(user.destroy()).unwrap();
    assert!(!adapter.mirror().contains_key("user"));
    assert_eq!(monitor.last_sent().0, "[user] - destroy");
}

#[test]
fn test_disconnect_stops_sending() {
    let registry = StoreRegistry::new();
    let monitor = ScriptedMonitor::default();
    let adapter = DevToolsAdapter::connect(&registry, &monitor, DevToolsOptions::default()).unwrap();
    let user = Store::new(&registry, StoreOptions::new("user"), Value::from(1)).unwrap();

    adapter.disconnect();
    user.set(Value::from(2)).unwrap();
    assert_eq!(monitor.send_count(), 1);
}

// --- Inbound ---

#[test]
fn test_jump_replays_without_echo() {
    let registry = StoreRegistry::new();
    let monitor = ScriptedMonitor::default();
    let _adapter = DevToolsAdapter::connect(&registry, &monitor, DevToolsOptions::default()).unwrap();
    let user = Store::new(&registry, StoreOptions::new("user"), Value::from("ann")).unwrap();
    user.set(Value::from("bob")).unwrap();

    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let _sub = user
        .select(Projection::Identity)
        .subscribe(move |v| sink.lock().push(v.clone()));
    let sent_before = monitor.send_count();

    monitor.deliver(&jump(json!({
        "user": { "value": "ann", "error": null, "isLoading": false }
    })));

    assert_eq!(user.value(), Value::from("ann"));
    assert_eq!(*seen.lock(), vec![Value::from("bob"), Value::from("ann")]);
    assert_eq!(monitor.send_count(), sent_before);
}

#[test]
fn test_jump_hydrates_dates_and_skips_unknown_stores() {
    let registry = StoreRegistry::new();
    let monitor = ScriptedMonitor::default();
    let _adapter = DevToolsAdapter::connect(&registry, &monitor, DevToolsOptions::default()).unwrap();
    let session = Store::new(
        &registry,
        StoreOptions::new("session"),
        Value::object([("since", Value::date_millis(0))]),
    )
    .unwrap();

    monitor.deliver(&jump(json!({
        "session": { "value": { "since": "2024-01-01T00:00:00.000Z" } },
        "ghost": { "value": 1 }
    })));

    assert_eq!(
        session.value().get("since"),
        Some(&Value::date_millis(1_704_067_200_000))
    );
    assert!(monitor.0.lock().errors.is_empty());
}

#[test]
fn test_replays_go_through_dispatcher() {
    let registry = StoreRegistry::new();
    let monitor = ScriptedMonitor::default();
    let runs = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&runs);
    let dispatcher = move |task: Task| {
        counter.fetch_add(1, Ordering::SeqCst);
        task();
    };
    let _adapter = DevToolsAdapter::connect_with(
        &registry,
        &monitor,
        DevToolsOptions::default(),
        Arc::new(dispatcher),
    )
    .unwrap();
    let a = Store::new(&registry, StoreOptions::new("a"), Value::from(1)).unwrap();
    let b = Store::new(&registry, StoreOptions::new("b"), Value::from(1)).unwrap();

    monitor.deliver(&jump(json!({ "a": { "value": 2 }, "b": { "value": 3 } })));
    assert_eq!(runs.load(Ordering::SeqCst), 2);
    assert_eq!(a.value(), Value::from(2));
    assert_eq!(b.value(), Value::from(3));
}

#[test]
fn test_commit_message_resets_baseline() {
    let registry = StoreRegistry::new();
    let monitor = ScriptedMonitor::default();
    let _adapter = DevToolsAdapter::connect(&registry, &monitor, DevToolsOptions::default()).unwrap();
    let user = Store::new(&registry, StoreOptions::new("user"), Value::from("ann")).unwrap();
    user.set(Value::from("bob")).unwrap();

    monitor.deliver(r#"{"type":"DISPATCH","payload":{"type":"COMMIT"}}"#);

    let script = monitor.0.lock();
    assert_eq!(script.inits.len(), 2);
    assert_eq!(script.inits[1]["user"]["value"], json!("bob"));
}

#[test]
fn test_pause_recording_with_status() {
    let registry = StoreRegistry::new();
    let monitor = ScriptedMonitor::default();
    let adapter = DevToolsAdapter::connect(&registry, &monitor, DevToolsOptions::default()).unwrap();
    let user = Store::new(&registry, StoreOptions::new("user"), Value::from(1)).unwrap();

    let pause = |status: bool| {
        json!({
            "type": "DISPATCH",
            "payload": { "type": "PAUSE_RECORDING", "status": status }
        })
        .to_string()
    };

    monitor.deliver(&pause(true));
    monitor.deliver(&pause(true));
    assert!(adapter.is_recording_paused());
    user.set(Value::from(2)).unwrap();

    monitor.deliver(&pause(false));
    user.set(Value::from(3)).unwrap();

    let values: Vec<serde_json::Value> = monitor
        .0
        .lock()
        .sends
        .iter()
        .map(|(_, state)| state["user"]["value"].clone())
        .collect();
    assert_eq!(values, vec![json!(1), json!(3)]);
}

#[test]
fn test_ignored_messages() {
    let registry = StoreRegistry::new();
    let monitor = ScriptedMonitor::default();
    let _adapter = DevToolsAdapter::connect(&registry, &monitor, DevToolsOptions::default()).unwrap();
    let user = Store::new(&registry, StoreOptions::new("user"), Value::from(1)).unwrap();

    monitor.deliver(r#"{"type":"START"}"#);
    monitor.deliver(r#"{"type":"DISPATCH","payload":{"type":"JUMP_TO_ACTION"}}"#);
    monitor.deliver(r#"{"type":"DISPATCH","payload":{"type":"IMPORT_STATE"}}"#);

    assert_eq!(user.value(), Value::from(1));
    assert!(monitor.0.lock().errors.is_empty());
    assert_eq!(
        MonitorMessage::parse(r#"{"type":"DISPATCH","payload":{"type":"IMPORT_STATE"}}"#)
            .unwrap()
            .payload
            .unwrap()
            .kind,
        PayloadKind::Unknown
    );
}
