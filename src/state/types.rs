//! State snapshots, lifecycle tags and action names.

use crate::hydrate::{hydrate, ClassRegistry};
use crate::value::{ErrorValue, Value};
use std::fmt;

/// Immutable snapshot held by a store. A new one is built on every commit.
#[derive(Clone, Debug, PartialEq, Default)]
pub struct State {
    pub value: Value,
    pub error: Option<ErrorValue>,
    pub is_loading: bool,
    pub is_paused: bool,
    pub is_hard_resetting: bool,
}

impl State {
    /// State of a store waiting for its first value.
    pub fn loading() -> Self {
        Self {
            is_loading: true,
            ..Default::default()
        }
    }

    pub fn active(value: Value) -> Self {
        Self {
            value,
            ..Default::default()
        }
    }

    /// Snapshot as plain data, in the shape the devtools monitor receives.
    pub fn to_snapshot(&self) -> Value {
        Value::object([
            ("value", self.value.clone()),
            (
                "error",
                self.error.clone().map(Value::Error).unwrap_or(Value::Null),
            ),
            ("isLoading", Value::Bool(self.is_loading)),
            ("isPaused", Value::Bool(self.is_paused)),
            ("isHardResetting", Value::Bool(self.is_hard_resetting)),
        ])
    }

    /// Rebuild a state from a snapshot, hydrating its value against
    /// `template`. A snapshot without a `value` key yields the default state.
    pub fn from_snapshot(snapshot: &Value, template: Option<&Value>, classes: &ClassRegistry) -> Self {
        let Some(raw) = snapshot.as_object().and_then(|o| o.get("value")) else {
            return State::default();
        };

        let value = match template {
            Some(template) => hydrate(template, raw, classes),
            None => raw.clone(),
        };
        let error = match snapshot.get("error") {
            Some(Value::Error(e)) => Some(e.clone()),
            Some(Value::Object(o)) => {
                let template = Value::Error(ErrorValue::message_only(""));
                hydrate(&template, &Value::Object(o.clone()), classes)
                    .as_error()
                    .cloned()
            }
            _ => None,
        };
        let flag = |key: &str| snapshot.get(key).and_then(Value::as_bool).unwrap_or(false);

        State {
            value,
            error,
            is_loading: flag("isLoading"),
            is_paused: flag("isPaused"),
            is_hard_resetting: flag("isHardResetting"),
        }
    }
}

/// Lifecycle tag derived from a store's flags. The most specific wins.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StateTag {
    Destroyed,
    HardResetting,
    Loading,
    Paused,
    Error,
    Active,
    /// Initialized but holding no value yet.
    Resolving,
}

impl StateTag {
    pub(crate) fn derive(state: &State, destroyed: bool) -> Self {
        if destroyed {
            StateTag::Destroyed
        } else if state.is_hard_resetting {
            StateTag::HardResetting
        } else if state.is_loading {
            StateTag::Loading
        } else if state.is_paused {
            StateTag::Paused
        } else if state.error.is_some() {
            StateTag::Error
        } else if !state.value.is_nullish() {
            StateTag::Active
        } else {
            StateTag::Resolving
        }
    }
}

/// Name of the operation that produced a commit.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Action {
    Init,
    AfterInit,
    AsyncInit,
    LazyInit,
    Update,
    Set,
    Override,
    Reset,
    HardReset,
    Error,
    Pause,
    Resume,
    Destroy,
    /// State written by the devtools monitor.
    Replay,
    Custom(String),
}

impl Action {
    pub fn custom(name: impl Into<String>) -> Self {
        Action::Custom(name.into())
    }

    pub fn as_str(&self) -> &str {
        match self {
            Action::Init => "initialize",
            Action::AfterInit => "afterInitialize",
            Action::AsyncInit => "initializeAsync",
            Action::LazyInit => "initializeLazily",
            Action::Update => "update",
            Action::Set => "set",
            Action::Override => "override",
            Action::Reset => "reset",
            Action::HardReset => "hardReset",
            Action::Error => "error",
            Action::Pause => "pause",
            Action::Resume => "resume",
            Action::Destroy => "destroy",
            Action::Replay => "replay",
            Action::Custom(name) => name,
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One committed transition on a store's internal change stream.
#[derive(Clone, Debug)]
pub struct Commit {
    pub state: State,
    pub action: Action,
}

/// Commit as seen from outside a store, on the registry's event channel.
#[derive(Clone, Debug)]
pub struct CommitEvent {
    pub store: String,
    pub state: State,
    pub action: Action,
}
