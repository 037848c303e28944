//! Store configuration: caller options merged over global defaults.

use super::hooks::{LifecycleHooks, NoHooks};
use crate::diff;
use crate::error::{Result, StateError};
use crate::hydrate::ClassRegistry;
use crate::storage::StorageBackend;
use crate::value::{Array, Object, Value};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Default debounce between a value change and its storage write.
pub const DEFAULT_STORAGE_DEBOUNCE: Duration = Duration::from_millis(100);

/// Whether operational misuse is an error or a logged no-op.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum RuntimeMode {
    #[default]
    Development,
    Production,
}

/// How consecutive emissions are judged equal.
#[derive(Clone, Default)]
pub enum CompareStrategy {
    /// Deep structural equality.
    #[default]
    Structural,
    /// Same allocation for containers, equal for scalars.
    Identity,
    Custom(Arc<dyn Fn(&Value, &Value) -> bool + Send + Sync>),
}

impl CompareStrategy {
    pub fn custom(f: impl Fn(&Value, &Value) -> bool + Send + Sync + 'static) -> Self {
        CompareStrategy::Custom(Arc::new(f))
    }

    pub fn equals(&self, a: &Value, b: &Value) -> bool {
        match self {
            CompareStrategy::Structural => diff::compare(a, b),
            CompareStrategy::Identity => match (a, b) {
                (Value::Array(x), Value::Array(y)) => Array::ptr_eq(x, y),
                (Value::Object(x), Value::Object(y)) => Object::ptr_eq(x, y),
                (x, y) if x.is_container() || y.is_container() => false,
                (x, y) => diff::compare(x, y),
            },
            CompareStrategy::Custom(f) => f(a, b),
        }
    }
}

impl fmt::Debug for CompareStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompareStrategy::Structural => f.write_str("Structural"),
            CompareStrategy::Identity => f.write_str("Identity"),
            CompareStrategy::Custom(_) => f.write_str("Custom"),
        }
    }
}

/// Turns values into storage payloads and back.
pub trait ValueSerializer: Send + Sync {
    fn stringify(&self, value: &Value) -> Result<String>;
    fn parse(&self, raw: &str) -> Result<Value>;
}

/// JSON payloads.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonSerializer;

impl ValueSerializer for JsonSerializer {
    fn stringify(&self, value: &Value) -> Result<String> {
        value.to_json_string()
    }

    fn parse(&self, raw: &str) -> Result<Value> {
        Value::from_json_str(raw)
    }
}

/// Which backend a persisted store writes to.
#[derive(Clone)]
pub enum StorageKind {
    Local,
    Session,
    Custom(Arc<dyn StorageBackend>),
}

impl fmt::Debug for StorageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageKind::Local => f.write_str("Local"),
            StorageKind::Session => f.write_str("Session"),
            StorageKind::Custom(_) => f.write_str("Custom"),
        }
    }
}

/// Caller-facing storage settings.
#[derive(Clone, Debug)]
pub struct StorageOptions {
    pub kind: StorageKind,
    pub key: Option<String>,
    pub debounce: Option<Duration>,
}

impl StorageOptions {
    pub fn local() -> Self {
        Self::of(StorageKind::Local)
    }

    pub fn session() -> Self {
        Self::of(StorageKind::Session)
    }

    pub fn custom(backend: Arc<dyn StorageBackend>) -> Self {
        Self::of(StorageKind::Custom(backend))
    }

    fn of(kind: StorageKind) -> Self {
        Self {
            kind,
            key: None,
            debounce: None,
        }
    }

    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = Some(debounce);
        self
    }
}

/// Resolved storage settings.
#[derive(Clone, Debug)]
pub struct StorageConfig {
    pub kind: StorageKind,
    pub key: String,
    pub debounce: Duration,
}

/// Registry-wide defaults applied to every store.
#[derive(Clone)]
pub struct GlobalDefaults {
    pub resettable: bool,
    pub immutable: bool,
    pub instance_handling: bool,
    pub compare: CompareStrategy,
    pub storage_debounce: Duration,
    pub serializer: Arc<dyn ValueSerializer>,
}

impl Default for GlobalDefaults {
    fn default() -> Self {
        Self {
            resettable: true,
            immutable: true,
            instance_handling: true,
            compare: CompareStrategy::Structural,
            storage_debounce: DEFAULT_STORAGE_DEBOUNCE,
            serializer: Arc::new(JsonSerializer),
        }
    }
}

impl fmt::Debug for GlobalDefaults {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GlobalDefaults")
            .field("resettable", &self.resettable)
            .field("immutable", &self.immutable)
            .field("instance_handling", &self.instance_handling)
            .field("compare", &self.compare)
            .field("storage_debounce", &self.storage_debounce)
            .finish()
    }
}

/// Caller input. Unset fields take the registry defaults.
#[derive(Clone, Default)]
pub struct StoreOptions {
    pub name: Option<String>,
    pub resettable: Option<bool>,
    pub storage: Option<StorageOptions>,
    pub compare: Option<CompareStrategy>,
    pub immutable: Option<bool>,
    pub instance_handling: Option<bool>,
    pub serializer: Option<Arc<dyn ValueSerializer>>,
    /// Explicit class declarations for hydration.
    pub classes: ClassRegistry,
    /// Sample value used for hydration instead of the initial value.
    pub template: Option<Value>,
    pub hooks: Option<Arc<dyn LifecycleHooks>>,
}

impl StoreOptions {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Default::default()
        }
    }

    pub fn resettable(mut self, resettable: bool) -> Self {
        self.resettable = Some(resettable);
        self
    }

    pub fn with_storage(mut self, storage: StorageOptions) -> Self {
        self.storage = Some(storage);
        self
    }

    pub fn with_compare(mut self, compare: CompareStrategy) -> Self {
        self.compare = Some(compare);
        self
    }

    pub fn immutable(mut self, immutable: bool) -> Self {
        self.immutable = Some(immutable);
        self
    }

    pub fn instance_handling(mut self, enabled: bool) -> Self {
        self.instance_handling = Some(enabled);
        self
    }

    pub fn with_serializer(mut self, serializer: Arc<dyn ValueSerializer>) -> Self {
        self.serializer = Some(serializer);
        self
    }

    pub fn with_classes(mut self, classes: ClassRegistry) -> Self {
        self.classes = classes;
        self
    }

    pub fn with_template(mut self, template: Value) -> Self {
        self.template = Some(template);
        self
    }

    pub fn with_hooks(mut self, hooks: impl LifecycleHooks + 'static) -> Self {
        self.hooks = Some(Arc::new(hooks));
        self
    }
}

/// Fully defaulted, validated configuration of one store.
#[derive(Clone)]
pub struct Config {
    pub name: String,
    pub resettable: bool,
    pub storage: Option<StorageConfig>,
    pub compare: CompareStrategy,
    pub immutable: bool,
    pub instance_handling: bool,
    pub serializer: Arc<dyn ValueSerializer>,
    pub classes: ClassRegistry,
    pub template: Option<Value>,
    pub hooks: Arc<dyn LifecycleHooks>,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("name", &self.name)
            .field("resettable", &self.resettable)
            .field("storage", &self.storage)
            .field("compare", &self.compare)
            .field("immutable", &self.immutable)
            .field("instance_handling", &self.instance_handling)
            .field("classes", &self.classes.len())
            .finish()
    }
}

/// Merge `options` over `defaults`.
pub fn resolve_config(defaults: &GlobalDefaults, options: StoreOptions) -> Result<Config> {
    let name = match options.name {
        Some(name) if !name.trim().is_empty() => name,
        _ => return Err(StateError::MissingConfig("store name".into())),
    };

    let storage = options.storage.map(|s| StorageConfig {
        kind: s.kind,
        key: s.key.unwrap_or_else(|| name.clone()),
        debounce: s.debounce.unwrap_or(defaults.storage_debounce),
    });
    if let Some(storage) = &storage {
        if storage.key.trim().is_empty() {
            return Err(StateError::MissingConfig("storage key".into()));
        }
    }

    Ok(Config {
        name,
        resettable: options.resettable.unwrap_or(defaults.resettable),
        storage,
        compare: options.compare.unwrap_or_else(|| defaults.compare.clone()),
        immutable: options.immutable.unwrap_or(defaults.immutable),
        instance_handling: options
            .instance_handling
            .unwrap_or(defaults.instance_handling),
        serializer: options
            .serializer
            .unwrap_or_else(|| Arc::clone(&defaults.serializer)),
        classes: options.classes,
        template: options.template,
        hooks: options.hooks.unwrap_or_else(|| Arc::new(NoHooks)),
    })
}
