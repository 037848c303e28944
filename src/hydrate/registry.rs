//! Class registry used in place of runtime reflection.

use crate::value::{Fields, Value};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

type Factory = dyn Fn(Option<&Value>) -> Value + Send + Sync;

/// How to build an instance of one class.
#[derive(Clone)]
pub struct ClassDescriptor {
    factory: Arc<Factory>,
    accepts_initializer: bool,
}

impl ClassDescriptor {
    /// Zero-argument constructor. Fields are copied in afterwards.
    pub fn new<F>(factory: F) -> Self
    where
        F: Fn() -> Value + Send + Sync + 'static,
    {
        Self {
            factory: Arc::new(move |_| factory()),
            accepts_initializer: false,
        }
    }

    /// Constructor that receives the plain data it is built from.
    pub fn with_initializer<F>(factory: F) -> Self
    where
        F: Fn(&Value) -> Value + Send + Sync + 'static,
    {
        Self {
            factory: Arc::new(move |init| factory(init.unwrap_or(&Value::Null))),
            accepts_initializer: true,
        }
    }

    /// Empty instance tagged with `class`.
    pub fn empty(class: &str) -> Self {
        let class = class.to_string();
        Self::new(move || Value::instance(&class, Fields::new()))
    }

    pub fn accepts_initializer(&self) -> bool {
        self.accepts_initializer
    }

    pub fn construct(&self, init: Option<&Value>) -> Value {
        if self.accepts_initializer {
            (self.factory)(init)
        } else {
            (self.factory)(None)
        }
    }
}

impl fmt::Debug for ClassDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassDescriptor")
            .field("accepts_initializer", &self.accepts_initializer)
            .finish()
    }
}

/// Class tag -> constructor table.
#[derive(Clone, Debug, Default)]
pub struct ClassRegistry {
    classes: HashMap<String, ClassDescriptor>,
}

impl ClassRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register or replace a class.
    pub fn register(&mut self, class: impl Into<String>, descriptor: ClassDescriptor) {
        self.classes.insert(class.into(), descriptor);
    }

    pub fn with_class(mut self, class: impl Into<String>, descriptor: ClassDescriptor) -> Self {
        self.register(class, descriptor);
        self
    }

    pub fn get(&self, class: &str) -> Option<&ClassDescriptor> {
        self.classes.get(class)
    }

    pub fn contains(&self, class: &str) -> bool {
        self.classes.contains_key(class)
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    /// Descriptor for `class`, falling back to an empty-instance constructor.
    pub fn resolve(&self, class: &str) -> ClassDescriptor {
        self.get(class)
            .cloned()
            .unwrap_or_else(|| ClassDescriptor::empty(class))
    }

    /// Register a default constructor for every tagged object reachable from
    /// `template`. Existing registrations are left alone.
    pub fn infer_from(&mut self, template: &Value) {
        match template {
            Value::Object(o) => {
                if let Some(class) = o.class() {
                    if !self.contains(class) {
                        self.register(class, ClassDescriptor::empty(class));
                    }
                }
                for field in o.fields().values() {
                    self.infer_from(field);
                }
            }
            Value::Array(a) => {
                for item in a.items() {
                    self.infer_from(item);
                }
            }
            Value::Error(e) => {
                for prop in e.props().values() {
                    self.infer_from(prop);
                }
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_infer_from_nested_template() {
        let template = Value::instance(
            "Team",
            [(
                "members",
                Value::array([Value::instance("Member", [("name", Value::from("a"))])]),
            )],
        );
        let mut registry = ClassRegistry::new();
        registry.infer_from(&template);
        assert!(registry.contains("Team"));
        assert!(registry.contains("Member"));
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_explicit_registration_wins_over_inference() {
        let mut registry = ClassRegistry::new().with_class(
            "Team",
            ClassDescriptor::with_initializer(|init| {
                Value::instance("Team", [("seeded", Value::from(init.is_container()))])
            }),
        );
        registry.infer_from(&Value::instance("Team", Fields::new()));
        assert!(registry.get("Team").unwrap().accepts_initializer());
    }
}
