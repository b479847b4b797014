//! Global name resolution: the immutable capability table plus the guest's
//! own namespace.

use std::collections::HashMap;
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::RwLock;

use crate::value::Value;

#[derive(Clone, Debug)]
pub struct GlobalEntry {
    pub value: Value,
    pub mutable: bool,
}

impl GlobalEntry {
    pub fn new(value: Value, mutable: bool) -> Self {
        Self { value, mutable }
    }
}

/// Ordered, immutable mapping from symbol name to host-provided value.
///
/// The only way to make one is [`CapabilityTableBuilder`]; once built it is
/// shared behind an `Arc` and has no mutating API.
pub struct CapabilityTable {
    entries: IndexMap<String, Value>,
}

impl CapabilityTable {
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.entries.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Names in registration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Default)]
pub struct CapabilityTableBuilder {
    entries: IndexMap<String, Value>,
}

impl CapabilityTableBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a name. Registering the same name twice is a host bug.
    pub fn register(&mut self, name: &str, value: Value) -> &mut Self {
        let previous = self.entries.insert(name.to_string(), value);
        debug_assert!(previous.is_none(), "capability `{name}` registered twice");
        self
    }

    pub fn build(self) -> Arc<CapabilityTable> {
        Arc::new(CapabilityTable {
            entries: self.entries,
        })
    }
}

/// Guest-defined top-level bindings.
pub type Namespace = HashMap<String, GlobalEntry>;

/// Everything a guest interpreter can name: the capability table and the
/// guest namespace. Cloning shares both, which is how guest threads see
/// the same globals as the frame loop.
#[derive(Clone)]
pub struct Environment {
    pub capabilities: Arc<CapabilityTable>,
    pub namespace: Arc<RwLock<Namespace>>,
}

impl Environment {
    pub fn new(capabilities: Arc<CapabilityTable>) -> Self {
        Self {
            capabilities,
            namespace: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Guest bindings shadow nothing: capability names cannot be rebound,
    /// so lookup order only matters for speed.
    pub fn lookup(&self, name: &str) -> Option<Value> {
        if let Some(entry) = self.namespace.read().get(name) {
            return Some(entry.value.clone());
        }
        self.capabilities.get(name).cloned()
    }

    /// Value of a guest-defined binding, ignoring capabilities.
    pub fn guest_binding(&self, name: &str) -> Option<Value> {
        self.namespace.read().get(name).map(|e| e.value.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_preserves_registration_order() {
        let mut b = CapabilityTableBuilder::new();
        b.register("zeta", Value::Int(1))
            .register("alpha", Value::Int(2))
            .register("mid", Value::Int(3));
        let table = b.build();
        let names: Vec<&str> = table.names().collect();
        assert_eq!(names, ["zeta", "alpha", "mid"]);
        assert_eq!(table.len(), 3);
        assert!(table.contains("alpha"));
        assert!(!table.contains("open"));
    }

    #[test]
    #[should_panic(expected = "registered twice")]
    #[cfg(debug_assertions)]
    fn duplicate_registration_is_caught() {
        let mut b = CapabilityTableBuilder::new();
        b.register("len", Value::Nil);
        b.register("len", Value::Nil);
    }

    #[test]
    fn namespace_is_shared_between_clones() {
        let env = Environment::new(CapabilityTableBuilder::new().build());
        let other = env.clone();
        other
            .namespace
            .write()
            .insert("x".into(), GlobalEntry::new(Value::Int(7), true));
        assert!(env.lookup("x").map(|v| v.equals(&Value::Int(7))).unwrap_or(false));
        assert!(env.guest_binding("missing").is_none());
    }
}
