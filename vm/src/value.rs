//! Runtime values shared between the interpreter, natives and host.
//!
//! Every value is `Send + Sync`: containers live behind `parking_lot`
//! mutexes so guest threads can share them. Code that needs to look at
//! nested containers takes a snapshot (clone the outer `Vec`/map and drop
//! the guard) before touching inner ones, so a container that contains
//! itself never locks twice.
//!
//! Rendering and equality are bounded twice over: a container already on
//! the current path renders as `[...]`/`{...}`, and a walk gives up after
//! [`MAX_VISITED_NODES`] nodes so shared sub-lists cannot blow up.
//! Dropping a container flattens its children onto a worklist instead of
//! recursing, so arbitrarily deep chains free on a fixed stack.

use std::collections::BTreeMap;
use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::Mutex;

use crate::function::Closure;
use crate::native::NativeObj;

/// Recursion limit for display and structural equality.
pub const MAX_NESTING: usize = 32;

/// Upper bound on container nodes one `display`/`repr`/`equals` call visits.
pub const MAX_VISITED_NODES: usize = 10_000;

pub type ListRef = Arc<ListCell>;
pub type MapRef = Arc<MapCell>;

/// Lock-protected list storage. Derefs to the mutex.
pub struct ListCell(Mutex<Vec<Value>>);

/// Lock-protected map storage. Derefs to the mutex.
pub struct MapCell(Mutex<BTreeMap<String, Value>>);

impl ListCell {
    pub fn new(items: Vec<Value>) -> Self {
        Self(Mutex::new(items))
    }
}

impl MapCell {
    pub fn new(entries: BTreeMap<String, Value>) -> Self {
        Self(Mutex::new(entries))
    }
}

impl Deref for ListCell {
    type Target = Mutex<Vec<Value>>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl Deref for MapCell {
    type Target = Mutex<BTreeMap<String, Value>>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl Drop for ListCell {
    fn drop(&mut self) {
        release(std::mem::take(self.0.get_mut()));
    }
}

impl Drop for MapCell {
    fn drop(&mut self) {
        release(std::mem::take(self.0.get_mut()).into_values().collect());
    }
}

/// Frees `pending` without recursing: a container whose last reference is
/// ours is emptied onto the worklist before its own (now empty) drop runs.
fn release(mut pending: Vec<Value>) {
    while let Some(value) = pending.pop() {
        match value {
            Value::List(list) => {
                if let Ok(cell) = Arc::try_unwrap(list) {
                    pending.extend(cell.0.lock().drain(..));
                }
            }
            Value::Map(map) => {
                if let Ok(cell) = Arc::try_unwrap(map) {
                    pending.extend(std::mem::take(&mut *cell.0.lock()).into_values());
                }
            }
            _ => {}
        }
    }
}

#[derive(Clone)]
pub enum Value {
    Nil,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(Arc<str>),
    List(ListRef),
    Map(MapRef),
    Function(Arc<Closure>),
    Native(Arc<NativeObj>),
    Module(Arc<Module>),
    Object(Arc<dyn HostObject>),
}

/// A host value with a fixed, read-only member table.
///
/// Member lookups on anything that is not a [`Module`] or a `HostObject`
/// are runtime errors, so this is the only way a host type can expose
/// methods to guest code.
pub trait HostObject: Send + Sync {
    fn type_name(&self) -> &'static str;
    fn member(&self, name: &str) -> Option<Value>;
}

/// A named bundle of host values (`math`, `random`).
pub struct Module {
    pub name: String,
    pub members: IndexMap<String, Value>,
}

impl Module {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            members: IndexMap::new(),
        }
    }

    pub fn with(mut self, name: &str, value: Value) -> Self {
        debug_assert!(
            !self.members.contains_key(name),
            "duplicate member `{name}` in module `{}`",
            self.name
        );
        self.members.insert(name.to_string(), value);
        self
    }
}

impl Value {
    pub fn str(s: &str) -> Self {
        Value::Str(Arc::from(s))
    }

    pub fn list(items: Vec<Value>) -> Self {
        Value::List(Arc::new(ListCell::new(items)))
    }

    pub fn map(entries: BTreeMap<String, Value>) -> Self {
        Value::Map(Arc::new(MapCell::new(entries)))
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Nil => "nil",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "string",
            Value::List(_) => "list",
            Value::Map(_) => "map",
            Value::Function(_) => "function",
            Value::Native(_) => "native",
            Value::Module(_) => "module",
            Value::Object(obj) => obj.type_name(),
        }
    }

    /// `nil`, `false`, zero, the empty string and empty containers are falsey.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Nil => false,
            Value::Bool(b) => *b,
            Value::Int(n) => *n != 0,
            Value::Float(f) => *f != 0.0,
            Value::Str(s) => !s.is_empty(),
            Value::List(l) => !l.lock().is_empty(),
            Value::Map(m) => !m.lock().is_empty(),
            Value::Function(_) | Value::Native(_) | Value::Module(_) | Value::Object(_) => true,
        }
    }

    pub fn is_falsey(&self) -> bool {
        !self.is_truthy()
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }

    pub fn is_callable(&self) -> bool {
        matches!(self, Value::Function(_) | Value::Native(_))
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    /// Numeric view used by mixed int/float arithmetic.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(n) => Some(*n as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Clone of the list contents, taken under the lock and released.
    pub fn list_snapshot(&self) -> Option<Vec<Value>> {
        match self {
            Value::List(l) => Some(l.lock().clone()),
            _ => None,
        }
    }

    /// Clone of the map contents, taken under the lock and released.
    pub fn map_snapshot(&self) -> Option<BTreeMap<String, Value>> {
        match self {
            Value::Map(m) => Some(m.lock().clone()),
            _ => None,
        }
    }

    /// Structural equality; containers compare element-wise.
    ///
    /// Gives up (unequal) once [`MAX_VISITED_NODES`] container pairs have
    /// been compared.
    pub fn equals(&self, other: &Value) -> bool {
        let mut budget = MAX_VISITED_NODES;
        values_equal(self, other, 0, &mut budget)
    }

    /// Guest-facing string form, as produced by `str()` and `print`.
    pub fn display(&self) -> String {
        Renderer::new(false).render(self)
    }

    /// Like [`Value::display`] but strings are quoted, as inside containers.
    pub fn repr(&self) -> String {
        Renderer::new(true).render(self)
    }
}

fn values_equal(a: &Value, b: &Value, depth: usize, budget: &mut usize) -> bool {
    if depth > MAX_NESTING {
        return false;
    }
    match (a, b) {
        (Value::Nil, Value::Nil) => true,
        (Value::Bool(x), Value::Bool(y)) => x == y,
        (Value::Int(x), Value::Int(y)) => x == y,
        (Value::Float(x), Value::Float(y)) => x == y,
        (Value::Int(x), Value::Float(y)) | (Value::Float(y), Value::Int(x)) => (*x as f64) == *y,
        (Value::Str(x), Value::Str(y)) => x == y,
        (Value::List(x), Value::List(y)) => {
            if Arc::ptr_eq(x, y) {
                return true;
            }
            if *budget == 0 {
                return false;
            }
            *budget -= 1;
            let xs = x.lock().clone();
            let ys = y.lock().clone();
            xs.len() == ys.len()
                && xs
                    .iter()
                    .zip(ys.iter())
                    .all(|(l, r)| values_equal(l, r, depth + 1, budget))
        }
        (Value::Map(x), Value::Map(y)) => {
            if Arc::ptr_eq(x, y) {
                return true;
            }
            if *budget == 0 {
                return false;
            }
            *budget -= 1;
            let xs = x.lock().clone();
            let ys = y.lock().clone();
            xs.len() == ys.len()
                && xs.iter().all(|(k, v)| {
                    ys.get(k)
                        .map(|w| values_equal(v, w, depth + 1, budget))
                        .unwrap_or(false)
                })
        }
        (Value::Function(x), Value::Function(y)) => Arc::ptr_eq(x, y),
        (Value::Native(x), Value::Native(y)) => Arc::ptr_eq(x, y),
        (Value::Module(x), Value::Module(y)) => Arc::ptr_eq(x, y),
        (Value::Object(x), Value::Object(y)) => Arc::ptr_eq(x, y),
        _ => false,
    }
}

fn write_float(out: &mut String, f: f64) {
    if f.is_finite() && f.fract() == 0.0 && f.abs() < 1e16 {
        out.push_str(&format!("{f:.1}"));
    } else {
        out.push_str(&format!("{f}"));
    }
}

/// One `display`/`repr` walk: the containers on the current path and the
/// remaining node allowance.
struct Renderer {
    out: String,
    quote_top: bool,
    path: Vec<usize>,
    budget: usize,
}

impl Renderer {
    fn new(quote_top: bool) -> Self {
        Self {
            out: String::new(),
            quote_top,
            path: Vec::new(),
            budget: MAX_VISITED_NODES,
        }
    }

    fn render(mut self, v: &Value) -> String {
        let quote = self.quote_top;
        self.write(v, quote);
        self.out
    }

    /// Returns false (after writing `elided`) if the container at `addr`
    /// must not be expanded.
    fn enter(&mut self, addr: usize, elided: &str) -> bool {
        if self.path.len() >= MAX_NESTING || self.path.contains(&addr) || self.budget == 0 {
            self.out.push_str(elided);
            return false;
        }
        self.budget -= 1;
        self.path.push(addr);
        true
    }

    fn write(&mut self, v: &Value, quote: bool) {
        match v {
            Value::Nil => self.out.push_str("nil"),
            Value::Bool(b) => self.out.push_str(if *b { "true" } else { "false" }),
            Value::Int(n) => self.out.push_str(&n.to_string()),
            Value::Float(f) => write_float(&mut self.out, *f),
            Value::Str(s) => {
                if quote {
                    self.out.push_str(&format!("{:?}", &**s));
                } else {
                    self.out.push_str(s);
                }
            }
            Value::List(l) => {
                if !self.enter(Arc::as_ptr(l) as usize, "[...]") {
                    return;
                }
                let items = l.lock().clone();
                self.out.push('[');
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        self.out.push_str(", ");
                    }
                    self.write(item, true);
                }
                self.out.push(']');
                self.path.pop();
            }
            Value::Map(m) => {
                if !self.enter(Arc::as_ptr(m) as usize, "{...}") {
                    return;
                }
                let entries = m.lock().clone();
                self.out.push('{');
                for (i, (k, item)) in entries.iter().enumerate() {
                    if i > 0 {
                        self.out.push_str(", ");
                    }
                    self.out.push_str(&format!("{k:?}: "));
                    self.write(item, true);
                }
                self.out.push('}');
                self.path.pop();
            }
            Value::Function(c) => self.out.push_str(&format!("<fn {}>", c.proto.name)),
            Value::Native(n) => self.out.push_str(&format!("<native {}>", n.name)),
            Value::Module(m) => self.out.push_str(&format!("<module {}>", m.name)),
            Value::Object(o) => self.out.push_str(&format!("<{}>", o.type_name())),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.repr())
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display())
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truthiness() {
        assert!(Value::Nil.is_falsey());
        assert!(Value::Bool(false).is_falsey());
        assert!(Value::Int(0).is_falsey());
        assert!(Value::Float(0.0).is_falsey());
        assert!(Value::str("").is_falsey());
        assert!(Value::list(vec![]).is_falsey());
        assert!(Value::map(BTreeMap::new()).is_falsey());
        assert!(Value::Int(-1).is_truthy());
        assert!(Value::str("x").is_truthy());
        assert!(Value::list(vec![Value::Nil]).is_truthy());
    }

    #[test]
    fn display_forms() {
        assert_eq!(Value::Int(42).display(), "42");
        assert_eq!(Value::Float(2.0).display(), "2.0");
        assert_eq!(Value::Float(0.25).display(), "0.25");
        assert_eq!(Value::str("hi").display(), "hi");
        let l = Value::list(vec![Value::Int(1), Value::str("a"), Value::Nil]);
        assert_eq!(l.display(), r#"[1, "a", nil]"#);
        let mut m = BTreeMap::new();
        m.insert("b".to_string(), Value::Bool(true));
        m.insert("a".to_string(), Value::Int(1));
        assert_eq!(Value::map(m).display(), r#"{"a": 1, "b": true}"#);
    }

    #[test]
    fn self_containing_list_does_not_deadlock() {
        let l = Value::list(vec![Value::Int(1)]);
        if let Value::List(inner) = &l {
            inner.lock().push(l.clone());
        }
        assert_eq!(l.display(), "[1, [...]]");
        assert!(l.equals(&l.clone()));
    }

    #[test]
    fn shared_sublists_render_in_bounded_time() {
        // Each level holds the previous one twice: 2^40 paths, 41 nodes.
        let mut v = Value::list(vec![]);
        for _ in 0..40 {
            v = Value::list(vec![v.clone(), v]);
        }
        let shown = v.display();
        assert!(shown.contains("[...]"));
        assert!(shown.len() < 1_000_000);

        let mut w = Value::list(vec![]);
        for _ in 0..40 {
            w = Value::list(vec![w.clone(), w]);
        }
        // Structurally equal but distinct; the walk is cut off, not hung.
        let _ = v.equals(&w);
    }

    #[test]
    fn list_holding_itself_twice() {
        let l = Value::list(vec![]);
        if let Value::List(inner) = &l {
            inner.lock().push(l.clone());
            inner.lock().push(l.clone());
        }
        assert_eq!(l.display(), "[[...], [...]]");
        assert!(l.equals(&l));
        if let Value::List(inner) = &l {
            inner.lock().clear();
        }
    }

    #[test]
    fn deep_chain_drops_without_recursion() {
        let mut v = Value::Nil;
        for i in 0..300_000 {
            v = if i % 2 == 0 {
                Value::list(vec![v])
            } else {
                let mut m = BTreeMap::new();
                m.insert("next".to_string(), v);
                Value::map(m)
            };
        }
        drop(v);
    }

    #[test]
    fn structural_equality() {
        let a = Value::list(vec![Value::Int(1), Value::Float(2.0)]);
        let b = Value::list(vec![Value::Float(1.0), Value::Int(2)]);
        assert!(a.equals(&b));
        assert!(!a.equals(&Value::list(vec![Value::Int(1)])));
        assert!(Value::str("x").equals(&Value::str("x")));
        assert!(!Value::str("1").equals(&Value::Int(1)));
    }
}
