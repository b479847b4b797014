use std::sync::Arc;

use crate::value::Value;

/// Where a closure takes each captured value from when it is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpvalueSource {
    /// Register of the enclosing frame.
    Local(u8),
    /// Upvalue of the enclosing closure.
    Upvalue(u8),
}

/// Compiled function body. Immutable once built and shared between every
/// closure (and thread) that runs it.
#[derive(Debug, Clone)]
pub struct FunctionProto {
    pub name: String,
    pub arity: u8,
    pub max_slots: u16,
    pub chunk: Vec<u32>,
    /// Source line per instruction, parallel to `chunk`.
    pub line_info: Vec<u32>,
    pub constants: Vec<Value>,
    /// Nested function prototypes, indexed by `CLOSURE`'s Bx operand.
    pub functions: Vec<Arc<FunctionProto>>,
    pub upvalues: Vec<UpvalueSource>,
}

impl FunctionProto {
    pub fn line_at(&self, ip: usize) -> u32 {
        self.line_info.get(ip).copied().unwrap_or(0)
    }
}

/// A function prototype plus the values it captured, by value, when the
/// `CLOSURE` instruction ran.
pub struct Closure {
    pub proto: Arc<FunctionProto>,
    pub upvalues: Vec<Value>,
}

impl Closure {
    pub fn new(proto: Arc<FunctionProto>) -> Self {
        Self {
            proto,
            upvalues: Vec::new(),
        }
    }
}
