use std::sync::Arc;

use crate::function::Closure;

/// Represents a single call frame in the execution stack.
///
/// Each frame tracks:
/// - `closure`: the running function and its captured values
/// - `ip`: Instruction Pointer (current bytecode index)
/// - `base`: Base offset in the value stack for this frame's registers
/// - `dest`: absolute stack slot for the return value, `None` when the
///   frame was entered from the host
#[derive(Clone)]
pub struct CallFrame {
    pub closure: Arc<Closure>,
    pub ip: usize,
    pub base: usize,
    pub dest: Option<usize>,
}

impl CallFrame {
    pub fn new(closure: Arc<Closure>, base: usize, dest: Option<usize>) -> Self {
        Self {
            closure,
            ip: 0,
            base,
            dest,
        }
    }

    /// Source line of the instruction that is executing (or just ran).
    pub fn current_line(&self) -> u32 {
        self.closure.proto.line_at(self.ip.saturating_sub(1))
    }
}
