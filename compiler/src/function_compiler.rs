use std::sync::Arc;

use vm::opcode::instruction::{encode_abc, encode_abx};
use vm::opcode::OpCode;
use vm::{FunctionProto, UpvalueSource, Value};

use crate::error::CompileError;
use crate::types::{Local, LoopContext};

/// Highest register index a function may use.
pub const MAX_REGISTERS: usize = 250;

/// State specific to ONE function being compiled
pub struct FunctionCompiler {
    pub name: String,
    pub arity: u8,
    /// Name the function can use to refer to itself (`LOAD_SELF`).
    pub self_name: Option<String>,
    pub locals: Vec<Local>,
    pub scope_depth: u32,
    pub bytecode: Vec<u32>,
    pub line_info: Vec<u32>,
    pub constants: Vec<Value>,
    pub functions: Vec<Arc<FunctionProto>>,
    pub upvalues: Vec<UpvalueSource>,
    /// Names each upvalue was captured under, parallel to `upvalues`.
    pub upvalue_names: Vec<String>,
    pub loop_stack: Vec<LoopContext>,

    pub current_line: usize,
    pub current_col: usize,

    // Register allocator state
    pub reg_top: u8,
    pub max_slots: u16,
}

impl FunctionCompiler {
    /// reg_top starts at arity: R0..R(arity-1) hold the arguments.
    pub fn new(name: String, arity: u8, self_name: Option<String>) -> Self {
        Self {
            name,
            arity,
            self_name,
            locals: Vec::new(),
            scope_depth: 0,
            bytecode: Vec::new(),
            line_info: Vec::new(),
            constants: Vec::new(),
            functions: Vec::new(),
            upvalues: Vec::new(),
            upvalue_names: Vec::new(),
            loop_stack: Vec::new(),
            current_line: 1,
            current_col: 1,
            reg_top: arity,
            max_slots: arity as u16,
        }
    }

    fn limit(&self, message: impl Into<String>) -> CompileError {
        CompileError::limit(message, self.current_line, self.current_col)
    }

    pub fn alloc_contiguous(&mut self, count: u8) -> Result<u8, CompileError> {
        let start = self.reg_top;
        if start as usize + count as usize > MAX_REGISTERS {
            return Err(self.limit(format!(
                "function `{}` needs more than {MAX_REGISTERS} registers",
                self.name
            )));
        }
        self.reg_top += count;
        if self.reg_top as u16 > self.max_slots {
            self.max_slots = self.reg_top as u16;
        }
        Ok(start)
    }

    pub fn alloc_reg(&mut self) -> Result<u8, CompileError> {
        self.alloc_contiguous(1)
    }

    pub fn free_reg(&mut self, reg: u8) {
        debug_assert_eq!(reg + 1, self.reg_top, "Register Hygiene Error");
        self.reg_top -= 1;
    }

    pub fn add_constant(&mut self, val: Value) -> Result<u16, CompileError> {
        let existing = self.constants.iter().position(|c| same_constant(c, &val));
        let idx = match existing {
            Some(idx) => idx,
            None => {
                self.constants.push(val);
                self.constants.len() - 1
            }
        };
        u16::try_from(idx).map_err(|_| self.limit("too many constants in one function"))
    }

    pub fn add_function(&mut self, proto: FunctionProto) -> Result<u16, CompileError> {
        self.functions.push(Arc::new(proto));
        u16::try_from(self.functions.len() - 1)
            .map_err(|_| self.limit("too many nested functions"))
    }

    pub fn add_upvalue(&mut self, source: UpvalueSource, name: &str) -> Result<u8, CompileError> {
        if let Some(i) = self.upvalues.iter().position(|u| *u == source) {
            return Ok(i as u8);
        }
        if self.upvalues.len() >= u8::MAX as usize {
            return Err(self.limit("too many captured variables"));
        }
        self.upvalues.push(source);
        self.upvalue_names.push(name.to_string());
        Ok((self.upvalues.len() - 1) as u8)
    }

    pub fn emit_abc(&mut self, op: OpCode, a: u8, b: u8, c: u8) {
        self.bytecode.push(encode_abc(op.as_u8(), a, b, c));
        self.line_info.push(self.current_line as u32);
    }

    pub fn emit_abx(&mut self, op: OpCode, a: u8, bx: u16) {
        self.bytecode.push(encode_abx(op.as_u8(), a, bx));
        self.line_info.push(self.current_line as u32);
    }

    /// Current instruction index as a jump target.
    pub fn label(&self) -> Result<u16, CompileError> {
        u16::try_from(self.bytecode.len()).map_err(|_| self.limit("function body too large"))
    }

    pub fn resolve_local(&self, name: &str) -> Option<usize> {
        self.locals.iter().rposition(|local| local.name == name)
    }

    pub fn into_proto(self) -> FunctionProto {
        FunctionProto {
            name: self.name,
            arity: self.arity,
            max_slots: self.max_slots,
            chunk: self.bytecode,
            line_info: self.line_info,
            constants: self.constants,
            functions: self.functions,
            upvalues: self.upvalues,
        }
    }
}

fn same_constant(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Int(x), Value::Int(y)) => x == y,
        (Value::Float(x), Value::Float(y)) => x.to_bits() == y.to_bits(),
        (Value::Str(x), Value::Str(y)) => x == y,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registers_start_after_arguments() {
        let mut f = FunctionCompiler::new("f".into(), 2, None);
        assert_eq!(f.alloc_reg().unwrap(), 2);
        assert_eq!(f.alloc_contiguous(3).unwrap(), 3);
        assert_eq!(f.max_slots, 6);
        for r in (2..6).rev() {
            f.free_reg(r);
        }
        assert_eq!(f.reg_top, 2);
        assert_eq!(f.max_slots, 6);
    }

    #[test]
    fn register_overflow_is_a_limit_error() {
        let mut f = FunctionCompiler::new("f".into(), 0, None);
        f.alloc_contiguous(MAX_REGISTERS as u8).unwrap();
        let err = f.alloc_reg().unwrap_err();
        assert_eq!(err.kind, crate::CompileErrorKind::Limit);
    }

    #[test]
    fn constants_are_deduplicated_by_kind() {
        let mut f = FunctionCompiler::new("f".into(), 0, None);
        let a = f.add_constant(Value::Int(1)).unwrap();
        let b = f.add_constant(Value::Float(1.0)).unwrap();
        let c = f.add_constant(Value::Int(1)).unwrap();
        let d = f.add_constant(Value::str("x")).unwrap();
        let e = f.add_constant(Value::str("x")).unwrap();
        assert_eq!((a, b, c, d, e), (0, 1, 0, 2, 2));
    }

    #[test]
    fn line_info_tracks_every_instruction() {
        let mut f = FunctionCompiler::new("f".into(), 0, None);
        f.emit_abx(OpCode::LoadNil, 0, 0);
        f.current_line = 7;
        f.emit_abc(OpCode::Return, 0, 1, 0);
        assert_eq!(f.line_info, vec![1, 7]);
    }
}
