use std::collections::HashMap;

use cart_parser::ast::{Program, Span};
use vm::opcode::OpCode;
use vm::FunctionProto;

use crate::error::CompileError;
use crate::function_compiler::FunctionCompiler;
use crate::statements::StatementCompiler;

/// Name of the implicit top-level function.
pub const MAIN_NAME: &str = "main";

pub struct Compiler {
    /// One entry per function being compiled; the last is the innermost.
    pub compilers: Vec<FunctionCompiler>,
    /// Top-level names this unit defines, with their mutability.
    pub global_symbols: HashMap<String, bool>,
}

impl Default for Compiler {
    fn default() -> Self {
        Self::new()
    }
}

impl Compiler {
    pub fn new() -> Self {
        Self {
            compilers: vec![FunctionCompiler::new(MAIN_NAME.to_string(), 0, None)],
            global_symbols: HashMap::new(),
        }
    }

    pub fn current(&mut self) -> &mut FunctionCompiler {
        let idx = self.compilers.len() - 1;
        &mut self.compilers[idx]
    }

    pub fn current_ref(&self) -> &FunctionCompiler {
        let idx = self.compilers.len() - 1;
        &self.compilers[idx]
    }

    /// Whether code is being emitted at the top level of the main function.
    pub fn at_top_level(&self) -> bool {
        self.compilers.len() == 1 && self.current_ref().scope_depth == 0
    }

    pub fn alloc_reg(&mut self) -> Result<u8, CompileError> {
        self.current().alloc_reg()
    }

    pub fn alloc_contiguous(&mut self, count: u8) -> Result<u8, CompileError> {
        self.current().alloc_contiguous(count)
    }

    pub fn free_reg(&mut self, reg: u8) {
        self.current().free_reg(reg)
    }

    pub fn emit_abc(&mut self, op: OpCode, a: u8, b: u8, c: u8) {
        self.current().emit_abc(op, a, b, c)
    }

    pub fn emit_abx(&mut self, op: OpCode, a: u8, bx: u16) {
        self.current().emit_abx(op, a, bx)
    }

    pub fn set_position(&mut self, span: &Span) {
        let f = self.current();
        f.current_line = span.line;
        f.current_col = span.col;
    }

    pub fn position(&self) -> (usize, usize) {
        let f = self.current_ref();
        (f.current_line, f.current_col)
    }

    pub fn syntax_error(&self, message: impl Into<String>) -> CompileError {
        let (line, col) = self.position();
        CompileError::syntax(message, line, col)
    }

    pub fn compile_program(mut self, program: &Program) -> Result<FunctionProto, CompileError> {
        for stmt in &program.stmts {
            self.compile_stmt(stmt)?;
        }
        self.emit_abc(OpCode::Return, 0, 0, 0);
        debug_assert_eq!(self.compilers.len(), 1);
        let main = self.compilers.pop().ok_or_else(|| {
            CompileError::syntax("compiler state lost the main function", 0, 0)
        })?;
        Ok(main.into_proto())
    }
}
