use cart_parser::ast::{Expr, UnaryOp};
use vm::opcode::OpCode;

use crate::codegen::Compiler;
use crate::error::CompileError;
use crate::expressions::{AtomCompiler, ExpressionCompiler};

pub trait PostfixCompiler {
    fn compile_prefix(&mut self, op: &UnaryOp, operand: &Expr) -> Result<u8, CompileError>;
    fn compile_call(&mut self, callee: &Expr, args: &[Expr]) -> Result<u8, CompileError>;
    fn compile_index(&mut self, object: &Expr, index: &Expr) -> Result<u8, CompileError>;
    fn compile_member(&mut self, object: &Expr, field: &str) -> Result<u8, CompileError>;
}

impl PostfixCompiler for Compiler {
    fn compile_prefix(&mut self, op: &UnaryOp, operand: &Expr) -> Result<u8, CompileError> {
        let reg = self.compile_expr(operand)?;
        let opcode = match op {
            UnaryOp::Neg => OpCode::Neg,
            UnaryOp::Not => OpCode::LogNot,
        };
        self.emit_abc(opcode, reg, reg, 0);
        Ok(reg)
    }

    /// The callee's register receives the result; arguments occupy the
    /// registers right after it.
    fn compile_call(&mut self, callee: &Expr, args: &[Expr]) -> Result<u8, CompileError> {
        if args.len() > u8::MAX as usize {
            let (line, col) = self.position();
            return Err(CompileError::limit("too many call arguments", line, col));
        }
        let reg = self.compile_expr(callee)?;
        for arg in args {
            self.compile_expr(arg)?;
        }
        self.emit_abc(OpCode::Call, reg, reg, args.len() as u8);
        for _ in 0..args.len() {
            let top = self.current_ref().reg_top - 1;
            self.free_reg(top);
        }
        Ok(reg)
    }

    fn compile_index(&mut self, object: &Expr, index: &Expr) -> Result<u8, CompileError> {
        let reg = self.compile_expr(object)?;
        let key_reg = self.compile_expr(index)?;
        self.emit_abc(OpCode::GetIndex, reg, reg, key_reg);
        self.free_reg(key_reg);
        Ok(reg)
    }

    fn compile_member(&mut self, object: &Expr, field: &str) -> Result<u8, CompileError> {
        let reg = self.compile_expr(object)?;
        let key_reg = self.compile_dot_key(field)?;
        self.emit_abc(OpCode::GetMember, reg, reg, key_reg);
        self.free_reg(key_reg);
        Ok(reg)
    }
}
