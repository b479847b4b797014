use cart_parser::ast::{BinOp, Expr};
use vm::opcode::OpCode;

use crate::codegen::Compiler;
use crate::error::CompileError;
use crate::expressions::ExpressionCompiler;

pub trait BinaryCompiler {
    fn compile_binary(&mut self, op: &BinOp, lhs: &Expr, rhs: &Expr) -> Result<u8, CompileError>;
}

impl BinaryCompiler for Compiler {
    /// Arithmetic and comparison operators. `&&`/`||` short-circuit and are
    /// compiled by the control-flow compiler instead.
    fn compile_binary(&mut self, op: &BinOp, lhs: &Expr, rhs: &Expr) -> Result<u8, CompileError> {
        let opcode = match op {
            BinOp::Add => OpCode::Add,
            BinOp::Sub => OpCode::Sub,
            BinOp::Mul => OpCode::Mul,
            BinOp::Div => OpCode::Div,
            BinOp::Mod => OpCode::Mod,
            BinOp::Pow => OpCode::Pow,
            BinOp::Eq => OpCode::Eq,
            BinOp::Neq => OpCode::NotEq,
            BinOp::Lt => OpCode::Lt,
            BinOp::Le => OpCode::Le,
            BinOp::Gt => OpCode::Gt,
            BinOp::Ge => OpCode::Ge,
            BinOp::And | BinOp::Or => {
                return Err(self.syntax_error("logical operator reached the arithmetic compiler"))
            }
        };

        let left_reg = self.compile_expr(lhs)?;
        let right_reg = self.compile_expr(rhs)?;

        // Reuse left_reg
        self.emit_abc(opcode, left_reg, left_reg, right_reg);
        self.free_reg(right_reg);

        Ok(left_reg)
    }
}
