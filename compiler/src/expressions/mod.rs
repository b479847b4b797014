use cart_parser::ast::{BinOp, Expr};
use vm::opcode::OpCode;

use crate::codegen::Compiler;
use crate::control_flow::ControlFlowCompiler;
use crate::error::CompileError;
use crate::functions::FunctionDefinitionCompiler;

pub mod atoms;
pub mod binary;
pub mod postfix;

pub use atoms::AtomCompiler;
pub use binary::BinaryCompiler;
pub use postfix::PostfixCompiler;

pub trait ExpressionCompiler {
    /// Compile `expr` into a freshly allocated register and return it.
    fn compile_expr(&mut self, expr: &Expr) -> Result<u8, CompileError>;
    fn compile_expr_into(&mut self, expr: &Expr, target: u8) -> Result<(), CompileError>;
}

impl ExpressionCompiler for Compiler {
    fn compile_expr(&mut self, expr: &Expr) -> Result<u8, CompileError> {
        // Instructions carry the line of the innermost expression being
        // compiled when they are emitted.
        let saved = self.position();
        self.set_position(expr.span());

        let reg = match expr {
            Expr::Number { value, .. } => self.compile_number(value),
            Expr::Float { value, .. } => self.compile_float(value),
            Expr::StringLit { value, .. } => self.compile_string(value),
            Expr::Bool { value, .. } => {
                let reg = self.alloc_reg()?;
                let op = if *value { OpCode::LoadTrue } else { OpCode::LoadFalse };
                self.emit_abx(op, reg, 0);
                Ok(reg)
            }
            Expr::Nil { .. } => {
                let reg = self.alloc_reg()?;
                self.emit_abx(OpCode::LoadNil, reg, 0);
                Ok(reg)
            }
            Expr::Ident { name, .. } => self.compile_identifier(name),
            Expr::Array { elements, .. } => self.compile_list(elements),
            Expr::Map { pairs, .. } => self.compile_map(pairs),
            Expr::BinOp { op, lhs, rhs, .. } => match op {
                BinOp::And | BinOp::Or => self.compile_logical(op, lhs, rhs),
                _ => self.compile_binary(op, lhs, rhs),
            },
            Expr::UnaryOp { op, operand, .. } => self.compile_prefix(op, operand),
            Expr::Call { callee, args, .. } => self.compile_call(callee, args),
            Expr::Index { object, index, .. } => self.compile_index(object, index),
            Expr::DotAccess { object, field, .. } => self.compile_member(object, field),
            Expr::If {
                condition,
                then_block,
                else_branch,
                ..
            } => self.compile_if(condition, then_block, else_branch.as_ref()),
            Expr::While {
                condition, body, ..
            } => self.compile_while(condition, body),
            Expr::For {
                var,
                iterable,
                body,
                ..
            } => self.compile_for(var, iterable, body),
            Expr::Forever { body, .. } => self.compile_forever(body),
            Expr::Block(block) => {
                let reg = self.alloc_reg()?;
                self.compile_block(block, reg)?;
                Ok(reg)
            }
            Expr::FnExpr {
                name, params, body, ..
            } => self.compile_function(name.as_deref(), params, body),
        };

        let f = self.current();
        f.current_line = saved.0;
        f.current_col = saved.1;
        reg
    }

    // Specialized compile_expr that targets a register
    fn compile_expr_into(&mut self, expr: &Expr, target: u8) -> Result<(), CompileError> {
        let reg = self.compile_expr(expr)?;
        if reg != target {
            self.emit_abc(OpCode::Move, target, reg, 0);
            self.free_reg(reg);
        }
        Ok(())
    }
}
