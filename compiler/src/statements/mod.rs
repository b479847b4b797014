use cart_parser::ast::Stmt;
use vm::opcode::OpCode;

use crate::codegen::Compiler;
use crate::control_flow::ControlFlowCompiler;
use crate::error::CompileError;
use crate::expressions::ExpressionCompiler;

pub mod declarations;

pub use declarations::DeclarationCompiler;

pub trait StatementCompiler {
    fn compile_stmt(&mut self, stmt: &Stmt) -> Result<(), CompileError>;
}

impl StatementCompiler for Compiler {
    fn compile_stmt(&mut self, stmt: &Stmt) -> Result<(), CompileError> {
        // Track source position for line info and error reporting
        self.set_position(stmt.span());

        match stmt {
            Stmt::LetDecl { name, value, .. } => self.compile_binding(name, value, false),
            Stmt::MutDecl { name, value, .. } => self.compile_binding(name, value, true),
            Stmt::Assignment { target, value, .. } => self.compile_assignment(target, value),
            Stmt::FnDecl {
                name, params, body, ..
            } => self.compile_fn_decl(name, params, body),
            // Vetted modules are already bound; the restrict pass has
            // rejected everything else.
            Stmt::Import { .. } => Ok(()),
            Stmt::Break { .. } => self.compile_break(),
            Stmt::Continue { .. } => self.compile_continue(),
            Stmt::Return { value, .. } => {
                if let Some(expr) = value {
                    let reg = self.compile_expr(expr)?;
                    self.emit_abc(OpCode::Return, reg, 1, 0);
                    self.free_reg(reg);
                } else {
                    self.emit_abc(OpCode::Return, 0, 0, 0);
                }
                Ok(())
            }
            Stmt::Expr(expr) => {
                let reg = self.compile_expr(expr)?;
                self.free_reg(reg);
                Ok(())
            }
        }
    }
}
