use cart_parser::ast::{Block, Expr};
use vm::opcode::OpCode;

use crate::codegen::Compiler;
use crate::error::CompileError;
use crate::expressions::{AtomCompiler, ExpressionCompiler};
use crate::functions::FunctionDefinitionCompiler;
use crate::scopes::ScopeCompiler;

pub trait DeclarationCompiler {
    fn compile_binding(&mut self, name: &str, value: &Expr, mutable: bool)
        -> Result<(), CompileError>;
    fn compile_fn_decl(
        &mut self,
        name: &str,
        params: &[String],
        body: &Block,
    ) -> Result<(), CompileError>;
    fn compile_assignment(&mut self, target: &Expr, value: &Expr) -> Result<(), CompileError>;
    fn bind(&mut self, name: &str, reg: u8, mutable: bool) -> Result<(), CompileError>;
}

impl DeclarationCompiler for Compiler {
    fn compile_binding(
        &mut self,
        name: &str,
        value: &Expr,
        mutable: bool,
    ) -> Result<(), CompileError> {
        let reg = self.compile_expr(value)?;
        self.bind(name, reg, mutable)
    }

    fn compile_fn_decl(
        &mut self,
        name: &str,
        params: &[String],
        body: &Block,
    ) -> Result<(), CompileError> {
        let reg = self.compile_function(Some(name), params, body)?;
        self.bind(name, reg, false)
    }

    /// Top-level bindings go to the guest namespace and release `reg`;
    /// anywhere else `reg` becomes the local's home.
    fn bind(&mut self, name: &str, reg: u8, mutable: bool) -> Result<(), CompileError> {
        if self.current_ref().scope_depth > 0 || self.compilers.len() > 1 {
            self.declare_local(name, reg, mutable);
            return Ok(());
        }
        let idx = self.name_constant(name)?;
        let op = if mutable {
            OpCode::DefGlobalVar
        } else {
            OpCode::DefGlobalLet
        };
        self.emit_abx(op, reg, idx);
        self.free_reg(reg);
        self.global_symbols.insert(name.to_string(), mutable);
        Ok(())
    }

    fn compile_assignment(&mut self, target: &Expr, value: &Expr) -> Result<(), CompileError> {
        match target {
            Expr::Ident { name, .. } => {
                if let Some(local) = self.resolve_local(name) {
                    if !local.mutable {
                        return Err(
                            self.syntax_error(format!("cannot assign to immutable binding `{name}`"))
                        );
                    }
                    let local_reg = local.reg;
                    let val_reg = self.compile_expr(value)?;
                    self.emit_abc(OpCode::Move, local_reg, val_reg, 0);
                    self.free_reg(val_reg);
                    return Ok(());
                }

                if self.current_ref().self_name.as_deref() == Some(name.as_str()) {
                    return Err(self.syntax_error(format!(
                        "cannot assign to `{name}` inside its own body"
                    )));
                }
                // Captures are copies taken when the closure was created.
                if self.resolve_upvalue(self.compilers.len() - 1, name)?.is_some() {
                    return Err(
                        self.syntax_error(format!("cannot assign to captured variable `{name}`"))
                    );
                }
                if self.global_symbols.get(name.as_str()) == Some(&false) {
                    return Err(
                        self.syntax_error(format!("cannot assign to immutable binding `{name}`"))
                    );
                }

                let val_reg = self.compile_expr(value)?;
                let idx = self.name_constant(name)?;
                self.emit_abx(OpCode::SetGlobal, val_reg, idx);
                self.free_reg(val_reg);
                Ok(())
            }
            Expr::Index { object, index, .. } => {
                let target_reg = self.compile_expr(object)?;
                let key_reg = self.compile_expr(index)?;
                let val_reg = self.compile_expr(value)?;
                // R[A][R[B]] = R[C]
                self.emit_abc(OpCode::SetIndex, target_reg, key_reg, val_reg);
                self.free_reg(val_reg);
                self.free_reg(key_reg);
                self.free_reg(target_reg);
                Ok(())
            }
            Expr::DotAccess { .. } => {
                let (line, col) = self.position();
                Err(CompileError::restricted(
                    "member assignment is not allowed",
                    line,
                    col,
                ))
            }
            _ => Err(self.syntax_error("invalid assignment target")),
        }
    }
}
