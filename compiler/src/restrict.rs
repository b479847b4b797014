//! Restricted-grammar pass.
//!
//! Runs over the parsed program before any code is generated and rejects
//! constructs guest code is not allowed to use: host-reserved names,
//! imports of anything but the vetted modules, member writes, member reads
//! on literals, and rebinding of capability names.

use std::collections::HashSet;

use cart_parser::ast::{Block, ElseBranch, Expr, ForIterable, MapKey, Program, Span, Stmt};
use vm::stdlib::SAFE_MODULES;
use vm::CapabilityTable;

use crate::error::CompileError;

/// Deepest expression/block nesting the compiler accepts.
pub const MAX_NESTING_DEPTH: usize = 200;

/// What guest source may name, import and bind.
#[derive(Debug, Clone)]
pub struct GrammarPolicy {
    allowed_imports: HashSet<String>,
    reserved: HashSet<String>,
}

impl Default for GrammarPolicy {
    fn default() -> Self {
        Self {
            allowed_imports: SAFE_MODULES.iter().map(|m| m.to_string()).collect(),
            reserved: HashSet::new(),
        }
    }
}

impl GrammarPolicy {
    /// Policy protecting every name in `table` from being rebound.
    pub fn for_capabilities(table: &CapabilityTable) -> Self {
        Self::default().with_reserved(table.names())
    }

    pub fn with_reserved<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.reserved.extend(names.into_iter().map(Into::into));
        self
    }

    pub fn is_reserved(&self, name: &str) -> bool {
        self.reserved.contains(name)
    }

    pub fn allows_import(&self, module: &str) -> bool {
        self.allowed_imports.contains(module)
    }
}

/// Check `program` against `policy`.
pub fn validate(program: &Program, policy: &GrammarPolicy) -> Result<(), CompileError> {
    let mut v = Validator { policy, depth: 0 };
    for stmt in &program.stmts {
        v.stmt(stmt)?;
    }
    Ok(())
}

struct Validator<'a> {
    policy: &'a GrammarPolicy,
    depth: usize,
}

fn restricted(message: String, span: &Span) -> CompileError {
    CompileError::restricted(message, span.line, span.col)
}

impl Validator<'_> {
    fn enter(&mut self, span: &Span) -> Result<(), CompileError> {
        self.depth += 1;
        if self.depth > MAX_NESTING_DEPTH {
            return Err(CompileError::limit(
                format!("nesting deeper than {MAX_NESTING_DEPTH} levels"),
                span.line,
                span.col,
            ));
        }
        Ok(())
    }

    fn leave(&mut self) {
        self.depth -= 1;
    }

    fn name(&self, name: &str, span: &Span) -> Result<(), CompileError> {
        if name.starts_with('_') {
            return Err(restricted(
                format!("names starting with `_` are reserved: `{name}`"),
                span,
            ));
        }
        Ok(())
    }

    fn binding(&self, name: &str, span: &Span) -> Result<(), CompileError> {
        self.name(name, span)?;
        if self.policy.is_reserved(name) {
            return Err(restricted(
                format!("cannot rebind capability `{name}`"),
                span,
            ));
        }
        Ok(())
    }

    fn stmt(&mut self, stmt: &Stmt) -> Result<(), CompileError> {
        match stmt {
            Stmt::LetDecl { name, value, span } | Stmt::MutDecl { name, value, span } => {
                self.binding(name, span)?;
                self.expr(value)
            }
            Stmt::Assignment {
                target,
                value,
                span,
            } => {
                match target {
                    Expr::Ident { name, .. } => self.binding(name, span)?,
                    Expr::Index { object, index, .. } => {
                        self.expr(object)?;
                        self.expr(index)?;
                    }
                    Expr::DotAccess { .. } => {
                        return Err(restricted("member assignment is not allowed".into(), span))
                    }
                    _ => {
                        return Err(CompileError::syntax(
                            "invalid assignment target",
                            span.line,
                            span.col,
                        ))
                    }
                }
                self.expr(value)
            }
            Stmt::FnDecl {
                name,
                params,
                body,
                span,
            } => {
                self.binding(name, span)?;
                self.function(params, body, span)
            }
            Stmt::Import { module, span } => {
                if !self.policy.allows_import(module) {
                    return Err(restricted(
                        format!("import of `{module}` is not allowed"),
                        span,
                    ));
                }
                Ok(())
            }
            Stmt::Return { value, .. } => match value {
                Some(expr) => self.expr(expr),
                None => Ok(()),
            },
            Stmt::Break { .. } | Stmt::Continue { .. } => Ok(()),
            Stmt::Expr(expr) => self.expr(expr),
        }
    }

    fn block(&mut self, block: &Block) -> Result<(), CompileError> {
        self.enter(&block.span)?;
        for stmt in &block.stmts {
            self.stmt(stmt)?;
        }
        self.leave();
        Ok(())
    }

    fn function(&mut self, params: &[String], body: &Block, span: &Span) -> Result<(), CompileError> {
        for param in params {
            self.binding(param, span)?;
        }
        self.block(body)
    }

    fn expr(&mut self, expr: &Expr) -> Result<(), CompileError> {
        self.enter(expr.span())?;
        match expr {
            Expr::Number { .. }
            | Expr::Float { .. }
            | Expr::Bool { .. }
            | Expr::StringLit { .. }
            | Expr::Nil { .. } => {}
            Expr::Ident { name, span } => self.name(name, span)?,
            Expr::BinOp { lhs, rhs, .. } => {
                self.expr(lhs)?;
                self.expr(rhs)?;
            }
            Expr::UnaryOp { operand, .. } => self.expr(operand)?,
            Expr::Call { callee, args, .. } => {
                self.expr(callee)?;
                for arg in args {
                    self.expr(arg)?;
                }
            }
            Expr::Index { object, index, .. } => {
                self.expr(object)?;
                self.expr(index)?;
            }
            Expr::DotAccess {
                object,
                field,
                span,
            } => {
                self.name(field, span)?;
                if object.is_literal() {
                    return Err(restricted(
                        format!("member access `.{field}` on a literal is not allowed"),
                        span,
                    ));
                }
                self.expr(object)?;
            }
            Expr::If {
                condition,
                then_block,
                else_branch,
                ..
            } => {
                self.expr(condition)?;
                self.block(then_block)?;
                match else_branch {
                    Some(ElseBranch::Block(block)) => self.block(block)?,
                    Some(ElseBranch::If(expr)) => self.expr(expr)?,
                    None => {}
                }
            }
            Expr::For {
                var,
                iterable,
                body,
                span,
            } => {
                self.binding(var, span)?;
                match iterable {
                    ForIterable::Range { start, end } => {
                        self.expr(start)?;
                        self.expr(end)?;
                    }
                    ForIterable::Expr(expr) => self.expr(expr)?,
                }
                self.block(body)?;
            }
            Expr::While {
                condition, body, ..
            } => {
                self.expr(condition)?;
                self.block(body)?;
            }
            Expr::Forever { body, .. } => self.block(body)?,
            Expr::Block(block) => self.block(block)?,
            Expr::FnExpr {
                name,
                params,
                body,
                span,
            } => {
                if let Some(name) = name {
                    self.binding(name, span)?;
                }
                self.function(params, body, span)?;
            }
            Expr::Array { elements, .. } => {
                for element in elements {
                    self.expr(element)?;
                }
            }
            Expr::Map { pairs, span } => {
                for (key, value) in pairs {
                    if let MapKey::Ident(name) = key {
                        self.name(name, span)?;
                    }
                    self.expr(value)?;
                }
            }
        }
        self.leave();
        Ok(())
    }
}
