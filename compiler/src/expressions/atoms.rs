use cart_parser::ast::{Expr, MapKey};
use cart_parser::unescape;
use vm::opcode::OpCode;
use vm::Value;

use crate::codegen::Compiler;
use crate::error::CompileError;
use crate::expressions::ExpressionCompiler;
use crate::scopes::ScopeCompiler;

/// Elements or pairs a single literal may hold (one register each).
pub const MAX_LITERAL_ITEMS: usize = 200;

pub trait AtomCompiler {
    fn compile_number(&mut self, text: &str) -> Result<u8, CompileError>;
    fn compile_float(&mut self, text: &str) -> Result<u8, CompileError>;
    fn compile_string(&mut self, raw: &str) -> Result<u8, CompileError>;
    fn compile_identifier(&mut self, name: &str) -> Result<u8, CompileError>;
    fn compile_list(&mut self, elements: &[Expr]) -> Result<u8, CompileError>;
    fn compile_map(&mut self, pairs: &[(MapKey, Expr)]) -> Result<u8, CompileError>;
    fn compile_dot_key(&mut self, name: &str) -> Result<u8, CompileError>;
    fn load_constant(&mut self, val: Value) -> Result<u8, CompileError>;
    fn name_constant(&mut self, name: &str) -> Result<u16, CompileError>;
}

impl AtomCompiler for Compiler {
    fn compile_number(&mut self, text: &str) -> Result<u8, CompileError> {
        let n: i64 = text.parse().map_err(|_| {
            let (line, col) = self.position();
            CompileError::limit(format!("integer literal `{text}` is out of range"), line, col)
        })?;
        self.load_constant(Value::Int(n))
    }

    fn compile_float(&mut self, text: &str) -> Result<u8, CompileError> {
        let f: f64 = text
            .parse()
            .map_err(|_| self.syntax_error(format!("invalid float literal `{text}`")))?;
        self.load_constant(Value::Float(f))
    }

    fn compile_string(&mut self, raw: &str) -> Result<u8, CompileError> {
        let s = unescape(raw);
        self.load_constant(Value::str(&s))
    }

    fn compile_identifier(&mut self, name: &str) -> Result<u8, CompileError> {
        let reg = self.alloc_reg()?;

        // 1. Locals (including parameters)
        if let Some(local_reg) = self.resolve_local(name).map(|l| l.reg) {
            self.emit_abc(OpCode::Move, reg, local_reg, 0);
            return Ok(reg);
        }

        // 2. The function's own name
        if self.current_ref().self_name.as_deref() == Some(name) {
            self.emit_abx(OpCode::LoadSelf, reg, 0);
            return Ok(reg);
        }

        // 3. Captured from an enclosing function
        if let Some(idx) = self.resolve_upvalue(self.compilers.len() - 1, name)? {
            self.emit_abx(OpCode::GetUpvalue, reg, idx as u16);
            return Ok(reg);
        }

        // 4. Globals and capabilities, resolved at run time
        let idx = self.name_constant(name)?;
        self.emit_abx(OpCode::GetGlobal, reg, idx);
        Ok(reg)
    }

    fn compile_list(&mut self, elements: &[Expr]) -> Result<u8, CompileError> {
        if elements.len() > MAX_LITERAL_ITEMS {
            let (line, col) = self.position();
            return Err(CompileError::limit(
                format!("list literal has more than {MAX_LITERAL_ITEMS} elements"),
                line,
                col,
            ));
        }
        let target_reg = self.alloc_reg()?;
        let start_reg = self.current_ref().reg_top;

        for (i, expr) in elements.iter().enumerate() {
            let reg = self.compile_expr(expr)?;
            debug_assert_eq!(reg as usize, start_reg as usize + i, "Register Hygiene Error");
        }

        // R[A] = List(R[B]...R[B+C-1])
        self.emit_abc(OpCode::BuildList, target_reg, start_reg, elements.len() as u8);

        for _ in 0..elements.len() {
            let top = self.current_ref().reg_top - 1;
            self.free_reg(top);
        }
        Ok(target_reg)
    }

    fn compile_map(&mut self, pairs: &[(MapKey, Expr)]) -> Result<u8, CompileError> {
        if pairs.len() * 2 > MAX_LITERAL_ITEMS {
            let (line, col) = self.position();
            return Err(CompileError::limit(
                format!("map literal has more than {} entries", MAX_LITERAL_ITEMS / 2),
                line,
                col,
            ));
        }
        let target_reg = self.alloc_reg()?;
        let start_reg = self.alloc_contiguous((pairs.len() * 2) as u8)?;

        for (i, (key, value)) in pairs.iter().enumerate() {
            let key_reg = start_reg + (i * 2) as u8;
            let text = match key {
                MapKey::Ident(name) => name.clone(),
                MapKey::StringLit(raw) => unescape(raw),
            };
            let idx = self.current().add_constant(Value::str(&text))?;
            self.emit_abx(OpCode::LoadConst, key_reg, idx);
            self.compile_expr_into(value, key_reg + 1)?;
        }

        // C is the number of pairs
        self.emit_abc(OpCode::BuildMap, target_reg, start_reg, pairs.len() as u8);

        for _ in 0..pairs.len() * 2 {
            let top = self.current_ref().reg_top - 1;
            self.free_reg(top);
        }
        Ok(target_reg)
    }

    fn compile_dot_key(&mut self, name: &str) -> Result<u8, CompileError> {
        self.load_constant(Value::str(name))
    }

    fn load_constant(&mut self, val: Value) -> Result<u8, CompileError> {
        let idx = self.current().add_constant(val)?;
        let reg = self.alloc_reg()?;
        self.emit_abx(OpCode::LoadConst, reg, idx);
        Ok(reg)
    }

    /// Constant-pool index of a global's name.
    fn name_constant(&mut self, name: &str) -> Result<u16, CompileError> {
        self.current().add_constant(Value::str(name))
    }
}
