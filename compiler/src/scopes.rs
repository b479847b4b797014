use vm::UpvalueSource;

use crate::codegen::Compiler;
use crate::error::CompileError;
use crate::types::Local;

pub trait ScopeCompiler {
    fn begin_scope(&mut self);
    fn end_scope(&mut self);
    fn declare_local(&mut self, name: &str, reg: u8, mutable: bool);
    fn resolve_local(&self, name: &str) -> Option<&Local>;
    fn resolve_upvalue(&mut self, compiler_idx: usize, name: &str)
        -> Result<Option<u8>, CompileError>;
}

impl ScopeCompiler for Compiler {
    fn begin_scope(&mut self) {
        self.current().scope_depth += 1;
    }

    fn end_scope(&mut self) {
        let func = self.current();
        func.scope_depth -= 1;
        let depth = func.scope_depth;

        // Locals are ordered by creation, so the ones leaving scope sit at
        // the end and own the topmost registers.
        while func.locals.last().is_some_and(|l| l.depth > depth) {
            if let Some(local) = func.locals.pop() {
                func.free_reg(local.reg);
            }
        }
    }

    fn declare_local(&mut self, name: &str, reg: u8, mutable: bool) {
        let func = self.current();
        let depth = func.scope_depth;
        func.locals.push(Local {
            name: name.to_string(),
            depth,
            reg,
            mutable,
        });
    }

    fn resolve_local(&self, name: &str) -> Option<&Local> {
        let func = self.current_ref();
        func.resolve_local(name).map(|i| &func.locals[i])
    }

    /// Find `name` in an enclosing function and thread it down to
    /// `compiler_idx` as a by-value capture.
    fn resolve_upvalue(
        &mut self,
        compiler_idx: usize,
        name: &str,
    ) -> Result<Option<u8>, CompileError> {
        if compiler_idx == 0 {
            return Ok(None);
        }
        let parent_idx = compiler_idx - 1;

        if let Some(i) = self.compilers[parent_idx].resolve_local(name) {
            let reg = self.compilers[parent_idx].locals[i].reg;
            let idx = self.compilers[compiler_idx].add_upvalue(UpvalueSource::Local(reg), name)?;
            return Ok(Some(idx));
        }

        if let Some(up) = self.resolve_upvalue(parent_idx, name)? {
            let idx = self.compilers[compiler_idx].add_upvalue(UpvalueSource::Upvalue(up), name)?;
            return Ok(Some(idx));
        }

        Ok(None)
    }
}
