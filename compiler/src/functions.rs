use cart_parser::ast::Block;
use vm::opcode::OpCode;

use crate::codegen::Compiler;
use crate::control_flow::ControlFlowCompiler;
use crate::error::CompileError;
use crate::function_compiler::FunctionCompiler;
use crate::scopes::ScopeCompiler;

/// Name given to anonymous functions.
pub const LAMBDA_NAME: &str = "lambda";

pub trait FunctionDefinitionCompiler {
    fn compile_function(
        &mut self,
        name: Option<&str>,
        params: &[String],
        body: &Block,
    ) -> Result<u8, CompileError>;
}

impl FunctionDefinitionCompiler for Compiler {
    /// Compile a function body into a new prototype and emit a `CLOSURE`
    /// that builds it in a fresh register.
    fn compile_function(
        &mut self,
        name: Option<&str>,
        params: &[String],
        body: &Block,
    ) -> Result<u8, CompileError> {
        let arity = u8::try_from(params.len()).map_err(|_| {
            let (line, col) = self.position();
            CompileError::limit("too many parameters", line, col)
        })?;
        for (i, param) in params.iter().enumerate() {
            if params[..i].contains(param) {
                return Err(self.syntax_error(format!("duplicate parameter `{param}`")));
            }
        }

        let (line, col) = self.position();
        let mut func = FunctionCompiler::new(
            name.unwrap_or(LAMBDA_NAME).to_string(),
            arity,
            name.map(str::to_string),
        );
        func.current_line = line;
        func.current_col = col;
        self.compilers.push(func);

        for (i, param) in params.iter().enumerate() {
            self.declare_local(param, i as u8, true);
        }

        let body_reg = self.alloc_reg()?;
        self.compile_block(body, body_reg)?;
        self.emit_abc(OpCode::Return, body_reg, 1, 0);

        let compiled = self
            .compilers
            .pop()
            .ok_or_else(|| self.syntax_error("compiler stack underflow"))?;
        let func_idx = self.current().add_function(compiled.into_proto())?;

        let target_reg = self.alloc_reg()?;
        self.emit_abx(OpCode::Closure, target_reg, func_idx);
        Ok(target_reg)
    }
}
