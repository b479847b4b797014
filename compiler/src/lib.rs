//! Turns cart script source into bytecode for the `vm` crate.
//!
//! [`compile`] parses the source, runs the [`restrict`] pass against a
//! [`GrammarPolicy`] and only then generates code, so a unit that comes
//! back is known to stay inside the sandbox grammar.

use std::sync::Arc;

use vm::FunctionProto;

pub mod codegen;
pub mod control_flow;
pub mod error;
pub mod expressions;
pub mod function_compiler;
pub mod functions;
pub mod restrict;
pub mod scopes;
pub mod statements;
pub mod types;

pub use codegen::Compiler;
pub use error::{CompileError, CompileErrorKind};
pub use restrict::GrammarPolicy;

/// A compiled cartridge: the top-level function plus everything nested in it.
#[derive(Debug, Clone)]
pub struct CompiledUnit {
    pub main: Arc<FunctionProto>,
}

pub fn compile(source: &str, policy: &GrammarPolicy) -> Result<CompiledUnit, CompileError> {
    let program = cart_parser::parse_program(source)?;
    restrict::validate(&program, policy)?;
    let main = Compiler::new().compile_program(&program)?;
    Ok(CompiledUnit {
        main: Arc::new(main),
    })
}
