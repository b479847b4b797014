pub mod check;
pub mod disassemble;
pub mod run;

use std::sync::Arc;

use console::{capabilities, ConsoleContext, SandboxLoader};

/// A loader configured exactly like the one `run` uses.
pub(crate) fn console_loader() -> SandboxLoader {
    let ctx = Arc::new(ConsoleContext::new());
    SandboxLoader::new(&capabilities::build(&ctx))
}
