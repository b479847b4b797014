use std::path::Path;

use anyhow::{Context, Result};
use console::load_cartridge;
use vm::disasm::disassemble;

use super::console_loader;

pub fn disassemble_file(path: &Path) -> Result<String> {
    let cart = load_cartridge(path)?;
    let unit = console_loader()
        .compile(&cart.source)
        .context("Compile error")?;
    Ok(format!(
        "== Disassembly of {} ==\n{}",
        cart.path.display(),
        disassemble(&unit.main)
    ))
}
