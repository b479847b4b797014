use std::path::Path;

use anyhow::{Context, Result};
use cart_parser::ast::Stmt;
use cart_parser::parse_program;
use console::load_cartridge;

use super::console_loader;

/// Compile a cartridge and describe what it defines.
pub fn check_file(path: &Path) -> Result<String> {
    let cart = load_cartridge(path)?;
    console_loader()
        .compile(&cart.source)
        .with_context(|| format!("{} failed the sandbox check", cart.path.display()))?;

    // Entry points are looked up by binding, so `let update = fn () {}` counts.
    let program = parse_program(&cart.source)?;
    let names: Vec<&str> = program
        .stmts
        .iter()
        .filter_map(|stmt| match stmt {
            Stmt::FnDecl { name, .. } | Stmt::LetDecl { name, .. } | Stmt::MutDecl { name, .. } => {
                Some(name.as_str())
            }
            _ => None,
        })
        .collect();
    let has = |entry: &str| names.contains(&entry);
    Ok(format!(
        "{}: ok ({} top-level binding{}; setup: {}, update: {})",
        cart.path.display(),
        names.len(),
        if names.len() == 1 { "" } else { "s" },
        if has("setup") { "yes" } else { "no" },
        if has("update") { "yes" } else { "no" },
    ))
}
