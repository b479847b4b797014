//! Sandbox loader: restricted compilation, one-shot top-level execution and
//! entry-point lookup.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use compiler::{compile, CompiledUnit, GrammarPolicy};
use tracing::{debug, info, warn};
use vm::{CapabilityTable, Environment, Value, VM};

use crate::constants::{CARTRIDGE_EXTENSION, LEGACY_CARTRIDGE_EXTENSION};
use crate::error::{GuestError, HostError, Location};

/// Cartridge source as read from disk.
#[derive(Debug, Clone)]
pub struct Cartridge {
    pub path: PathBuf,
    pub source: String,
}

/// `game` becomes `game.cart`, or `game.callumcart` when only that file
/// exists. Paths that already carry an extension are left alone.
pub fn resolve_cartridge_path(path: &Path) -> PathBuf {
    if path.extension().is_some() {
        return path.to_path_buf();
    }
    let preferred = path.with_extension(CARTRIDGE_EXTENSION);
    let legacy = path.with_extension(LEGACY_CARTRIDGE_EXTENSION);
    if !preferred.exists() && legacy.exists() {
        legacy
    } else {
        preferred
    }
}

pub fn load_cartridge(path: &Path) -> Result<Cartridge, HostError> {
    let path = resolve_cartridge_path(path);
    let source = fs::read_to_string(&path).map_err(|source| HostError::Io {
        path: path.clone(),
        source,
    })?;
    debug!(path = %path.display(), bytes = source.len(), "cartridge read");
    Ok(Cartridge { path, source })
}

/// The two optional callbacks a cartridge may define.
#[derive(Clone, Default)]
pub struct EntryPoints {
    pub setup: Option<Value>,
    pub update: Option<Value>,
}

pub struct SandboxLoader {
    policy: GrammarPolicy,
}

impl SandboxLoader {
    pub fn new(table: &CapabilityTable) -> Self {
        Self {
            policy: GrammarPolicy::for_capabilities(table),
        }
    }

    pub fn policy(&self) -> &GrammarPolicy {
        &self.policy
    }

    pub fn compile(&self, source: &str) -> Result<CompiledUnit, GuestError> {
        let unit = compile(source, &self.policy)?;
        info!(
            functions = unit.main.functions.len(),
            "cartridge compiled"
        );
        Ok(unit)
    }

    /// Run the top level once. On error the namespace keeps whatever was
    /// bound before the failing statement.
    pub fn execute(&self, vm: &mut VM, unit: &CompiledUnit) -> Result<(), GuestError> {
        match vm.run_main(Arc::clone(&unit.main)) {
            Ok(_) => Ok(()),
            Err(source) => {
                let err = GuestError::LoadRuntime {
                    location: Location::of(vm),
                    source,
                };
                warn!(error = %err, "cartridge top level failed");
                Err(err)
            }
        }
    }

    pub fn entry_points(&self, env: &Environment) -> EntryPoints {
        let entries = EntryPoints {
            setup: env.guest_binding("setup"),
            update: env.guest_binding("update"),
        };
        debug!(
            setup = entries.setup.is_some(),
            update = entries.update.is_some(),
            "entry points resolved"
        );
        entries
    }
}
