use std::fmt;
use std::path::PathBuf;

use compiler::CompileError;
use thiserror::Error;
use vm::{RuntimeError, VM};

/// Function name and source line of a failing guest instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    pub function: String,
    pub line: u32,
}

impl Location {
    /// Where `vm` last failed, if it recorded anything.
    pub fn of(vm: &VM) -> Option<Self> {
        vm.last_error_location
            .as_ref()
            .map(|(function, line)| Self {
                function: function.clone(),
                line: *line,
            })
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "in `{}` at line {}", self.function, self.line)
    }
}

fn at(location: &Option<Location>) -> String {
    location
        .as_ref()
        .map(|l| format!(" {l}"))
        .unwrap_or_default()
}

/// Something the cartridge did wrong. Never crosses the loader or
/// scheduler boundary; these are logged and counted.
#[derive(Debug, Error)]
pub enum GuestError {
    #[error("cartridge rejected: {0}")]
    Syntax(#[from] CompileError),

    #[error("error while loading{}: {source}", at(.location))]
    LoadRuntime {
        location: Option<Location>,
        source: RuntimeError,
    },

    #[error("error in `{entry}` on tick {tick}{}: {source}", at(.location))]
    FrameRuntime {
        entry: &'static str,
        tick: u64,
        location: Option<Location>,
        source: RuntimeError,
    },
}

/// Failures of the host itself. Fatal.
#[derive(Debug, Error)]
pub enum HostError {
    #[error("{}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid config {}: {source}", .path.display())]
    Config {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("display error: {0}")]
    Display(String),
}
