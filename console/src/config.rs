//! `console.toml`: runtime knobs. Every field is optional.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::constants::FPS;
use crate::error::HostError;

pub const DEFAULT_THREAD_JOIN_TIMEOUT_MS: u64 = 2_000;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConsoleConfig {
    /// Ticks per second; 0 runs unthrottled.
    pub fps: u32,
    /// Stop after this many ticks.
    pub max_ticks: Option<u64>,
    /// Instructions allowed per guest call; unlimited when unset.
    pub instruction_budget: Option<u64>,
    pub thread_join_timeout_ms: u64,
    pub log_filter: Option<String>,
    /// Write the last presented frame here on shutdown.
    pub screenshot: Option<PathBuf>,
    pub random_seed: Option<u64>,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            fps: FPS,
            max_ticks: None,
            instruction_budget: None,
            thread_join_timeout_ms: DEFAULT_THREAD_JOIN_TIMEOUT_MS,
            log_filter: None,
            screenshot: None,
            random_seed: None,
        }
    }
}

impl ConsoleConfig {
    pub fn load(path: &Path) -> Result<Self, HostError> {
        let text = fs::read_to_string(path).map_err(|source| HostError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&text).map_err(|source| HostError::Config {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_toml(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        let cfg = ConsoleConfig::from_toml("").unwrap();
        assert_eq!(cfg, ConsoleConfig::default());
        assert_eq!(cfg.fps, 30);
        assert_eq!(cfg.thread_join_timeout_ms, 2_000);
    }

    #[test]
    fn partial_file_overrides_named_fields() {
        let cfg = ConsoleConfig::from_toml(
            "fps = 0\nmax_ticks = 10\ninstruction_budget = 5000\nscreenshot = \"out.ppm\"",
        )
        .unwrap();
        assert_eq!(cfg.fps, 0);
        assert_eq!(cfg.max_ticks, Some(10));
        assert_eq!(cfg.instruction_budget, Some(5000));
        assert_eq!(cfg.screenshot, Some(PathBuf::from("out.ppm")));
        assert_eq!(cfg.log_filter, None);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(ConsoleConfig::from_toml("fsp = 1").is_err());
    }

    #[test]
    fn load_reports_the_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("console.toml");
        std::fs::write(&path, "fps = \"fast\"").unwrap();
        let err = ConsoleConfig::load(&path).unwrap_err();
        assert!(matches!(err, HostError::Config { .. }));
        assert!(err.to_string().contains("console.toml"));

        let missing = ConsoleConfig::load(&dir.path().join("nope.toml")).unwrap_err();
        assert!(matches!(missing, HostError::Io { .. }));
    }
}
