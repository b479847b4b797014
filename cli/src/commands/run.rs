use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use console::{ConsoleConfig, HeadlessDisplay, IdleInput, RunSummary, Scheduler};
use tracing::info;

/// Command-line values that take precedence over the config file.
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub max_ticks: Option<u64>,
    pub fps: Option<u32>,
    pub budget: Option<u64>,
    pub screenshot: Option<PathBuf>,
}

pub fn resolve_config(path: Option<&Path>, overrides: &Overrides) -> Result<ConsoleConfig> {
    let mut config = match path {
        Some(path) => ConsoleConfig::load(path)?,
        None => ConsoleConfig::default(),
    };
    if let Some(max_ticks) = overrides.max_ticks {
        config.max_ticks = Some(max_ticks);
    }
    if let Some(fps) = overrides.fps {
        config.fps = fps;
    }
    if let Some(budget) = overrides.budget {
        config.instruction_budget = Some(budget);
    }
    if let Some(screenshot) = &overrides.screenshot {
        config.screenshot = Some(screenshot.clone());
    }
    Ok(config)
}

pub fn run_file(path: &Path, config: ConsoleConfig) -> Result<RunSummary> {
    let screenshot = config.screenshot.clone();
    let mut scheduler = Scheduler::new(config, HeadlessDisplay::new(), IdleInput);
    scheduler
        .load_path(path)
        .context("Failed to read cartridge")?;
    let summary = scheduler.run().context("Display failure")?;

    if let Some(shot) = screenshot {
        scheduler
            .display()
            .write_ppm(&shot)
            .context("Failed to write screenshot")?;
        info!(path = %shot.display(), "screenshot written");
    }
    Ok(summary)
}
