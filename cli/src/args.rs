use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "cart")]
#[command(about = "CallumConsole cartridge runner", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Load a cartridge and run its frame loop
    Run {
        /// Path to the cartridge (`.cart` is appended when there is no extension)
        path: PathBuf,
        /// TOML config file
        #[arg(long)]
        config: Option<PathBuf>,
        /// Stop after this many ticks
        #[arg(long)]
        max_ticks: Option<u64>,
        /// Tick rate; 0 runs unthrottled
        #[arg(long)]
        fps: Option<u32>,
        /// Instructions allowed per guest call
        #[arg(long)]
        budget: Option<u64>,
        /// Write the last frame as a PPM image on exit
        #[arg(long)]
        screenshot: Option<PathBuf>,
    },
    /// Compile a cartridge under the sandbox rules without running it
    Check {
        /// Path to the cartridge
        path: PathBuf,
    },
    /// Print the bytecode of a cartridge
    Disassemble {
        /// Path to the cartridge
        path: PathBuf,
    },
}
