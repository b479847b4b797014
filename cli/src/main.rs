use anyhow::Result;
use clap::Parser;

use cli::args::{Cli, Commands};
use cli::commands::{check, disassemble, run};
use cli::logging;

fn main() -> Result<()> {
    let cli = Cli::parse();

    match &cli.command {
        Commands::Run {
            path,
            config,
            max_ticks,
            fps,
            budget,
            screenshot,
        } => {
            let overrides = run::Overrides {
                max_ticks: *max_ticks,
                fps: *fps,
                budget: *budget,
                screenshot: screenshot.clone(),
            };
            let config = run::resolve_config(config.as_deref(), &overrides)?;
            logging::init(config.log_filter.as_deref());
            let summary = run::run_file(path, config)?;
            println!(
                "{} ticks, {} guest error{}",
                summary.ticks,
                summary.guest_errors,
                if summary.guest_errors == 1 { "" } else { "s" }
            );
            Ok(())
        }
        Commands::Check { path } => {
            logging::init(None);
            let report = check::check_file(path)?;
            println!("{report}");
            Ok(())
        }
        Commands::Disassemble { path } => {
            logging::init(None);
            print!("{}", disassemble::disassemble_file(path)?);
            Ok(())
        }
    }
}
