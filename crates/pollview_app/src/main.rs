mod cli;
mod config;
mod platform;

use clap::Parser;
use pollview_logging::pv_warn;

use crate::cli::{Cli, Command};
use crate::config::AppConfig;
use crate::platform::logging::LogDestination;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let (config, warnings) = AppConfig::resolve(&cli.global, |key| std::env::var(key).ok())?;

    // The live view redraws stdout; keep its log lines off the terminal.
    let destination = match cli.command {
        Command::Live { .. } => LogDestination::File,
        _ => LogDestination::Both,
    };
    platform::logging::initialize(destination, config.log_level, &config.state_dir);
    for warning in warnings {
        pv_warn!("{}", warning);
    }

    platform::run(cli.command, &config)
}
