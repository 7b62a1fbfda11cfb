// Standard library
use std::process::ExitCode;

// External crates
use clap::Parser;
use colored::Colorize;
use tracing::debug;

// Internal imports
use hark_core::{check_environment, user_paths, HarkConfig};
use hark_logging::{init_subscriber, LogSettings};
use hark_orchestrator::{HarkContext, LocalClient};

// Local modules
mod cli;
mod commands;
mod output;

use cli::Args;
use commands::execute_command;

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    match run(args).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{} {:#}", "Error:".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> anyhow::Result<ExitCode> {
    check_environment()?;
    let home = user_paths::hark_home(args.hark_home.as_deref())?;
    let config = HarkConfig::load(&home)?;

    // Logging comes up before the context so store setup is recorded.
    let level = args.log_level.clone().unwrap_or(config.log_level);
    let log_file = user_paths::log_file(&home);
    let _log_guard = init_subscriber(&LogSettings::new(&level).with_file(&log_file));
    debug!("Using hark home {}", home.display());

    let context = HarkContext::open(&home).await?;

    let client = LocalClient::new(context);
    execute_command(&client, args.command).await
}
