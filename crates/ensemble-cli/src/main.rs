mod cli;
mod commands;
mod config;
mod error;
mod logging;
mod ui;

use crate::cli::{Cli, Commands};
use crate::error::Result;
use clap::Parser;
use tracing::{debug, error, info};

fn main() {
    if let Err(e) = run_app() {
        eprintln!("\nError: {e}");
        std::process::exit(1);
    }
}

fn run_app() -> Result<()> {
    let cli = Cli::parse();
    logging::setup_logging(cli.verbose, cli.quiet, cli.log_file.clone())?;

    info!("ensemble v{} starting up", env!("CARGO_PKG_VERSION"));
    debug!("parsed arguments: {:?}", &cli);

    let result = match cli.command {
        Commands::Run(args) => commands::run::run(args),
        Commands::Check(args) => commands::check::run(args),
    };
    match &result {
        Ok(_) => info!("command completed successfully"),
        Err(e) => error!("command failed: {e}"),
    }
    result
}
