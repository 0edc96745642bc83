use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

const HELP_TEMPLATE: &str = "\
{before-help}{name} {version}
{author-with-newline}{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}
";

#[derive(Parser, Debug)]
#[command(
    version,
    about = "ensemble - a particle-simulation engine for molecular Monte Carlo and molecular dynamics.",
    help_template = HELP_TEMPLATE,
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity level (-v for INFO, -vv for DEBUG, -vvv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all log output except for errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Write logs to a specified file in addition to the console output
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the simulation described by a TOML configuration file.
    Run(RunArgs),
    /// Validate a configuration file without running anything.
    Check(CheckArgs),
}

/// Arguments for the `run` subcommand.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Path to the simulation description in TOML format.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub config: PathBuf,

    /// Override the number of steps from the config file.
    #[arg(short, long, value_name = "INT")]
    pub steps: Option<u64>,

    /// Override the random seed from the config file.
    #[arg(long, value_name = "INT")]
    pub seed: Option<u64>,

    /// Hide the progress bar even on a terminal.
    #[arg(long)]
    pub no_progress: bool,
}

/// Arguments for the `check` subcommand.
#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Path to the simulation description in TOML format.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub config: PathBuf,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_command_parses_overrides() {
        let cli = Cli::parse_from([
            "ensemble", "run", "--config", "fluid.toml", "--steps", "5000", "--seed", "9",
        ]);
        match cli.command {
            Commands::Run(args) => {
                assert_eq!(args.config, PathBuf::from("fluid.toml"));
                assert_eq!(args.steps, Some(5000));
                assert_eq!(args.seed, Some(9));
                assert!(!args.no_progress);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn verbosity_flags_accumulate() {
        let cli = Cli::parse_from(["ensemble", "-vv", "check", "--config", "fluid.toml"]);
        assert_eq!(cli.verbose, 2);
        assert!(!cli.quiet);
    }

    #[test]
    fn quiet_conflicts_with_verbose() {
        let parsed = Cli::try_parse_from(["ensemble", "-v", "-q", "run", "-c", "fluid.toml"]);
        assert!(parsed.is_err());
    }
}
