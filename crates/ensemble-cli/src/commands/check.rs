use crate::cli::CheckArgs;
use crate::config::load_spec;
use crate::error::{CliError, Result};

pub fn run(args: CheckArgs) -> Result<()> {
    let spec = load_spec(&args.config)?;
    spec.validate().map_err(|e| CliError::Config(e.to_string()))?;

    let atoms: usize = spec.species.iter().map(|s| s.count).sum();
    println!(
        "OK: {} atoms over {} species, {} potentials, {} steps",
        atoms,
        spec.species.len(),
        spec.potentials.len(),
        spec.steps
    );
    Ok(())
}
