use crate::cli::RunArgs;
use crate::config::load_spec;
use crate::error::{CliError, Result};
use crate::ui::ProgressUi;
use ensemble::workflows::simulate;
use tracing::info;

pub fn run(args: RunArgs) -> Result<()> {
    if args.steps == Some(0) {
        return Err(CliError::Argument(
            "--steps must be at least 1".to_string(),
        ));
    }
    let mut spec = load_spec(&args.config)?;
    if let Some(steps) = args.steps {
        spec.steps = steps;
    }
    if let Some(seed) = args.seed {
        spec.seed = Some(seed);
    }
    info!(
        config = %args.config.display(),
        steps = spec.steps,
        "starting simulation"
    );

    let ui = ProgressUi::new(!args.no_progress);
    let report = simulate::run(&spec, &ui.reporter())?;

    println!("Steps completed:   {}", report.steps_completed);
    println!("Potential energy:  {:.6}", report.potential_energy);
    println!("Kinetic energy:    {:.6}", report.kinetic_energy);
    println!("Neighbor rebuilds: {}", report.neighbor_rebuilds);
    if let Some(acceptance) = report.acceptance_ratio {
        println!("Acceptance ratio:  {:.3}", acceptance);
    }
    Ok(())
}
