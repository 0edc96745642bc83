//! Runs a complete simulation described by a [`SimulationSpec`].

use super::setup::{build_simulation, integrator_seed, rng_from_spec, seed_velocities};
use super::WorkflowError;
use crate::engine::config::{IntegratorSpec, SimulationSpec};
use crate::engine::controller::{Controller, RunOutcome};
use crate::engine::integrator::monte_carlo::MetropolisMonteCarlo;
use crate::engine::integrator::velocity_verlet::VelocityVerlet;
use crate::engine::integrator::{kinetic_energy, Integrator};
use crate::engine::progress::{Progress, ProgressReporter};
use std::thread;
use std::time::Duration;
use tracing::info;

/// The observable outcome of a finished run.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationReport {
    pub steps_completed: u64,
    pub potential_energy: f64,
    pub kinetic_energy: f64,
    pub neighbor_rebuilds: u64,
    /// Trial acceptance fraction; `None` for deterministic integrators.
    pub acceptance_ratio: Option<f64>,
}

/// Builds the system, runs the configured integrator for `spec.steps` steps
/// on a worker thread, and summarizes the final state.
pub fn run(
    spec: &SimulationSpec,
    reporter: &ProgressReporter,
) -> Result<SimulationReport, WorkflowError> {
    reporter.report(Progress::PhaseStart { name: "Setup" });
    let mut rng = rng_from_spec(spec);
    let mut simulation = build_simulation(spec)?;
    if let IntegratorSpec::MolecularDynamics {
        initial_temperature,
        ..
    } = spec.integrator
    {
        seed_velocities(simulation.system_mut(), initial_temperature, &mut rng);
    }
    reporter.report(Progress::PhaseFinish);

    reporter.report(Progress::PhaseStart { name: "Run" });
    reporter.report(Progress::TaskStart {
        total_steps: spec.steps,
    });
    let report = match spec.integrator {
        IntegratorSpec::MonteCarlo {
            temperature,
            max_displacement,
            hard_core_diameter,
            ignore_overlap,
        } => {
            let integrator =
                MetropolisMonteCarlo::new(temperature, max_displacement, integrator_seed(&mut rng))
                    .with_hard_core(hard_core_diameter)
                    .with_ignored_overlap(ignore_overlap);
            let outcome = drive(simulation, integrator, spec.steps, reporter)?;
            let acceptance = outcome.integrator.acceptance_ratio();
            summarize(outcome, Some(acceptance))?
        }
        IntegratorSpec::MolecularDynamics { time_step, .. } => {
            let outcome = drive(simulation, VelocityVerlet::new(time_step), spec.steps, reporter)?;
            summarize(outcome, None)?
        }
    };
    reporter.report(Progress::TaskFinish);
    reporter.report(Progress::PhaseFinish);

    info!(
        steps = report.steps_completed,
        potential_energy = report.potential_energy,
        rebuilds = report.neighbor_rebuilds,
        "run complete"
    );
    Ok(report)
}

fn drive<I: Integrator + 'static>(
    simulation: crate::engine::simulation::Simulation,
    integrator: I,
    steps: u64,
    reporter: &ProgressReporter,
) -> Result<RunOutcome<I>, WorkflowError> {
    let controller = Controller::spawn(simulation, integrator, Some(steps));
    let mut reported = 0;
    while !controller.is_finished() {
        let completed = controller.completed_steps();
        if completed != reported {
            reporter.report(Progress::TaskProgress {
                completed_steps: completed,
            });
            reported = completed;
        }
        thread::sleep(Duration::from_millis(10));
    }
    let outcome = controller.halt().map_err(WorkflowError::Engine)?;
    reporter.report(Progress::TaskProgress {
        completed_steps: outcome.integrator.step_count(),
    });
    Ok(outcome)
}

fn summarize<I: Integrator>(
    outcome: RunOutcome<I>,
    acceptance_ratio: Option<f64>,
) -> Result<SimulationReport, WorkflowError> {
    outcome.result?;
    Ok(SimulationReport {
        steps_completed: outcome.integrator.step_count(),
        potential_energy: outcome.simulation.total_energy()?,
        kinetic_energy: kinetic_energy(outcome.simulation.system()),
        neighbor_rebuilds: outcome.simulation.neighbors().rebuild_count(),
        acceptance_ratio,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::config::{
        NeighborConfig, PotentialForm, PotentialSpec, RegionSpec, SpeciesSpec,
    };
    use std::sync::Mutex;

    fn lj_spec(integrator: IntegratorSpec, steps: u64) -> SimulationSpec {
        SimulationSpec {
            region: RegionSpec {
                lengths: [8.0, 8.0, 8.0],
                periodic: [true; 3],
            },
            species: vec![SpeciesSpec {
                count: 27,
                mass: 1.0,
            }],
            potentials: vec![PotentialSpec {
                species: (0, 0),
                form: PotentialForm::LennardJones {
                    epsilon: 1.0,
                    sigma: 1.0,
                    cutoff: 2.5,
                },
            }],
            neighbor: NeighborConfig::default(),
            integrator,
            steps,
            seed: Some(1234),
        }
    }

    #[test]
    fn monte_carlo_run_completes_and_reports_acceptance() {
        let spec = lj_spec(
            IntegratorSpec::MonteCarlo {
                temperature: 1.5,
                max_displacement: 0.15,
                hard_core_diameter: 0.5,
                ignore_overlap: false,
            },
            300,
        );
        let report = run(&spec, &ProgressReporter::new()).unwrap();
        assert_eq!(report.steps_completed, 300);
        let acceptance = report.acceptance_ratio.unwrap();
        assert!(acceptance > 0.0 && acceptance <= 1.0);
        assert!(report.neighbor_rebuilds >= 1);
    }

    #[test]
    fn molecular_dynamics_run_reports_kinetic_energy() {
        let spec = lj_spec(
            IntegratorSpec::MolecularDynamics {
                time_step: 0.002,
                initial_temperature: 1.0,
            },
            200,
        );
        let report = run(&spec, &ProgressReporter::new()).unwrap();
        assert_eq!(report.steps_completed, 200);
        assert!(report.kinetic_energy > 0.0);
        assert_eq!(report.acceptance_ratio, None);
    }

    #[test]
    fn seeded_runs_are_reproducible() {
        let spec = lj_spec(
            IntegratorSpec::MonteCarlo {
                temperature: 1.5,
                max_displacement: 0.15,
                hard_core_diameter: 0.0,
                ignore_overlap: false,
            },
            150,
        );
        let first = run(&spec, &ProgressReporter::new()).unwrap();
        let second = run(&spec, &ProgressReporter::new()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn progress_events_bracket_the_run() {
        let events = Mutex::new(Vec::new());
        let reporter = ProgressReporter::with_callback(Box::new(|event| {
            events.lock().unwrap().push(format!("{event:?}"));
        }));
        let spec = lj_spec(
            IntegratorSpec::MolecularDynamics {
                time_step: 0.002,
                initial_temperature: 0.5,
            },
            50,
        );
        run(&spec, &reporter).unwrap();

        drop(reporter);
        let events = events.into_inner().unwrap();
        assert!(events.iter().any(|e| e.contains("TaskStart")));
        assert!(events.iter().any(|e| e.contains("TaskFinish")));
        assert!(events.last().unwrap().contains("PhaseFinish"));
    }

    #[test]
    fn invalid_spec_fails_before_spawning_anything() {
        let mut spec = lj_spec(
            IntegratorSpec::MonteCarlo {
                temperature: 1.0,
                max_displacement: 0.1,
                hard_core_diameter: 0.0,
                ignore_overlap: false,
            },
            10,
        );
        spec.species[0].count = 0;
        assert!(matches!(
            run(&spec, &ProgressReporter::new()),
            Err(WorkflowError::Config(_))
        ));
    }
}
