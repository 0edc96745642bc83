use super::Integrator;
use crate::engine::dispatch::{self, OverlapCheck};
use crate::engine::error::EngineError;
use crate::engine::simulation::Simulation;
use rand::rngs::StdRng;
use rand::seq::IteratorRandom;
use rand::{Rng, SeedableRng};
use tracing::debug;

/// Metropolis Monte Carlo with single-atom displacement trials.
///
/// Each step picks a uniformly random atom, proposes a uniform displacement
/// within a cube of half-edge `max_displacement`, and accepts with the
/// Metropolis probability `min(1, exp(-dE / T))` in reduced units (the
/// Boltzmann constant is one). Rejected trials restore the old position.
/// Trial energies are evaluated over the atom's up- and down-neighbor rows,
/// so `max_displacement` should stay below half the listing safety margin or
/// rebuilds will dominate.
pub struct MetropolisMonteCarlo {
    temperature: f64,
    max_displacement: f64,
    hard_core_diameter: f64,
    ignore_overlap: bool,
    rng: StdRng,
    steps: u64,
    attempted: u64,
    accepted: u64,
}

impl MetropolisMonteCarlo {
    pub fn new(temperature: f64, max_displacement: f64, seed: u64) -> Self {
        Self {
            temperature,
            max_displacement,
            hard_core_diameter: 0.0,
            ignore_overlap: false,
            rng: StdRng::seed_from_u64(seed),
            steps: 0,
            attempted: 0,
            accepted: 0,
        }
    }

    /// Rejects starting configurations with any pair closer than `diameter`
    /// at reset time. Zero disables the check.
    pub fn with_hard_core(mut self, diameter: f64) -> Self {
        self.hard_core_diameter = diameter;
        self
    }

    /// Downgrades the reset-time overlap rejection to a no-op; useful for
    /// deliberately overlapped starting lattices that early moves relax.
    pub fn with_ignored_overlap(mut self, ignore: bool) -> Self {
        self.ignore_overlap = ignore;
        self
    }

    pub fn temperature(&self) -> f64 {
        self.temperature
    }

    pub fn attempted(&self) -> u64 {
        self.attempted
    }

    pub fn accepted(&self) -> u64 {
        self.accepted
    }

    /// Fraction of trials accepted since the last reset; 0 before any trial.
    pub fn acceptance_ratio(&self) -> f64 {
        if self.attempted == 0 {
            0.0
        } else {
            self.accepted as f64 / self.attempted as f64
        }
    }
}

/// The Metropolis criterion in reduced units: downhill always accepted,
/// uphill with probability exp(-delta / temperature).
fn metropolis_accept(delta: f64, temperature: f64, rng: &mut StdRng) -> bool {
    delta <= 0.0 || rng.gen_range(0.0..1.0) < (-delta / temperature).exp()
}

impl Integrator for MetropolisMonteCarlo {
    fn reset(&mut self, simulation: &mut Simulation) -> Result<(), EngineError> {
        self.steps = 0;
        self.attempted = 0;
        self.accepted = 0;
        simulation.build_neighbor_lists()?;

        if self.hard_core_diameter > 0.0 && !self.ignore_overlap {
            let mut check = OverlapCheck::new(self.hard_core_diameter);
            let grid = simulation
                .neighbors()
                .grid()
                .ok_or(EngineError::CellGridMissing)?;
            dispatch::walk_cells(simulation.system(), simulation.registry(), grid, &mut check);
            if let Some((a, b, distance)) = check.violation() {
                return Err(EngineError::ConfigurationOverlap {
                    a,
                    b,
                    distance,
                    hard_core: self.hard_core_diameter,
                });
            }
        }
        Ok(())
    }

    fn step(&mut self, simulation: &mut Simulation) -> Result<(), EngineError> {
        let Some(target) = simulation
            .system()
            .atoms_iter()
            .map(|(id, _)| id)
            .choose(&mut self.rng)
        else {
            self.steps += 1;
            return Ok(());
        };

        let old_energy = simulation.energy_of(target)?;
        let old_position = simulation
            .system()
            .atom(target)
            .map(|atom| atom.position)
            .ok_or_else(|| EngineError::Internal("trial atom vanished mid-step".into()))?;

        let d = self.max_displacement;
        let trial = old_position
            + nalgebra::Vector3::new(
                self.rng.gen_range(-d..=d),
                self.rng.gen_range(-d..=d),
                self.rng.gen_range(-d..=d),
            );
        if let Some(atom) = simulation.system_mut().atom_mut(target) {
            atom.position = trial;
        }
        let new_energy = simulation.energy_of(target)?;

        self.attempted += 1;
        let delta = new_energy - old_energy;
        if metropolis_accept(delta, self.temperature, &mut self.rng) {
            self.accepted += 1;
        } else if let Some(atom) = simulation.system_mut().atom_mut(target) {
            atom.position = old_position;
        }

        self.steps += 1;
        let (system, registry, neighbors) = simulation.parts_mut();
        neighbors.step_complete(system, registry)?;
        if self.steps % 1000 == 0 {
            debug!(
                steps = self.steps,
                acceptance = self.acceptance_ratio(),
                "trial-move progress"
            );
        }
        Ok(())
    }

    fn step_count(&self) -> u64 {
        self.steps
    }
}
