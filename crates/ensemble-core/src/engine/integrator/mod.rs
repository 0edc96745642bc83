pub mod monte_carlo;
pub mod velocity_verlet;

use crate::core::models::system::SimulationBox;
use crate::engine::error::EngineError;
use crate::engine::simulation::Simulation;

/// A stepping scheme that advances a [`Simulation`].
///
/// Implementations own their per-run state (RNG, cached forces, counters) and
/// are driven from a single worker thread; `Send` lets the controller move
/// them there.
pub trait Integrator: Send {
    /// Prepares for a fresh run against the current configuration: builds the
    /// neighbor lists, validates the starting state, and clears counters.
    fn reset(&mut self, simulation: &mut Simulation) -> Result<(), EngineError>;

    /// Advances the simulation by one step.
    fn step(&mut self, simulation: &mut Simulation) -> Result<(), EngineError>;

    /// Number of steps taken since the last reset.
    fn step_count(&self) -> u64;
}

/// Total kinetic energy, `sum(m v^2 / 2)`, in reduced units.
pub fn kinetic_energy(system: &SimulationBox) -> f64 {
    system
        .atoms_iter()
        .map(|(_, atom)| 0.5 * atom.mass * atom.velocity.norm_squared())
        .sum()
}

/// Instantaneous kinetic temperature from equipartition, `2 KE / (3 N)` with
/// the Boltzmann constant fixed at one. Zero for an empty box.
pub fn kinetic_temperature(system: &SimulationBox) -> f64 {
    if system.is_empty() {
        return 0.0;
    }
    2.0 * kinetic_energy(system) / (3.0 * system.len() as f64)
}
