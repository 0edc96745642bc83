use super::Integrator;
use crate::core::models::ids::AtomId;
use crate::engine::error::EngineError;
use crate::engine::simulation::Simulation;
use nalgebra::Vector3;
use slotmap::SecondaryMap;

/// Velocity-Verlet molecular dynamics.
///
/// Each step does a half velocity kick from the cached forces, a full
/// position drift, then recomputes forces at the new positions and finishes
/// with the second half kick. Neighbor-list bookkeeping runs between the
/// drift and the force evaluation so the new forces always see lists that are
/// valid for the drifted positions.
pub struct VelocityVerlet {
    time_step: f64,
    forces: SecondaryMap<AtomId, Vector3<f64>>,
    steps: u64,
}

impl VelocityVerlet {
    pub fn new(time_step: f64) -> Self {
        Self {
            time_step,
            forces: SecondaryMap::new(),
            steps: 0,
        }
    }

    pub fn time_step(&self) -> f64 {
        self.time_step
    }

    /// Elapsed simulated time since the last reset.
    pub fn elapsed_time(&self) -> f64 {
        self.steps as f64 * self.time_step
    }

    fn half_kick(&self, simulation: &mut Simulation) {
        let half_dt = 0.5 * self.time_step;
        for (id, atom) in simulation.system_mut().atoms_iter_mut() {
            if let Some(force) = self.forces.get(id) {
                atom.velocity += force * (half_dt / atom.mass);
            }
        }
    }
}

impl Integrator for VelocityVerlet {
    fn reset(&mut self, simulation: &mut Simulation) -> Result<(), EngineError> {
        self.steps = 0;
        simulation.build_neighbor_lists()?;
        self.forces = simulation.forces()?;
        Ok(())
    }

    fn step(&mut self, simulation: &mut Simulation) -> Result<(), EngineError> {
        self.half_kick(simulation);

        let dt = self.time_step;
        for (_, atom) in simulation.system_mut().atoms_iter_mut() {
            atom.position += atom.velocity * dt;
        }

        self.steps += 1;
        let (system, registry, neighbors) = simulation.parts_mut();
        neighbors.step_complete(system, registry)?;

        self.forces = simulation.forces()?;
        self.half_kick(simulation);
        Ok(())
    }

    fn step_count(&self) -> u64 {
        self.steps
    }
}
