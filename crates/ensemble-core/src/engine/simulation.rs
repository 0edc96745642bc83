use crate::core::models::ids::AtomId;
use crate::core::models::system::SimulationBox;
use crate::engine::config::NeighborConfig;
use crate::engine::dispatch::{
    self, Direction, EnergySum, ForceSum, IterationScope,
};
use crate::engine::error::EngineError;
use crate::engine::neighbor::manager::NeighborManager;
use crate::engine::registry::PotentialRegistry;
use nalgebra::Vector3;
use slotmap::SecondaryMap;

/// A runnable simulation: the box, its interaction table, and the neighbor
/// machinery, moved as one unit between the controller and its worker.
pub struct Simulation {
    system: SimulationBox,
    registry: PotentialRegistry,
    neighbors: NeighborManager,
}

impl Simulation {
    pub fn new(
        system: SimulationBox,
        registry: PotentialRegistry,
        neighbor_config: NeighborConfig,
    ) -> Self {
        Self {
            system,
            registry,
            neighbors: NeighborManager::new(neighbor_config),
        }
    }

    pub fn system(&self) -> &SimulationBox {
        &self.system
    }

    pub fn system_mut(&mut self) -> &mut SimulationBox {
        &mut self.system
    }

    pub fn registry(&self) -> &PotentialRegistry {
        &self.registry
    }

    pub fn neighbors(&self) -> &NeighborManager {
        &self.neighbors
    }

    /// Split borrow for integrator step loops that mutate the box while
    /// driving the neighbor machinery.
    pub fn parts_mut(
        &mut self,
    ) -> (&mut SimulationBox, &mut PotentialRegistry, &mut NeighborManager) {
        (&mut self.system, &mut self.registry, &mut self.neighbors)
    }

    /// Builds the neighbor lists from the current positions. Integrators call
    /// this from their reset before taking the first step.
    pub fn build_neighbor_lists(&mut self) -> Result<(), EngineError> {
        self.neighbors.rebuild(&mut self.system, &mut self.registry)
    }

    /// Total potential energy, summed over the neighbor lists.
    pub fn total_energy(&self) -> Result<f64, EngineError> {
        let mut sum = EnergySum::default();
        dispatch::walk_neighbor_lists(
            &self.system,
            &self.registry,
            self.neighbors.store(),
            IterationScope::All,
            &mut sum,
        )?;
        Ok(sum.total)
    }

    /// Interaction energy between one atom and all of its listed neighbors.
    pub fn energy_of(&self, atom: AtomId) -> Result<f64, EngineError> {
        let mut sum = EnergySum::default();
        dispatch::walk_neighbor_lists(
            &self.system,
            &self.registry,
            self.neighbors.store(),
            IterationScope::Atom(atom, Direction::Both),
            &mut sum,
        )?;
        Ok(sum.total)
    }

    /// Forces on every atom, summed over the neighbor lists.
    pub fn forces(&self) -> Result<SecondaryMap<AtomId, Vector3<f64>>, EngineError> {
        let mut sum = ForceSum::new();
        dispatch::walk_neighbor_lists(
            &self.system,
            &self.registry,
            self.neighbors.store(),
            IterationScope::All,
            &mut sum,
        )?;
        Ok(sum.into_forces())
    }
}
