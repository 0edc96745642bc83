use crate::core::models::ids::SpeciesId;
use crate::core::potentials::PairPotential;
use crate::engine::neighbor::criterion::{DistanceCriterion, NeighborCriterion};
use std::sync::Arc;

/// One registered interaction: a potential, the unordered species pair it
/// applies to, and the neighbor criterion that gates its listing.
pub struct PotentialEntry {
    species: (SpeciesId, SpeciesId),
    potential: Arc<dyn PairPotential>,
    criterion: Box<dyn NeighborCriterion>,
}

impl PotentialEntry {
    pub fn species(&self) -> (SpeciesId, SpeciesId) {
        self.species
    }

    pub fn potential(&self) -> &dyn PairPotential {
        self.potential.as_ref()
    }

    pub fn criterion(&self) -> &dyn NeighborCriterion {
        self.criterion.as_ref()
    }

    pub(crate) fn criterion_mut(&mut self) -> &mut dyn NeighborCriterion {
        self.criterion.as_mut()
    }

    /// Whether this entry applies to an (unordered) species pair.
    pub fn applies_to(&self, a: SpeciesId, b: SpeciesId) -> bool {
        (a, b) == self.species || (b, a) == self.species
    }

    /// Whether this entry applies to any pair involving the species.
    pub fn involves(&self, species: SpeciesId) -> bool {
        self.species.0 == species || self.species.1 == species
    }
}

/// The table of registered pair interactions.
///
/// The position of an entry is its *potential index*, the key under which the
/// neighbor-list store files that interaction's rows. Multiple entries may
/// target the same species pair; each gets its own index and rows.
#[derive(Default)]
pub struct PotentialRegistry {
    entries: Vec<PotentialEntry>,
}

impl PotentialRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a potential with an explicit criterion chain.
    ///
    /// # Return
    ///
    /// The potential index assigned to this entry.
    pub fn register(
        &mut self,
        species_a: SpeciesId,
        species_b: SpeciesId,
        potential: Arc<dyn PairPotential>,
        criterion: Box<dyn NeighborCriterion>,
    ) -> usize {
        self.entries.push(PotentialEntry {
            species: (species_a, species_b),
            potential,
            criterion,
        });
        self.entries.len() - 1
    }

    /// Registers a potential gated by a plain distance criterion at the
    /// potential's own range plus the given safety margin.
    pub fn register_with_margin(
        &mut self,
        species_a: SpeciesId,
        species_b: SpeciesId,
        potential: Arc<dyn PairPotential>,
        safety_margin: f64,
    ) -> usize {
        let criterion = Box::new(DistanceCriterion::new(potential.range(), safety_margin));
        self.register(species_a, species_b, potential, criterion)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[PotentialEntry] {
        &self.entries
    }

    pub(crate) fn entries_mut(&mut self) -> &mut [PotentialEntry] {
        &mut self.entries
    }

    pub fn entry(&self, potential_index: usize) -> Option<&PotentialEntry> {
        self.entries.get(potential_index)
    }

    /// The largest listing radius over all entries (interaction range plus
    /// safety margin); the cell grid sizes its cells against this.
    pub fn max_neighbor_range(&self) -> f64 {
        self.entries
            .iter()
            .map(|e| e.criterion.neighbor_range())
            .fold(0.0, f64::max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::potentials::analytic::{LennardJones, SoftSphere};

    #[test]
    fn register_assigns_sequential_indices() {
        let mut registry = PotentialRegistry::new();
        let lj = Arc::new(LennardJones::new(1.0, 1.0, 2.5));
        let ss = Arc::new(SoftSphere::new(1.0, 1.0, 12, 1.5));

        let first = registry.register_with_margin(0, 0, lj, 0.3);
        let second = registry.register_with_margin(0, 1, ss, 0.3);

        assert_eq!((first, second), (0, 1));
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.entry(0).unwrap().species(), (0, 0));
        assert_eq!(registry.entry(1).unwrap().species(), (0, 1));
    }

    #[test]
    fn species_matching_is_unordered() {
        let mut registry = PotentialRegistry::new();
        registry.register_with_margin(0, 1, Arc::new(LennardJones::new(1.0, 1.0, 2.5)), 0.3);

        let entry = registry.entry(0).unwrap();
        assert!(entry.applies_to(0, 1));
        assert!(entry.applies_to(1, 0));
        assert!(!entry.applies_to(0, 0));
        assert!(entry.involves(0) && entry.involves(1));
        assert!(!entry.involves(2));
    }

    #[test]
    fn max_neighbor_range_includes_the_margin() {
        let mut registry = PotentialRegistry::new();
        registry.register_with_margin(0, 0, Arc::new(LennardJones::new(1.0, 1.0, 2.5)), 0.5);
        registry.register_with_margin(0, 0, Arc::new(SoftSphere::new(1.0, 1.0, 12, 1.5)), 0.5);

        assert!((registry.max_neighbor_range() - 3.0).abs() < 1e-12);
    }

    #[test]
    fn empty_registry_reports_zero_range() {
        assert_eq!(PotentialRegistry::new().max_neighbor_range(), 0.0);
    }
}
