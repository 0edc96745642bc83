use crate::core::models::ids::{AtomId, SpeciesId};
use crate::core::models::system::SimulationBox;
use nalgebra::Point3;
use slotmap::SecondaryMap;
use std::collections::HashSet;

/// Policy deciding whether two atoms belong in each other's neighbor lists,
/// and whether an atom has moved enough to invalidate cached neighbor data.
///
/// Criteria compose as an explicit decorator chain: a base
/// [`DistanceCriterion`] can be wrapped by filters that narrow `accept` while
/// forwarding the displacement bookkeeping (`need_update` / `is_unsafe` /
/// `reset`) to the wrapped criterion.
pub trait NeighborCriterion: Send {
    /// The listing radius: interaction range plus safety margin. The cell
    /// grid sizes its cells against the largest of these.
    fn neighbor_range(&self) -> f64;

    /// Whether the pair is within listing range (plus any decorator filters).
    fn accept(&self, system: &SimulationBox, a: AtomId, b: AtomId) -> bool;

    /// Whether the atom has moved more than half the safety margin since the
    /// last [`reset`](NeighborCriterion::reset), i.e. its cached neighbor
    /// data should be refreshed soon.
    fn need_update(&self, system: &SimulationBox, atom: AtomId) -> bool;

    /// Whether the atom has moved more than the *full* safety margin, meaning
    /// an interaction may already have been missed. A correctness alarm, not
    /// merely a performance one.
    fn is_unsafe(&self, system: &SimulationBox, atom: AtomId) -> bool;

    /// Records the atom's current position as the new displacement baseline.
    fn reset(&mut self, system: &SimulationBox, atom: AtomId);
}

/// The base criterion: minimum-image distance below range + safety margin,
/// with standard Verlet-list displacement bookkeeping.
#[derive(Debug)]
pub struct DistanceCriterion {
    range: f64,
    safety_margin: f64,
    last_reset: SecondaryMap<AtomId, Point3<f64>>,
}

impl DistanceCriterion {
    /// # Arguments
    ///
    /// * `range` - The interaction cutoff of the associated potential.
    /// * `safety_margin` - Extra listing range (the Verlet skin); must be
    ///   non-negative. A zero margin forces a rebuild whenever anything moves.
    pub fn new(range: f64, safety_margin: f64) -> Self {
        assert!(range > 0.0, "interaction range must be positive");
        assert!(safety_margin >= 0.0, "safety margin cannot be negative");
        Self {
            range,
            safety_margin,
            last_reset: SecondaryMap::new(),
        }
    }

    /// Minimum-image displacement since the last reset, or `None` if the atom
    /// has never been reset (which counts as needing an update).
    fn displacement(&self, system: &SimulationBox, atom: AtomId) -> Option<f64> {
        let baseline = self.last_reset.get(atom)?;
        let current = system.atom(atom)?.position;
        // Wrapping moves positions by whole periods, which the minimum image
        // cancels, so the baseline stays valid across rebuild re-wraps.
        Some(
            system
                .boundary()
                .minimum_image(current - baseline)
                .norm(),
        )
    }
}

impl NeighborCriterion for DistanceCriterion {
    fn neighbor_range(&self) -> f64 {
        self.range + self.safety_margin
    }

    fn accept(&self, system: &SimulationBox, a: AtomId, b: AtomId) -> bool {
        let listed = self.range + self.safety_margin;
        system.separation(a, b).norm_squared() < listed * listed
    }

    fn need_update(&self, system: &SimulationBox, atom: AtomId) -> bool {
        match self.displacement(system, atom) {
            Some(moved) => moved > 0.5 * self.safety_margin,
            None => true,
        }
    }

    fn is_unsafe(&self, system: &SimulationBox, atom: AtomId) -> bool {
        match self.displacement(system, atom) {
            Some(moved) => moved > self.safety_margin,
            None => false,
        }
    }

    fn reset(&mut self, system: &SimulationBox, atom: AtomId) {
        if let Some(a) = system.atom(atom) {
            self.last_reset.insert(atom, a.position);
        }
    }
}

/// Restricts acceptance to one unordered species pair.
pub struct SpeciesPairCriterion {
    species: (SpeciesId, SpeciesId),
    inner: Box<dyn NeighborCriterion>,
}

impl SpeciesPairCriterion {
    pub fn new(a: SpeciesId, b: SpeciesId, inner: Box<dyn NeighborCriterion>) -> Self {
        Self {
            species: (a, b),
            inner,
        }
    }
}

impl NeighborCriterion for SpeciesPairCriterion {
    fn neighbor_range(&self) -> f64 {
        self.inner.neighbor_range()
    }

    fn accept(&self, system: &SimulationBox, a: AtomId, b: AtomId) -> bool {
        let (sa, sb) = match (system.atom(a), system.atom(b)) {
            (Some(a), Some(b)) => (a.species, b.species),
            _ => return false,
        };
        let matches = (sa, sb) == self.species || (sb, sa) == self.species;
        matches && self.inner.accept(system, a, b)
    }

    fn need_update(&self, system: &SimulationBox, atom: AtomId) -> bool {
        self.inner.need_update(system, atom)
    }

    fn is_unsafe(&self, system: &SimulationBox, atom: AtomId) -> bool {
        self.inner.is_unsafe(system, atom)
    }

    fn reset(&mut self, system: &SimulationBox, atom: AtomId) {
        self.inner.reset(system, atom);
    }
}

/// Restricts acceptance to intra- or intermolecular pairs, based on the
/// atoms' molecule tags. Untagged atoms belong to no molecule and therefore
/// never count as sharing one.
pub struct MoleculeCriterion {
    require_same: bool,
    inner: Box<dyn NeighborCriterion>,
}

impl MoleculeCriterion {
    /// Accepts only pairs within the same molecule.
    pub fn intramolecular(inner: Box<dyn NeighborCriterion>) -> Self {
        Self {
            require_same: true,
            inner,
        }
    }

    /// Accepts only pairs spanning different molecules.
    pub fn intermolecular(inner: Box<dyn NeighborCriterion>) -> Self {
        Self {
            require_same: false,
            inner,
        }
    }
}

impl NeighborCriterion for MoleculeCriterion {
    fn neighbor_range(&self) -> f64 {
        self.inner.neighbor_range()
    }

    fn accept(&self, system: &SimulationBox, a: AtomId, b: AtomId) -> bool {
        let same = match (system.atom(a), system.atom(b)) {
            (Some(a), Some(b)) => a.molecule.is_some() && a.molecule == b.molecule,
            _ => false,
        };
        same == self.require_same && self.inner.accept(system, a, b)
    }

    fn need_update(&self, system: &SimulationBox, atom: AtomId) -> bool {
        self.inner.need_update(system, atom)
    }

    fn is_unsafe(&self, system: &SimulationBox, atom: AtomId) -> bool {
        self.inner.is_unsafe(system, atom)
    }

    fn reset(&mut self, system: &SimulationBox, atom: AtomId) {
        self.inner.reset(system, atom);
    }
}

/// Restricts acceptance by membership in a caller-supplied set of bonded
/// pairs (either requiring or excluding bonded pairs).
pub struct BondCriterion {
    bonded: HashSet<(AtomId, AtomId)>,
    require_bonded: bool,
    inner: Box<dyn NeighborCriterion>,
}

impl BondCriterion {
    /// Accepts only bonded pairs.
    pub fn bonded(
        pairs: impl IntoIterator<Item = (AtomId, AtomId)>,
        inner: Box<dyn NeighborCriterion>,
    ) -> Self {
        Self {
            bonded: pairs.into_iter().map(Self::key).collect(),
            require_bonded: true,
            inner,
        }
    }

    /// Accepts only non-bonded pairs.
    pub fn nonbonded(
        pairs: impl IntoIterator<Item = (AtomId, AtomId)>,
        inner: Box<dyn NeighborCriterion>,
    ) -> Self {
        Self {
            bonded: pairs.into_iter().map(Self::key).collect(),
            require_bonded: false,
            inner,
        }
    }

    fn key((a, b): (AtomId, AtomId)) -> (AtomId, AtomId) {
        if a <= b { (a, b) } else { (b, a) }
    }
}

impl NeighborCriterion for BondCriterion {
    fn neighbor_range(&self) -> f64 {
        self.inner.neighbor_range()
    }

    fn accept(&self, system: &SimulationBox, a: AtomId, b: AtomId) -> bool {
        let is_bonded = self.bonded.contains(&Self::key((a, b)));
        is_bonded == self.require_bonded && self.inner.accept(system, a, b)
    }

    fn need_update(&self, system: &SimulationBox, atom: AtomId) -> bool {
        self.inner.need_update(system, atom)
    }

    fn is_unsafe(&self, system: &SimulationBox, atom: AtomId) -> bool {
        self.inner.is_unsafe(system, atom)
    }

    fn reset(&mut self, system: &SimulationBox, atom: AtomId) {
        self.inner.reset(system, atom);
    }
}
