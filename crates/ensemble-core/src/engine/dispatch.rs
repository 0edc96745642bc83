use crate::core::models::ids::AtomId;
use crate::core::models::system::SimulationBox;
use crate::core::potentials::PairPotential;
use crate::engine::error::EngineError;
use crate::engine::neighbor::cell_grid::CellGrid;
use crate::engine::neighbor::store::NeighborListStore;
use crate::engine::registry::PotentialRegistry;
use itertools::Itertools;
use nalgebra::Vector3;
use slotmap::SecondaryMap;

/// Which neighbor rows a single-atom walk reads. `Both` covers every
/// neighbor of the targeted atom exactly once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
    Both,
}

impl Direction {
    fn reads_up(self) -> bool {
        matches!(self, Direction::Up | Direction::Both)
    }

    fn reads_down(self) -> bool {
        matches!(self, Direction::Down | Direction::Both)
    }
}

/// Which pairs a dispatch pass covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IterationScope {
    /// Every stored pair, visited exactly once (up-rows only).
    All,
    /// The rows of a single atom, e.g. a trial-move candidate.
    Atom(AtomId, Direction),
    /// An explicit pair list, visited as given; the store is not consulted.
    Pairs(Vec<(AtomId, AtomId)>),
}

/// Receives each dispatched pair together with the potential that governs it.
///
/// The separation handed to the visitor is the minimum-image `b - a`.
pub trait PairVisitor {
    fn visit(
        &mut self,
        potential: &dyn PairPotential,
        a: AtomId,
        b: AtomId,
        separation: &Vector3<f64>,
    );
}

/// Walks pairs through the neighbor-list store; the fast path used during
/// integration.
///
/// Fails if the store was sized for a different potential table than the
/// registry currently holds; lists and registry must come from the same
/// rebuild. Pair order is unspecified, but each covered pair is visited
/// exactly once per pass.
pub fn walk_neighbor_lists(
    system: &SimulationBox,
    registry: &PotentialRegistry,
    store: &NeighborListStore,
    scope: IterationScope,
    visitor: &mut dyn PairVisitor,
) -> Result<(), EngineError> {
    if store.n_potentials() != registry.len() {
        return Err(EngineError::NeighborInconsistency(format!(
            "store sized for {} potentials but registry holds {}; lists are stale",
            store.n_potentials(),
            registry.len()
        )));
    }
    match scope {
        IterationScope::All => {
            for (id, _) in system.atoms_iter() {
                walk_atom_rows(system, registry, store, id, Direction::Up, visitor);
            }
        }
        IterationScope::Atom(id, direction) => {
            if system.atom(id).is_none() {
                return Err(EngineError::NeighborInconsistency(format!(
                    "targeted atom {id:?} is not in the box"
                )));
            }
            walk_atom_rows(system, registry, store, id, direction, visitor);
        }
        IterationScope::Pairs(pairs) => {
            for (a, b) in pairs {
                let (Some(atom_a), Some(atom_b)) = (system.atom(a), system.atom(b)) else {
                    return Err(EngineError::NeighborInconsistency(format!(
                        "explicit pair {a:?}/{b:?} refers to a missing atom"
                    )));
                };
                let separation = system.separation(a, b);
                for entry in registry.entries() {
                    if entry.applies_to(atom_a.species, atom_b.species) {
                        visitor.visit(entry.potential(), a, b, &separation);
                    }
                }
            }
        }
    }
    Ok(())
}

fn walk_atom_rows(
    system: &SimulationBox,
    registry: &PotentialRegistry,
    store: &NeighborListStore,
    atom: AtomId,
    direction: Direction,
    visitor: &mut dyn PairVisitor,
) {
    for (index, entry) in registry.entries().iter().enumerate() {
        let potential = entry.potential();
        if direction.reads_up() {
            for &nb in store.up(atom, index) {
                let separation = system.separation(atom, nb);
                visitor.visit(potential, atom, nb, &separation);
            }
        }
        if direction.reads_down() {
            for &nb in store.down(atom, index) {
                let separation = system.separation(atom, nb);
                visitor.visit(potential, atom, nb, &separation);
            }
        }
    }
}

/// Walks cell-adjacent pairs directly, applying criteria inline instead of
/// consulting stored lists; the bootstrap path used when lists do not exist
/// yet (or to cross-check them). Covers the same pairs a fresh rebuild would
/// file.
pub fn walk_cells(
    system: &SimulationBox,
    registry: &PotentialRegistry,
    grid: &CellGrid,
    visitor: &mut dyn PairVisitor,
) {
    let mut visit_pair = |a: AtomId, b: AtomId| {
        let (Some(atom_a), Some(atom_b)) = (system.atom(a), system.atom(b)) else {
            return;
        };
        let separation = system.separation(a, b);
        for entry in registry.entries() {
            if entry.applies_to(atom_a.species, atom_b.species)
                && entry.criterion().accept(system, a, b)
            {
                visitor.visit(entry.potential(), a, b, &separation);
            }
        }
    };
    grid.for_each_cell_pair(|ca, cb| {
        let left = grid.cell_atoms(ca);
        if ca == cb {
            for (i, &a) in left.iter().enumerate() {
                for &b in &left[i + 1..] {
                    visit_pair(a, b);
                }
            }
        } else {
            for &a in left {
                for &b in grid.cell_atoms(cb) {
                    visit_pair(a, b);
                }
            }
        }
    });
}

/// Walks every species-matching pair quadratically, ignoring both lists and
/// cells. Only sensible as a reference for small systems; the potentials'
/// own cutoffs still apply.
pub fn walk_all_pairs(
    system: &SimulationBox,
    registry: &PotentialRegistry,
    visitor: &mut dyn PairVisitor,
) {
    for (a, b) in system.atom_ids().into_iter().tuple_combinations() {
        let (Some(atom_a), Some(atom_b)) = (system.atom(a), system.atom(b)) else {
            continue;
        };
        let separation = system.separation(a, b);
        for entry in registry.entries() {
            if entry.applies_to(atom_a.species, atom_b.species) {
                visitor.visit(entry.potential(), a, b, &separation);
            }
        }
    }
}

/// Accumulates total potential energy.
#[derive(Debug, Default)]
pub struct EnergySum {
    pub total: f64,
}

impl PairVisitor for EnergySum {
    fn visit(
        &mut self,
        potential: &dyn PairPotential,
        _a: AtomId,
        _b: AtomId,
        separation: &Vector3<f64>,
    ) {
        self.total += potential.evaluate(separation).energy;
    }
}

/// Accumulates the force on every visited atom.
///
/// Expects an each-pair-once pass (`All`, the cell walk, or the direct
/// walk); a both-directions single-atom walk double-counts.
#[derive(Debug, Default)]
pub struct ForceSum {
    forces: SecondaryMap<AtomId, Vector3<f64>>,
}

impl ForceSum {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn force_on(&self, atom: AtomId) -> Vector3<f64> {
        self.forces.get(atom).copied().unwrap_or_else(Vector3::zeros)
    }

    pub fn into_forces(self) -> SecondaryMap<AtomId, Vector3<f64>> {
        self.forces
    }

    fn accumulate(&mut self, atom: AtomId, force: Vector3<f64>) {
        match self.forces.get_mut(atom) {
            Some(total) => *total += force,
            None => {
                self.forces.insert(atom, force);
            }
        }
    }
}

impl PairVisitor for ForceSum {
    fn visit(
        &mut self,
        potential: &dyn PairPotential,
        a: AtomId,
        b: AtomId,
        separation: &Vector3<f64>,
    ) {
        let force_on_a = potential.evaluate(separation).force;
        self.accumulate(a, force_on_a);
        self.accumulate(b, -force_on_a);
    }
}

/// Counts dispatched pairs; a verification visitor.
#[derive(Debug, Default)]
pub struct PairCount {
    pub count: usize,
}

impl PairVisitor for PairCount {
    fn visit(
        &mut self,
        _potential: &dyn PairPotential,
        _a: AtomId,
        _b: AtomId,
        _separation: &Vector3<f64>,
    ) {
        self.count += 1;
    }
}

/// Records the closest pair below a hard-core separation, if any.
#[derive(Debug)]
pub struct OverlapCheck {
    hard_core: f64,
    closest: Option<(AtomId, AtomId, f64)>,
}

impl OverlapCheck {
    pub fn new(hard_core: f64) -> Self {
        Self {
            hard_core,
            closest: None,
        }
    }

    pub fn hard_core(&self) -> f64 {
        self.hard_core
    }

    /// The most deeply overlapping pair seen, or `None` if all clear.
    pub fn violation(&self) -> Option<(AtomId, AtomId, f64)> {
        self.closest
    }
}

impl PairVisitor for OverlapCheck {
    fn visit(
        &mut self,
        _potential: &dyn PairPotential,
        a: AtomId,
        b: AtomId,
        separation: &Vector3<f64>,
    ) {
        let distance = separation.norm();
        if distance < self.hard_core && self.closest.is_none_or(|(_, _, d)| distance < d) {
            self.closest = Some((a, b, distance));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::atom::Atom;
    use crate::core::models::boundary::Boundary;
    use crate::core::potentials::analytic::LennardJones;
    use crate::engine::config::NeighborConfig;
    use crate::engine::neighbor::manager::NeighborManager;
    use nalgebra::Point3;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use std::sync::Arc;

    fn dilute_gas(
        n: usize,
        box_edge: f64,
        seed: u64,
    ) -> (SimulationBox, PotentialRegistry, NeighborManager) {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut system = SimulationBox::new(Boundary::periodic(Vector3::new(
            box_edge, box_edge, box_edge,
        )));
        for _ in 0..n {
            system.add_atom(Atom::new(
                0,
                Point3::new(
                    rng.gen_range(0.0..box_edge),
                    rng.gen_range(0.0..box_edge),
                    rng.gen_range(0.0..box_edge),
                ),
            ));
        }
        let mut registry = PotentialRegistry::new();
        registry.register_with_margin(0, 0, Arc::new(LennardJones::new(1.0, 1.0, 2.5)), 0.3);
        let mut manager = NeighborManager::new(NeighborConfig::default());
        manager.rebuild(&mut system, &mut registry).unwrap();
        (system, registry, manager)
    }

    #[test]
    fn list_energy_matches_direct_energy() {
        let (system, registry, manager) = dilute_gas(80, 12.0, 41);

        let mut listed = EnergySum::default();
        walk_neighbor_lists(
            &system,
            &registry,
            manager.store(),
            IterationScope::All,
            &mut listed,
        )
        .unwrap();

        let mut direct = EnergySum::default();
        walk_all_pairs(&system, &registry, &mut direct);

        assert!(
            (listed.total - direct.total).abs() < 1e-9,
            "list walk {} vs direct {}",
            listed.total,
            direct.total
        );
        assert!(listed.total != 0.0, "test should exercise interactions");
    }

    #[test]
    fn dilute_gas_cell_walk_covers_the_same_pairs_as_the_lists() {
        // 100 atoms in a 50-box: the direct cell path and a fresh list walk
        // must agree pair-for-pair.
        let (system, registry, manager) = dilute_gas(100, 50.0, 47);

        let mut listed = PairCount::default();
        walk_neighbor_lists(
            &system,
            &registry,
            manager.store(),
            IterationScope::All,
            &mut listed,
        )
        .unwrap();

        let mut direct = PairCount::default();
        walk_cells(&system, &registry, manager.grid().unwrap(), &mut direct);

        assert_eq!(listed.count, direct.count);
        assert!(listed.count > 0, "test should list some pairs");
    }

    #[test]
    fn single_atom_energy_matches_direct_difference() {
        let (system, registry, manager) = dilute_gas(60, 10.0, 17);
        let target = system.atom_ids()[7];

        let mut around = EnergySum::default();
        walk_neighbor_lists(
            &system,
            &registry,
            manager.store(),
            IterationScope::Atom(target, Direction::Both),
            &mut around,
        )
        .unwrap();

        // Reference: direct sum over pairs involving the target.
        struct OnlyTarget {
            target: AtomId,
            inner: EnergySum,
        }
        impl PairVisitor for OnlyTarget {
            fn visit(
                &mut self,
                potential: &dyn PairPotential,
                a: AtomId,
                b: AtomId,
                separation: &Vector3<f64>,
            ) {
                if a == self.target || b == self.target {
                    self.inner.visit(potential, a, b, separation);
                }
            }
        }
        let mut direct = OnlyTarget {
            target,
            inner: EnergySum::default(),
        };
        walk_all_pairs(&system, &registry, &mut direct);

        assert!((around.total - direct.inner.total).abs() < 1e-9);
    }

    #[test]
    fn up_and_down_directions_partition_the_both_walk() {
        let (system, registry, manager) = dilute_gas(60, 10.0, 17);
        let target = system.atom_ids()[3];

        let count_in = |direction| {
            let mut count = PairCount::default();
            walk_neighbor_lists(
                &system,
                &registry,
                manager.store(),
                IterationScope::Atom(target, direction),
                &mut count,
            )
            .unwrap();
            count.count
        };
        assert_eq!(
            count_in(Direction::Up) + count_in(Direction::Down),
            count_in(Direction::Both)
        );
    }

    #[test]
    fn explicit_pair_list_is_walked_verbatim() {
        let (system, registry, manager) = dilute_gas(20, 10.0, 3);
        let ids = system.atom_ids();
        let pairs = vec![(ids[0], ids[1]), (ids[2], ids[3]), (ids[0], ids[5])];

        let mut count = PairCount::default();
        walk_neighbor_lists(
            &system,
            &registry,
            manager.store(),
            IterationScope::Pairs(pairs),
            &mut count,
        )
        .unwrap();
        assert_eq!(count.count, 3);
    }

    #[test]
    fn forces_from_list_walk_sum_to_zero() {
        // Jittered lattice: the closest pair stays above sigma, so per-pair
        // forces are moderate and the pairwise cancellation leaves no
        // floating-point residual worth speaking of.
        let mut rng = StdRng::seed_from_u64(29);
        let mut system =
            SimulationBox::new(Boundary::periodic(Vector3::new(6.0, 6.0, 6.0)));
        for i in 0..4 {
            for j in 0..4 {
                for k in 0..4 {
                    system.add_atom(Atom::new(
                        0,
                        Point3::new(
                            (i as f64 + 0.5) * 1.5 + rng.gen_range(-0.2..0.2),
                            (j as f64 + 0.5) * 1.5 + rng.gen_range(-0.2..0.2),
                            (k as f64 + 0.5) * 1.5 + rng.gen_range(-0.2..0.2),
                        ),
                    ));
                }
            }
        }
        let mut registry = PotentialRegistry::new();
        registry.register_with_margin(0, 0, Arc::new(LennardJones::new(1.0, 1.0, 2.5)), 0.3);
        let mut manager = NeighborManager::new(NeighborConfig::default());
        manager.rebuild(&mut system, &mut registry).unwrap();

        let mut forces = ForceSum::new();
        walk_neighbor_lists(
            &system,
            &registry,
            manager.store(),
            IterationScope::All,
            &mut forces,
        )
        .unwrap();

        let total: Vector3<f64> = system
            .atom_ids()
            .iter()
            .map(|&id| forces.force_on(id))
            .sum();
        assert!(total.norm() < 1e-9, "net force {total:?}");
    }

    #[test]
    fn mismatched_store_capacity_is_fatal() {
        let (system, mut registry, manager) = dilute_gas(10, 10.0, 1);
        registry.register_with_margin(0, 0, Arc::new(LennardJones::new(1.0, 1.0, 2.0)), 0.3);

        let err = walk_neighbor_lists(
            &system,
            &registry,
            manager.store(),
            IterationScope::All,
            &mut PairCount::default(),
        )
        .unwrap_err();
        assert!(matches!(err, EngineError::NeighborInconsistency(_)));
    }

    #[test]
    fn overlap_check_reports_closest_violation() {
        let mut system =
            SimulationBox::new(Boundary::periodic(Vector3::new(10.0, 10.0, 10.0)));
        let a = system.add_atom(Atom::new(0, Point3::new(1.0, 1.0, 1.0)));
        let b = system.add_atom(Atom::new(0, Point3::new(1.2, 1.0, 1.0)));
        system.add_atom(Atom::new(0, Point3::new(5.0, 5.0, 5.0)));
        let mut registry = PotentialRegistry::new();
        registry.register_with_margin(0, 0, Arc::new(LennardJones::new(1.0, 1.0, 2.5)), 0.3);

        let mut check = OverlapCheck::new(0.5);
        walk_all_pairs(&system, &registry, &mut check);

        let (va, vb, d) = check.violation().unwrap();
        assert_eq!((va.min(vb), va.max(vb)), (a.min(b), a.max(b)));
        assert!((d - 0.2).abs() < 1e-12);
    }

    #[test]
    fn overlap_check_passes_on_spaced_atoms() {
        let mut system =
            SimulationBox::new(Boundary::periodic(Vector3::new(10.0, 10.0, 10.0)));
        system.add_atom(Atom::new(0, Point3::new(1.0, 1.0, 1.0)));
        system.add_atom(Atom::new(0, Point3::new(3.0, 1.0, 1.0)));
        let mut registry = PotentialRegistry::new();
        registry.register_with_margin(0, 0, Arc::new(LennardJones::new(1.0, 1.0, 2.5)), 0.3);

        let mut check = OverlapCheck::new(0.9);
        walk_all_pairs(&system, &registry, &mut check);
        assert!(check.violation().is_none());
    }
}
