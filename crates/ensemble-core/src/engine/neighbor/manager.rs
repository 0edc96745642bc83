use super::cell_grid::CellGrid;
use super::store::NeighborListStore;
use crate::core::models::ids::AtomId;
use crate::core::models::system::SimulationBox;
use crate::engine::config::{NeighborConfig, UnsafeListPolicy};
use crate::engine::error::EngineError;
use crate::engine::registry::PotentialRegistry;
use tracing::{debug, instrument, warn};

/// Where the neighbor-list machinery currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListState {
    /// No lists have been built yet.
    Idle,
    /// Lists are populated and consistent with the positions at the last
    /// rebuild (up to the safety margin).
    Built,
    /// The per-interval staleness check is running.
    CheckPending,
    /// A full rebuild is in progress.
    Rebuilding,
}

/// Orchestrates rebuild-vs-reuse decisions for the neighbor lists.
///
/// Owns the cell grid and the list store. Integrators report each completed
/// step through [`step_complete`](NeighborManager::step_complete); every
/// `update_interval` steps the manager polls the registered criteria and
/// rebuilds when any atom has drifted past half its safety margin. The
/// rebuild is wholesale: wrap positions, reassign cells, clear every row,
/// rescan cell-adjacent pairs, reset the criteria.
pub struct NeighborManager {
    grid: Option<CellGrid>,
    store: NeighborListStore,
    update_interval: u32,
    steps_until_check: u32,
    unsafe_policy: UnsafeListPolicy,
    state: ListState,
    rebuild_count: u64,
}

impl NeighborManager {
    pub fn new(config: NeighborConfig) -> Self {
        let interval = config.update_interval.max(1);
        Self {
            grid: None,
            store: NeighborListStore::new(),
            update_interval: interval,
            steps_until_check: interval,
            unsafe_policy: config.unsafe_policy,
            state: ListState::Idle,
            rebuild_count: 0,
        }
    }

    pub fn state(&self) -> ListState {
        self.state
    }

    pub fn store(&self) -> &NeighborListStore {
        &self.store
    }

    pub fn grid(&self) -> Option<&CellGrid> {
        self.grid.as_ref()
    }

    /// Number of full rebuilds performed so far.
    pub fn rebuild_count(&self) -> u64 {
        self.rebuild_count
    }

    pub fn unsafe_policy(&self) -> UnsafeListPolicy {
        self.unsafe_policy
    }

    pub fn set_unsafe_policy(&mut self, policy: UnsafeListPolicy) {
        self.unsafe_policy = policy;
    }

    /// Interval bookkeeping: called by integrators once per completed step.
    /// Runs [`check_and_update`](NeighborManager::check_and_update) every
    /// `update_interval` calls.
    ///
    /// # Return
    ///
    /// `true` if a rebuild was performed.
    pub fn step_complete(
        &mut self,
        system: &mut SimulationBox,
        registry: &mut PotentialRegistry,
    ) -> Result<bool, EngineError> {
        self.steps_until_check -= 1;
        if self.steps_until_check > 0 {
            return Ok(false);
        }
        self.steps_until_check = self.update_interval;
        self.check_and_update(system, registry)
    }

    /// Polls every atom's criteria; rebuilds if any reports `need_update`.
    ///
    /// An atom past the *full* safety margin means an interaction may already
    /// have been missed; depending on the configured policy this logs a
    /// warning (the rebuild still runs) or fails the simulation.
    pub fn check_and_update(
        &mut self,
        system: &mut SimulationBox,
        registry: &mut PotentialRegistry,
    ) -> Result<bool, EngineError> {
        self.state = ListState::CheckPending;
        let mut need_update = false;
        let mut unsafe_found = false;
        'atoms: for (id, atom) in system.atoms_iter() {
            for entry in registry.entries() {
                if !entry.involves(atom.species) {
                    continue;
                }
                if entry.criterion().need_update(system, id) {
                    need_update = true;
                    if entry.criterion().is_unsafe(system, id) {
                        unsafe_found = true;
                        break 'atoms;
                    }
                }
            }
        }

        if !need_update {
            self.state = ListState::Built;
            return Ok(false);
        }
        if unsafe_found {
            match self.unsafe_policy {
                UnsafeListPolicy::Warn => warn!(
                    "atoms exceeded the safe neighbor-list displacement limit; \
                     interactions may have been missed before this rebuild"
                ),
                UnsafeListPolicy::Fail => return Err(EngineError::UnsafeDisplacement),
            }
        }
        self.rebuild(system, registry)?;
        Ok(true)
    }

    /// Rebuilds the neighbor lists from scratch.
    ///
    /// Steps: wrap every position into the primary cell; (re)build the cell
    /// grid if missing or stale; reassign every atom to its cell; clear every
    /// list row; enumerate cell-adjacent atom pairs, applying each matching
    /// entry's criterion and filing accepted pairs as one up-row plus one
    /// down-row entry; finally reset all criteria's displacement baselines.
    #[instrument(skip_all, level = "debug")]
    pub fn rebuild(
        &mut self,
        system: &mut SimulationBox,
        registry: &mut PotentialRegistry,
    ) -> Result<(), EngineError> {
        if registry.is_empty() {
            return Err(EngineError::NeighborInconsistency(
                "no potentials registered; nothing to build neighbor lists for".into(),
            ));
        }
        let range = registry.max_neighbor_range();
        if range <= 0.0 {
            return Err(EngineError::NeighborInconsistency(format!(
                "non-positive neighbor range {range}"
            )));
        }

        self.state = ListState::Rebuilding;
        system.wrap_all();

        let shape = CellGrid::shape_for(system.boundary(), range);
        let needs_new_grid = self
            .grid
            .as_ref()
            .is_none_or(|g| g.is_stale(system.boundary()) || g.shape() != shape);
        if needs_new_grid {
            debug!(?shape, "building cell grid");
            self.grid = Some(CellGrid::new(system.boundary(), shape));
        }
        let Some(grid) = self.grid.as_mut() else {
            return Err(EngineError::CellGridMissing);
        };
        grid.assign_all(system.atoms_iter().map(|(id, atom)| (id, &atom.position)));

        self.store.set_capacity(registry.len());
        let ids = system.atom_ids();
        for &id in &ids {
            self.store.ensure_atom(id);
        }

        let grid = &*grid;
        for cell in 0..grid.cell_count() {
            let atoms = grid.cell_atoms(cell);
            for (i, &a) in atoms.iter().enumerate() {
                for &b in &atoms[i + 1..] {
                    list_pair(&mut self.store, system, registry, a, b)?;
                }
            }
            for &other in grid.forward_neighbors(cell) {
                for &a in atoms {
                    for &b in grid.cell_atoms(other) {
                        list_pair(&mut self.store, system, registry, a, b)?;
                    }
                }
            }
        }

        for entry in registry.entries_mut() {
            for &id in &ids {
                let Some(atom) = system.atom(id) else { continue };
                if entry.involves(atom.species) {
                    entry.criterion_mut().reset(system, id);
                }
            }
        }

        self.rebuild_count += 1;
        self.state = ListState::Built;
        debug!(
            atoms = ids.len(),
            pairs = self.store.pair_count(),
            rebuilds = self.rebuild_count,
            "neighbor lists rebuilt"
        );
        Ok(())
    }
}

/// Files one candidate pair under every matching registry entry. The
/// id-ordered-first atom owns the up-row entry, the other the down-row entry,
/// so each accepted pair is stored in exactly one direction.
fn list_pair(
    store: &mut NeighborListStore,
    system: &SimulationBox,
    registry: &PotentialRegistry,
    a: AtomId,
    b: AtomId,
) -> Result<(), EngineError> {
    let (Some(atom_a), Some(atom_b)) = (system.atom(a), system.atom(b)) else {
        return Err(EngineError::Internal(format!(
            "cell grid refers to unknown atoms {a:?}/{b:?}"
        )));
    };
    for (index, entry) in registry.entries().iter().enumerate() {
        if !entry.applies_to(atom_a.species, atom_b.species) {
            continue;
        }
        if !entry.criterion().accept(system, a, b) {
            continue;
        }
        let (up_owner, down_owner) = if a <= b { (a, b) } else { (b, a) };
        store.add_up(up_owner, index, down_owner)?;
        store.add_down(down_owner, index, up_owner)?;
    }
    Ok(())
}
