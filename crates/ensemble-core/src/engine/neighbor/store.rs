use crate::core::models::ids::AtomId;
use crate::engine::error::EngineError;
use slotmap::SecondaryMap;

/// The up/down neighbor rows of a single atom, one pair of rows per
/// registered potential.
#[derive(Debug, Clone, Default)]
pub struct AtomNeighborLists {
    up: Vec<Vec<AtomId>>,
    down: Vec<Vec<AtomId>>,
}

impl AtomNeighborLists {
    fn with_capacity(n_potentials: usize) -> Self {
        Self {
            up: vec![Vec::new(); n_potentials],
            down: vec![Vec::new(); n_potentials],
        }
    }

    fn clear(&mut self) {
        for row in self.up.iter_mut().chain(self.down.iter_mut()) {
            row.clear();
        }
    }
}

/// Per-atom, per-potential neighbor rows.
///
/// Every accepted pair is stored exactly once as a whole: in the up-row of
/// one atom and the down-row of the other, so walking all up-rows visits each
/// pair once while walking one atom's up- and down-rows together visits all
/// of that atom's neighbors. Rows are rebuilt wholesale by the neighbor
/// manager, never partially patched.
#[derive(Debug, Default)]
pub struct NeighborListStore {
    rows: SecondaryMap<AtomId, AtomNeighborLists>,
    n_potentials: usize,
}

impl NeighborListStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of potential slots each row is sized for.
    pub fn n_potentials(&self) -> usize {
        self.n_potentials
    }

    /// Resizes every row to the given number of potential slots, clearing
    /// all stored neighbors.
    pub fn set_capacity(&mut self, n_potentials: usize) {
        if n_potentials != self.n_potentials {
            self.n_potentials = n_potentials;
            self.rows.clear();
        } else {
            for (_, row) in self.rows.iter_mut() {
                row.clear();
            }
        }
    }

    /// Ensures the atom has (empty) rows; called for every atom at the start
    /// of a rebuild so that atoms without neighbors still resolve.
    pub fn ensure_atom(&mut self, id: AtomId) {
        match self.rows.get_mut(id) {
            Some(row) => row.clear(),
            None => {
                self.rows
                    .insert(id, AtomNeighborLists::with_capacity(self.n_potentials));
            }
        }
    }

    /// Drops an atom's rows entirely.
    pub fn remove_atom(&mut self, id: AtomId) {
        self.rows.remove(id);
    }

    fn check_index(&self, potential_index: usize) -> Result<(), EngineError> {
        if potential_index >= self.n_potentials {
            return Err(EngineError::NeighborInconsistency(format!(
                "potential index {} out of range (store sized for {})",
                potential_index, self.n_potentials
            )));
        }
        Ok(())
    }

    /// Appends `neighbor` to `atom`'s up-row for the given potential.
    pub fn add_up(
        &mut self,
        atom: AtomId,
        potential_index: usize,
        neighbor: AtomId,
    ) -> Result<(), EngineError> {
        self.check_index(potential_index)?;
        match self.rows.get_mut(atom) {
            Some(row) => {
                row.up[potential_index].push(neighbor);
                Ok(())
            }
            None => Err(EngineError::NeighborInconsistency(format!(
                "atom {atom:?} has no neighbor rows; rebuild must register it first"
            ))),
        }
    }

    /// Appends `neighbor` to `atom`'s down-row for the given potential.
    pub fn add_down(
        &mut self,
        atom: AtomId,
        potential_index: usize,
        neighbor: AtomId,
    ) -> Result<(), EngineError> {
        self.check_index(potential_index)?;
        match self.rows.get_mut(atom) {
            Some(row) => {
                row.down[potential_index].push(neighbor);
                Ok(())
            }
            None => Err(EngineError::NeighborInconsistency(format!(
                "atom {atom:?} has no neighbor rows; rebuild must register it first"
            ))),
        }
    }

    /// The atom's up-neighbors for one potential (empty if unknown).
    pub fn up(&self, atom: AtomId, potential_index: usize) -> &[AtomId] {
        self.rows
            .get(atom)
            .and_then(|row| row.up.get(potential_index))
            .map_or(&[], Vec::as_slice)
    }

    /// The atom's down-neighbors for one potential (empty if unknown).
    pub fn down(&self, atom: AtomId, potential_index: usize) -> &[AtomId] {
        self.rows
            .get(atom)
            .and_then(|row| row.down.get(potential_index))
            .map_or(&[], Vec::as_slice)
    }

    /// Total number of stored pairs (each pair counted once, via up-rows).
    pub fn pair_count(&self) -> usize {
        self.rows
            .iter()
            .map(|(_, row)| row.up.iter().map(Vec::len).sum::<usize>())
            .sum()
    }
}
