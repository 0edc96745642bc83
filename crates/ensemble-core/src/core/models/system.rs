use super::atom::Atom;
use super::boundary::Boundary;
use super::ids::AtomId;
use nalgebra::Vector3;
use slotmap::SlotMap;

/// The complete simulation state: a mutable collection of atoms plus one
/// boundary.
///
/// Atoms are stored in a slot map so that every consumer (neighbor lists,
/// cell buckets, cached forces) refers to them by [`AtomId`] handle rather
/// than by reference, keeping rebuilds cheap bulk-array operations. The box
/// is owned exclusively by the worker thread while a simulation is stepping;
/// external mutation is funneled through the controller's urgent actions.
#[derive(Debug, Clone)]
pub struct SimulationBox {
    atoms: SlotMap<AtomId, Atom>,
    boundary: Boundary,
}

impl SimulationBox {
    /// Creates an empty box with the given boundary.
    pub fn new(boundary: Boundary) -> Self {
        Self {
            atoms: SlotMap::with_key(),
            boundary,
        }
    }

    /// Returns the boundary.
    pub fn boundary(&self) -> &Boundary {
        &self.boundary
    }

    /// Resizes the boundary.
    ///
    /// Any cell grid built against the old dimensions becomes stale; the
    /// neighbor manager rebuilds it on the next rebuild pass.
    pub fn resize(&mut self, new_lengths: Vector3<f64>) {
        self.boundary.resize(new_lengths);
    }

    /// Adds an atom and returns its handle.
    pub fn add_atom(&mut self, atom: Atom) -> AtomId {
        self.atoms.insert(atom)
    }

    /// Removes an atom.
    ///
    /// # Return
    ///
    /// Returns `Some(Atom)` if the atom existed, otherwise `None`. Neighbor
    /// lists referring to the removed atom stay consistent because rows are
    /// rebuilt wholesale, never patched.
    pub fn remove_atom(&mut self, id: AtomId) -> Option<Atom> {
        self.atoms.remove(id)
    }

    /// Retrieves an immutable reference to an atom by its handle.
    pub fn atom(&self, id: AtomId) -> Option<&Atom> {
        self.atoms.get(id)
    }

    /// Retrieves a mutable reference to an atom by its handle.
    pub fn atom_mut(&mut self, id: AtomId) -> Option<&mut Atom> {
        self.atoms.get_mut(id)
    }

    /// Returns an iterator over all atoms.
    pub fn atoms_iter(&self) -> impl Iterator<Item = (AtomId, &Atom)> {
        self.atoms.iter()
    }

    /// Returns a mutable iterator over all atoms.
    pub fn atoms_iter_mut(&mut self) -> impl Iterator<Item = (AtomId, &mut Atom)> {
        self.atoms.iter_mut()
    }

    /// Returns the handles of all atoms, in storage order.
    pub fn atom_ids(&self) -> Vec<AtomId> {
        self.atoms.keys().collect()
    }

    /// Returns the number of atoms.
    pub fn len(&self) -> usize {
        self.atoms.len()
    }

    /// Returns `true` if the box holds no atoms.
    pub fn is_empty(&self) -> bool {
        self.atoms.is_empty()
    }

    /// Returns the minimum-image separation `b - a` between two atoms.
    ///
    /// # Panics
    ///
    /// Panics if either handle is dangling; handles fed to the engine come
    /// from this box and outlive every derived structure by construction.
    pub fn separation(&self, a: AtomId, b: AtomId) -> Vector3<f64> {
        self.boundary
            .separation(&self.atoms[a].position, &self.atoms[b].position)
    }

    /// Folds every atom position into the primary cell.
    ///
    /// Called at the start of every neighbor-list rebuild so that cell
    /// assignment sees canonical coordinates.
    pub fn wrap_all(&mut self) {
        for (_, atom) in self.atoms.iter_mut() {
            atom.position = self.boundary.wrap(atom.position);
        }
    }
}
