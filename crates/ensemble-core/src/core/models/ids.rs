use slotmap::new_key_type;

new_key_type! {
    /// A unique, stable identifier for an atom in a [`SimulationBox`](super::system::SimulationBox).
    ///
    /// Atom ids are slot-map keys: cheap to copy, safe to hold across
    /// insertions and removals, and usable as indices into secondary maps
    /// (neighbor-list rows, cell membership, cached forces) without keeping
    /// live references into the atom storage itself.
    pub struct AtomId;
}

/// An atom-type tag, shared by all atoms of the same species.
///
/// The core does no species bookkeeping beyond this tag; it exists so that
/// potentials and neighbor criteria can be registered per pair of species.
pub type SpeciesId = u32;
