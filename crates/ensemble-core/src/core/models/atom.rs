use super::ids::SpeciesId;
use nalgebra::{Point3, Vector3};

/// Represents a single particle in the simulation.
///
/// An atom is an opaque handle from the engine's point of view: a mutable
/// position, an immutable species tag, and the per-particle state the
/// integrators need (velocity and mass for molecular dynamics). Atoms are
/// owned by a [`SimulationBox`](super::system::SimulationBox) and addressed
/// through [`AtomId`](super::ids::AtomId) handles.
#[derive(Debug, Clone, PartialEq)]
pub struct Atom {
    /// The species (atom-type) tag. Immutable after creation by convention;
    /// potentials and neighbor criteria are registered per species pair.
    pub species: SpeciesId,
    /// The position in simulation units. Positions may drift outside the
    /// primary cell between neighbor-list rebuilds; the boundary's
    /// minimum-image convention keeps separations correct regardless.
    pub position: Point3<f64>,
    /// The velocity, used only by the molecular-dynamics integrator.
    pub velocity: Vector3<f64>,
    /// The particle mass, used only by the molecular-dynamics integrator.
    pub mass: f64,
    /// Optional molecule tag, consumed by the intra/intermolecular neighbor
    /// criteria. Atoms without a tag belong to no molecule.
    pub molecule: Option<u32>,
}

impl Atom {
    /// Creates a new atom of the given species at the given position.
    ///
    /// Velocity starts at zero, mass at 1.0, and no molecule tag is set;
    /// callers that need molecular dynamics or molecular filters adjust the
    /// fields afterward.
    ///
    /// # Arguments
    ///
    /// * `species` - The species tag of the atom.
    /// * `position` - The initial position.
    pub fn new(species: SpeciesId, position: Point3<f64>) -> Self {
        Self {
            species,
            position,
            velocity: Vector3::zeros(),
            mass: 1.0,
            molecule: None,
        }
    }

    /// Sets the molecule tag, builder-style.
    pub fn with_molecule(mut self, molecule: u32) -> Self {
        self.molecule = Some(molecule);
        self
    }

    /// Sets the mass, builder-style.
    pub fn with_mass(mut self, mass: f64) -> Self {
        self.mass = mass;
        self
    }
}
