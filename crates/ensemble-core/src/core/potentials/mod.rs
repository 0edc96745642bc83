//! Pairwise potential capability and the bundled analytic forms.
//!
//! The engine treats a potential as an opaque capability: a finite
//! interaction range plus an energy/force evaluation over a minimum-image
//! separation vector. Concrete forms are distinct types implementing
//! [`PairPotential`]; dispatch is through the trait, never through runtime
//! type inspection.

pub mod analytic;

use nalgebra::Vector3;

/// The result of evaluating a pair potential for one separation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PairEnergy {
    /// Potential energy of the pair.
    pub energy: f64,
    /// Force acting on atom A, with the separation taken as `b - a`.
    /// The force on B is the negation (Newton's third law).
    pub force: Vector3<f64>,
}

impl PairEnergy {
    /// A zero-energy, zero-force result, returned beyond the cutoff.
    pub const ZERO: PairEnergy = PairEnergy {
        energy: 0.0,
        force: Vector3::new(0.0, 0.0, 0.0),
    };
}

/// A pairwise interaction with a finite range.
///
/// `separation` is the minimum-image vector from atom A to atom B as computed
/// by the dispatcher; implementations must return [`PairEnergy::ZERO`] for
/// separations at or beyond [`range`](PairPotential::range), since neighbor
/// lists guarantee nothing about pairs farther apart than that.
pub trait PairPotential: Send + Sync + std::fmt::Debug {
    /// The interaction cutoff distance.
    fn range(&self) -> f64;

    /// Evaluates energy and force for the given separation `b - a`.
    fn evaluate(&self, separation: &Vector3<f64>) -> PairEnergy;
}
