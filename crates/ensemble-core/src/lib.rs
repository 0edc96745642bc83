//! # Ensemble Core Library
//!
//! A particle-simulation engine for molecular-scale Monte Carlo and molecular
//! dynamics: atoms in a periodic (or bounded) box interact through pairwise
//! potentials, and an integrator repeatedly perturbs the system while the
//! caller samples whatever observables it cares about.
//!
//! ## Architectural Philosophy
//!
//! The library is designed with a strict three-layer architecture to ensure a
//! clear separation of concerns, making it modular, testable, and extensible.
//!
//! - **[`core`]: The Foundation.** Contains stateless data models
//!   (`SimulationBox`, `Boundary`, `Atom`) and pure pairwise potentials.
//!
//! - **[`engine`]: The Logic Core.** This stateful layer keeps the simulation
//!   fast and correct: the cell grid and neighbor-list machinery that avoid
//!   O(N²) pair evaluation, the pair dispatcher, the MC/MD integrators, and
//!   the controller that drives an integrator on a worker thread while
//!   remaining pausable and interruptible.
//!
//! - **[`workflows`]: The Public API.** The highest-level, user-facing layer,
//!   tying `engine` and `core` together to run a complete simulation from a
//!   declarative description.

pub mod core;
pub mod engine;
pub mod workflows;
