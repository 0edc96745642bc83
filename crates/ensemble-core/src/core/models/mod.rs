//! Data models for the simulation state.
//!
//! The [`system::SimulationBox`] owns the atoms (arena-allocated, addressed by
//! [`ids::AtomId`] handles) and the [`boundary::Boundary`] describing the
//! region they live in.

pub mod atom;
pub mod boundary;
pub mod ids;
pub mod system;
