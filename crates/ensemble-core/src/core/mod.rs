//! Foundation layer: data models and pure pairwise potentials.

pub mod models;
pub mod potentials;
