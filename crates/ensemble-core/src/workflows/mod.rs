//! High-level entry points: declarative setup and complete runs.
//!
//! This layer turns a validated [`SimulationSpec`](crate::engine::config::SimulationSpec)
//! into a populated [`Simulation`](crate::engine::simulation::Simulation) and
//! drives it through the controller, reporting progress along the way. The
//! engine layer underneath stays usable on its own for callers that assemble
//! systems programmatically.

pub mod setup;
pub mod simulate;

use crate::engine::config::ConfigError;
use crate::engine::error::EngineError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("invalid simulation description: {0}")]
    Config(#[from] ConfigError),

    #[error("engine failure: {0}")]
    Engine(#[from] EngineError),
}
