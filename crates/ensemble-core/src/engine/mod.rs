//! Stateful logic core: neighbor tracking, pair dispatch, integration, and
//! the controller that drives it all on a worker thread.

pub mod config;
pub mod controller;
pub mod dispatch;
pub mod error;
pub mod integrator;
pub mod neighbor;
pub mod progress;
pub mod registry;
pub mod simulation;
