//! Spatial neighbor tracking: the cell grid, acceptance criteria, the
//! per-atom neighbor-list store, and the manager that decides when cached
//! neighbor information has gone stale and rebuilds it.

pub mod cell_grid;
pub mod criterion;
pub mod manager;
pub mod store;
