use crate::core::models::ids::AtomId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(
        "configuration overlap: atoms {a:?} and {b:?} are {distance:.6} apart, closer than the hard core {hard_core:.6}"
    )]
    ConfigurationOverlap {
        a: AtomId,
        b: AtomId,
        distance: f64,
        hard_core: f64,
    },

    #[error("neighbor list inconsistency: {0}")]
    NeighborInconsistency(String),

    #[error("cell grid has not been built; run a neighbor rebuild first")]
    CellGridMissing,

    #[error(
        "atoms exceeded the safe displacement limit before the neighbor rebuild triggered; interactions may have been missed"
    )]
    UnsafeDisplacement,

    #[error("controller worker thread is not reachable")]
    WorkerDisconnected,

    #[error("urgent action panicked: {0}")]
    UrgentActionPanicked(String),

    #[error("internal logic error: {0}")]
    Internal(String),
}
