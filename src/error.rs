//! Error taxonomy
//!
//! None of these cross the engine boundary: the session absorbs them and
//! degrades to a safe state.

use thiserror::Error;

use crate::sim::BlockId;

/// Faults raised inside the simulation
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimError {
    /// Zero-length or non-finite gravity input
    #[error("ignored input: {0}")]
    InvalidInput(&'static str),
    /// Registry is at its block cap
    #[error("block registry full ({capacity} blocks)")]
    CapacityExceeded { capacity: usize },
    /// A block's position or velocity stopped being finite
    #[error("numerical fault on block {id:?}")]
    NumericalFault { id: BlockId },
    /// Lifecycle call out of order (e.g. resume after destroy)
    #[error("lifecycle misuse: {0}")]
    LifecycleMisuse(&'static str),
}

/// Failures of the persistence collaborator
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("storage JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
