//! Placement error types.
//!
//! Every variant is a configuration error in the caller's input. Missing
//! cluster data and empty results are not errors; they are reported through
//! the decision itself.

use thiserror::Error;

/// Errors surfaced by the placement engine.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum PlacementError {
    #[error("invalid selector: {0}")]
    InvalidSelector(String),

    #[error("unknown selector operator: {0}")]
    UnknownOperator(String),

    #[error("unknown scoring weight: {0}")]
    UnknownWeightKey(String),

    #[error("invalid scoring weight {name}: {value}")]
    InvalidWeight { name: String, value: f64 },

    #[error("duplicate cluster in candidate list: {0}")]
    DuplicateCluster(String),
}

pub type PlacementResult<T> = Result<T, PlacementError>;
