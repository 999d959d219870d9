//! Grid-subsystem error type.

use thiserror::Error;

use bt_core::{CellId, ParticleId};

/// Errors produced by `bt-grid`.
#[derive(Debug, Error)]
pub enum GridError {
    #[error("cell {0} is outside the grid")]
    OutOfBounds(CellId),

    #[error("particle {particle} is not in the bucket of {cell}")]
    NotInBucket { particle: ParticleId, cell: CellId },

    #[error("grid dimensions invalid: {0}")]
    Dimensions(String),

    #[error("empty geometry: {0}")]
    EmptyGeometry(&'static str),
}

pub type GridResult<T> = Result<T, GridError>;
