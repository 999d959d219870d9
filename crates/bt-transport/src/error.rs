//! Transport error type.

use thiserror::Error;

use bt_admission::AdmissionError;
use bt_core::ParticleId;
use bt_grid::GridError;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("particle {0} not found")]
    ParticleNotFound(ParticleId),

    #[error("occupancy: {0}")]
    Grid(#[from] GridError),

    #[error("admission: {0}")]
    Admission(#[from] AdmissionError),
}

pub type TransportResult<T> = Result<T, TransportError>;
