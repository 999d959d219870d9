//! Kernel-wide base error type.
//!
//! Sub-crates define their own error enums and either convert into
//! `CoreError` via `From` or wrap it as one variant.  Pick whichever keeps
//! the error sites clean.

use thiserror::Error;

use crate::{CellId, ParticleId};

/// The base error type for `bt-core` and a common variant for sub-crates.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("particle {0} not found")]
    ParticleNotFound(ParticleId),

    #[error("cell {0} is outside the grid")]
    CellOutOfBounds(CellId),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Shorthand result type for all `bt-*` crates.
pub type CoreResult<T> = Result<T, CoreError>;
