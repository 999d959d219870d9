//! Admission error type.
//!
//! Refusing a truck is not an error (see [`Refusal`](crate::Refusal)); these
//! variants signal bookkeeping defects.

use thiserror::Error;

use bt_core::YardId;

#[derive(Debug, Error)]
pub enum AdmissionError {
    #[error("unknown yard {0}")]
    UnknownYard(YardId),

    #[error("release from empty yard {0}")]
    Underflow(YardId),

    #[error("invalid admission setting: {0}")]
    Setting(String),
}

pub type AdmissionResult<T> = Result<T, AdmissionError>;
