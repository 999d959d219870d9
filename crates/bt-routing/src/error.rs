//! Routing-subsystem error type.

use thiserror::Error;

use bt_core::CellId;

/// Errors produced by `bt-routing`.
///
/// An empty or unreachable sink set is *not* an error: it yields a table in
/// which every cell is unreachable.
#[derive(Debug, Error)]
pub enum RoutingError {
    #[error("sink {0} is outside the grid")]
    SinkOutOfBounds(CellId),

    #[error("background rebuild {token} was lost before reporting")]
    WorkerLost { token: u64 },
}

pub type RoutingResult<T> = Result<T, RoutingError>;
