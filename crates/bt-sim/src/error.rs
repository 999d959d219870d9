use bt_admission::AdmissionError;
use bt_core::SimSecond;
use bt_grid::GridError;
use bt_routing::RoutingError;
use bt_scenario::ScenarioError;
use bt_transport::TransportError;
use thiserror::Error;

use crate::InvariantViolation;

#[derive(Debug, Error)]
pub enum SimError {
    #[error("simulation configuration error: {0}")]
    Config(String),

    #[error("step delta {0} must be finite and non-negative")]
    InvalidStep(f64),

    /// A logic defect; the step was abandoned and state is not corrected.
    #[error("invariant violated: {0}")]
    Invariant(#[from] InvariantViolation),

    #[error("no snapshot held for {0}")]
    NoSnapshot(SimSecond),

    #[error("routing error: {0}")]
    Routing(#[from] RoutingError),

    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("admission error: {0}")]
    Admission(#[from] AdmissionError),

    #[error("grid error: {0}")]
    Grid(#[from] GridError),

    #[error("scenario error: {0}")]
    Scenario(#[from] ScenarioError),
}

pub type SimResult<T> = Result<T, SimError>;
