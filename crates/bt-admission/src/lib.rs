//! `bt-admission` — yards, staging areas, and who may enter them.
//!
//! Every lot moves through three states:
//!
//! ```text
//!            admit reaches cutoff            mass reaches 0
//! Available ─────────────────────► Draining ───────────────► Cooldown{until}
//!     ▲                                                          │
//!     └──────────────────────── now ≥ until ─────────────────────┘
//! ```
//!
//! Only `Available` lots accept trucks or appear as routing sinks.  Any
//! change to the admissible set raises the controller's dirty flag; the
//! caller turns that into a rate-limited routing rebuild.

pub mod controller;
pub mod error;
pub mod yard;

#[cfg(test)]
mod tests;

pub use controller::{AdmissionConfig, AdmissionController, Decision, Refusal};
pub use error::{AdmissionError, AdmissionResult};
pub use yard::{Yard, YardKind, YardState};
