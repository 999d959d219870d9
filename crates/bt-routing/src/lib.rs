//! `bt-routing` — potential fields and next-hop tables per sink set.
//!
//! # Crate layout
//!
//! | Module        | Contents                                                     |
//! |---------------|--------------------------------------------------------------|
//! | [`sink`]      | `SinkSet` — the five destination families                    |
//! | [`field`]     | `FieldSpec`, `compute_field` (multi-source Dijkstra + hops)  |
//! | [`table`]     | `RoutingTable`, `RoutingTables` (versioned, `Arc`-shared)    |
//! | [`scheduler`] | `RebuildScheduler`, `RoutingInput`, `RebuildMode`            |
//! | [`error`]     | `RoutingError`, `RoutingResult<T>`                           |
//!
//! # Cost units
//!
//! Potentials are integer milli-steps: one grid step costs
//! [`STEP_COST`](field::STEP_COST).  Integer costs keep Dijkstra exact and
//! the heap totally ordered, so ties always break on `CellId` and replays are
//! bit-identical.
//!
//! # Copy-in / copy-out
//!
//! A rebuild receives an `Arc<Grid>` and owned field specs, and returns new
//! tables.  It never touches live simulation state, so it can run on the
//! Rayon pool without locks.

pub mod error;
pub mod field;
pub mod scheduler;
pub mod sink;
pub mod table;

#[cfg(test)]
mod tests;

pub use error::{RoutingError, RoutingResult};
pub use field::{FieldSpec, STEP_COST, UNREACHABLE, compute_field};
pub use scheduler::{RebuildMode, RebuildScheduler, RoutingInput, SchedulerStats, ServiceOutcome};
pub use sink::SinkSet;
pub use table::{RoutingTable, RoutingTables};
