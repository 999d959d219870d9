//! `bt-sim` — the simulation context for border_twin.
//!
//! # Crate layout
//!
//! | Module         | Contents                                                  |
//! |----------------|-----------------------------------------------------------|
//! | [`config`]     | `SimConfig` — every tunable of a run                      |
//! | [`builder`]    | `SimBuilder` — geometry stamping, bridging, lot setup     |
//! | [`sim`]        | `Sim` — the step loop, reset, restore, digest             |
//! | [`invariants`] | `check`, `InvariantViolation` — fatal end-of-step checks  |
//! | [`snapshot`]   | `Snapshot`, `SnapshotRing` — replay points                |
//! | [`event_log`]  | `EventLog`, `SimEvent` — capped routing-lineage log       |
//! | [`metrics`]    | `Metrics` — injected / exited / loss counters             |
//! | [`observer`]   | `SimObserver`, `NoopObserver`                             |
//! | [`error`]      | `SimError`, `SimResult<T>`                                |
//!
//! # Determinism
//!
//! With `frame_budget: None`, a seed, a scenario, and a sequence of step
//! deltas fully determine the run: every iteration is over sorted
//! containers or ascending ids, rebuilds complete inline, and randomness
//! comes from one seeded stream plus per-serial jitter.
//! [`Sim::state_digest`] is the check.
//!
//! # Quick-start
//!
//! ```rust,ignore
//! use bt_sim::{NoopObserver, SimBuilder, SimConfig};
//!
//! let mut sim = SimBuilder::new(SimConfig::default(), scenario)
//!     .road(points, RoadStamp::default())
//!     .source("gate", gate, Origin::Industrial, "gate_rate")
//!     .crossing(crossing)
//!     .build()?;
//! sim.run_for(24.0 * 3_600.0, 1.0, &mut NoopObserver)?;
//! println!("{} trucks crossed", sim.metrics().exited);
//! ```

pub mod builder;
pub mod config;
pub mod error;
pub mod event_log;
pub mod invariants;
pub mod metrics;
pub mod observer;
pub mod sim;
pub mod snapshot;

#[cfg(test)]
mod tests;

pub use builder::SimBuilder;
pub use config::SimConfig;
pub use error::{SimError, SimResult};
pub use event_log::{EventLog, LogEntry, SimEvent};
pub use invariants::{InvariantViolation, check};
pub use metrics::Metrics;
pub use observer::{NoopObserver, SimObserver};
pub use sim::{Departure, Sim, StepSummary};
pub use snapshot::{Snapshot, SnapshotRing};
