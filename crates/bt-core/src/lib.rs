//! `bt-core` — foundational types for the `border_twin` simulation kernel.
//!
//! This crate is a dependency of every other `bt-*` crate.  It has no `bt-*`
//! dependencies and minimal external ones (only `rand` and `thiserror`, plus
//! optional `serde`).
//!
//! # What lives here
//!
//! | Module     | Contents                                                  |
//! |------------|-----------------------------------------------------------|
//! | [`ids`]    | `CellId`, `ParticleId`, `YardId`, `LaneId`                |
//! | [`geo`]    | `GeoPoint`, `WorldPoint`, `LocalProjection`               |
//! | [`time`]   | `SimClock`, `SimSecond`                                   |
//! | [`rng`]    | `SimRng`, `particle_jitter`                               |
//! | [`mode`]   | `ModeKind`, `StallReason`, `LossCause`                    |
//! | [`error`]  | `CoreError`, `CoreResult`                                 |
//!
//! # Feature flags
//!
//! | Flag    | Effect                                                     |
//! |---------|------------------------------------------------------------|
//! | `serde` | Adds `Serialize`/`Deserialize` to all public types.        |

pub mod error;
pub mod geo;
pub mod ids;
pub mod mode;
pub mod rng;
pub mod time;

#[cfg(test)]
mod tests;

// ── Re-exports ────────────────────────────────────────────────────────────────

pub use error::{CoreError, CoreResult};
pub use geo::{GeoPoint, LocalProjection, WorldPoint};
pub use ids::{CellId, LaneId, ParticleId, YardId};
pub use mode::{LossCause, ModeKind, StallReason};
pub use rng::{SimRng, particle_jitter};
pub use time::{SimClock, SimSecond};
