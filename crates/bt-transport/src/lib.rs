//! `bt-transport` — trucks on the grid.
//!
//! # Crate layout
//!
//! | Module         | Contents                                                 |
//! |----------------|----------------------------------------------------------|
//! | [`particle`]   | `Particle`, per-mode `ModeState`, `Lineage`              |
//! | [`store`]      | `ParticleStore` (slot reuse), `TransportState`           |
//! | [`dwell`]      | `DwellQueue` — timed wake-ups for parked trucks          |
//! | [`congestion`] | `CongestionLaw` — `c(ρ) = 1 / (1 + (ρ/ρ₀)^p)`            |
//! | [`inject`]     | `Source`, `Injector` — rate accumulators per source cell |
//! | [`integrator`] | `Integrator` — CFL sub-steps, plan/apply transfers       |
//! | [`error`]      | `TransportError`, `TransportResult<T>`                   |
//!
//! # Authorised mutation
//!
//! A particle's cell and its bucket membership change together, only through
//! [`TransportState`] methods.  `Particle::cell` is read-only outside this
//! crate.

pub mod congestion;
pub mod dwell;
pub mod error;
pub mod inject;
pub mod integrator;
pub mod particle;
pub mod store;


pub use congestion::CongestionLaw;
pub use dwell::DwellQueue;
pub use error::{TransportError, TransportResult};
pub use inject::{Injector, Source};
pub use integrator::{Arrival, Integrator, StepInput, StepReport, TransportEvent, TransportParams};
pub use particle::{ClearedPhase, Crossing, Lineage, ModeState, Origin, Particle};
pub use store::{ParticleStore, TransportState};
