//! `bt-scenario` — hourly inflow, capacity, and friction tables.
//!
//! # Crate layout
//!
//! | Module     | Contents                                                   |
//! |------------|------------------------------------------------------------|
//! | [`table`]  | `HourlyTable` (24 values), `ScenarioData` (keyed tables)   |
//! | [`blend`]  | `ScenarioBlend` — weighted interpolation of two datasets   |
//! | [`loader`] | `load_scenario_csv`, `load_scenario_reader`                |
//! | [`error`]  | `ScenarioError`, `ScenarioResult<T>`                       |
//!
//! # Keys
//!
//! A dataset is a map from key to hourly table.  Inflow keys are free-form
//! (one per commodity or source); the kernel itself reads three reserved
//! keys, [`BORDER_CAPACITY`], [`ALT_BORDER_CAPACITY`], and
//! [`COMMUTER_FRICTION`].

pub mod blend;
pub mod error;
pub mod loader;
pub mod table;

#[cfg(test)]
mod tests;

pub use blend::ScenarioBlend;
pub use error::{ScenarioError, ScenarioResult};
pub use loader::{load_scenario_csv, load_scenario_reader};
pub use table::{HourlyTable, ScenarioData};

/// Main crossing throughput, trucks/hour.  `inf` means unlimited, `0` closed.
pub const BORDER_CAPACITY: &str = "border_capacity";
/// Alternate crossing throughput, trucks/hour.
pub const ALT_BORDER_CAPACITY: &str = "alt_border_capacity";
/// Commuter friction added to downstream density, trucks/cell.
pub const COMMUTER_FRICTION: &str = "commuter_friction";
