//! `bt-grid` — the fixed N×N grid and everything stamped onto it.
//!
//! # Crate layout
//!
//! | Module        | Contents                                                   |
//! |---------------|------------------------------------------------------------|
//! | [`grid`]      | `Grid` (flat conductance/region arrays), `Region`, `Dir`   |
//! | [`stamp`]     | polyline / polygon / point stamping (monotone union)       |
//! | [`bridge`]    | `BridgeOutcome`, bounded BFS connector stamping            |
//! | [`occupancy`] | `Occupancy` — per-cell mass and particle buckets           |
//! | [`error`]     | `GridError`, `GridResult<T>`                               |
//!
//! # Layout
//!
//! Cells are addressed by a flat row-major [`CellId`](bt_core::CellId):
//! `row * n + col`, row 0 at the south edge.  Every per-cell array is sized
//! `n * n` at construction and never resized mid-run.

pub mod bridge;
pub mod error;
pub mod grid;
pub mod occupancy;
pub mod stamp;


pub use bridge::BridgeOutcome;
pub use error::{GridError, GridResult};
pub use grid::{Dir, Grid, Region};
pub use occupancy::Occupancy;
pub use stamp::{RoadStamp, point_in_polygon};
