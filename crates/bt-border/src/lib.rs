//! `bt-border` — the crossing's inspection lanes.
//!
//! A fixed pool of single-server lanes shares one FIFO.  Service time is
//! deterministic and set from the posted hourly throughput:
//!
//! | capacity (trucks/h) | service time per lane      |
//! |---------------------|----------------------------|
//! | `0`                 | ∞ (closed, nothing starts) |
//! | finite `c > 0`      | `3600 / (c / lanes)` s     |
//! | `∞`                 | 0 s                        |
//!
//! [`BorderModel::advance`] replays service events in time order up to
//! `now`.  A freed lane starts its next truck at the instant it became free
//! (or when the truck arrived, if later), never at `now`, so throughput does
//! not depend on the step size.

pub mod model;


pub use model::{BorderModel, Completion, Lane, service_time};
