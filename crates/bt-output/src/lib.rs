//! `bt-output` — simulation output writers for border_twin.
//!
//! | Backend | Files created                          |
//! |---------|----------------------------------------|
//! | CSV     | `step_metrics.csv`, `yard_fill.csv`    |
//!
//! Backends implement [`OutputWriter`] and are driven by
//! [`SimOutputObserver`], which implements `bt_sim::SimObserver`.
//!
//! # Usage
//!
//! ```rust,ignore
//! use bt_output::{CsvWriter, SimOutputObserver};
//!
//! let writer = CsvWriter::new(Path::new("./output"))?;
//! let mut obs = SimOutputObserver::new(writer).with_step_stride(60);
//! sim.run_for(86_400.0, 1.0, &mut obs)?;
//! obs.take_error().map(|e| eprintln!("output error: {e}"));
//! ```

pub mod csv;
pub mod error;
pub mod observer;
pub mod row;
pub mod writer;


pub use csv::CsvWriter;
pub use error::{OutputError, OutputResult};
pub use observer::SimOutputObserver;
pub use row::{StepRow, YardRow};
pub use writer::OutputWriter;
