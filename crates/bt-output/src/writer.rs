//! The `OutputWriter` trait implemented by backend writers.

use crate::{OutputResult, StepRow, YardRow};

/// Sink for simulation output rows.
///
/// The observer never propagates these errors into the step loop; they are
/// stored and retrieved with
/// [`SimOutputObserver::take_error`](crate::SimOutputObserver::take_error).
pub trait OutputWriter {
    /// Write one per-step metrics row.
    fn write_step(&mut self, row: &StepRow) -> OutputResult<()>;

    /// Write a batch of per-yard fill rows.
    fn write_yards(&mut self, rows: &[YardRow]) -> OutputResult<()>;

    /// Flush and close all underlying file handles.
    ///
    /// Idempotent; safe to call more than once.
    fn finish(&mut self) -> OutputResult<()>;
}
