//! `SimOutputObserver<W>` — bridges `SimObserver` to an `OutputWriter`.

use bt_admission::Yard;
use bt_core::{SimClock, SimSecond};
use bt_sim::{Metrics, SimObserver};
use tracing::warn;

use crate::row::{StepRow, YardRow};
use crate::writer::OutputWriter;
use crate::{OutputError, OutputResult};

/// A [`SimObserver`] that writes per-step metrics and per-second yard fill
/// to any [`OutputWriter`] backend.
///
/// Errors from the writer are stored internally because `SimObserver` methods
/// have no return value.  After the run, check with
/// [`take_error`][Self::take_error].
pub struct SimOutputObserver<W: OutputWriter> {
    writer:     W,
    /// Write a step row every this many steps; `1` writes all of them.
    step_every: u64,
    steps_seen: u64,
    last_error: Option<OutputError>,
}

impl<W: OutputWriter> SimOutputObserver<W> {
    pub fn new(writer: W) -> Self {
        Self { writer, step_every: 1, steps_seen: 0, last_error: None }
    }

    /// Thin the step rows to one per `every` steps (the first step is
    /// always written).
    pub fn with_step_stride(mut self, every: u64) -> Self {
        self.step_every = every.max(1);
        self
    }

    /// Take the stored write error (if any) after the run returns.
    ///
    /// Returns `None` if all writes succeeded.
    pub fn take_error(&mut self) -> Option<OutputError> {
        self.last_error.take()
    }

    /// Unwrap the inner writer (e.g. to inspect files after the run).
    pub fn into_writer(self) -> W {
        self.writer
    }

    fn store_err(&mut self, result: OutputResult<()>) {
        if let Err(e) = result {
            // Keep only the first error.
            if self.last_error.is_none() {
                warn!(error = %e, "output write failed; further errors suppressed");
                self.last_error = Some(e);
            }
        }
    }
}

impl<W: OutputWriter> SimObserver for SimOutputObserver<W> {
    fn on_step_end(&mut self, clock: &SimClock, metrics: &Metrics) {
        let write = self.steps_seen % self.step_every == 0;
        self.steps_seen += 1;
        if write {
            let result = self.writer.write_step(&StepRow::new(clock, metrics));
            self.store_err(result);
        }
    }

    fn on_second(&mut self, second: SimSecond, yards: &[Yard]) {
        let rows: Vec<YardRow> = yards.iter().map(|y| YardRow::new(second, y)).collect();
        if !rows.is_empty() {
            let result = self.writer.write_yards(&rows);
            self.store_err(result);
        }
    }

    fn on_run_end(&mut self, _clock: &SimClock, _metrics: &Metrics) {
        let result = self.writer.finish();
        self.store_err(result);
    }
}
