//! Simulation observer trait for progress reporting and data collection.

use bt_admission::Yard;
use bt_core::{SimClock, SimSecond};

use crate::Metrics;

/// Callbacks invoked by [`Sim::step_observed`][crate::Sim::step_observed]
/// and [`Sim::run_for`][crate::Sim::run_for].
///
/// All methods have default no-op implementations so implementors only need
/// to override what they care about.
pub trait SimObserver {
    /// Called before any processing in a step.
    fn on_step_start(&mut self, _clock: &SimClock) {}

    /// Called after a step's invariants passed.
    fn on_step_end(&mut self, _clock: &SimClock, _metrics: &Metrics) {}

    /// Called once per step that crosses into a new whole second, with the
    /// latest second reached and the lots as they stand at the end of that
    /// step.  A step spanning several seconds reports only the last one.
    fn on_second(&mut self, _second: SimSecond, _yards: &[Yard]) {}

    /// Called once when [`Sim::run_for`][crate::Sim::run_for] finishes.
    fn on_run_end(&mut self, _clock: &SimClock, _metrics: &Metrics) {}
}

/// A [`SimObserver`] that does nothing.
pub struct NoopObserver;

impl SimObserver for NoopObserver {}
