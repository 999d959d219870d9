//! Plain data row types written by output backends.

use bt_admission::{Yard, YardKind, YardState};
use bt_core::{LossCause, SimClock, SimSecond};
use bt_sim::Metrics;

/// Run counters at the end of one step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepRow {
    pub elapsed_secs: f64,
    /// Local hour of day at the end of the step.
    pub hour:         u32,
    pub injected:     u64,
    pub exited:       u64,
    pub expired:      u64,
    pub live:         u64,
    pub queued:       u64,
    /// Cumulative truck-hours lost, indexed by [`LossCause::index`].
    pub loss_hours:   [f64; LossCause::ALL.len()],
}

impl StepRow {
    pub fn new(clock: &SimClock, m: &Metrics) -> Self {
        Self {
            elapsed_secs: clock.now(),
            hour:         clock.hour_of_day(),
            injected:     m.injected,
            exited:       m.exited,
            expired:      m.expired,
            live:         m.live as u64,
            queued:       m.queued as u64,
            loss_hours:   m.loss_hours,
        }
    }
}

/// One lot at a whole simulated second.
#[derive(Debug, Clone, PartialEq)]
pub struct YardRow {
    pub second:    u64,
    pub yard:      u16,
    pub name:      String,
    pub kind:      YardKind,
    pub state:     YardState,
    pub occupants: u32,
    pub capacity:  u32,
    /// `occupants / capacity`; `0` for a zero-capacity lot.
    pub fill:      f64,
}

impl YardRow {
    pub fn new(second: SimSecond, y: &Yard) -> Self {
        Self {
            second:    second.0,
            yard:      y.id().0,
            name:      y.name().to_owned(),
            kind:      y.kind(),
            state:     y.state(),
            occupants: y.occupants(),
            capacity:  y.capacity(),
            fill:      y.fill_ratio(),
        }
    }
}
