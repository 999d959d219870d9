//! Simulation time model.
//!
//! # Design
//!
//! The kernel advances in caller-supplied deltas of simulated seconds, so
//! time is continuous (`f64` seconds since start).  Two derived views are
//! exact integers:
//!
//! - [`SimSecond`]: whole simulated seconds since start.  Snapshots and
//!   replay checks are keyed on it.
//! - hour of day: `(start_secs_of_day + elapsed) / 3600 mod 24`, used to
//!   query hourly inflow, capacity, and friction tables.

use std::fmt;

const SECS_PER_DAY: f64 = 86_400.0;

// ── SimSecond ─────────────────────────────────────────────────────────────────

/// Whole simulated seconds since the start of the run.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SimSecond(pub u64);

impl SimSecond {
    pub const ZERO: SimSecond = SimSecond(0);

    #[inline]
    pub fn as_secs_f64(self) -> f64 {
        self.0 as f64
    }
}

impl fmt::Display for SimSecond {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "S{}", self.0)
    }
}

// ── SimClock ──────────────────────────────────────────────────────────────────

/// Tracks elapsed simulated time and maps it to a time of day.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SimClock {
    /// Seconds after local midnight at which the run starts.
    pub start_secs_of_day: f64,
    /// Simulated seconds elapsed since start.
    pub elapsed_secs: f64,
    /// Number of completed `step` calls.
    pub steps: u64,
}

impl SimClock {
    /// Create a clock starting at `start_hour` (0–23) local time.
    pub fn new(start_hour: u32) -> Self {
        Self {
            start_secs_of_day: (start_hour % 24) as f64 * 3_600.0,
            elapsed_secs:      0.0,
            steps:             0,
        }
    }

    /// Advance by `dt` simulated seconds.  Negative deltas are ignored.
    #[inline]
    pub fn advance(&mut self, dt: f64) {
        if dt > 0.0 {
            self.elapsed_secs += dt;
        }
        self.steps += 1;
    }

    /// Current simulated time in seconds since start.
    #[inline]
    pub fn now(&self) -> f64 {
        self.elapsed_secs
    }

    /// Whole seconds elapsed (floor).
    #[inline]
    pub fn whole_second(&self) -> SimSecond {
        SimSecond(self.elapsed_secs.max(0.0).floor() as u64)
    }

    /// Hour of day (0–23) at time `t` seconds since start.
    pub fn hour_at(&self, t: f64) -> u32 {
        let secs_of_day = (self.start_secs_of_day + t).rem_euclid(SECS_PER_DAY);
        ((secs_of_day / 3_600.0) as u32).min(23)
    }

    /// Hour of day (0–23) now.
    #[inline]
    pub fn hour_of_day(&self) -> u32 {
        self.hour_at(self.elapsed_secs)
    }

    /// Seconds from start until the next top of the hour after `t`.
    pub fn next_hour_boundary(&self, t: f64) -> f64 {
        let abs = self.start_secs_of_day + t;
        ((abs / 3_600.0).floor() + 1.0) * 3_600.0 - self.start_secs_of_day
    }

    /// Break elapsed time into (day, hour, minute) since start, for logging.
    pub fn elapsed_dhm(&self) -> (u64, u32, u32) {
        let total = self.elapsed_secs.max(0.0) as u64;
        let days = total / 86_400;
        let hours = ((total % 86_400) / 3_600) as u32;
        let minutes = ((total % 3_600) / 60) as u32;
        (days, hours, minutes)
    }
}

impl fmt::Display for SimClock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (d, h, m) = self.elapsed_dhm();
        write!(f, "{} (day {} +{:02}:{:02}, local hour {:02})", self.whole_second(), d, h, m, self.hour_of_day())
    }
}
