//! `DwellQueue` — sparse timed wake-ups for parked trucks.
//!
//! Yard dwells, staging re-checks, and overnight wake-ups all register the
//! whole simulated second at which the truck needs attention.  Each step
//! drains only the due seconds, so parked trucks cost nothing in between.
//!
//! Entries can go stale (the truck timed out, or was re-registered); the
//! consumer checks the particle's mode before acting.

use std::collections::BTreeMap;

use bt_core::ParticleId;

#[derive(Clone, Debug, Default)]
pub struct DwellQueue {
    inner: BTreeMap<u64, Vec<ParticleId>>,
    total: usize,
}

impl DwellQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wake `particle` at simulated time `at`, rounded up to a whole second.
    pub fn push(&mut self, at: f64, particle: ParticleId) {
        let key = at.max(0.0).ceil() as u64;
        self.inner.entry(key).or_default().push(particle);
        self.total += 1;
    }

    /// Remove and return every entry due at or before `now`, earliest first,
    /// registration order within a second.
    pub fn pop_due(&mut self, now: f64) -> Vec<ParticleId> {
        let horizon = now.max(0.0).floor() as u64;
        let later = self.inner.split_off(&(horizon + 1));
        let due = std::mem::replace(&mut self.inner, later);
        let out: Vec<ParticleId> = due.into_values().flatten().collect();
        self.total -= out.len();
        out
    }

    /// Earliest pending second.
    pub fn next_due(&self) -> Option<u64> {
        self.inner.keys().next().copied()
    }

    pub fn len(&self) -> usize {
        self.total
    }

    pub fn is_empty(&self) -> bool {
        self.total == 0
    }

    pub fn clear(&mut self) {
        self.inner.clear();
        self.total = 0;
    }
}
