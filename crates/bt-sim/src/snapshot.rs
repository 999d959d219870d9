//! In-memory snapshots keyed to whole simulated seconds.
//!
//! A [`Snapshot`] is a deep copy of everything a step mutates.  Routing
//! tables are `Arc`-shared, so capturing them costs a few pointer copies.
//! The ring keeps the newest `capacity` snapshots and evicts the oldest.

use std::collections::VecDeque;

use bt_admission::AdmissionController;
use bt_border::BorderModel;
use bt_core::{SimClock, SimRng, SimSecond};
use bt_routing::RoutingTables;
use bt_transport::{Injector, TransportState};

use crate::{Departure, Metrics};

#[derive(Clone, Debug)]
pub struct Snapshot {
    pub second:        SimSecond,
    pub(crate) clock:     SimClock,
    pub(crate) rng:       SimRng,
    pub(crate) state:     TransportState,
    pub(crate) admission: AdmissionController,
    pub(crate) injector:  Injector,
    pub(crate) main:      BorderModel,
    pub(crate) alt:       Option<BorderModel>,
    pub(crate) departing: VecDeque<Departure>,
    pub(crate) metrics:   Metrics,
    pub(crate) tables:    RoutingTables,
    /// Whether routing was waiting on a rebuild at capture time.
    pub(crate) routing_dirty: bool,
}

impl Snapshot {
    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    pub fn clock(&self) -> &SimClock {
        &self.clock
    }
}

#[derive(Clone, Debug)]
pub struct SnapshotRing {
    ring:     VecDeque<Snapshot>,
    capacity: usize,
}

impl SnapshotRing {
    pub fn new(capacity: usize) -> Self {
        Self { ring: VecDeque::with_capacity(capacity.min(64)), capacity }
    }

    /// Store `snap`, replacing any snapshot for the same second.
    pub fn push(&mut self, snap: Snapshot) {
        if self.capacity == 0 {
            return;
        }
        self.ring.retain(|s| s.second != snap.second);
        if self.ring.len() == self.capacity {
            self.ring.pop_front();
        }
        self.ring.push_back(snap);
    }

    pub fn get(&self, second: SimSecond) -> Option<&Snapshot> {
        self.ring.iter().find(|s| s.second == second)
    }

    pub fn latest(&self) -> Option<&Snapshot> {
        self.ring.back()
    }

    /// Seconds held, oldest first.
    pub fn seconds(&self) -> impl Iterator<Item = SimSecond> + '_ {
        self.ring.iter().map(|s| s.second)
    }

    pub fn len(&self) -> usize {
        self.ring.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ring.is_empty()
    }

    /// Drop snapshots taken after `second` (they describe a discarded future).
    pub fn truncate_after(&mut self, second: SimSecond) {
        self.ring.retain(|s| s.second <= second);
    }

    pub fn clear(&mut self) {
        self.ring.clear();
    }
}
