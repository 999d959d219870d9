//! `EventLog` — capped ring buffer of routing-lineage events.
//!
//! Stalls, resumptions, reroutes, admissions, border arrivals, and departures
//! are appended with a global sequence number.  When full, the oldest entry
//! is dropped and counted.  Particle ids are recycled, so each entry also
//! carries the truck's serial, which never repeats within a run.

use std::collections::VecDeque;

use bt_core::{LaneId, ParticleId, StallReason};
use bt_transport::{Crossing, TransportEvent};

#[derive(Copy, Clone, PartialEq, Debug)]
pub enum SimEvent {
    Transport(TransportEvent),
    Enqueued { particle: ParticleId, crossing: Crossing, at: f64 },
    Departed { particle: ParticleId, lane: LaneId, at: f64 },
    Expired { particle: ParticleId, at: f64 },
    RoutingInstalled { version: u64, at: f64 },
    RoutingDiscarded { token: u64, at: f64 },
}

impl SimEvent {
    pub fn at(&self) -> f64 {
        match *self {
            SimEvent::Transport(e) => match e {
                TransportEvent::Stalled { at, .. }
                | TransportEvent::Resumed { at, .. }
                | TransportEvent::Rerouted { at, .. }
                | TransportEvent::Admitted { at, .. }
                | TransportEvent::Refused { at, .. }
                | TransportEvent::LeftLot { at, .. } => at,
            },
            SimEvent::Enqueued { at, .. }
            | SimEvent::Departed { at, .. }
            | SimEvent::Expired { at, .. }
            | SimEvent::RoutingInstalled { at, .. }
            | SimEvent::RoutingDiscarded { at, .. } => at,
        }
    }

    /// Stall reason, for `Stalled` events.
    pub fn stall_reason(&self) -> Option<StallReason> {
        match self {
            SimEvent::Transport(TransportEvent::Stalled { reason, .. }) => Some(*reason),
            _ => None,
        }
    }
}

#[derive(Copy, Clone, PartialEq, Debug)]
pub struct LogEntry {
    pub seq:    u64,
    /// Serial of the truck involved, if any.
    pub serial: Option<u64>,
    pub event:  SimEvent,
}

#[derive(Clone, Debug)]
pub struct EventLog {
    entries:  VecDeque<LogEntry>,
    capacity: usize,
    next_seq: u64,
    dropped:  u64,
}

impl EventLog {
    pub fn new(capacity: usize) -> Self {
        Self { entries: VecDeque::with_capacity(capacity.min(4_096)), capacity, next_seq: 0, dropped: 0 }
    }

    pub fn push(&mut self, serial: Option<u64>, event: SimEvent) {
        if self.capacity == 0 {
            self.dropped += 1;
            return;
        }
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
            self.dropped += 1;
        }
        self.entries.push_back(LogEntry { seq: self.next_seq, serial, event });
        self.next_seq += 1;
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Entries evicted (or refused at capacity 0) so far.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    /// Oldest to newest.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &LogEntry> + '_ {
        self.entries.iter()
    }

    /// Everything retained about one truck.
    pub fn for_serial(&self, serial: u64) -> impl Iterator<Item = &LogEntry> + '_ {
        self.entries.iter().filter(move |e| e.serial == Some(serial))
    }

    /// Entries at or after simulated time `t`.
    pub fn since(&self, t: f64) -> impl Iterator<Item = &LogEntry> + '_ {
        self.entries.iter().filter(move |e| e.event.at() >= t)
    }

    /// Retained stall entries with the given reason.
    pub fn stalls(&self, reason: StallReason) -> impl Iterator<Item = &LogEntry> + '_ {
        self.entries.iter().filter(move |e| e.event.stall_reason() == Some(reason))
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.next_seq = 0;
        self.dropped = 0;
    }
}
