//! `BorderModel` and its lanes.

use std::collections::VecDeque;

use bt_core::{LaneId, ParticleId};
use tracing::debug;

/// Seconds one lane needs per truck at `capacity_tph` across `lanes` lanes.
pub fn service_time(capacity_tph: f64, lanes: usize) -> f64 {
    if capacity_tph.is_infinite() && capacity_tph > 0.0 {
        0.0
    } else if capacity_tph > 0.0 && lanes > 0 {
        3600.0 / (capacity_tph / lanes as f64)
    } else {
        f64::INFINITY
    }
}

/// One inspection lane.
#[derive(Clone, Debug, Default)]
pub struct Lane {
    occupant:   Option<ParticleId>,
    started_at: f64,
    busy_until: f64,
    free_since: f64,
    busy_secs:  f64,
    served:     u64,
}

impl Lane {
    #[inline]
    pub fn occupant(&self) -> Option<ParticleId> {
        self.occupant
    }

    /// Completion time of the current truck; meaningless when idle.
    #[inline]
    pub fn busy_until(&self) -> f64 {
        self.busy_until
    }

    #[inline]
    pub fn served(&self) -> u64 {
        self.served
    }

    /// Busy seconds up to `now`, counting the truck in service.
    pub fn busy_secs(&self, now: f64) -> f64 {
        match self.occupant {
            Some(_) => self.busy_secs + (now.min(self.busy_until) - self.started_at).max(0.0),
            None => self.busy_secs,
        }
    }
}

/// A truck that finished inspection.
#[derive(Copy, Clone, PartialEq, Debug)]
pub struct Completion {
    pub particle: ParticleId,
    pub lane:     LaneId,
    /// Simulated time service ended.
    pub at:       f64,
}

#[derive(Clone, Debug)]
pub struct BorderModel {
    lanes:        Vec<Lane>,
    queue:        VecDeque<(ParticleId, f64)>,
    capacity_tph: f64,
    service_secs: f64,
    epoch:        f64,
    started:      u64,
    served:       u64,
    wait_secs:    f64,
}

impl BorderModel {
    /// `lanes` idle lanes, closed until [`set_capacity`](Self::set_capacity).
    pub fn new(lanes: usize) -> Self {
        Self {
            lanes:        vec![Lane::default(); lanes],
            queue:        VecDeque::new(),
            capacity_tph: 0.0,
            service_secs: f64::INFINITY,
            epoch:        0.0,
            started:      0,
            served:       0,
            wait_secs:    0.0,
        }
    }

    /// Post a new capacity effective at `now`.  Trucks already in service
    /// keep their completion time.  Lanes idle through a closure count as
    /// free from the reopening, not from before it.
    pub fn set_capacity(&mut self, capacity_tph: f64, now: f64) {
        let secs = service_time(capacity_tph, self.lanes.len());
        if secs != self.service_secs {
            debug!(capacity_tph, service_secs = secs, now, "border capacity changed");
        }
        if !self.is_open() && secs.is_finite() {
            for l in self.lanes.iter_mut().filter(|l| l.occupant.is_none()) {
                l.free_since = l.free_since.max(now);
            }
        }
        self.capacity_tph = capacity_tph;
        self.service_secs = secs;
    }

    // ── Queries ───────────────────────────────────────────────────────────

    #[inline]
    pub fn capacity_tph(&self) -> f64 {
        self.capacity_tph
    }

    #[inline]
    pub fn service_secs(&self) -> f64 {
        self.service_secs
    }

    #[inline]
    pub fn is_open(&self) -> bool {
        self.service_secs.is_finite()
    }

    #[inline]
    pub fn lanes(&self) -> &[Lane] {
        &self.lanes
    }

    #[inline]
    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    pub fn in_service(&self) -> usize {
        self.lanes.iter().filter(|l| l.occupant.is_some()).count()
    }

    /// Trucks held by the border, queued or in service.
    pub fn len(&self) -> usize {
        self.queue_len() + self.in_service()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Queued trucks in FIFO order.
    pub fn queued(&self) -> impl Iterator<Item = ParticleId> + '_ {
        self.queue.iter().map(|&(p, _)| p)
    }

    #[inline]
    pub fn served(&self) -> u64 {
        self.served
    }

    /// Mean seconds between enqueue and service start.
    pub fn mean_wait_secs(&self) -> f64 {
        if self.started == 0 { 0.0 } else { self.wait_secs / self.started as f64 }
    }

    /// Fraction of lane-time spent serving since the last reset.
    pub fn utilization(&self, now: f64) -> f64 {
        let span = (now - self.epoch) * self.lanes.len() as f64;
        if span <= 0.0 {
            return 0.0;
        }
        self.lanes.iter().map(|l| l.busy_secs(now)).sum::<f64>() / span
    }

    // ── Events ────────────────────────────────────────────────────────────

    /// Append a truck to the global FIFO.
    pub fn enqueue(&mut self, particle: ParticleId, now: f64) {
        self.queue.push_back((particle, now));
    }

    /// Replay service up to `now` and return completions in time order.
    pub fn advance(&mut self, now: f64) -> Vec<Completion> {
        let mut done = Vec::new();
        loop {
            self.start_waiting(now);

            let next = self
                .lanes
                .iter()
                .enumerate()
                .filter(|(_, l)| l.occupant.is_some() && l.busy_until <= now)
                .min_by(|(i, a), (j, b)| a.busy_until.total_cmp(&b.busy_until).then(i.cmp(j)))
                .map(|(i, _)| i);
            let Some(i) = next else { break };

            let lane = &mut self.lanes[i];
            let Some(particle) = lane.occupant.take() else { break };
            lane.busy_secs += lane.busy_until - lane.started_at;
            lane.free_since = lane.busy_until;
            lane.served += 1;
            self.served += 1;
            done.push(Completion { particle, lane: LaneId(i as u16), at: lane.busy_until });
        }
        done
    }

    /// Hand queued trucks to idle lanes, earliest-freed lane first.
    fn start_waiting(&mut self, now: f64) {
        if !self.is_open() {
            return;
        }
        while !self.queue.is_empty() {
            let idle = self
                .lanes
                .iter()
                .enumerate()
                .filter(|(_, l)| l.occupant.is_none())
                .min_by(|(i, a), (j, b)| a.free_since.total_cmp(&b.free_since).then(i.cmp(j)))
                .map(|(i, _)| i);
            let Some(i) = idle else { break };
            let Some((particle, enqueued_at)) = self.queue.pop_front() else { break };

            let lane = &mut self.lanes[i];
            let start = lane.free_since.max(enqueued_at).min(now);
            lane.occupant = Some(particle);
            lane.started_at = start;
            lane.busy_until = start + self.service_secs;
            self.started += 1;
            self.wait_secs += start - enqueued_at;
        }
    }

    /// Drop every truck and restart utilisation accounting at `now`.
    pub fn reset(&mut self, now: f64) {
        for l in &mut self.lanes {
            *l = Lane { free_since: now, ..Lane::default() };
        }
        self.queue.clear();
        self.epoch = now;
        self.started = 0;
        self.served = 0;
        self.wait_secs = 0.0;
    }
}
