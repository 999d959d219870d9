//! `Sim` — the simulation context and its step loop.
//!
//! # One step
//!
//! ```text
//! step(dt):
//!   ① Capacity   — post this hour's border capacity on every crossing.
//!   ② Admission  — expire cooldowns; a changed lot marks routing dirty.
//!   ③ Routing    — collect a finished rebuild, or issue one if dirty.
//!   ④ Wake-ups   — finished dwells, staging re-checks, overnight wakes.
//!   ⑤ Injection  — accrue hourly demand and spawn trucks at sources.
//!   ⑥ Transport  — CFL sub-steps; crossing arrivals join the border FIFO.
//!   ⑦ Border     — advance lanes, split at hour boundaries; departures.
//!   ⑧ Age limit  — drop trucks past `max_particle_age_secs`.
//!   ⑨ Invariants — any failure aborts the step with `SimError::Invariant`.
//!   ⑩ Snapshot   — on every `snapshot_interval_secs` boundary.
//! ```
//!
//! All state a step mutates lives in this struct and is only reachable
//! through `&mut self`, so two contexts never share anything but the
//! immutable grid.

use std::collections::VecDeque;
use std::sync::Arc;

use bt_admission::{AdmissionController, Yard, YardKind};
use bt_border::{BorderModel, Completion};
use bt_core::{
    CellId, LaneId, LossCause, ModeKind, ParticleId, SimClock, SimRng, SimSecond, StallReason, WorldPoint, YardId,
    particle_jitter,
};
use bt_grid::{Grid, Region};
use bt_routing::{
    FieldSpec, RebuildMode, RebuildScheduler, RoutingInput, RoutingTables, SchedulerStats, SinkSet,
};
use bt_scenario::{ALT_BORDER_CAPACITY, BORDER_CAPACITY, COMMUTER_FRICTION, ScenarioBlend};
use bt_transport::{
    ClearedPhase, Crossing, Injector, Integrator, ModeState, Origin, Particle, StepInput, TransportEvent,
    TransportState,
};
use tracing::{debug, info, trace};
use xxhash_rust::xxh3::xxh3_64;

use crate::{
    EventLog, Metrics, NoopObserver, SimConfig, SimError, SimEvent, SimObserver, SimResult, Snapshot,
    SnapshotRing, invariants,
};

/// Upper bound on the departure list, whatever `depart_anim_secs` says.
const MAX_DEPARTING: usize = 10_000;

/// A truck that finished border service, kept for `depart_anim_secs`.
#[derive(Copy, Clone, PartialEq, Debug)]
pub struct Departure {
    pub serial:   u64,
    pub crossing: Crossing,
    pub lane:     LaneId,
    /// Last on-grid position.
    pub pos:      WorldPoint,
    pub at:       f64,
    pub until:    f64,
}

/// What a single step did.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct StepSummary {
    pub substeps:  u32,
    pub injected:  usize,
    pub arrived:   usize,
    pub departed:  usize,
    pub expired:   usize,
    /// Parked trucks whose wake-up was handled.
    pub woken:     usize,
    /// Routing version installed this step.
    pub installed: Option<u64>,
}

/// The simulation context.  Construct with [`SimBuilder`](crate::SimBuilder).
pub struct Sim {
    config:         SimConfig,
    grid:           Arc<Grid>,
    crossing_cells: Vec<CellId>,
    alt_cells:      Vec<CellId>,
    scenario:       ScenarioBlend,
    clock:          SimClock,
    rng:            SimRng,
    state:          TransportState,
    admission:      AdmissionController,
    injector:       Injector,
    integrator:     Integrator,
    scheduler:      RebuildScheduler,
    tables:         RoutingTables,
    main:           BorderModel,
    alt:            Option<BorderModel>,
    departing:      VecDeque<Departure>,
    metrics:        Metrics,
    events:         EventLog,
    snapshots:      SnapshotRing,
    last_snapshot:  Option<SimSecond>,
}

impl Sim {
    /// Wire up a context over a finished grid.  Captures the second-0
    /// snapshot.
    pub(crate) fn assemble(
        config:    SimConfig,
        grid:      Grid,
        scenario:  ScenarioBlend,
        admission: AdmissionController,
        injector:  Injector,
    ) -> Self {
        let mode = match config.frame_budget {
            None => RebuildMode::Blocking,
            Some(_) => RebuildMode::Background { min_interval: config.min_rebuild_interval },
        };
        let crossing_cells = grid.cells_with(Region::Sink);
        let alt_cells = grid.cells_with(Region::AltSink);
        let alt = (!alt_cells.is_empty()).then(|| BorderModel::new(config.alt_lanes.max(1)));

        info!(
            n = grid.n(),
            conductive = grid.conductive_count(),
            yards = admission.len(),
            sources = injector.sources().len(),
            alt_crossing = alt.is_some(),
            ?mode,
            "simulation built"
        );

        let mut sim = Self {
            integrator:     Integrator::new(config.transport.clone(), &grid),
            scheduler:      RebuildScheduler::new(mode),
            tables:         RoutingTables::empty(grid.len()),
            state:          TransportState::new(grid.len(), config.unit_mass),
            clock:          SimClock::new(config.start_hour),
            rng:            SimRng::new(config.seed),
            main:           BorderModel::new(config.lanes),
            events:         EventLog::new(config.event_log_capacity),
            snapshots:      SnapshotRing::new(config.snapshot_capacity),
            departing:      VecDeque::new(),
            metrics:        Metrics::default(),
            last_snapshot:  None,
            grid:           Arc::new(grid),
            crossing_cells,
            alt_cells,
            scenario,
            admission,
            injector,
            alt,
            config,
        };
        sim.capture();
        sim
    }

    // ── Stepping ──────────────────────────────────────────────────────────

    /// Advance by `dt` simulated seconds.
    pub fn step(&mut self, dt: f64) -> SimResult<StepSummary> {
        self.step_observed(dt, &mut NoopObserver)
    }

    /// Advance by `dt` simulated seconds, reporting to `observer`.
    ///
    /// `dt == 0` is a no-op for motion but still services routing and
    /// wake-ups.  On `Err` the context is left as the failing phase left
    /// it; callers should [`restore`](Self::restore) or
    /// [`reset`](Self::reset).
    pub fn step_observed<O: SimObserver>(&mut self, dt: f64, observer: &mut O) -> SimResult<StepSummary> {
        if !(dt.is_finite() && dt >= 0.0) {
            return Err(SimError::InvalidStep(dt));
        }
        observer.on_step_start(&self.clock);
        let t0 = self.clock.now();
        let t1 = t0 + dt;
        let second_before = self.clock.whole_second();
        let hour = self.clock.hour_at(t0);
        let mut summary = StepSummary::default();

        // ① Capacity
        self.post_capacity(hour, t0);

        // ② Admission
        if self.admission.update(t0) > 0 {
            trace!(now = t0, "lot states changed");
        }
        if self.admission.take_dirty() {
            self.scheduler.mark_dirty();
        }

        // ③ Routing
        summary.installed = self.service_routing(t0)?;

        // ④ Wake-ups
        summary.woken = self.wake_due(t0)?;

        // ⑤ Injection
        summary.injected = self.inject(hour, t0, dt)?;

        // ⑥ Transport
        let input = StepInput {
            now:       t0,
            dt,
            friction:  self.scenario.value_or(COMMUTER_FRICTION, hour, 0.0) as f32,
            next_hour: self.clock.next_hour_boundary(t0),
        };
        let report = self.integrator.step(&mut self.state, &self.grid, &self.tables, &mut self.admission, input)?;
        summary.substeps = report.substeps;
        self.metrics.add_loss(&report.loss_hours);
        self.metrics.transfers += u64::from(report.transfers);
        self.metrics.substeps += u64::from(report.substeps);
        for e in report.events {
            self.log_transport(e);
        }
        for a in &report.arrivals {
            let model = match (a.crossing, self.alt.as_mut()) {
                (Crossing::Alt, Some(alt)) => alt,
                _ => &mut self.main,
            };
            model.enqueue(a.particle, a.at);
            let serial = self.serial_of(a.particle);
            self.events.push(serial, SimEvent::Enqueued { particle: a.particle, crossing: a.crossing, at: a.at });
        }
        summary.arrived = report.arrivals.len();

        // ⑦ Border
        let waiting = self.main.queue_len() + self.alt.as_ref().map_or(0, BorderModel::queue_len);
        let mut border_loss = [0.0; LossCause::ALL.len()];
        border_loss[LossCause::BorderQueue.index()] = waiting as f64 * dt / 3600.0;
        self.metrics.add_loss(&border_loss);
        summary.departed = self.advance_border(t0, t1)?;

        // ⑧ Age limit
        summary.expired = self.expire(t1)?;

        self.departing.retain(|d| d.until > t1);
        self.clock.advance(dt);
        self.metrics.live = self.state.store().len();
        self.metrics.queued = self.main.len() + self.alt.as_ref().map_or(0, BorderModel::len);

        // ⑨ Invariants
        if self.config.check_invariants {
            invariants::check(&self.state, &self.admission, &self.metrics)?;
        }

        // ⑩ Snapshot
        let second = self.clock.whole_second();
        if self.snapshot_due(second) {
            self.capture();
        }

        observer.on_step_end(&self.clock, &self.metrics);
        if second > second_before {
            observer.on_second(second, self.admission.yards());
        }
        Ok(summary)
    }

    /// Step `dt` at a time until `secs` more simulated seconds have passed.
    /// The last step is shortened to land exactly on the target.
    pub fn run_for<O: SimObserver>(&mut self, secs: f64, dt: f64, observer: &mut O) -> SimResult<()> {
        if !(dt.is_finite() && dt > 0.0) {
            return Err(SimError::InvalidStep(dt));
        }
        let target = self.clock.now() + secs.max(0.0);
        while self.clock.now() < target {
            let remaining = target - self.clock.now();
            self.step_observed(dt.min(remaining), observer)?;
        }
        info!(
            elapsed = self.clock.now(),
            injected = self.metrics.injected,
            exited = self.metrics.exited,
            live = self.metrics.live,
            loss_hours = self.metrics.total_loss_hours(),
            "run finished"
        );
        observer.on_run_end(&self.clock, &self.metrics);
        Ok(())
    }

    // ── Phases ────────────────────────────────────────────────────────────

    fn post_capacity(&mut self, hour: u32, now: f64) {
        let main_tph = capacity_at(&self.scenario, BORDER_CAPACITY, hour);
        self.main.set_capacity(main_tph, now);
        if let Some(alt) = self.alt.as_mut() {
            alt.set_capacity(capacity_at(&self.scenario, ALT_BORDER_CAPACITY, hour), now);
        }
    }

    fn service_routing(&mut self, now: f64) -> SimResult<Option<u64>> {
        let grid = &self.grid;
        let admission = &self.admission;
        let crossing = &self.crossing_cells;
        let alt = &self.alt_cells;
        let bias = self.config.yard_bias_weight;
        let out = self
            .scheduler
            .service(&mut self.tables, || routing_input(grid, admission, crossing, alt, bias))?;

        if let Some(token) = out.discarded {
            self.events.push(None, SimEvent::RoutingDiscarded { token, at: now });
        }
        if let Some(version) = out.installed {
            self.metrics.rebuilds += 1;
            self.events.push(None, SimEvent::RoutingInstalled { version, at: now });
        }
        Ok(out.installed)
    }

    fn wake_due(&mut self, now: f64) -> SimResult<usize> {
        let mut woken = 0;
        for id in self.state.dwell.pop_due(now) {
            let Some(p) = self.state.store().get(id) else { continue };
            let (crossing, mode) = (p.crossing, p.mode);
            let next = match mode {
                ModeState::Yard { dwell_until, .. } if dwell_until <= now => Some(self.after_conversion(crossing)),
                ModeState::Sleeping { yard, wake_at } if wake_at <= now => {
                    if self.border(crossing).is_open() {
                        Some(self.cleared_mode())
                    } else {
                        let again = self.clock.next_hour_boundary(now);
                        self.state.dwell.push(again, id);
                        Some(ModeState::Sleeping { yard, wake_at: again })
                    }
                }
                ModeState::Staging { .. } => {
                    if self.should_stage() {
                        self.state.dwell.push(now + self.config.transport.staging_recheck_secs, id);
                        None
                    } else {
                        Some(ModeState::EN_ROUTE)
                    }
                }
                // Stale entry: the truck moved on or its slot was reused.
                _ => None,
            };
            if let Some(mode) = next {
                self.state.particle_mut(id)?.mode = mode;
                woken += 1;
            }
        }
        Ok(woken)
    }

    fn inject(&mut self, hour: u32, now: f64, dt: f64) -> SimResult<usize> {
        let cleared = self.cleared_mode();
        let share = if self.alt.is_some() { self.config.alt_crossing_share } else { 0.0 };
        let seed = self.config.seed;
        let amplitude = self.config.transport.jitter_amplitude;
        let grid = &self.grid;
        let scenario = &self.scenario;
        let rng = &mut self.rng;

        let spawned = self.injector.inject(
            &mut self.state,
            dt,
            self.config.transport.road_cell_capacity,
            |src| scenario.value_or(&src.key, hour, 0.0),
            |src, serial| {
                let crossing = if share > 0.0 && rng.gen_bool(share) { Crossing::Alt } else { Crossing::Main };
                let mode = match src.origin {
                    Origin::Corridor => ModeState::Road { target: SinkSet::ConversionYards },
                    Origin::Industrial => cleared,
                };
                Particle::new(
                    serial,
                    src.origin,
                    crossing,
                    src.cell,
                    grid.cell_center(src.cell),
                    now,
                    particle_jitter(seed, serial, amplitude),
                    mode,
                )
            },
        )?;
        self.metrics.injected += spawned.len() as u64;
        Ok(spawned.len())
    }

    fn advance_border(&mut self, t0: f64, t1: f64) -> SimResult<usize> {
        let mut done: Vec<(Crossing, Completion)> =
            advance_split(&mut self.main, &self.clock, &self.scenario, BORDER_CAPACITY, t0, t1)
                .into_iter()
                .map(|c| (Crossing::Main, c))
                .collect();
        if let Some(alt) = self.alt.as_mut() {
            let alt_done = advance_split(alt, &self.clock, &self.scenario, ALT_BORDER_CAPACITY, t0, t1);
            done.extend(alt_done.into_iter().map(|c| (Crossing::Alt, c)));
            // Stable: main before alt on equal completion times.
            done.sort_by(|a, b| a.1.at.total_cmp(&b.1.at));
        }
        for &(crossing, c) in &done {
            self.depart(crossing, c)?;
        }
        self.mark_border_phases(t1);
        Ok(done.len())
    }

    fn depart(&mut self, crossing: Crossing, c: Completion) -> SimResult<()> {
        let p = self.state.despawn(c.particle)?;
        if let Some(yard) = p.held_lot() {
            self.admission.release(yard, c.at)?;
        }
        self.metrics.exited += 1;
        if self.departing.len() >= MAX_DEPARTING {
            self.departing.pop_front();
        }
        self.departing.push_back(Departure {
            serial: p.serial,
            crossing,
            lane: c.lane,
            pos: p.pos,
            at: c.at,
            until: c.at + self.config.depart_anim_secs,
        });
        self.events.push(Some(p.serial), SimEvent::Departed { particle: c.particle, lane: c.lane, at: c.at });
        Ok(())
    }

    /// Sync each border-held truck's phase and stall with its model.
    fn mark_border_phases(&mut self, now: f64) {
        for model in std::iter::once(&self.main).chain(self.alt.as_ref()) {
            for (i, lane) in model.lanes().iter().enumerate() {
                let Some(id) = lane.occupant() else { continue };
                let Some(p) = self.state.particle_mut(id).ok() else { continue };
                p.mode = ModeState::Cleared { phase: ClearedPhase::InService { lane: LaneId(i as u16) } };
                if p.lineage.stall.take().is_some() {
                    self.events.push(
                        Some(p.serial),
                        SimEvent::Transport(TransportEvent::Resumed { particle: id, cell: p.cell(), at: now }),
                    );
                }
            }
            let open = model.is_open();
            for id in model.queued() {
                let Some(p) = self.state.particle_mut(id).ok() else { continue };
                let closed_stall = p.lineage.stall == Some(StallReason::BorderClosed);
                let event = if !open && !closed_stall {
                    p.lineage.stall = Some(StallReason::BorderClosed);
                    p.lineage.stall_since = now;
                    TransportEvent::Stalled { particle: id, cell: p.cell(), reason: StallReason::BorderClosed, at: now }
                } else if open && closed_stall {
                    p.lineage.stall = None;
                    TransportEvent::Resumed { particle: id, cell: p.cell(), at: now }
                } else {
                    continue;
                };
                self.events.push(Some(p.serial), SimEvent::Transport(event));
            }
        }
    }

    fn expire(&mut self, now: f64) -> SimResult<usize> {
        let Some(max_age) = self.config.max_particle_age_secs else {
            return Ok(0);
        };
        let old: Vec<ParticleId> = self
            .state
            .store()
            .iter()
            .filter(|(_, p)| !p.mode.at_border() && p.age(now) > max_age)
            .map(|(id, _)| id)
            .collect();
        for &id in &old {
            let p = self.state.despawn(id)?;
            if let Some(yard) = p.held_lot() {
                self.admission.release(yard, now)?;
            }
            self.metrics.expired += 1;
            self.events.push(Some(p.serial), SimEvent::Expired { particle: id, at: now });
        }
        if !old.is_empty() {
            debug!(count = old.len(), max_age, "removed trucks past the age limit");
        }
        Ok(old.len())
    }

    // ── Clearance decisions ───────────────────────────────────────────────

    fn border(&self, crossing: Crossing) -> &BorderModel {
        match (crossing, self.alt.as_ref()) {
            (Crossing::Alt, Some(alt)) => alt,
            _ => &self.main,
        }
    }

    fn should_stage(&self) -> bool {
        let waiting = self.main.queue_len() + self.alt.as_ref().map_or(0, BorderModel::queue_len);
        waiting >= self.config.staging_threshold && self.admission.any_of_kind(YardKind::Staging)
    }

    /// Mode for a truck that is done with every yard.
    fn cleared_mode(&self) -> ModeState {
        if self.should_stage() {
            ModeState::Road { target: SinkSet::Staging }
        } else {
            ModeState::EN_ROUTE
        }
    }

    /// Mode for a truck whose conversion dwell just ended.
    fn after_conversion(&self, crossing: Crossing) -> ModeState {
        if !self.border(crossing).is_open() && self.admission.any_of_kind(YardKind::Overnight) {
            ModeState::Road { target: SinkSet::OvernightYards }
        } else {
            self.cleared_mode()
        }
    }

    fn serial_of(&self, id: ParticleId) -> Option<u64> {
        self.state.store().get(id).map(|p| p.serial)
    }

    fn log_transport(&mut self, event: TransportEvent) {
        let id = match event {
            TransportEvent::Stalled { particle, .. }
            | TransportEvent::Resumed { particle, .. }
            | TransportEvent::Rerouted { particle, .. }
            | TransportEvent::Admitted { particle, .. }
            | TransportEvent::Refused { particle, .. }
            | TransportEvent::LeftLot { particle, .. } => particle,
        };
        let serial = self.serial_of(id);
        self.events.push(serial, SimEvent::Transport(event));
    }

    // ── Snapshots, reset ──────────────────────────────────────────────────

    fn snapshot_due(&self, second: SimSecond) -> bool {
        let every = self.config.snapshot_interval_secs;
        every > 0 && self.last_snapshot.is_none_or(|last| second.0 / every > last.0 / every)
    }

    /// Capture a snapshot at the current whole second.
    pub fn capture(&mut self) -> SimSecond {
        let second = self.clock.whole_second();
        self.snapshots.push(Snapshot {
            second,
            clock:         self.clock.clone(),
            rng:           self.rng.clone(),
            state:         self.state.clone(),
            admission:     self.admission.clone(),
            injector:      self.injector.clone(),
            main:          self.main.clone(),
            alt:           self.alt.clone(),
            departing:     self.departing.clone(),
            metrics:       self.metrics.clone(),
            tables:        self.tables.clone(),
            routing_dirty: self.scheduler.is_dirty(),
        });
        self.last_snapshot = Some(second);
        trace!(%second, held = self.snapshots.len(), "captured snapshot");
        second
    }

    /// Roll back to the snapshot taken at `second`.  Snapshots after it are
    /// dropped; an in-flight routing rebuild is discarded on arrival.
    pub fn restore(&mut self, second: SimSecond) -> SimResult<()> {
        let snap = self.snapshots.get(second).cloned().ok_or(SimError::NoSnapshot(second))?;
        self.clock = snap.clock;
        self.rng = snap.rng;
        self.state = snap.state;
        self.admission = snap.admission;
        self.injector = snap.injector;
        self.main = snap.main;
        self.alt = snap.alt;
        self.departing = snap.departing;
        self.metrics = snap.metrics;
        self.tables = snap.tables;
        self.scheduler.abandon();
        if snap.routing_dirty {
            self.scheduler.mark_dirty();
        }
        self.snapshots.truncate_after(second);
        self.last_snapshot = Some(second);
        info!(%second, live = self.metrics.live, "restored snapshot");
        Ok(())
    }

    /// Back to time zero with an empty network.  Configuration, geometry,
    /// scenario, and runtime settings (cutoff, capacity multiplier, blend
    /// weight) are kept.
    pub fn reset(&mut self) {
        self.clock = SimClock::new(self.config.start_hour);
        self.rng = SimRng::new(self.config.seed);
        self.state.clear();
        self.admission.reset();
        self.injector.reset();
        self.main.reset(0.0);
        if let Some(alt) = self.alt.as_mut() {
            alt.reset(0.0);
        }
        self.departing.clear();
        self.metrics = Metrics::default();
        self.events.clear();
        self.snapshots.clear();
        self.tables = RoutingTables::empty(self.grid.len());
        self.scheduler.invalidate();
        self.last_snapshot = None;
        self.capture();
        info!("simulation reset");
    }

    /// Block until an in-flight background rebuild lands.
    pub fn settle_routing(&mut self) -> SimResult<Option<u64>> {
        let out = self.scheduler.wait(&mut self.tables)?;
        if let Some(version) = out.installed {
            self.metrics.rebuilds += 1;
            self.events.push(None, SimEvent::RoutingInstalled { version, at: self.clock.now() });
        }
        Ok(out.installed)
    }

    // ── Runtime settings ──────────────────────────────────────────────────

    pub fn set_cutoff(&mut self, cutoff: f64) -> SimResult<()> {
        self.admission.set_cutoff(cutoff)?;
        if self.admission.take_dirty() {
            self.scheduler.mark_dirty();
        }
        Ok(())
    }

    pub fn set_capacity_multiplier(&mut self, multiplier: f64) -> SimResult<()> {
        self.admission.set_capacity_multiplier(multiplier)?;
        if self.admission.take_dirty() {
            self.scheduler.mark_dirty();
        }
        Ok(())
    }

    /// Blend weight between the base and alternate scenario.
    pub fn set_scenario_weight(&mut self, weight: f64) -> SimResult<()> {
        self.scenario.set_weight(weight)?;
        Ok(())
    }

    // ── Queries ───────────────────────────────────────────────────────────

    #[inline]
    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    #[inline]
    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    #[inline]
    pub fn clock(&self) -> &SimClock {
        &self.clock
    }

    #[inline]
    pub fn now(&self) -> f64 {
        self.clock.now()
    }

    #[inline]
    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    #[inline]
    pub fn events(&self) -> &EventLog {
        &self.events
    }

    #[inline]
    pub fn snapshots(&self) -> &SnapshotRing {
        &self.snapshots
    }

    #[inline]
    pub fn state(&self) -> &TransportState {
        &self.state
    }

    #[inline]
    pub fn admission(&self) -> &AdmissionController {
        &self.admission
    }

    #[inline]
    pub fn scenario(&self) -> &ScenarioBlend {
        &self.scenario
    }

    #[inline]
    pub fn tables(&self) -> &RoutingTables {
        &self.tables
    }

    pub fn routing_stats(&self) -> SchedulerStats {
        self.scheduler.stats()
    }

    /// The border model serving `crossing`, if that crossing exists.
    pub fn border_model(&self, crossing: Crossing) -> Option<&BorderModel> {
        match crossing {
            Crossing::Main => Some(&self.main),
            Crossing::Alt => self.alt.as_ref(),
        }
    }

    #[inline]
    pub fn departing(&self) -> &VecDeque<Departure> {
        &self.departing
    }

    /// Live trucks per mode, indexed like [`ModeKind::ALL`].  `Departing`
    /// counts the departure list.
    pub fn mode_counts(&self) -> [usize; ModeKind::ALL.len()] {
        let mut counts = [0; ModeKind::ALL.len()];
        for (_, p) in self.state.store().iter() {
            counts[p.mode.kind() as usize] += 1;
        }
        counts[ModeKind::Departing as usize] = self.departing.len();
        counts
    }

    /// `(yard, occupants / capacity)` for every lot.
    pub fn yard_fill(&self) -> Vec<(YardId, f64)> {
        self.admission.yards().iter().map(|y| (y.id(), y.fill_ratio())).collect()
    }

    #[inline]
    pub fn yards(&self) -> &[Yard] {
        self.admission.yards()
    }

    /// Busy share of each lane of `crossing` since time zero.
    pub fn lane_utilization(&self, crossing: Crossing) -> Vec<f64> {
        let now = self.clock.now();
        let Some(model) = self.border_model(crossing) else {
            return Vec::new();
        };
        model
            .lanes()
            .iter()
            .map(|l| if now > 0.0 { (l.busy_secs(now) / now).clamp(0.0, 1.0) } else { 0.0 })
            .collect()
    }

    /// Hash of the observable state: clock, counters, every truck, every
    /// lot, and the border queues.  Routing versions are excluded, so a run
    /// restored from a snapshot digests like the original.
    pub fn state_digest(&self) -> u64 {
        let store = self.state.store();
        let mut buf: Vec<u8> = Vec::with_capacity(128 + store.len() * 48);
        buf.extend_from_slice(&self.clock.now().to_bits().to_le_bytes());
        let m = &self.metrics;
        for v in [m.injected, m.exited, m.expired, m.transfers] {
            buf.extend_from_slice(&v.to_le_bytes());
        }
        for h in m.loss_hours {
            buf.extend_from_slice(&h.to_bits().to_le_bytes());
        }
        for (id, p) in store.iter() {
            buf.extend_from_slice(&id.0.to_le_bytes());
            buf.extend_from_slice(&p.serial.to_le_bytes());
            buf.extend_from_slice(&p.cell().0.to_le_bytes());
            buf.extend_from_slice(&p.pos.x.to_bits().to_le_bytes());
            buf.extend_from_slice(&p.pos.y.to_bits().to_le_bytes());
            buf.push(p.mode.kind() as u8);
            buf.push(u8::from(p.on_grid()));
            buf.extend_from_slice(&p.held_lot().map_or(u16::MAX, |y| y.0).to_le_bytes());
        }
        for y in self.admission.yards() {
            buf.extend_from_slice(&y.occupants().to_le_bytes());
            buf.extend_from_slice(y.state().as_str().as_bytes());
        }
        for model in std::iter::once(&self.main).chain(self.alt.as_ref()) {
            buf.extend_from_slice(&(model.queue_len() as u64).to_le_bytes());
            buf.extend_from_slice(&model.served().to_le_bytes());
            buf.extend(model.queued().flat_map(|id| id.0.to_le_bytes()));
        }
        xxh3_64(&buf)
    }
}

// ── Free helpers ──────────────────────────────────────────────────────────────

/// Hourly crossing capacity.  A missing key means unlimited.
fn capacity_at(scenario: &ScenarioBlend, key: &str, hour: u32) -> f64 {
    scenario.value_or(key, hour, f64::INFINITY)
}

/// Advance `model` to `t1`, re-posting capacity at every top of the hour
/// crossed on the way so service times follow the hourly schedule.
fn advance_split(
    model:    &mut BorderModel,
    clock:    &SimClock,
    scenario: &ScenarioBlend,
    key:      &str,
    t0:       f64,
    t1:       f64,
) -> Vec<Completion> {
    let mut out = Vec::new();
    let mut t = t0;
    loop {
        let boundary = clock.next_hour_boundary(t);
        if boundary >= t1 {
            break;
        }
        out.extend(model.advance(boundary));
        model.set_capacity(capacity_at(scenario, key, clock.hour_at(boundary)), boundary);
        t = boundary;
    }
    out.extend(model.advance(t1));
    out
}

/// Snapshot of everything a routing rebuild reads.
fn routing_input(
    grid:        &Arc<Grid>,
    admission:   &AdmissionController,
    crossing:    &[CellId],
    alt:         &[CellId],
    bias_weight: f32,
) -> RoutingInput {
    let penalties = admission.entry_penalties();
    let bias = (bias_weight > 0.0).then_some((SinkSet::Crossing, bias_weight));
    let mut fields = vec![
        FieldSpec::new(SinkSet::Crossing, crossing.to_vec()),
        FieldSpec::new(SinkSet::AltCrossing, alt.to_vec()),
    ];
    for (set, kind) in [
        (SinkSet::ConversionYards, YardKind::Conversion),
        (SinkSet::OvernightYards, YardKind::Overnight),
        (SinkSet::Staging, YardKind::Staging),
    ] {
        let mut spec = FieldSpec::new(set, admission.sink_cells(kind));
        spec.closed_lots = admission.closed_mask(kind);
        spec.lot_penalty = penalties.clone();
        spec.bias = bias;
        fields.push(spec);
    }
    RoutingInput { grid: Arc::clone(grid), fields }
}
