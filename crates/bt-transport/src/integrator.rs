//! The transport integrator.
//!
//! # One step
//!
//! ```text
//! n = clamp(ceil(dt · v_max / (cfl · cell)), 1, max_substeps)
//! for each of n equal sub-steps h = dt / n:
//!     headings  ← hop direction of every moving truck           (read-only)
//!     plan      ← per truck, ascending id, against frozen occupancy
//!     apply     ← transfers in ascending id, re-checking live capacity
//! ```
//!
//! # Plan
//!
//! A moving truck reads the next hop of its table.  The hop is gated: lot
//! cells need an admitting yard, road cells need room below
//! `road_cell_capacity`.  A gated hop falls back to a neighbour that still
//! descends, else to one that climbs (backtrack), else the truck stalls with
//! a reason.  The truck then moves axially towards the chosen neighbour's
//! centre at `speed · c(ρ) · jitter`.  Crossing into that neighbour becomes
//! an intent; staying inside the cell just updates the position.
//!
//! # Apply
//!
//! Intents commit in ascending id.  Capacity is re-checked against live
//! state; a truck that loses the race keeps its prior position and stalls.

use bt_admission::{AdmissionController, Decision, YardKind};
use bt_core::{CellId, LossCause, ParticleId, StallReason, WorldPoint, YardId};
use bt_grid::{Dir, Grid, Occupancy, Region};
use bt_routing::{RoutingTable, RoutingTables, SinkSet};
use rustc_hash::FxHashMap;
use tracing::trace;

use crate::{
    ClearedPhase, CongestionLaw, Crossing, ModeState, Particle, TransportResult, TransportState,
};

// ── Parameters ────────────────────────────────────────────────────────────────

#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TransportParams {
    /// Speed on cells with no posted limit, m/s.
    pub free_flow_mps:         f32,
    pub congestion:            CongestionLaw,
    /// Trucks a road cell holds before it counts as gridlocked.
    pub road_cell_capacity:    u32,
    /// Largest share of a cell a truck may cross per sub-step.
    pub cfl:                   f64,
    pub max_substeps:          u32,
    /// Jitter amplitude assumed when bounding the fastest truck.
    pub jitter_amplitude:      f32,
    pub conversion_dwell_secs: f64,
    /// How often a staged truck re-checks the border queue.
    pub staging_recheck_secs:  f64,
}

impl Default for TransportParams {
    fn default() -> Self {
        Self {
            free_flow_mps:         13.9,
            congestion:            CongestionLaw::default(),
            road_cell_capacity:    6,
            cfl:                   0.9,
            max_substeps:          64,
            jitter_amplitude:      0.1,
            conversion_dwell_secs: 1_800.0,
            staging_recheck_secs:  120.0,
        }
    }
}

// ── Step input / report ───────────────────────────────────────────────────────

#[derive(Copy, Clone, Debug)]
pub struct StepInput {
    /// Simulated time at the start of the step.
    pub now:       f64,
    pub dt:        f64,
    /// Commuter friction added to every downstream density, trucks/cell.
    pub friction:  f32,
    /// Next top of the hour after `now`; overnight wake-ups are set to it.
    pub next_hour: f64,
}

/// A truck that reached a crossing and must be enqueued there.
#[derive(Copy, Clone, PartialEq, Debug)]
pub struct Arrival {
    pub particle: ParticleId,
    pub crossing: Crossing,
    pub at:       f64,
}

/// Routing-lineage events, fed to the simulation's event log.
#[derive(Copy, Clone, PartialEq, Debug)]
pub enum TransportEvent {
    Stalled  { particle: ParticleId, cell: CellId, reason: StallReason, at: f64 },
    Resumed  { particle: ParticleId, cell: CellId, at: f64 },
    Rerouted { particle: ParticleId, from_version: u64, to_version: u64, at: f64 },
    Admitted { particle: ParticleId, yard: YardId, at: f64 },
    Refused  { particle: ParticleId, yard: YardId, at: f64 },
    LeftLot  { particle: ParticleId, yard: YardId, at: f64 },
}

#[derive(Clone, Debug, Default)]
pub struct StepReport {
    pub substeps:   u32,
    /// Committed cell transfers.
    pub transfers:  u32,
    /// Truck-hours lost this step, indexed by `LossCause::index()`.
    pub loss_hours: [f64; LossCause::ALL.len()],
    pub arrivals:   Vec<Arrival>,
    pub events:     Vec<TransportEvent>,
}

impl StepReport {
    fn lose(&mut self, cause: LossCause, hours: f64) {
        self.loss_hours[cause.index()] += hours;
    }
}

// ── Internals ─────────────────────────────────────────────────────────────────

/// How a truck enters a cell.
#[derive(Copy, Clone, PartialEq, Debug)]
enum Entry {
    Border(Crossing),
    Admit(YardId),
    /// Lot-to-lot move inside the truck's own lot.
    Internal,
    Road,
}

#[derive(Copy, Clone, Debug)]
struct Intent {
    id:    ParticleId,
    from:  CellId,
    to:    CellId,
    pos:   WorldPoint,
    entry: Entry,
}

type Headings = FxHashMap<CellId, [u32; 4]>;

/// Lot family a yard-bound sink set routes to.
fn lot_kind(set: SinkSet) -> Option<YardKind> {
    match set {
        SinkSet::ConversionYards => Some(YardKind::Conversion),
        SinkSet::OvernightYards  => Some(YardKind::Overnight),
        SinkSet::Staging         => Some(YardKind::Staging),
        SinkSet::Crossing | SinkSet::AltCrossing => None,
    }
}

/// Sink set a moving truck follows.
///
/// A yard-bound truck whose table has no sinks falls back to its crossing
/// only when no lot of that kind exists at all.  When such lots exist but
/// none admits, the result is `None`: the truck holds where it is.
pub fn effective_set(p: &Particle, tables: &RoutingTables, admission: &AdmissionController) -> Option<SinkSet> {
    let crossing = if p.crossing == Crossing::Alt && tables.get(SinkSet::AltCrossing).has_sinks() {
        SinkSet::AltCrossing
    } else {
        SinkSet::Crossing
    };
    match p.mode {
        ModeState::Road { target } if tables.get(target).has_sinks() => Some(target),
        ModeState::Road { target } if lot_kind(target).is_some_and(|k| admission.any_of_kind(k)) => None,
        _ => Some(crossing),
    }
}

/// Move from `pos` towards `target` (the centre of the neighbour in `dir`):
/// first onto the cell's centre line, then along the axis.
pub(crate) fn axial_step(pos: WorldPoint, center: WorldPoint, target: WorldPoint, dir: Dir, budget: f64) -> WorldPoint {
    let mut p = pos;
    let mut left = budget.max(0.0);
    let mut slide = |from: &mut f64, to: f64| {
        let d = to - *from;
        let m = d.abs().min(left);
        *from += m.copysign(d);
        left -= m;
    };
    if dir.is_horizontal() {
        slide(&mut p.y, center.y);
        slide(&mut p.x, target.x);
    } else {
        slide(&mut p.x, center.x);
        slide(&mut p.y, target.y);
    }
    p
}

fn note_stall(p: &mut Particle, id: ParticleId, reason: StallReason, at: f64, report: &mut StepReport) {
    if p.lineage.stall != Some(reason) {
        p.lineage.stall = Some(reason);
        p.lineage.stall_since = at;
        report.events.push(TransportEvent::Stalled { particle: id, cell: p.cell, reason, at });
    }
}

fn note_resume(p: &mut Particle, id: ParticleId, at: f64, report: &mut StepReport) {
    if p.lineage.stall.take().is_some() {
        report.events.push(TransportEvent::Resumed { particle: id, cell: p.cell, at });
    }
}

// ── Integrator ────────────────────────────────────────────────────────────────

#[derive(Clone, Debug)]
pub struct Integrator {
    params:    TransportParams,
    vmax:      f64,
    cell_size: f64,
}

impl Integrator {
    pub fn new(params: TransportParams, grid: &Grid) -> Self {
        let posted = grid.speed_limit.iter().copied().fold(0.0_f32, f32::max);
        let vmax = posted.max(params.free_flow_mps) as f64 * (1.0 + params.jitter_amplitude.clamp(0.0, 0.9) as f64);
        Self { params, vmax, cell_size: grid.cell_size() }
    }

    #[inline]
    pub fn params(&self) -> &TransportParams {
        &self.params
    }

    /// Sub-steps needed for `dt` so the fastest truck crosses at most
    /// `cfl` of a cell per sub-step, capped at `max_substeps`.
    pub fn substeps(&self, dt: f64) -> u32 {
        if dt <= 0.0 {
            return 0;
        }
        let need = (dt * self.vmax / (self.params.cfl * self.cell_size)).ceil();
        (need.max(1.0) as u32).min(self.params.max_substeps.max(1))
    }

    /// Advance every moving truck by `input.dt`.
    pub fn step(
        &self,
        state:     &mut TransportState,
        grid:      &Grid,
        tables:    &RoutingTables,
        admission: &mut AdmissionController,
        input:     StepInput,
    ) -> TransportResult<StepReport> {
        let mut report = StepReport::default();
        let n = self.substeps(input.dt);
        if n == 0 {
            return Ok(report);
        }
        let h = input.dt / n as f64;
        for k in 0..n {
            let t = input.now + (k + 1) as f64 * h;
            let headings = headings(state, grid, tables, admission);
            let intents = self.plan(state, grid, tables, admission, &headings, h, t, input.friction, &mut report);
            self.apply(state, grid, admission, intents, t, input.next_hour, &mut report)?;
        }
        report.substeps = n;
        Ok(report)
    }

    // ── Gating ────────────────────────────────────────────────────────────

    /// What entering `to` would mean for a truck holding `held`.
    fn classify(grid: &Grid, table: &RoutingTable, held: Option<YardId>, to: CellId) -> Result<Entry, StallReason> {
        let region = grid.region[to.index()];
        if region.is_crossing() && table.is_sink(to) {
            let crossing = if region == Region::AltSink { Crossing::Alt } else { Crossing::Main };
            return Ok(Entry::Border(crossing));
        }
        if region.is_lot() {
            let yard = grid.yard_of[to.index()];
            return if held == Some(yard) {
                Ok(Entry::Internal)
            } else if table.is_sink(to) {
                Ok(Entry::Admit(yard))
            } else {
                Err(StallReason::LotFull)
            };
        }
        Ok(Entry::Road)
    }

    /// Plan-time gate against the frozen occupancy.
    fn gate(
        &self,
        grid:      &Grid,
        table:     &RoutingTable,
        occ:       &Occupancy,
        admission: &AdmissionController,
        held:      Option<YardId>,
        to:        CellId,
    ) -> Result<Entry, StallReason> {
        match Self::classify(grid, table, held, to)? {
            Entry::Admit(y) if !admission.can_admit(y) => Err(StallReason::LotFull),
            Entry::Road if occ.count(to) >= self.params.road_cell_capacity as usize => Err(StallReason::RoadFull),
            e => Ok(e),
        }
    }

    /// Best ungated neighbour other than `hop`: lowest potential below the
    /// current cell's, else lowest potential above it.
    #[allow(clippy::too_many_arguments)]
    fn alternative(
        &self,
        grid:      &Grid,
        table:     &RoutingTable,
        occ:       &Occupancy,
        admission: &AdmissionController,
        held:      Option<YardId>,
        at:        CellId,
        hop:       CellId,
    ) -> Option<(CellId, Entry)> {
        let here = table.potential(at)?;
        let mut down: Option<(u32, CellId, Entry)> = None;
        let mut up: Option<(u32, CellId, Entry)> = None;
        for dir in Dir::ALL {
            let Some(a) = grid.neighbor(at, dir) else { continue };
            if a == hop || !grid.can_step(at, dir) {
                continue;
            }
            let Some(pa) = table.potential(a) else { continue };
            let Ok(entry) = self.gate(grid, table, occ, admission, held, a) else { continue };
            let slot = if pa < here { &mut down } else { &mut up };
            if slot.is_none_or(|(best, _, _)| pa < best) {
                *slot = Some((pa, a, entry));
            }
        }
        down.or(up).map(|(_, a, e)| (a, e))
    }

    // ── Plan ──────────────────────────────────────────────────────────────

    #[allow(clippy::too_many_arguments)]
    fn plan(
        &self,
        state:     &mut TransportState,
        grid:      &Grid,
        tables:    &RoutingTables,
        admission: &AdmissionController,
        headings:  &Headings,
        h:         f64,
        t:         f64,
        friction:  f32,
        report:    &mut StepReport,
    ) -> Vec<Intent> {
        let occ = &state.occupancy;
        let max_disp = self.params.cfl * self.cell_size;
        let mut intents = Vec::new();

        for id in state.store.ids() {
            let Some(p) = state.store.get_mut(id) else { continue };
            if !p.on_grid || !p.mode.is_moving() {
                continue;
            }
            let Some(set) = effective_set(p, tables, admission) else {
                note_stall(p, id, StallReason::LotFull, t, report);
                report.lose(LossCause::LotFull, h / 3600.0);
                continue;
            };
            let table = tables.get(set);

            if p.lineage.route_version != tables.version() {
                if p.lineage.stall.is_some() {
                    report.events.push(TransportEvent::Rerouted {
                        particle:     id,
                        from_version: p.lineage.route_version,
                        to_version:   tables.version(),
                        at:           t,
                    });
                }
                if p.lineage.last_set.is_some() {
                    p.lineage.reroutes += 1;
                }
                p.lineage.route_version = tables.version();
            }
            p.lineage.last_set = Some(set);

            let c = p.cell;
            let Some(hop) = table.next_hop(c) else {
                if table.is_sink(c) {
                    if let Ok(entry) = Self::classify(grid, table, p.held, c) {
                        intents.push(Intent { id, from: c, to: c, pos: grid.cell_center(c), entry });
                        continue;
                    }
                }
                note_stall(p, id, StallReason::DeadEnd, t, report);
                report.lose(LossCause::DeadEnd, h / 3600.0);
                continue;
            };

            let (target, entry) = match self.gate(grid, table, occ, admission, p.held, hop) {
                Ok(e) => (hop, e),
                Err(reason) => match self.alternative(grid, table, occ, admission, p.held, c, hop) {
                    Some(alt) => alt,
                    None => {
                        note_stall(p, id, reason, t, report);
                        report.lose(reason.loss_cause(), h / 3600.0);
                        continue;
                    }
                },
            };
            let Some(dir) = grid.dir_between(c, target) else { continue };

            let opposing = headings.get(&target).map_or(0, |hd| hd[dir.opposite().index()]);
            let rho = CongestionLaw::effective_density(occ.count(target) as u32, opposing, friction);
            let f = self.params.congestion.factor(rho);
            let v = grid.speed_at(c, self.params.free_flow_mps) as f64 * f as f64 * p.jitter as f64;
            let next = axial_step(p.pos, grid.cell_center(c), grid.cell_center(target), dir, (v * h).min(max_disp));

            report.lose(LossCause::Congestion, (1.0 - f as f64) * h / 3600.0);
            note_resume(p, id, t, report);

            if grid.cell_at(next) == Some(target) {
                intents.push(Intent { id, from: c, to: target, pos: next, entry });
            } else {
                p.pos = next;
            }
        }
        intents
    }

    // ── Apply ─────────────────────────────────────────────────────────────

    #[allow(clippy::too_many_arguments)]
    fn apply(
        &self,
        state:     &mut TransportState,
        grid:      &Grid,
        admission: &mut AdmissionController,
        intents:   Vec<Intent>,
        t:         f64,
        next_hour: f64,
        report:    &mut StepReport,
    ) -> TransportResult<()> {
        for it in intents {
            match it.entry {
                Entry::Border(crossing) => {
                    state.relocate(it.id, it.to, grid.cell_center(it.to))?;
                    leave_lot(state, grid, admission, it.id, t, report)?;
                    state.detach(it.id)?;
                    let p = state.particle_mut(it.id)?;
                    p.mode = ModeState::Cleared { phase: ClearedPhase::Queued { since: t } };
                    p.lineage.stall = None;
                    report.arrivals.push(Arrival { particle: it.id, crossing, at: t });
                    report.transfers += 1;
                }
                Entry::Admit(yard) => match admission.try_admit(yard, t)? {
                    Decision::Admitted => {
                        let place = least_loaded(state.occupancy(), admission.yard(yard)?.cells()).unwrap_or(it.to);
                        state.relocate(it.id, place, grid.cell_center(place))?;
                        leave_lot(state, grid, admission, it.id, t, report)?;
                        state.set_held(it.id, Some(yard))?;
                        let kind = admission.yard(yard)?.kind();
                        let p = state.particle_mut(it.id)?;
                        p.lineage.stall = None;
                        let wake = match kind {
                            YardKind::Conversion => {
                                let until = t + self.params.conversion_dwell_secs;
                                p.mode = ModeState::Yard { yard, arrived_at: t, dwell_until: until };
                                until
                            }
                            YardKind::Overnight => {
                                let wake = next_hour.max(t);
                                p.mode = ModeState::Sleeping { yard, wake_at: wake };
                                wake
                            }
                            YardKind::Staging => {
                                p.mode = ModeState::Staging { yard, since: t };
                                t + self.params.staging_recheck_secs
                            }
                        };
                        state.dwell.push(wake, it.id);
                        report.events.push(TransportEvent::Admitted { particle: it.id, yard, at: t });
                        report.transfers += 1;
                        trace!(particle = %it.id, %yard, place = %place, "admitted");
                    }
                    Decision::Refused(_) => {
                        let p = state.particle_mut(it.id)?;
                        note_stall(p, it.id, StallReason::LotFull, t, report);
                        report.events.push(TransportEvent::Refused { particle: it.id, yard, at: t });
                    }
                },
                Entry::Internal => {
                    if it.from != it.to {
                        state.relocate(it.id, it.to, it.pos)?;
                        report.transfers += 1;
                    }
                }
                Entry::Road => {
                    if state.occupancy().count(it.to) >= self.params.road_cell_capacity as usize {
                        let p = state.particle_mut(it.id)?;
                        note_stall(p, it.id, StallReason::RoadFull, t, report);
                        continue;
                    }
                    state.relocate(it.id, it.to, it.pos)?;
                    leave_lot(state, grid, admission, it.id, t, report)?;
                    report.transfers += 1;
                }
            }
        }
        Ok(())
    }
}

/// Per-cell counts of moving trucks by the direction of their next hop.
fn headings(state: &TransportState, grid: &Grid, tables: &RoutingTables, admission: &AdmissionController) -> Headings {
    let mut out = Headings::default();
    for (_, p) in state.store.iter() {
        if !p.on_grid || !p.mode.is_moving() {
            continue;
        }
        let Some(set) = effective_set(p, tables, admission) else { continue };
        let table = tables.get(set);
        let Some(hop) = table.next_hop(p.cell) else { continue };
        if let Some(dir) = grid.dir_between(p.cell, hop) {
            out.entry(p.cell).or_default()[dir.index()] += 1;
        }
    }
    out
}

/// Release the truck's held lot if its cell is no longer part of it.
fn leave_lot(
    state:     &mut TransportState,
    grid:      &Grid,
    admission: &mut AdmissionController,
    id:        ParticleId,
    t:         f64,
    report:    &mut StepReport,
) -> TransportResult<()> {
    let p = state.particle(id)?;
    let Some(yard) = p.held else { return Ok(()) };
    if grid.yard_of[p.cell.index()] == yard {
        return Ok(());
    }
    admission.release(yard, t)?;
    state.set_held(id, None)?;
    report.events.push(TransportEvent::LeftLot { particle: id, yard, at: t });
    Ok(())
}

/// Emptiest cell of a lot, lowest id on ties.
fn least_loaded(occ: &Occupancy, cells: &[CellId]) -> Option<CellId> {
    cells.iter().copied().min_by_key(|&c| occ.count(c))
}
