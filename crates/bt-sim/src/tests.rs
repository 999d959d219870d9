//! Integration tests for bt-sim.

#[cfg(test)]
mod helpers {
    use bt_admission::YardKind;
    use bt_core::WorldPoint;
    use bt_grid::RoadStamp;
    use bt_scenario::{HourlyTable, ScenarioBlend, ScenarioData};
    use bt_transport::{CongestionLaw, Origin, TransportParams};

    use crate::{Sim, SimBuilder, SimConfig};

    pub fn wp(x: f64, y: f64) -> WorldPoint {
        WorldPoint::new(x, y)
    }

    /// 12×12 grid of 10 m cells, one lane, free-flowing roads.
    pub fn config() -> SimConfig {
        SimConfig {
            grid_n:                 12,
            cell_size_m:            10.0,
            lanes:                  1,
            transport:              TransportParams {
                congestion:         CongestionLaw { rho0: 100.0, exponent: 3.7 },
                road_cell_capacity: 50,
                jitter_amplitude:   0.0,
                ..TransportParams::default()
            },
            snapshot_interval_secs: 10,
            event_log_capacity:     100_000,
            ..SimConfig::default()
        }
    }

    /// `flow` at `rate` trucks/h during `hour` only.
    pub fn flow_at(hour: u32, rate: f64) -> ScenarioData {
        let mut t = HourlyTable::constant(0.0);
        t.set(hour, rate);
        ScenarioData::new().with("flow", t)
    }

    pub fn constant_flow(rate: f64) -> ScenarioData {
        ScenarioData::new().with("flow", HourlyTable::constant(rate))
    }

    /// Road along row 0 from the source (col 0) to the crossing (col 10).
    pub fn corridor(cfg: SimConfig, scenario: ScenarioBlend, origin: Origin) -> Sim {
        SimBuilder::new(cfg, scenario)
            .road(vec![wp(5.0, 5.0), wp(105.0, 5.0)], RoadStamp::default())
            .source("gate", wp(5.0, 5.0), origin, "flow")
            .crossing(wp(105.0, 5.0))
            .build()
            .unwrap()
    }

    /// The corridor plus a one-cell conversion lot north of col 5.
    pub fn with_lot(cfg: SimConfig, scenario: ScenarioBlend, capacity: u32) -> Sim {
        SimBuilder::new(cfg, scenario)
            .road(vec![wp(5.0, 5.0), wp(105.0, 5.0)], RoadStamp::default())
            .yard(
                "lot",
                YardKind::Conversion,
                vec![wp(50.0, 10.0), wp(60.0, 10.0), wp(60.0, 20.0), wp(50.0, 20.0)],
                capacity,
            )
            .source("corridor", wp(5.0, 5.0), Origin::Corridor, "flow")
            .crossing(wp(105.0, 5.0))
            .build()
            .unwrap()
    }
}

// ── Builder ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod builder {
    use bt_admission::YardKind;
    use bt_grid::{Region, RoadStamp};
    use bt_scenario::{ScenarioBlend, ScenarioData};
    use bt_transport::Origin;

    use super::helpers::{config, corridor, wp};
    use crate::{SimBuilder, SimError};

    #[test]
    fn crossing_is_required() {
        let err = SimBuilder::new(config(), ScenarioBlend::single(ScenarioData::new()))
            .road(vec![wp(5.0, 5.0), wp(105.0, 5.0)], RoadStamp::default())
            .build()
            .err();
        assert!(matches!(err, Some(SimError::Config(_))));
    }

    #[test]
    fn features_outside_the_grid_are_rejected() {
        let scen = || ScenarioBlend::single(ScenarioData::new());
        let far = SimBuilder::new(config(), scen()).crossing(wp(5_000.0, 5.0)).build().err();
        assert!(matches!(far, Some(SimError::Config(_))));

        let src = SimBuilder::new(config(), scen())
            .crossing(wp(105.0, 5.0))
            .source("nowhere", wp(-50.0, 5.0), Origin::Industrial, "flow")
            .build()
            .err();
        assert!(matches!(src, Some(SimError::Config(_))));
    }

    #[test]
    fn too_many_lots_are_rejected() {
        // One id past the last usable one would alias the sentinel.
        let builder = (0..=usize::from(u16::MAX)).fold(
            SimBuilder::new(config(), ScenarioBlend::single(ScenarioData::new())).crossing(wp(105.0, 5.0)),
            |b, i| b.yard(format!("lot {i}"), YardKind::Conversion, Vec::new(), 1),
        );
        let err = builder.build().err();
        assert!(matches!(err, Some(SimError::Config(ref m)) if m.contains("65536 lots")));
    }

    #[test]
    fn invalid_config_is_rejected() {
        let cfg = crate::SimConfig { lanes: 0, ..config() };
        let err = SimBuilder::new(cfg, ScenarioBlend::single(ScenarioData::new())).crossing(wp(5.0, 5.0)).build().err();
        assert!(matches!(err, Some(SimError::Config(_))));
    }

    #[test]
    fn geometry_lands_on_the_grid() {
        let sim = corridor(config(), ScenarioBlend::single(ScenarioData::new()), Origin::Industrial);
        let g = sim.grid();
        assert_eq!(g.cells_with(Region::Sink), vec![g.cell(0, 10)]);
        assert!((0..10).all(|col| g.region[g.cell(0, col).index()] == Region::Road));
        assert_eq!(sim.snapshots().len(), 1, "second-0 snapshot taken at build");
    }

    #[test]
    fn detached_lot_is_bridged() {
        // Lot two rows above the road: one connector cell is paved.
        let sim = SimBuilder::new(config(), ScenarioBlend::single(ScenarioData::new()))
            .road(vec![wp(5.0, 5.0), wp(105.0, 5.0)], RoadStamp::default())
            .yard("far", YardKind::Conversion, vec![wp(50.0, 20.0), wp(60.0, 20.0), wp(60.0, 30.0), wp(50.0, 30.0)], 5)
            .crossing(wp(105.0, 5.0))
            .build()
            .unwrap();
        let g = sim.grid();
        assert_eq!(g.region[g.cell(1, 5).index()], Region::Road);
        assert_eq!(sim.admission().yards()[0].cells(), &[g.cell(2, 5)]);
    }
}

// ── Stepping ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod stepping {
    use bt_core::{LossCause, StallReason};
    use bt_scenario::{ScenarioBlend, ScenarioData};
    use bt_transport::Origin;
    use test_log::test;

    use super::helpers::{config, corridor, flow_at};
    use crate::{NoopObserver, SimError, SimEvent};

    #[test]
    fn ten_per_second_for_an_hour_all_cross() {
        let mut sim = corridor(config(), ScenarioBlend::single(flow_at(0, 36_000.0)), Origin::Industrial);
        sim.run_for(3_600.0 + 600.0, 1.0, &mut NoopObserver).unwrap();
        let m = sim.metrics();
        assert_eq!(m.injected, 36_000);
        assert_eq!(m.exited, m.injected);
        assert_eq!(m.live, 0);
        assert_eq!(m.expired, 0);
    }

    #[test]
    fn conservation_holds_every_step() {
        let mut sim = corridor(config(), ScenarioBlend::single(flow_at(0, 7_200.0)), Origin::Industrial);
        for _ in 0..200 {
            sim.step(0.5).unwrap();
            let m = sim.metrics();
            assert_eq!(m.injected - m.exited - m.expired, m.live as u64);
        }
        assert!(sim.metrics().exited > 0);
    }

    #[test]
    fn bad_deltas_are_rejected_without_side_effects() {
        let mut sim = corridor(config(), ScenarioBlend::single(flow_at(0, 3_600.0)), Origin::Industrial);
        for dt in [-1.0, f64::NAN, f64::INFINITY] {
            assert!(matches!(sim.step(dt), Err(SimError::InvalidStep(_))));
        }
        assert_eq!(sim.now(), 0.0);
        assert_eq!(sim.metrics().injected, 0);
    }

    #[test]
    fn zero_delta_moves_nothing() {
        let mut sim = corridor(config(), ScenarioBlend::single(flow_at(0, 3_600.0)), Origin::Industrial);
        let s = sim.step(0.0).unwrap();
        assert_eq!(s.injected, 0);
        assert_eq!(sim.now(), 0.0);
        assert_eq!(sim.metrics().rebuilds, 1, "routing still serviced");
    }

    #[test]
    fn closed_border_holds_trucks_and_accrues_queue_loss() {
        // Start at 23:00 with the border shut until midnight.
        let mut capacity = bt_scenario::HourlyTable::constant(f64::INFINITY);
        capacity.set(23, 0.0);
        let scen = flow_at(23, 10.0).with(bt_scenario::BORDER_CAPACITY, capacity);
        let cfg = crate::SimConfig { start_hour: 23, ..config() };
        let mut sim = corridor(cfg, ScenarioBlend::single(scen), Origin::Industrial);

        let mut last_loss = 0.0;
        while sim.now() < 3_590.0 {
            sim.step(1.0).unwrap();
            let loss = sim.metrics().total_loss_hours();
            assert!(loss >= last_loss, "loss never decreases");
            last_loss = loss;
        }
        let m = sim.metrics().clone();
        assert_eq!(m.exited, 0);
        assert!(m.queued > 0);
        assert!(m.loss(LossCause::BorderQueue) > 0.0);
        assert_eq!(sim.events().stalls(StallReason::BorderClosed).count(), m.queued);

        sim.run_for(110.0, 1.0, &mut NoopObserver).unwrap();
        let m = sim.metrics();
        assert!(m.injected >= 9);
        assert_eq!(m.exited, m.injected);
        assert!(sim.events().iter().any(|e| matches!(e.event, SimEvent::Departed { .. })));
    }

    #[test]
    fn stranded_trucks_expire() {
        // Source on an isolated stub; nothing may pave a connector.
        let cfg = crate::SimConfig { bridge_max_gap: 0, max_particle_age_secs: Some(20.0), ..config() };
        let mut sim = crate::SimBuilder::new(cfg, ScenarioBlend::single(flow_at(0, 360.0)))
            .road(vec![super::helpers::wp(5.0, 45.0), super::helpers::wp(25.0, 45.0)], Default::default())
            .source("stub", super::helpers::wp(5.0, 45.0), Origin::Industrial, "flow")
            .crossing(super::helpers::wp(105.0, 5.0))
            .build()
            .unwrap();
        sim.run_for(120.0, 1.0, &mut NoopObserver).unwrap();
        let m = sim.metrics();
        assert!(m.expired > 0);
        assert_eq!(m.exited, 0);
        assert_eq!(m.live as u64 + m.expired, m.injected);
        assert!(m.loss(LossCause::DeadEnd) > 0.0);
        assert!(sim.events().iter().any(|e| matches!(e.event, SimEvent::Expired { .. })));
    }

    #[test]
    fn empty_scenario_runs_idle() {
        let mut sim = corridor(config(), ScenarioBlend::single(ScenarioData::new()), Origin::Industrial);
        sim.run_for(30.0, 1.0, &mut NoopObserver).unwrap();
        assert_eq!(sim.metrics().injected, 0);
        assert_eq!(sim.metrics().total_loss_hours(), 0.0);
    }
}

// ── Yards ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod yards {
    use bt_core::{LossCause, ModeKind, YardId};
    use bt_scenario::ScenarioBlend;
    use bt_transport::{TransportEvent, TransportParams};
    use test_log::test;

    use super::helpers::{config, constant_flow, with_lot};
    use crate::{SimConfig, SimEvent};

    fn lot_config(dwell: f64, cooldown: f64) -> SimConfig {
        let base = config();
        SimConfig {
            transport: TransportParams { conversion_dwell_secs: dwell, ..base.transport.clone() },
            admission: bt_admission::AdmissionConfig { cooldown_secs: cooldown, ..Default::default() },
            ..base
        }
    }

    #[test]
    fn capacity_one_lot_never_double_admits() {
        // Two trucks half a second apart, then the source dries up.
        let scen = ScenarioBlend::new(constant_flow(7_200.0), constant_flow(0.0), 0.0).unwrap();
        let mut sim = with_lot(lot_config(30.0, 900.0), scen, 1);
        sim.step(0.5).unwrap();
        sim.step(0.5).unwrap();
        sim.set_scenario_weight(1.0).unwrap();
        assert_eq!(sim.metrics().injected, 2);

        let mut saw_dwell = false;
        while sim.now() < 90.0 {
            sim.step(0.5).unwrap();
            assert!(sim.yards()[0].occupants() <= 1);
            saw_dwell |= sim.mode_counts()[ModeKind::Yard as usize] == 1;
        }
        let admitted = sim
            .events()
            .iter()
            .filter(|e| matches!(e.event, SimEvent::Transport(TransportEvent::Admitted { .. })))
            .count();
        assert_eq!(admitted, 1);
        assert!(saw_dwell);
        // The second truck waits out the cooldown instead of skipping conversion.
        let m = sim.metrics();
        assert_eq!(m.exited, 1);
        assert_eq!(m.live, 1);
        assert!(m.loss(LossCause::LotFull) > 0.0);
    }

    #[test]
    fn closed_lot_holds_corridor_traffic() {
        let mut sim = with_lot(lot_config(600.0, 60.0), ScenarioBlend::single(constant_flow(360.0)), 1);
        while sim.now() < 300.0 {
            sim.step(1.0).unwrap();
        }
        let admitted = sim
            .events()
            .iter()
            .filter(|e| matches!(e.event, SimEvent::Transport(TransportEvent::Admitted { .. })))
            .count();
        let m = sim.metrics();
        assert!(m.injected > 20, "injected {}", m.injected);
        assert_eq!(admitted, 1);
        assert_eq!(m.exited, 0, "no truck reaches the border unconverted");
        assert_eq!(m.live as u64, m.injected);
        assert_eq!(sim.mode_counts()[ModeKind::Yard as usize], 1);
        assert!(m.loss(LossCause::LotFull) > 0.0);
    }

    #[test]
    fn emptied_lot_stays_shut_for_its_cooldown() {
        let mut sim = with_lot(lot_config(5.0, 60.0), ScenarioBlend::single(constant_flow(1_800.0)), 1);
        while sim.now() < 400.0 {
            sim.step(0.5).unwrap();
        }
        let lot = YardId(0);
        let mut left_at: Option<f64> = None;
        let mut admissions = 0;
        for e in sim.events().iter() {
            match e.event {
                SimEvent::Transport(TransportEvent::LeftLot { yard, at, .. }) if yard == lot => left_at = Some(at),
                SimEvent::Transport(TransportEvent::Admitted { yard, at, .. }) if yard == lot => {
                    if let Some(l) = left_at {
                        assert!(at >= l + 60.0, "re-admitted at {at} after leaving at {l}");
                    }
                    admissions += 1;
                }
                _ => {}
            }
        }
        assert!(admissions >= 2, "lot reopened after cooling down");
    }

    #[test]
    fn yard_fill_reports_each_lot() {
        let mut sim = with_lot(lot_config(600.0, 60.0), ScenarioBlend::single(constant_flow(1_800.0)), 2);
        while sim.now() < 60.0 {
            sim.step(1.0).unwrap();
        }
        let fill = sim.yard_fill();
        assert_eq!(fill.len(), 1);
        assert_eq!(fill[0], (YardId(0), 1.0));
    }
}

// ── Determinism, snapshots, reset ─────────────────────────────────────────────

#[cfg(test)]
mod replay {
    use bt_core::SimSecond;
    use bt_scenario::ScenarioBlend;
    use bt_transport::TransportParams;

    use super::helpers::{config, constant_flow, with_lot};
    use crate::{Sim, SimConfig, SimError};

    fn jittered() -> SimConfig {
        let base = config();
        SimConfig {
            transport: TransportParams { jitter_amplitude: 0.2, conversion_dwell_secs: 20.0, ..base.transport.clone() },
            admission: bt_admission::AdmissionConfig { cooldown_secs: 30.0, ..Default::default() },
            ..base
        }
    }

    fn sim() -> Sim {
        with_lot(jittered(), ScenarioBlend::single(constant_flow(3_600.0)), 2)
    }

    fn digests(sim: &mut Sim, steps: usize) -> Vec<u64> {
        (0..steps)
            .map(|_| {
                sim.step(0.5).unwrap();
                sim.state_digest()
            })
            .collect()
    }

    #[test]
    fn same_seed_same_run() {
        let (mut a, mut b) = (sim(), sim());
        assert_eq!(digests(&mut a, 300), digests(&mut b, 300));
        assert_eq!(a.metrics(), b.metrics());
    }

    #[test]
    fn reset_replays_from_scratch() {
        let mut s = sim();
        let first = digests(&mut s, 200);
        s.set_cutoff(0.5).unwrap();
        s.set_cutoff(0.95).unwrap();
        s.reset();
        assert_eq!(s.now(), 0.0);
        assert_eq!(s.metrics().injected, 0);
        assert!(s.events().is_empty());
        assert_eq!(digests(&mut s, 200), first);
    }

    #[test]
    fn restore_replays_the_same_future() {
        let mut s = sim();
        let original = digests(&mut s, 80);
        assert!(s.snapshots().seconds().any(|sec| sec == SimSecond(20)));

        s.restore(SimSecond(20)).unwrap();
        assert_eq!(s.now(), 20.0);
        assert!(s.snapshots().seconds().all(|sec| sec <= SimSecond(20)));
        let replay = digests(&mut s, 40);
        assert_eq!(replay, original[40..]);
    }

    #[test]
    fn missing_snapshot_is_an_error() {
        let mut s = sim();
        digests(&mut s, 4);
        assert!(matches!(s.restore(SimSecond(7)), Err(SimError::NoSnapshot(_))));
    }

    #[test]
    fn ring_keeps_the_newest() {
        let cfg = SimConfig { snapshot_interval_secs: 1, snapshot_capacity: 3, ..jittered() };
        let mut s = with_lot(cfg, ScenarioBlend::single(constant_flow(3_600.0)), 2);
        digests(&mut s, 20);
        let held: Vec<_> = s.snapshots().seconds().collect();
        assert_eq!(held, vec![SimSecond(8), SimSecond(9), SimSecond(10)]);
    }
}

// ── Routing modes & alternate crossing ────────────────────────────────────────

#[cfg(test)]
mod routing {
    use std::time::Duration;

    use bt_grid::RoadStamp;
    use bt_scenario::ScenarioBlend;
    use bt_transport::{Crossing, Origin};

    use super::helpers::{config, constant_flow, corridor, flow_at, wp};
    use crate::{NoopObserver, SimBuilder, SimConfig, SimEvent};

    #[test]
    fn background_rebuild_lands_after_settling() {
        let cfg = SimConfig {
            frame_budget: Some(Duration::from_millis(1)),
            min_rebuild_interval: Duration::ZERO,
            ..config()
        };
        let mut sim = corridor(cfg, ScenarioBlend::single(constant_flow(0.0)), Origin::Industrial);
        sim.step(0.5).unwrap();
        sim.settle_routing().unwrap();
        assert!(sim.tables().version() > 0);
        assert!(sim.events().iter().any(|e| matches!(e.event, SimEvent::RoutingInstalled { .. })));
    }

    #[test]
    fn alt_share_sends_trucks_to_the_alternate_crossing() {
        let cfg = SimConfig { alt_crossing_share: 1.0, alt_lanes: 1, ..config() };
        let mut sim = SimBuilder::new(cfg, ScenarioBlend::single(flow_at(0, 3_600.0)))
            .road(vec![wp(5.0, 5.0), wp(105.0, 5.0)], RoadStamp::default())
            .road(vec![wp(5.0, 5.0), wp(5.0, 105.0)], RoadStamp::default())
            .source("gate", wp(5.0, 5.0), Origin::Industrial, "flow")
            .crossing(wp(105.0, 5.0))
            .alt_crossing(wp(5.0, 105.0))
            .build()
            .unwrap();
        sim.run_for(60.0, 0.5, &mut NoopObserver).unwrap();
        let exited = sim.metrics().exited;
        assert!(exited > 0);
        assert_eq!(sim.border_model(Crossing::Alt).map(|b| b.served()), Some(exited));
        assert_eq!(sim.border_model(Crossing::Main).map(|b| b.served()), Some(0));
    }

    #[test]
    fn no_alt_crossing_means_no_alt_model() {
        let sim = corridor(config(), ScenarioBlend::single(constant_flow(0.0)), Origin::Industrial);
        assert!(sim.border_model(Crossing::Alt).is_none());
        assert!(sim.lane_utilization(Crossing::Alt).is_empty());
    }
}

// ── Observer, event log, invariants ───────────────────────────────────────────

#[cfg(test)]
mod plumbing {
    use bt_admission::{AdmissionConfig, AdmissionController};
    use bt_core::{ParticleId, SimClock, SimSecond};
    use bt_scenario::ScenarioBlend;
    use bt_transport::{Origin, TransportState};

    use super::helpers::{config, constant_flow, corridor};
    use crate::{EventLog, InvariantViolation, Metrics, SimEvent, SimObserver, check};

    #[derive(Default)]
    struct Counter {
        starts:  usize,
        ends:    usize,
        seconds: Vec<SimSecond>,
        runs:    usize,
    }

    impl SimObserver for Counter {
        fn on_step_start(&mut self, _: &SimClock) {
            self.starts += 1;
        }
        fn on_step_end(&mut self, _: &SimClock, _: &Metrics) {
            self.ends += 1;
        }
        fn on_second(&mut self, second: SimSecond, _: &[bt_admission::Yard]) {
            self.seconds.push(second);
        }
        fn on_run_end(&mut self, _: &SimClock, _: &Metrics) {
            self.runs += 1;
        }
    }

    #[test]
    fn observer_sees_every_step_and_second() {
        let mut sim = corridor(config(), ScenarioBlend::single(constant_flow(3_600.0)), Origin::Industrial);
        let mut obs = Counter::default();
        sim.run_for(5.0, 0.5, &mut obs).unwrap();
        assert_eq!((obs.starts, obs.ends, obs.runs), (10, 10, 1));
        assert_eq!(obs.seconds, (1..=5).map(SimSecond).collect::<Vec<_>>());
    }

    #[test]
    fn long_step_reports_its_last_second_once() {
        let mut sim = corridor(config(), ScenarioBlend::single(constant_flow(3_600.0)), Origin::Industrial);
        let mut obs = Counter::default();
        sim.step_observed(2.5, &mut obs).unwrap();
        sim.step_observed(0.25, &mut obs).unwrap();
        sim.step_observed(3.0, &mut obs).unwrap();
        assert_eq!(obs.seconds, vec![SimSecond(2), SimSecond(5)]);
    }

    #[test]
    fn event_log_drops_oldest() {
        let mut log = EventLog::new(2);
        for i in 0..3 {
            log.push(Some(i), SimEvent::Expired { particle: ParticleId(i as u32), at: i as f64 });
        }
        assert_eq!(log.len(), 2);
        assert_eq!(log.dropped(), 1);
        assert_eq!(log.iter().next().map(|e| e.seq), Some(1));
        assert_eq!(log.for_serial(2).count(), 1);
        assert_eq!(log.for_serial(0).count(), 0);
        assert_eq!(log.since(2.0).count(), 1);
    }

    #[test]
    fn conservation_breach_is_reported() {
        let state = TransportState::new(16, 1.0);
        let admission = AdmissionController::new(AdmissionConfig::default()).unwrap();
        let metrics = Metrics { injected: 1, ..Metrics::default() };
        assert!(matches!(check(&state, &admission, &metrics), Err(InvariantViolation::Conservation { .. })));
        assert!(check(&state, &admission, &Metrics::default()).is_ok());
    }
}
