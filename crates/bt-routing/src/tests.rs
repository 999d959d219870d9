//! Unit tests for bt-routing.

#[cfg(test)]
mod helpers {
    use bt_core::{CellId, WorldPoint, YardId};
    use bt_grid::{Grid, Region};

    pub fn grid(n: usize) -> Grid {
        Grid::new(n, 10.0, WorldPoint::new(0.0, 0.0)).unwrap()
    }

    pub fn pave(g: &mut Grid, cells: &[(usize, usize)], region: Region, yard: YardId) {
        for &(r, c) in cells {
            let i = g.cell(r, c).index();
            g.conductance_x[i] = 1.0;
            g.conductance_y[i] = 1.0;
            g.region[i] = region;
            g.yard_of[i] = yard;
        }
    }

    pub fn roads(g: &mut Grid, cells: &[(usize, usize)]) {
        pave(g, cells, Region::Road, YardId::INVALID);
    }

    /// 3×3 ring of road around the centre, with a one-cell lot (yard 0) at
    /// (1, 0) linking (0, 0) and (2, 0) directly.
    pub fn ring_with_lot() -> (Grid, CellId, CellId, CellId) {
        let mut g = grid(3);
        roads(&mut g, &[(0, 0), (0, 1), (0, 2), (1, 2), (2, 2), (2, 1), (2, 0)]);
        pave(&mut g, &[(1, 0)], Region::Yard, YardId(0));
        let (sink, lot, far) = (g.cell(0, 0), g.cell(1, 0), g.cell(2, 0));
        (g, sink, lot, far)
    }
}

// ── Field computation ─────────────────────────────────────────────────────────

#[cfg(test)]
mod field {
    use super::helpers::{grid, pave, ring_with_lot, roads};
    use crate::field::bias_costs;
    use crate::{FieldSpec, RoutingError, STEP_COST, SinkSet, UNREACHABLE, compute_field};
    use bt_core::{CellId, YardId};
    use bt_grid::Region;

    #[test]
    fn corridor_potential_counts_steps() {
        let mut g = grid(5);
        roads(&mut g, &[(0, 0), (0, 1), (0, 2), (0, 3), (0, 4)]);
        let sink = g.cell(0, 4);
        let t = compute_field(&g, &FieldSpec::new(SinkSet::Crossing, vec![sink]), None, 1).unwrap();

        assert_eq!(t.potential(g.cell(0, 0)), Some(4 * STEP_COST));
        assert_eq!(t.potential(sink), Some(0));
        assert!(t.is_sink(sink));
        assert_eq!(t.next_hop(g.cell(0, 0)), Some(g.cell(0, 1)));
        assert_eq!(t.next_hop(sink), None);
        assert_eq!(t.potential(g.cell(1, 0)), None, "impassable cell is unreachable");
        assert_eq!(t.reachable_count(), 5);
        assert_eq!(t.version(), 1);
    }

    #[test]
    fn empty_sink_set_is_all_unreachable() {
        let mut g = grid(3);
        roads(&mut g, &[(0, 0), (0, 1)]);
        let t = compute_field(&g, &FieldSpec::new(SinkSet::Staging, vec![]), None, 3).unwrap();
        assert!(!t.has_sinks());
        assert!(t.potentials().iter().all(|&p| p == UNREACHABLE));
        assert_eq!(t.next_hop(g.cell(0, 0)), None);
    }

    #[test]
    fn out_of_bounds_sink_is_an_error() {
        let g = grid(2);
        let err = compute_field(&g, &FieldSpec::new(SinkSet::Crossing, vec![CellId(99)]), None, 1).unwrap_err();
        assert!(matches!(err, RoutingError::SinkOutOfBounds(CellId(99))));
    }

    #[test]
    fn open_lot_is_a_shortcut_for_yard_fields() {
        let (g, sink, lot, far) = ring_with_lot();
        let mut spec = FieldSpec::new(SinkSet::ConversionYards, vec![sink]);
        spec.closed_lots = vec![false];
        let t = compute_field(&g, &spec, None, 1).unwrap();
        assert_eq!(t.potential(far), Some(2 * STEP_COST));
        assert_eq!(t.next_hop(far), Some(lot));
    }

    #[test]
    fn closed_lot_is_a_wall_but_can_be_left() {
        let (g, sink, lot, far) = ring_with_lot();
        let mut spec = FieldSpec::new(SinkSet::ConversionYards, vec![sink]);
        spec.closed_lots = vec![true];
        let t = compute_field(&g, &spec, None, 1).unwrap();

        assert_eq!(t.potential(far), Some(6 * STEP_COST), "must go around the ring");
        assert_ne!(t.next_hop(far), Some(lot));
        assert_eq!(t.potential(lot), Some(STEP_COST), "trucks inside still get a way out");
        assert_eq!(t.next_hop(lot), Some(sink));
        for i in 0..g.len() {
            assert_ne!(t.next_hop(CellId(i as u32)), Some(lot), "nothing routes into a wall");
        }
    }

    #[test]
    fn closed_lot_interior_still_drains() {
        // Two-cell lot stacked north of a road row; only its south cell
        // touches the road.
        let mut g = grid(3);
        roads(&mut g, &[(0, 0), (0, 1), (0, 2)]);
        pave(&mut g, &[(1, 1), (2, 1)], Region::Yard, YardId(0));
        let mut spec = FieldSpec::new(SinkSet::OvernightYards, vec![g.cell(0, 2)]);
        spec.closed_lots = vec![true];
        let t = compute_field(&g, &spec, None, 1).unwrap();
        assert_eq!(t.potential(g.cell(2, 1)), Some(3 * STEP_COST));
        assert_eq!(t.next_hop(g.cell(2, 1)), Some(g.cell(1, 1)));
        assert_eq!(t.next_hop(g.cell(0, 0)), Some(g.cell(0, 1)));
    }

    #[test]
    fn crossing_roads_never_descend_through_lots() {
        let (g, sink, lot, far) = ring_with_lot();
        let t = compute_field(&g, &FieldSpec::new(SinkSet::Crossing, vec![sink]), None, 1).unwrap();
        assert_eq!(t.potential(far), Some(6 * STEP_COST));
        assert_eq!(t.next_hop(far), Some(g.cell(2, 1)));
        // The lot still receives potential from the road beside it.
        assert_eq!(t.potential(lot), Some(STEP_COST));
        assert_eq!(t.next_hop(lot), Some(sink));
    }

    #[test]
    fn lot_penalty_surcharges_entry() {
        let (g, _, lot, far) = ring_with_lot();
        let mut spec = FieldSpec::new(SinkSet::ConversionYards, vec![lot]);
        spec.lot_penalty = vec![500];
        let t = compute_field(&g, &spec, None, 1).unwrap();
        assert_eq!(t.potential(far), Some(STEP_COST + 500));
        assert_eq!(t.potential(g.cell(2, 1)), Some(2 * STEP_COST + 500));
    }

    #[test]
    fn ties_follow_direction_order() {
        let mut g = grid(3);
        roads(&mut g, &[(0, 0), (0, 1), (1, 0), (1, 1)]);
        let t = compute_field(&g, &FieldSpec::new(SinkSet::Crossing, vec![g.cell(0, 0)]), None, 1).unwrap();
        // South and West both descend to 1000; South comes first.
        assert_eq!(t.next_hop(g.cell(1, 1)), Some(g.cell(0, 1)));
    }

    #[test]
    fn bias_costs_are_normalised() {
        let b = bias_costs(&[0, 1_000, 2_000, UNREACHABLE], 1.0);
        assert_eq!(b, vec![0, 500, 1_000, 0]);
        assert_eq!(bias_costs(&[0, 1_000], 0.0), vec![0, 0]);
    }

    #[test]
    fn bias_steers_towards_the_biased_sink() {
        // Road row with yards at both ends; the crossing sits at the west end.
        let mut g = grid(5);
        roads(&mut g, &[(0, 0), (0, 1), (0, 2), (0, 3), (0, 4)]);
        let crossing = compute_field(&g, &FieldSpec::new(SinkSet::Crossing, vec![g.cell(0, 0)]), None, 1).unwrap();

        let mut spec = FieldSpec::new(SinkSet::ConversionYards, vec![g.cell(0, 0), g.cell(0, 4)]);
        let plain = compute_field(&g, &spec, None, 1).unwrap();
        spec.bias = Some((SinkSet::Crossing, 1.0));
        let biased = compute_field(&g, &spec, Some(crossing.potentials()), 1).unwrap();

        let mid = g.cell(0, 2);
        assert_eq!(plain.next_hop(mid), Some(g.cell(0, 3)), "plain tie goes east, first in scan order");
        assert_eq!(biased.next_hop(mid), Some(g.cell(0, 1)));
        assert_eq!(biased.potential(g.cell(0, 1)), Some(1_250));
    }
}

// ── Scheduler ─────────────────────────────────────────────────────────────────

#[cfg(test)]
mod scheduler {
    use std::sync::Arc;
    use std::time::Duration;

    use super::helpers::{grid, roads};
    use crate::{FieldSpec, RebuildMode, RebuildScheduler, RoutingInput, RoutingTables, SinkSet};
    use test_log::test;

    fn input() -> RoutingInput {
        let mut g = grid(4);
        roads(&mut g, &[(0, 0), (0, 1), (0, 2), (0, 3)]);
        let fields = vec![
            FieldSpec::new(SinkSet::Crossing, vec![g.cell(0, 3)]),
            FieldSpec::new(SinkSet::ConversionYards, vec![g.cell(0, 0)]),
        ];
        RoutingInput { grid: Arc::new(g), fields }
    }

    fn background(min_interval: Duration) -> RebuildMode {
        RebuildMode::Background { min_interval }
    }

    #[test]
    fn blocking_installs_inline() {
        let mut s = RebuildScheduler::new(RebuildMode::Blocking);
        let mut tables = RoutingTables::empty(16);
        let out = s.service(&mut tables, input).unwrap();
        assert_eq!(out.started, Some(1));
        assert_eq!(out.installed, Some(1));
        assert_eq!(tables.version(), 1);
        assert!(tables.get(SinkSet::Crossing).has_sinks());
        assert!(!tables.get(SinkSet::Staging).has_sinks());

        let idle = s.service(&mut tables, || unreachable!("not dirty")).unwrap();
        assert_eq!(idle, Default::default());
    }

    #[test]
    fn crossing_field_is_cached_across_rebuilds() {
        let mut s = RebuildScheduler::new(RebuildMode::Blocking);
        let mut tables = RoutingTables::empty(16);
        s.service(&mut tables, input).unwrap();
        s.mark_dirty();
        s.service(&mut tables, input).unwrap();
        assert_eq!(tables.version(), 2);
        assert_eq!(tables.get(SinkSet::ConversionYards).version(), 2);
        assert_eq!(tables.get(SinkSet::Crossing).version(), 1);
    }

    #[test]
    fn background_result_installs_on_collection() {
        let mut s = RebuildScheduler::new(background(Duration::ZERO));
        let mut tables = RoutingTables::empty(16);
        let out = s.service(&mut tables, input).unwrap();
        assert_eq!(out.started, Some(1));
        assert_eq!(out.installed, None);
        assert!(s.is_pending());

        let done = s.wait(&mut tables).unwrap();
        assert_eq!(done.installed, Some(1));
        assert_eq!(tables.version(), 1);
        assert!(!s.is_pending());
    }

    #[test]
    fn invalidated_build_is_discarded() {
        let mut s = RebuildScheduler::new(background(Duration::ZERO));
        let mut tables = RoutingTables::empty(16);
        s.service(&mut tables, input).unwrap();
        s.invalidate();

        let out = s.wait(&mut tables).unwrap();
        assert_eq!(out.discarded, Some(1));
        assert_eq!(tables.version(), 0, "stale tables never land");
        assert_eq!(s.stats().discarded, 1);

        // The invalidation left the scheduler dirty, so a new build follows.
        let out = s.service(&mut tables, input).unwrap();
        assert_eq!(out.started, Some(3));
        s.wait(&mut tables).unwrap();
        assert_eq!(tables.version(), 3);
    }

    #[test]
    fn abandon_is_a_no_op_when_idle() {
        let mut s = RebuildScheduler::new(RebuildMode::Blocking);
        let mut tables = RoutingTables::empty(16);
        s.service(&mut tables, input).unwrap();
        let token = s.token();
        s.abandon();
        assert_eq!(s.token(), token);
        assert!(!s.is_dirty());
    }

    #[test]
    fn abandoned_build_is_discarded_and_reissued() {
        let mut s = RebuildScheduler::new(background(Duration::ZERO));
        let mut tables = RoutingTables::empty(16);
        s.service(&mut tables, input).unwrap();
        s.abandon();
        assert!(s.is_dirty());

        let out = s.wait(&mut tables).unwrap();
        assert_eq!(out.discarded, Some(1));
        assert_eq!(tables.version(), 0);
    }

    #[test]
    fn dirty_mark_mid_build_is_deferred_then_reissued() {
        let mut s = RebuildScheduler::new(background(Duration::ZERO));
        let mut tables = RoutingTables::empty(16);
        s.service(&mut tables, input).unwrap();
        s.mark_dirty();
        assert_eq!(s.stats().deferred, 1);

        s.wait(&mut tables).unwrap();
        assert_eq!(tables.version(), 1);
        assert!(s.is_dirty(), "deferred request survives the in-flight build");

        let out = s.service(&mut tables, input).unwrap();
        assert_eq!(out.started, Some(2));
        s.wait(&mut tables).unwrap();
        assert_eq!(tables.version(), 2);
        assert_eq!(s.stats().issued, 2);
    }

    #[test]
    fn rebuilds_are_rate_limited() {
        let mut s = RebuildScheduler::new(background(Duration::from_secs(3600)));
        let mut tables = RoutingTables::empty(16);
        s.service(&mut tables, input).unwrap();
        s.wait(&mut tables).unwrap();

        s.mark_dirty();
        let out = s.service(&mut tables, input).unwrap();
        assert_eq!(out.started, None);
        assert!(s.is_dirty(), "request stays queued until the interval passes");
        assert_eq!(s.stats().issued, 1);
    }
}
