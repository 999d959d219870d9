//! Potential-field and next-hop computation for one sink set.
//!
//! # Algorithm
//!
//! Multi-source Dijkstra seeded with every sink at potential 0.  A step
//! from cell `v` into an already-settled cell `u` costs
//!
//! ```text
//! STEP_COST + lot_penalty(u)  (only when v is outside u's lot)
//!           + bias_weight · STEP_COST · bias(v) / max(bias)
//! ```
//!
//! so potentials grow outward from the sinks and `potential[v]` is the cost
//! of the cheapest descent from `v`.
//!
//! # Restrictions
//!
//! | Rule            | Effect                                                  |
//! |-----------------|---------------------------------------------------------|
//! | closed lot      | never entered from outside; its cells still get potential so trucks inside can leave |
//! | no lot shortcut | a non-lot cell never gains potential from a lot cell, and never hops into one |
//!
//! The next-hop pass picks, for every reachable non-sink cell, the steppable
//! neighbour with strictly lower potential and the same restrictions.  Ties
//! go to the first neighbour in `Dir::ALL` order; heap ties go to the lower
//! `CellId`.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use bt_core::{CellId, YardId};
use bt_grid::{Dir, Grid};
use tracing::{debug, warn};

use crate::{RoutingError, RoutingResult, RoutingTable, SinkSet};

/// Cost of one uniform grid step.
pub const STEP_COST: u32 = 1_000;

/// Potential sentinel for cells with no path to any sink.
pub const UNREACHABLE: u32 = u32::MAX;

/// Everything needed to build one routing table, detached from live state.
#[derive(Clone, Debug)]
pub struct FieldSpec {
    pub sink_set:         SinkSet,
    /// Sink cells.  Duplicates are harmless.
    pub sinks:            Vec<CellId>,
    /// Per-yard flag: the lot acts as a wall (draining, cooling down, or
    /// not part of this sink set).  Indexed by `YardId`.
    pub closed_lots:      Vec<bool>,
    /// Per-yard surcharge for entering the lot from outside.  Indexed by
    /// `YardId`; missing entries mean 0.
    pub lot_penalty:      Vec<u32>,
    /// Optional bias: the potential of another sink set and its weight.
    pub bias:             Option<(SinkSet, f32)>,
    /// Forbid roads from descending through lot interiors.
    pub no_lot_shortcuts: bool,
}

impl FieldSpec {
    /// A field with no walls or penalties.
    pub fn new(sink_set: SinkSet, sinks: Vec<CellId>) -> Self {
        Self {
            sink_set,
            sinks,
            closed_lots:      Vec::new(),
            lot_penalty:      Vec::new(),
            bias:             None,
            no_lot_shortcuts: sink_set.is_crossing(),
        }
    }

    #[inline]
    fn is_closed(&self, yard: YardId) -> bool {
        yard.is_valid() && self.closed_lots.get(yard.index()).copied().unwrap_or(false)
    }

    #[inline]
    fn penalty(&self, yard: YardId) -> u32 {
        if yard.is_valid() {
            self.lot_penalty.get(yard.index()).copied().unwrap_or(0)
        } else {
            0
        }
    }
}

/// Precomputed per-cell bias cost, `0` where the bias field is unreachable.
pub(crate) fn bias_costs(bias: &[u32], weight: f32) -> Vec<u32> {
    let max = bias.iter().copied().filter(|&b| b != UNREACHABLE).max().unwrap_or(0);
    if max == 0 || weight <= 0.0 {
        return vec![0; bias.len()];
    }
    let scale = weight as f64 * STEP_COST as f64 / max as f64;
    bias.iter()
        .map(|&b| if b == UNREACHABLE { 0 } else { (b as f64 * scale).round() as u32 })
        .collect()
}

/// Build the table for `spec` over `grid`.
///
/// `bias` must be the potential array of `spec.bias`'s sink set when that is
/// `Some`; it is ignored otherwise.  `version` is stamped on the result.
pub fn compute_field(
    grid:    &Grid,
    spec:    &FieldSpec,
    bias:    Option<&[u32]>,
    version: u64,
) -> RoutingResult<RoutingTable> {
    let len = grid.len();
    if let Some(&bad) = spec.sinks.iter().find(|s| !grid.contains(**s)) {
        return Err(RoutingError::SinkOutOfBounds(bad));
    }

    let mut dist = vec![UNREACHABLE; len];
    let mut next_hop = vec![CellId::INVALID; len];

    if spec.sinks.is_empty() {
        warn!(set = %spec.sink_set, "empty sink set; no particles will be routed to it");
        return Ok(RoutingTable::new(spec.sink_set, version, dist, next_hop));
    }

    let bias_cost = match (spec.bias, bias) {
        (Some((_, w)), Some(b)) if b.len() == len => bias_costs(b, w),
        _ => vec![0; len],
    };

    let is_lot = |c: CellId| grid.region[c.index()].is_lot();
    let yard = |c: CellId| grid.yard_of[c.index()];
    // `from` may descend into `into` (ignoring axis conductance).
    let may_descend = |from: CellId, into: CellId| {
        let walled = spec.is_closed(yard(into)) && yard(into) != yard(from);
        !walled && !(spec.no_lot_shortcuts && is_lot(into) && !is_lot(from))
    };

    // ── Multi-source Dijkstra ─────────────────────────────────────────────
    let mut heap: BinaryHeap<Reverse<(u32, CellId)>> = BinaryHeap::new();
    for &s in &spec.sinks {
        if dist[s.index()] != 0 {
            dist[s.index()] = 0;
            heap.push(Reverse((0, s)));
        }
    }

    while let Some(Reverse((cost, u))) = heap.pop() {
        if cost > dist[u.index()] {
            continue;
        }
        for dir in Dir::ALL {
            let Some(v) = grid.neighbor(u, dir) else { continue };
            if !grid.can_step(v, dir.opposite()) || !may_descend(v, u) {
                continue;
            }
            let entry = if yard(u).is_valid() && yard(u) != yard(v) { spec.penalty(yard(u)) } else { 0 };
            let new_cost = cost
                .saturating_add(STEP_COST)
                .saturating_add(entry)
                .saturating_add(bias_cost[v.index()]);
            if new_cost < dist[v.index()] {
                dist[v.index()] = new_cost;
                heap.push(Reverse((new_cost, v)));
            }
        }
    }

    // ── Next-hop pass ─────────────────────────────────────────────────────
    for i in 0..len {
        let v = CellId(i as u32);
        let dv = dist[i];
        if dv == 0 || dv == UNREACHABLE {
            continue;
        }
        let mut best: Option<(u32, CellId)> = None;
        for dir in Dir::ALL {
            let Some(u) = grid.neighbor(v, dir) else { continue };
            if !grid.can_step(v, dir) || !may_descend(v, u) {
                continue;
            }
            let du = dist[u.index()];
            if du < dv && best.is_none_or(|(b, _)| du < b) {
                best = Some((du, u));
            }
        }
        if let Some((_, u)) = best {
            next_hop[i] = u;
        }
    }

    let table = RoutingTable::new(spec.sink_set, version, dist, next_hop);
    debug!(
        set = %spec.sink_set,
        version,
        sinks = spec.sinks.len(),
        reachable = table.reachable_count(),
        "computed routing field"
    );
    Ok(table)
}
