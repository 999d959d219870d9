//! Bridging: guarantee lots, sources, and crossings touch the road network.
//!
//! A 0-1 breadth-first search starts from the feature's cells.  Stepping
//! onto a conductive cell is free; stepping onto an impassable one costs 1.
//! The first road cell popped is the nearest by "cells that would need
//! paving", and the impassable cells along its path are stamped as a
//! synthetic connector.  The search gives up once the paving cost exceeds
//! `max_gap` cells, leaving the feature disconnected.

use std::collections::VecDeque;

use bt_core::{CellId, YardId};
use tracing::{debug, warn};

use crate::{Grid, Region};

/// Result of one bridging attempt.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum BridgeOutcome {
    /// A conductive path to a road already existed.
    Connected,
    /// A connector of `cells` cells was stamped.
    Bridged { cells: usize },
    /// No road within `max_gap` paved cells; left disconnected.
    Unresolved,
}

impl Grid {
    /// Connect the feature made of `starts` to the nearest road cell.
    ///
    /// `conductance` is applied to stamped connector cells, which become
    /// [`Region::Road`].
    pub fn bridge_to_roads(&mut self, starts: &[CellId], max_gap: usize, conductance: f32) -> BridgeOutcome {
        let starts: Vec<CellId> = starts.iter().copied().filter(|c| self.contains(*c)).collect();
        if starts.is_empty() {
            warn!("bridging requested for a feature with no cells inside the grid");
            return BridgeOutcome::Unresolved;
        }

        let len = self.len();
        let mut cost = vec![u32::MAX; len];
        let mut prev = vec![CellId::INVALID; len];
        let mut deque: VecDeque<CellId> = VecDeque::new();
        let mut is_start = vec![false; len];

        for &s in &starts {
            is_start[s.index()] = true;
            cost[s.index()] = 0;
            deque.push_back(s);
        }

        let mut found = None;
        while let Some(cur) = deque.pop_front() {
            let c = cost[cur.index()];
            if !is_start[cur.index()]
                && self.region[cur.index()] == Region::Road
                && self.is_conductive(cur)
            {
                found = Some(cur);
                break;
            }
            for (_, nb) in self.neighbors(cur) {
                let paved = !self.is_conductive(nb);
                let nc = c + paved as u32;
                if nc as usize > max_gap || nc >= cost[nb.index()] {
                    continue;
                }
                cost[nb.index()] = nc;
                prev[nb.index()] = cur;
                if paved {
                    deque.push_back(nb);
                } else {
                    deque.push_front(nb);
                }
            }
        }

        let Some(target) = found else {
            warn!(start = %starts[0], max_gap, "bridging failed: no road within reach, feature left disconnected");
            return BridgeOutcome::Unresolved;
        };

        let mut stamped = 0;
        let mut cur = prev[target.index()];
        while cur.is_valid() && !is_start[cur.index()] {
            if !self.is_conductive(cur) {
                self.claim(cur, Region::Road, YardId::INVALID, conductance);
                stamped += 1;
            }
            cur = prev[cur.index()];
        }

        if stamped == 0 {
            BridgeOutcome::Connected
        } else {
            debug!(start = %starts[0], %target, cells = stamped, "stamped synthetic connector");
            BridgeOutcome::Bridged { cells: stamped }
        }
    }
}
