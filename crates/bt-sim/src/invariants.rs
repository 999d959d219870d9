//! Fatal invariant checks run at the end of every step.
//!
//! | Check          | Holds when                                                   |
//! |----------------|--------------------------------------------------------------|
//! | conservation   | `injected − exited − expired == live`, and live mass matches |
//! | cell mass      | every cell's mass equals its bucket count × unit mass        |
//! | bucket         | every on-grid truck is in its own cell's bucket              |
//! | bucket total   | buckets hold exactly the on-grid trucks                      |
//! | capacity       | no lot holds more than its bound                             |
//! | lot ledger     | each lot's count equals the trucks holding it                |

use bt_admission::AdmissionController;
use bt_core::{CellId, ParticleId, YardId};
use bt_transport::TransportState;
use thiserror::Error;

use crate::Metrics;

#[derive(Clone, Debug, PartialEq, Error)]
pub enum InvariantViolation {
    #[error("conservation: injected {injected} − exited {exited} − expired {expired} ≠ live {live} (mass {mass})")]
    Conservation { injected: u64, exited: u64, expired: u64, live: usize, mass: f64 },

    #[error("cell {cell} holds mass {mass} but {count} trucks")]
    CellMass { cell: CellId, mass: f64, count: usize },

    #[error("{particle} claims {cell} but is not in its bucket")]
    Misplaced { particle: ParticleId, cell: CellId },

    #[error("buckets hold {in_buckets} trucks but {on_grid} are on the grid")]
    BucketTotal { in_buckets: usize, on_grid: usize },

    #[error("{yard} holds {occupants} trucks, over its bound of {bound}")]
    OverCapacity { yard: YardId, occupants: u32, bound: u32 },

    #[error("{yard} counts {counted} trucks but {holding} hold it")]
    LotLedger { yard: YardId, counted: u32, holding: u32 },
}

/// Run every check; the first failure wins.
pub fn check(
    state:     &TransportState,
    admission: &AdmissionController,
    metrics:   &Metrics,
) -> Result<(), InvariantViolation> {
    let occ = state.occupancy();
    let live = state.store().len();
    let unit = occ.unit_mass();
    let on_grid = state.on_grid_count();
    let mass = occ.total_mass() + (live - on_grid.min(live)) as f64 * unit;
    let net = metrics.injected as i128 - metrics.exited as i128 - metrics.expired as i128;
    if net != live as i128 || (mass - net as f64 * unit).abs() >= unit {
        return Err(InvariantViolation::Conservation {
            injected: metrics.injected,
            exited:   metrics.exited,
            expired:  metrics.expired,
            live,
            mass,
        });
    }

    if let Some((cell, mass, count)) = occ.find_mass_mismatch() {
        return Err(InvariantViolation::CellMass { cell, mass, count });
    }
    if let Some((particle, cell)) = state.find_misplaced() {
        return Err(InvariantViolation::Misplaced { particle, cell });
    }
    if occ.total_count() != on_grid {
        return Err(InvariantViolation::BucketTotal { in_buckets: occ.total_count(), on_grid });
    }
    if let Some((yard, occupants, bound)) = admission.find_over_capacity() {
        return Err(InvariantViolation::OverCapacity { yard, occupants, bound });
    }

    let mut holding = vec![0u32; admission.len()];
    for (_, p) in state.store().iter() {
        if let Some(y) = p.held_lot() {
            if let Some(h) = holding.get_mut(y.index()) {
                *h += 1;
            }
        }
    }
    for (y, &h) in admission.yards().iter().zip(&holding) {
        if y.occupants() != h {
            return Err(InvariantViolation::LotLedger { yard: y.id(), counted: y.occupants(), holding: h });
        }
    }
    Ok(())
}
