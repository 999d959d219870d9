//! Aggregate counters exposed read-only by [`Sim`](crate::Sim).

use bt_core::LossCause;

/// Cumulative run metrics.  Every field only grows, except `live` and
/// `queued`, which are current levels.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Metrics {
    /// Trucks created at sources.
    pub injected:   u64,
    /// Trucks that completed border service.
    pub exited:     u64,
    /// Trucks removed by the age limit.
    pub expired:    u64,
    /// Truck-hours lost, indexed by [`LossCause::index`].
    pub loss_hours: [f64; LossCause::ALL.len()],
    /// Committed cell transfers.
    pub transfers:  u64,
    /// Sub-steps taken by the integrator.
    pub substeps:   u64,
    /// Routing table sets installed.
    pub rebuilds:   u64,
    pub live:       usize,
    /// Trucks waiting or in service at any crossing.
    pub queued:     usize,
}

impl Metrics {
    #[inline]
    pub fn loss(&self, cause: LossCause) -> f64 {
        self.loss_hours[cause.index()]
    }

    pub fn total_loss_hours(&self) -> f64 {
        self.loss_hours.iter().sum()
    }

    pub(crate) fn add_loss(&mut self, hours: &[f64; LossCause::ALL.len()]) {
        for (acc, h) in self.loss_hours.iter_mut().zip(hours) {
            *acc += h.max(0.0);
        }
    }
}
