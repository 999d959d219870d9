//! The `Yard` record.

use bt_core::{CellId, YardId};

/// Purpose of a lot, which decides the sink set it belongs to.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum YardKind {
    /// Customs conversion: corridor trucks dwell here before clearing.
    Conversion,
    /// Overnight parking while the border is closed.
    Overnight,
    /// Short waits while the border queue is long.
    Staging,
}

impl YardKind {
    pub fn as_str(self) -> &'static str {
        match self {
            YardKind::Conversion => "conversion",
            YardKind::Overnight  => "overnight",
            YardKind::Staging    => "staging",
        }
    }
}

#[derive(Copy, Clone, PartialEq, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum YardState {
    #[default]
    Available,
    Draining,
    /// Emptied after draining; closed until simulated time `until`.
    Cooldown { until: f64 },
}

impl YardState {
    pub fn as_str(self) -> &'static str {
        match self {
            YardState::Available     => "available",
            YardState::Draining      => "draining",
            YardState::Cooldown { .. } => "cooldown",
        }
    }
}

/// One yard or staging area.
///
/// Occupancy is private: it changes only through
/// [`AdmissionController::try_admit`](crate::AdmissionController::try_admit)
/// and [`release`](crate::AdmissionController::release).
#[derive(Clone, Debug)]
pub struct Yard {
    pub(crate) id:            YardId,
    pub(crate) name:          String,
    pub(crate) kind:          YardKind,
    pub(crate) cells:         Vec<CellId>,
    /// Capacity in trucks before the scenario multiplier.
    pub(crate) base_capacity: u32,
    pub(crate) capacity:      u32,
    /// Highest occupancy allowed right now: `capacity`, or the occupancy at
    /// the moment a multiplier shrank capacity below it.
    pub(crate) bound:         u32,
    pub(crate) occupants:     u32,
    pub(crate) state:         YardState,
}

impl Yard {
    #[inline]
    pub fn id(&self) -> YardId {
        self.id
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn kind(&self) -> YardKind {
        self.kind
    }

    /// Member cells, ascending.
    #[inline]
    pub fn cells(&self) -> &[CellId] {
        &self.cells
    }

    #[inline]
    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    #[inline]
    pub fn base_capacity(&self) -> u32 {
        self.base_capacity
    }

    #[inline]
    pub fn bound(&self) -> u32 {
        self.bound
    }

    #[inline]
    pub fn occupants(&self) -> u32 {
        self.occupants
    }

    #[inline]
    pub fn state(&self) -> YardState {
        self.state
    }

    /// Occupants over capacity; `0.0` for zero-capacity lots.
    pub fn fill_ratio(&self) -> f64 {
        if self.capacity == 0 {
            0.0
        } else {
            self.occupants as f64 / self.capacity as f64
        }
    }

    /// Occupancy at which the lot starts draining.
    pub(crate) fn threshold(&self, cutoff: f64) -> u32 {
        ((cutoff * self.capacity as f64).ceil() as u32).clamp(1, self.capacity.max(1))
    }
}
