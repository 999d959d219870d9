//! The particle record: one truck.

use bt_core::{CellId, LaneId, ModeKind, StallReason, WorldPoint, YardId};
use bt_routing::SinkSet;

/// Where a truck entered the system.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Origin {
    /// Long-haul corridor: must pass a conversion yard first.
    Corridor,
    /// Local industry: already cleared for the border.
    Industrial,
}

impl Origin {
    pub fn as_str(self) -> &'static str {
        match self {
            Origin::Corridor   => "corridor",
            Origin::Industrial => "industrial",
        }
    }
}

/// Which crossing a truck was assigned at injection.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Crossing {
    #[default]
    Main,
    Alt,
}

impl Crossing {
    pub fn sink_set(self) -> SinkSet {
        match self {
            Crossing::Main => SinkSet::Crossing,
            Crossing::Alt  => SinkSet::AltCrossing,
        }
    }
}

#[derive(Copy, Clone, PartialEq, Debug)]
pub enum ClearedPhase {
    /// Driving towards the crossing.
    EnRoute,
    /// In the border FIFO since `since`.
    Queued { since: f64 },
    InService { lane: LaneId },
}

/// Mode plus the attributes that mode needs, and nothing else.
#[derive(Copy, Clone, PartialEq, Debug)]
pub enum ModeState {
    /// Driving towards a lot of `target` (conversion, overnight, or staging).
    Road { target: SinkSet },
    Staging { yard: YardId, since: f64 },
    Yard { yard: YardId, arrived_at: f64, dwell_until: f64 },
    Cleared { phase: ClearedPhase },
    Sleeping { yard: YardId, wake_at: f64 },
}

impl ModeState {
    pub const EN_ROUTE: ModeState = ModeState::Cleared { phase: ClearedPhase::EnRoute };

    pub fn kind(&self) -> ModeKind {
        match self {
            ModeState::Road { .. }     => ModeKind::Road,
            ModeState::Staging { .. }  => ModeKind::Staging,
            ModeState::Yard { .. }     => ModeKind::Yard,
            ModeState::Cleared { .. }  => ModeKind::Cleared,
            ModeState::Sleeping { .. } => ModeKind::Sleeping,
        }
    }

    /// `true` for modes the integrator advances.
    #[inline]
    pub fn is_moving(&self) -> bool {
        matches!(self, ModeState::Road { .. } | ModeState::Cleared { phase: ClearedPhase::EnRoute })
    }

    /// `true` while held by a border model (queued or in service).
    #[inline]
    pub fn at_border(&self) -> bool {
        matches!(
            self,
            ModeState::Cleared { phase: ClearedPhase::Queued { .. } | ClearedPhase::InService { .. } }
        )
    }
}

/// Routing-lineage bookkeeping for stall diagnosis.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Lineage {
    /// Routing version the particle last planned under.
    pub route_version: u64,
    /// Sink set it last followed.
    pub last_set:      Option<SinkSet>,
    pub stall:         Option<StallReason>,
    pub stall_since:   f64,
    /// Times a new routing version reached this particle.
    pub reroutes:      u32,
}

/// One truck.
#[derive(Clone, Debug)]
pub struct Particle {
    pub serial:   u64,
    pub origin:   Origin,
    pub crossing: Crossing,
    pub pos:      WorldPoint,
    pub born_at:  f64,
    /// Speed multiplier, fixed at creation.
    pub jitter:   f32,
    pub mode:     ModeState,
    pub lineage:  Lineage,
    pub(crate) cell:    CellId,
    pub(crate) on_grid: bool,
    pub(crate) held:    Option<YardId>,
}

impl Particle {
    /// A new particle at `pos` in `cell`.  It joins the grid on
    /// [`TransportState::spawn`](crate::TransportState::spawn).
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        serial:   u64,
        origin:   Origin,
        crossing: Crossing,
        cell:     CellId,
        pos:      WorldPoint,
        born_at:  f64,
        jitter:   f32,
        mode:     ModeState,
    ) -> Self {
        Self {
            serial,
            origin,
            crossing,
            pos,
            born_at,
            jitter,
            mode,
            lineage: Lineage::default(),
            cell,
            on_grid: false,
            held: None,
        }
    }

    /// Owning cell.  For trucks at the border this is the crossing cell they
    /// arrived at, although they are no longer in its bucket.
    #[inline]
    pub fn cell(&self) -> CellId {
        self.cell
    }

    /// `true` while the particle sits in a cell bucket.
    #[inline]
    pub fn on_grid(&self) -> bool {
        self.on_grid
    }

    /// Lot whose admission count includes this particle.
    #[inline]
    pub fn held_lot(&self) -> Option<YardId> {
        self.held
    }

    #[inline]
    pub fn age(&self, now: f64) -> f64 {
        now - self.born_at
    }
}
