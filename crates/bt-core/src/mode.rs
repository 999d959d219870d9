//! Particle mode, stall, and loss-cause enums shared across crates.
//!
//! The per-mode payloads live in `bt-transport`; this module only carries
//! the discriminants so metrics, logs, and output can name them without
//! depending on the transport crate.

/// The discrete lifecycle stage of a truck.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ModeKind {
    /// Moving on the road network towards a yard.
    Road,
    /// Waiting in a staging area for the border queue to drain.
    Staging,
    /// Admitted to a conversion yard, dwelling.
    Yard,
    /// Cleared for the border: driving to, queued at, or in service at a lane.
    Cleared,
    /// Parked overnight in an overnight yard until the border opens.
    Sleeping,
    /// Served by the border; only kept for the departure animation.
    Departing,
}

impl ModeKind {
    pub const ALL: [ModeKind; 6] = [
        ModeKind::Road,
        ModeKind::Staging,
        ModeKind::Yard,
        ModeKind::Cleared,
        ModeKind::Sleeping,
        ModeKind::Departing,
    ];

    /// Human-readable label, used for CSV column values.
    pub fn as_str(self) -> &'static str {
        match self {
            ModeKind::Road      => "road",
            ModeKind::Staging   => "staging",
            ModeKind::Yard      => "yard",
            ModeKind::Cleared   => "cleared",
            ModeKind::Sleeping  => "sleeping",
            ModeKind::Departing => "departing",
        }
    }
}

impl std::fmt::Display for ModeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a particle could not move this sub-step.  Saturation, not an error.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum StallReason {
    /// No routable neighbour (unreachable or disconnected cell).
    DeadEnd,
    /// The target yard is full or not admitting.
    LotFull,
    /// The target road cell is gridlocked.
    RoadFull,
    /// Waiting at a border with zero posted capacity.
    BorderClosed,
}

impl StallReason {
    pub fn as_str(self) -> &'static str {
        match self {
            StallReason::DeadEnd      => "dead_end",
            StallReason::LotFull      => "lot_full",
            StallReason::RoadFull     => "road_full",
            StallReason::BorderClosed => "border_closed",
        }
    }

    /// The lost-throughput bucket this stall accrues to.
    pub fn loss_cause(self) -> LossCause {
        match self {
            StallReason::DeadEnd      => LossCause::DeadEnd,
            StallReason::LotFull      => LossCause::LotFull,
            StallReason::RoadFull     => LossCause::RoadFull,
            StallReason::BorderClosed => LossCause::BorderQueue,
        }
    }
}

impl std::fmt::Display for StallReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Buckets of the truck-hours-lost metric.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum LossCause {
    /// Moving below free-flow: the `(1 - c(ρ))` share of each truck-second.
    Congestion,
    DeadEnd,
    LotFull,
    RoadFull,
    /// Waiting in the border queue (including while the border is closed).
    BorderQueue,
}

impl LossCause {
    pub const ALL: [LossCause; 5] = [
        LossCause::Congestion,
        LossCause::DeadEnd,
        LossCause::LotFull,
        LossCause::RoadFull,
        LossCause::BorderQueue,
    ];

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn as_str(self) -> &'static str {
        match self {
            LossCause::Congestion  => "congestion",
            LossCause::DeadEnd     => "dead_end",
            LossCause::LotFull     => "lot_full",
            LossCause::RoadFull    => "road_full",
            LossCause::BorderQueue => "border_queue",
        }
    }
}
