//! The destination families particles route towards.

/// One routing table is maintained per sink set.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, PartialOrd, Ord)]
pub enum SinkSet {
    ConversionYards,
    OvernightYards,
    Staging,
    Crossing,
    AltCrossing,
}

impl SinkSet {
    pub const ALL: [SinkSet; 5] = [
        SinkSet::ConversionYards,
        SinkSet::OvernightYards,
        SinkSet::Staging,
        SinkSet::Crossing,
        SinkSet::AltCrossing,
    ];

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    /// Crossing fields do not depend on yard state and are cached.
    #[inline]
    pub fn is_crossing(self) -> bool {
        matches!(self, SinkSet::Crossing | SinkSet::AltCrossing)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SinkSet::ConversionYards => "conversion_yards",
            SinkSet::OvernightYards  => "overnight_yards",
            SinkSet::Staging         => "staging",
            SinkSet::Crossing        => "crossing",
            SinkSet::AltCrossing     => "alt_crossing",
        }
    }
}

impl std::fmt::Display for SinkSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
