//! Versioned routing tables.

use std::sync::Arc;

use bt_core::CellId;

use crate::{SinkSet, UNREACHABLE};

/// Dense potential and next-hop arrays for one sink set.
///
/// Replaced wholesale on rebuild, never patched.
#[derive(Clone, Debug)]
pub struct RoutingTable {
    sink_set:  SinkSet,
    version:   u64,
    potential: Vec<u32>,
    next_hop:  Vec<CellId>,
    reachable: usize,
}

impl RoutingTable {
    pub fn new(sink_set: SinkSet, version: u64, potential: Vec<u32>, next_hop: Vec<CellId>) -> Self {
        debug_assert_eq!(potential.len(), next_hop.len());
        let reachable = potential.iter().filter(|&&p| p != UNREACHABLE).count();
        Self { sink_set, version, potential, next_hop, reachable }
    }

    /// A table in which nothing is reachable.
    pub fn unreachable(sink_set: SinkSet, len: usize) -> Self {
        Self::new(sink_set, 0, vec![UNREACHABLE; len], vec![CellId::INVALID; len])
    }

    #[inline]
    pub fn sink_set(&self) -> SinkSet {
        self.sink_set
    }

    /// Build token the table was computed under.
    #[inline]
    pub fn version(&self) -> u64 {
        self.version
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.potential.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.potential.is_empty()
    }

    /// Potential of `cell`, `None` when unreachable.
    #[inline]
    pub fn potential(&self, cell: CellId) -> Option<u32> {
        match self.potential.get(cell.index()) {
            Some(&p) if p != UNREACHABLE => Some(p),
            _ => None,
        }
    }

    /// Raw potential array (`UNREACHABLE` sentinel), used as a bias input.
    #[inline]
    pub fn potentials(&self) -> &[u32] {
        &self.potential
    }

    /// Neighbour to move towards, `None` at sinks and where no descent exists.
    #[inline]
    pub fn next_hop(&self, cell: CellId) -> Option<CellId> {
        self.next_hop.get(cell.index()).copied().filter(|c| c.is_valid())
    }

    #[inline]
    pub fn is_sink(&self, cell: CellId) -> bool {
        self.potential.get(cell.index()) == Some(&0)
    }

    /// `true` if at least one sink exists.
    #[inline]
    pub fn has_sinks(&self) -> bool {
        self.reachable > 0
    }

    #[inline]
    pub fn reachable_count(&self) -> usize {
        self.reachable
    }
}

// ── RoutingTables ─────────────────────────────────────────────────────────────

/// The installed table per sink set plus the build token they were
/// installed under.
///
/// Tables are `Arc`-shared, so cloning the set for a snapshot is cheap and
/// cached crossing fields are shared across rebuilds.
#[derive(Clone, Debug)]
pub struct RoutingTables {
    version: u64,
    tables:  Vec<Arc<RoutingTable>>,
}

impl RoutingTables {
    /// All-unreachable tables at version 0.
    pub fn empty(len: usize) -> Self {
        Self {
            version: 0,
            tables:  SinkSet::ALL.iter().map(|&s| Arc::new(RoutingTable::unreachable(s, len))).collect(),
        }
    }

    /// Version of the most recent install.  Particles routed under an older
    /// version re-read their hop on the next sub-step.
    #[inline]
    pub fn version(&self) -> u64 {
        self.version
    }

    #[inline]
    pub fn get(&self, set: SinkSet) -> &RoutingTable {
        &self.tables[set.index()]
    }

    /// Install freshly built tables; sets not present keep their table.
    pub fn install(&mut self, version: u64, built: impl IntoIterator<Item = Arc<RoutingTable>>) {
        for t in built {
            let i = t.sink_set().index();
            self.tables[i] = t;
        }
        self.version = version;
    }
}
