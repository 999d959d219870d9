//! The grid store: flat per-cell arrays over a fixed N×N discretisation.
//!
//! # Data layout
//!
//! Every attribute is a separate `Vec` indexed by `CellId`, the same
//! structure-of-arrays shape a CSR graph uses for its edge arrays.  The
//! routing solver copies the arrays it needs into an immutable input, so
//! hot loops scan contiguous memory and background builds never alias the
//! live grid.
//!
//! # Conductance
//!
//! Each cell carries two conductances, one per axis.  A step between two
//! horizontally adjacent cells needs `conductance_x > 0` on both; vertical
//! steps read `conductance_y`.  Zero on both axes means impassable.

use bt_core::{CellId, WorldPoint, YardId};

use crate::{GridError, GridResult};

// ── Region ────────────────────────────────────────────────────────────────────

/// What a cell is used for.  Stamping never downgrades a region: a later
/// stamp only wins when its [`rank`](Region::rank) is at least as high.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Region {
    #[default]
    Impassable,
    Road,
    /// Conversion or overnight yard interior.
    Yard,
    /// Staging-area interior.
    Staging,
    /// Main border crossing.
    Sink,
    /// Alternate border crossing.
    AltSink,
}

impl Region {
    /// Stamping precedence.
    pub fn rank(self) -> u8 {
        match self {
            Region::Impassable => 0,
            Region::Road       => 1,
            Region::Yard       => 2,
            Region::Staging    => 2,
            Region::Sink       => 3,
            Region::AltSink    => 3,
        }
    }

    /// Yard or staging interior: cells tracked at yard granularity.
    #[inline]
    pub fn is_lot(self) -> bool {
        matches!(self, Region::Yard | Region::Staging)
    }

    #[inline]
    pub fn is_crossing(self) -> bool {
        matches!(self, Region::Sink | Region::AltSink)
    }
}

// ── Dir ───────────────────────────────────────────────────────────────────────

/// One of the four grid directions.  Iteration order is always
/// [`Dir::ALL`], which every scan in the kernel relies on for determinism.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum Dir {
    North,
    East,
    South,
    West,
}

impl Dir {
    pub const ALL: [Dir; 4] = [Dir::North, Dir::East, Dir::South, Dir::West];

    #[inline]
    pub fn opposite(self) -> Dir {
        match self {
            Dir::North => Dir::South,
            Dir::East  => Dir::West,
            Dir::South => Dir::North,
            Dir::West  => Dir::East,
        }
    }

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    /// `true` for East/West steps, which read `conductance_x`.
    #[inline]
    pub fn is_horizontal(self) -> bool {
        matches!(self, Dir::East | Dir::West)
    }
}

// ── Grid ──────────────────────────────────────────────────────────────────────

/// Fixed N×N grid with conductance, region, yard membership, and posted
/// speed per cell.
///
/// Fields are `pub` for direct indexed access on hot paths; all arrays have
/// length `n * n`.
#[derive(Clone, Debug)]
pub struct Grid {
    n:           usize,
    cell_size_m: f64,
    /// South-west corner of cell (0, 0) in world metres.
    origin:      WorldPoint,

    /// Conductance for East/West steps (≥ 0).
    pub conductance_x: Vec<f32>,
    /// Conductance for North/South steps (≥ 0).
    pub conductance_y: Vec<f32>,
    pub region:        Vec<Region>,
    /// Owning yard or staging area; `YardId::INVALID` elsewhere.
    pub yard_of:       Vec<YardId>,
    /// Posted speed limit in m/s; `0.0` means "use the free-flow default".
    pub speed_limit:   Vec<f32>,
}

impl Grid {
    /// Allocate an all-impassable grid.
    pub fn new(n: usize, cell_size_m: f64, origin: WorldPoint) -> GridResult<Self> {
        if n == 0 || n > 46_340 {
            return Err(GridError::Dimensions(format!("n = {n} must be in 1..=46340")));
        }
        if !(cell_size_m.is_finite() && cell_size_m > 0.0) {
            return Err(GridError::Dimensions(format!("cell size {cell_size_m} must be positive")));
        }
        let len = n * n;
        Ok(Self {
            n,
            cell_size_m,
            origin,
            conductance_x: vec![0.0; len],
            conductance_y: vec![0.0; len],
            region:        vec![Region::Impassable; len],
            yard_of:       vec![YardId::INVALID; len],
            speed_limit:   vec![0.0; len],
        })
    }

    // ── Dimensions ────────────────────────────────────────────────────────

    #[inline]
    pub fn n(&self) -> usize {
        self.n
    }

    /// Number of cells (`n * n`).
    #[inline]
    pub fn len(&self) -> usize {
        self.n * self.n
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.n == 0
    }

    #[inline]
    pub fn cell_size(&self) -> f64 {
        self.cell_size_m
    }

    #[inline]
    pub fn origin(&self) -> WorldPoint {
        self.origin
    }

    #[inline]
    pub fn contains(&self, cell: CellId) -> bool {
        cell.index() < self.len()
    }

    // ── Coordinates ───────────────────────────────────────────────────────

    #[inline]
    pub fn cell(&self, row: usize, col: usize) -> CellId {
        CellId((row * self.n + col) as u32)
    }

    #[inline]
    pub fn row_col(&self, cell: CellId) -> (usize, usize) {
        (cell.index() / self.n, cell.index() % self.n)
    }

    /// Cell containing `p`, or `None` outside the grid.
    pub fn cell_at(&self, p: WorldPoint) -> Option<CellId> {
        let fx = (p.x - self.origin.x) / self.cell_size_m;
        let fy = (p.y - self.origin.y) / self.cell_size_m;
        if !(fx >= 0.0 && fy >= 0.0) {
            return None;
        }
        let (col, row) = (fx.floor() as usize, fy.floor() as usize);
        (col < self.n && row < self.n).then(|| self.cell(row, col))
    }

    /// World position of the centre of `cell`.
    pub fn cell_center(&self, cell: CellId) -> WorldPoint {
        let (row, col) = self.row_col(cell);
        WorldPoint::new(
            self.origin.x + (col as f64 + 0.5) * self.cell_size_m,
            self.origin.y + (row as f64 + 0.5) * self.cell_size_m,
        )
    }

    // ── Topology ──────────────────────────────────────────────────────────

    /// Neighbour of `cell` in direction `dir`, or `None` at the edge.
    #[inline]
    pub fn neighbor(&self, cell: CellId, dir: Dir) -> Option<CellId> {
        let (row, col) = self.row_col(cell);
        match dir {
            Dir::North if row + 1 < self.n => Some(self.cell(row + 1, col)),
            Dir::East if col + 1 < self.n  => Some(self.cell(row, col + 1)),
            Dir::South if row > 0          => Some(self.cell(row - 1, col)),
            Dir::West if col > 0           => Some(self.cell(row, col - 1)),
            _ => None,
        }
    }

    /// In-bounds 4-neighbours in [`Dir::ALL`] order.
    pub fn neighbors(&self, cell: CellId) -> impl Iterator<Item = (Dir, CellId)> + '_ {
        Dir::ALL
            .into_iter()
            .filter_map(move |d| self.neighbor(cell, d).map(|c| (d, c)))
    }

    /// Direction from `from` to an adjacent `to`, if they are 4-neighbours.
    pub fn dir_between(&self, from: CellId, to: CellId) -> Option<Dir> {
        Dir::ALL.into_iter().find(|&d| self.neighbor(from, d) == Some(to))
    }

    /// `true` if either axis conducts.
    #[inline]
    pub fn is_conductive(&self, cell: CellId) -> bool {
        self.conductance_x[cell.index()] > 0.0 || self.conductance_y[cell.index()] > 0.0
    }

    /// `true` if a particle may step from `from` in direction `dir`.
    #[inline]
    pub fn can_step(&self, from: CellId, dir: Dir) -> bool {
        let Some(to) = self.neighbor(from, dir) else {
            return false;
        };
        let k = if dir.is_horizontal() { &self.conductance_x } else { &self.conductance_y };
        k[from.index()] > 0.0 && k[to.index()] > 0.0
    }

    /// Posted speed of `cell`, or `default_mps` when none is posted.
    #[inline]
    pub fn speed_at(&self, cell: CellId, default_mps: f32) -> f32 {
        let v = self.speed_limit[cell.index()];
        if v > 0.0 { v } else { default_mps }
    }

    /// All cells tagged with `region`, ascending.
    pub fn cells_with(&self, region: Region) -> Vec<CellId> {
        self.region
            .iter()
            .enumerate()
            .filter(|(_, r)| **r == region)
            .map(|(i, _)| CellId(i as u32))
            .collect()
    }

    /// All cells owned by `yard`, ascending.
    pub fn yard_cells(&self, yard: YardId) -> Vec<CellId> {
        self.yard_of
            .iter()
            .enumerate()
            .filter(|(_, y)| **y == yard)
            .map(|(i, _)| CellId(i as u32))
            .collect()
    }

    /// Total conductive cells; a cheap sanity figure for logs.
    pub fn conductive_count(&self) -> usize {
        (0..self.len()).filter(|&i| self.is_conductive(CellId(i as u32))).count()
    }
}
