//! Fluent builder for constructing a [`Sim`].

use bt_admission::{AdmissionController, YardKind};
use bt_core::{CellId, GeoPoint, LocalProjection, WorldPoint, YardId};
use bt_grid::{BridgeOutcome, Grid, Region, RoadStamp};
use bt_scenario::ScenarioBlend;
use bt_transport::{Injector, Origin, Source};
use tracing::{debug, warn};

use crate::{Sim, SimConfig, SimError, SimResult};

/// Conductance given to lots, crossings, sources, and bridging connectors.
const FEATURE_CONDUCTANCE: f32 = 1.0;

/// Lot ids are `u16`; the top value is the `INVALID` sentinel.
const MAX_LOTS: usize = YardId::INVALID.0 as usize;

struct YardSpec {
    name:     String,
    kind:     YardKind,
    polygon:  Vec<WorldPoint>,
    capacity: u32,
}

struct SourceSpec {
    name:   String,
    point:  WorldPoint,
    origin: Origin,
    key:    String,
}

/// Fluent builder for [`Sim`].
///
/// # Required inputs
///
/// - [`SimConfig`]: grid size, seed, and the component tunables
/// - [`ScenarioBlend`]: hourly source rates and border capacity
/// - at least one [`crossing`](Self::crossing)
///
/// # Geometry
///
/// | Method               | Stamps                                   |
/// |----------------------|------------------------------------------|
/// | `.road(pts, stamp)`  | road polyline                            |
/// | `.yard(..)`          | lot polygon (yard or staging region)     |
/// | `.source(..)`        | injection point, paved as road           |
/// | `.crossing(p)`       | main border crossing                     |
/// | `.alt_crossing(p)`   | alternate crossing (adds a second border)|
///
/// Each has a `_geo` twin taking WGS-84 points, projected through
/// [`projection`](Self::projection).  Stamping order is roads, lots,
/// crossings, sources; region precedence makes the order matter only for
/// overlapping lots, where the later lot wins.  Afterwards every lot,
/// source, and crossing is bridged to the road network.
///
/// # Example
///
/// ```rust,ignore
/// let mut sim = SimBuilder::new(config, scenario)
///     .road(vec![WorldPoint::new(5.0, 5.0), WorldPoint::new(995.0, 5.0)], RoadStamp::default())
///     .yard("north", YardKind::Conversion, lot_polygon, 40)
///     .source("corridor", WorldPoint::new(5.0, 5.0), Origin::Corridor, "corridor_rate")
///     .crossing(WorldPoint::new(995.0, 5.0))
///     .build()?;
/// sim.run_for(3_600.0, 1.0, &mut NoopObserver)?;
/// ```
pub struct SimBuilder {
    config:     SimConfig,
    scenario:   ScenarioBlend,
    origin:     WorldPoint,
    projection: Option<LocalProjection>,
    roads:      Vec<(Vec<WorldPoint>, RoadStamp)>,
    yards:      Vec<YardSpec>,
    sources:    Vec<SourceSpec>,
    crossings:  Vec<WorldPoint>,
    alts:       Vec<WorldPoint>,
}

impl SimBuilder {
    pub fn new(config: SimConfig, scenario: ScenarioBlend) -> Self {
        Self {
            config,
            scenario,
            origin:     WorldPoint::new(0.0, 0.0),
            projection: None,
            roads:      Vec::new(),
            yards:      Vec::new(),
            sources:    Vec::new(),
            crossings:  Vec::new(),
            alts:       Vec::new(),
        }
    }

    /// World position of the grid's south-west corner.  Defaults to the
    /// local origin.
    pub fn grid_origin(mut self, origin: WorldPoint) -> Self {
        self.origin = origin;
        self
    }

    /// Projection used by the `_geo` methods.  If never set, the first
    /// geographic point seen anchors it.
    pub fn projection(mut self, anchor: GeoPoint) -> Self {
        self.projection = Some(LocalProjection::new(anchor));
        self
    }

    pub fn road(mut self, points: Vec<WorldPoint>, stamp: RoadStamp) -> Self {
        self.roads.push((points, stamp));
        self
    }

    /// A lot.  Yards get ids in call order, starting at 0.
    pub fn yard(mut self, name: impl Into<String>, kind: YardKind, polygon: Vec<WorldPoint>, capacity: u32) -> Self {
        self.yards.push(YardSpec { name: name.into(), kind, polygon, capacity });
        self
    }

    /// A truck source reading its hourly rate from scenario column `key`.
    pub fn source(
        mut self,
        name:   impl Into<String>,
        point:  WorldPoint,
        origin: Origin,
        key:    impl Into<String>,
    ) -> Self {
        self.sources.push(SourceSpec { name: name.into(), point, origin, key: key.into() });
        self
    }

    pub fn crossing(mut self, point: WorldPoint) -> Self {
        self.crossings.push(point);
        self
    }

    pub fn alt_crossing(mut self, point: WorldPoint) -> Self {
        self.alts.push(point);
        self
    }

    // ── Geographic input ──────────────────────────────────────────────────

    pub fn road_geo(mut self, points: &[GeoPoint], stamp: RoadStamp) -> Self {
        let pts = self.project(points);
        self.road(pts, stamp)
    }

    pub fn yard_geo(mut self, name: impl Into<String>, kind: YardKind, polygon: &[GeoPoint], capacity: u32) -> Self {
        let pts = self.project(polygon);
        self.yard(name, kind, pts, capacity)
    }

    pub fn source_geo(
        mut self,
        name:   impl Into<String>,
        point:  GeoPoint,
        origin: Origin,
        key:    impl Into<String>,
    ) -> Self {
        let p = self.project(&[point])[0];
        self.source(name, p, origin, key)
    }

    pub fn crossing_geo(mut self, point: GeoPoint) -> Self {
        let p = self.project(&[point])[0];
        self.crossing(p)
    }

    pub fn alt_crossing_geo(mut self, point: GeoPoint) -> Self {
        let p = self.project(&[point])[0];
        self.alt_crossing(p)
    }

    fn project(&mut self, points: &[GeoPoint]) -> Vec<WorldPoint> {
        if self.projection.is_none() {
            self.projection = points.first().map(|&p| LocalProjection::new(p));
        }
        match &self.projection {
            Some(proj) => points.iter().map(|&p| proj.project(p)).collect(),
            None => Vec::new(),
        }
    }

    // ── Build ─────────────────────────────────────────────────────────────

    /// Validate, rasterize, bridge, and return a ready-to-run [`Sim`].
    pub fn build(self) -> SimResult<Sim> {
        self.config.validate()?;
        if self.crossings.is_empty() {
            return Err(SimError::Config("at least one border crossing is required".into()));
        }
        if self.yards.len() > MAX_LOTS {
            return Err(SimError::Config(format!("{} lots exceed the limit of {MAX_LOTS}", self.yards.len())));
        }
        let cfg = &self.config;
        let mut grid = Grid::new(cfg.grid_n, cfg.cell_size_m, self.origin)?;

        // ── Stamp ─────────────────────────────────────────────────────────
        for (points, stamp) in &self.roads {
            grid.stamp_polyline(points, *stamp)?;
        }
        for (i, y) in self.yards.iter().enumerate() {
            let region = if y.kind == YardKind::Staging { Region::Staging } else { Region::Yard };
            grid.stamp_polygon(&y.polygon, region, YardId(i as u16), FEATURE_CONDUCTANCE)?;
        }
        let mut crossing_cells = Vec::new();
        for (points, region) in [(&self.crossings, Region::Sink), (&self.alts, Region::AltSink)] {
            for &p in points {
                let cell = grid
                    .stamp_point(p, region, FEATURE_CONDUCTANCE)
                    .ok_or_else(|| SimError::Config(format!("crossing at ({:.1}, {:.1}) lies outside the grid", p.x, p.y)))?;
                crossing_cells.push(cell);
            }
        }
        let mut sources = Vec::with_capacity(self.sources.len());
        for s in &self.sources {
            let cell = grid.cell_at(s.point).ok_or_else(|| {
                SimError::Config(format!("source {} at ({:.1}, {:.1}) lies outside the grid", s.name, s.point.x, s.point.y))
            })?;
            grid.stamp_point(s.point, Region::Road, FEATURE_CONDUCTANCE);
            sources.push(Source::new(s.name.clone(), cell, s.origin, s.key.clone()));
        }

        // ── Bridge ────────────────────────────────────────────────────────
        // Later lots may have overwritten cells of earlier ones, so read the
        // final footprint back from the grid.
        let footprints: Vec<_> = (0..self.yards.len()).map(|i| grid.yard_cells(YardId(i as u16))).collect();
        let mut unresolved = 0;
        for (y, cells) in self.yards.iter().zip(&footprints) {
            if cells.is_empty() {
                warn!(yard = %y.name, "lot covers no grid cell; it will never admit");
                continue;
            }
            unresolved += bridge(&mut grid, cells, cfg.bridge_max_gap, &y.name);
        }
        for s in &sources {
            unresolved += bridge(&mut grid, &[s.cell], cfg.bridge_max_gap, &s.name);
        }
        for &c in &crossing_cells {
            unresolved += bridge(&mut grid, &[c], cfg.bridge_max_gap, "crossing");
        }
        if unresolved > 0 {
            warn!(unresolved, "some features remain disconnected from the road network");
        }

        // ── Lots ──────────────────────────────────────────────────────────
        let mut admission = AdmissionController::new(cfg.admission.clone())?;
        for (y, cells) in self.yards.into_iter().zip(footprints) {
            admission.add_yard(y.name, y.kind, cells, y.capacity);
        }

        Ok(Sim::assemble(self.config, grid, self.scenario, admission, Injector::new(sources)))
    }
}

/// Bridge one feature; returns 1 if it stayed disconnected.
fn bridge(grid: &mut Grid, cells: &[CellId], max_gap: usize, name: &str) -> usize {
    match grid.bridge_to_roads(cells, max_gap, FEATURE_CONDUCTANCE) {
        BridgeOutcome::Connected => 0,
        BridgeOutcome::Bridged { cells } => {
            debug!(feature = name, cells, "bridged feature to the road network");
            0
        }
        BridgeOutcome::Unresolved => {
            warn!(feature = name, "feature left disconnected");
            1
        }
    }
}
