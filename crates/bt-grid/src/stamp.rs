//! Geometry stamping: polylines, polygons, and points onto the grid.
//!
//! Every stamp is a **monotone union**: a cell's conductance becomes the max
//! of its existing and the stamped value, so stamping order never removes
//! connectivity.  Region tags follow [`Region::rank`] precedence.

use bt_core::{CellId, WorldPoint, YardId};
use tracing::debug;

use crate::{Grid, GridError, GridResult, Region};

/// Minimum share of a road's conductance given to the cross axis, so that
/// turns onto perpendicular streets stay passable.
const AXIS_FLOOR: f32 = 0.25;

/// Parameters for stamping one road polyline.
#[derive(Clone, Copy, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RoadStamp {
    /// Carriageway width in metres.  Narrower than a cell still marks the
    /// centre-line cells.
    pub width_m:     f64,
    pub conductance: f32,
    /// Posted speed in m/s; `0.0` leaves the default in place.
    pub speed_mps:   f32,
}

impl Default for RoadStamp {
    fn default() -> Self {
        Self { width_m: 0.0, conductance: 1.0, speed_mps: 0.0 }
    }
}

impl Grid {
    /// Stamp a road polyline.
    ///
    /// Each segment is walked cell by cell, stepping one axis at a time, so
    /// consecutive road cells always share a side and slanted roads stay
    /// drivable on the 4-connected grid.  Roads wider than a cell add
    /// parallel walks at half-cell spacing on either side.
    ///
    /// Returns the number of cell visits (cells may repeat).
    pub fn stamp_polyline(&mut self, points: &[WorldPoint], road: RoadStamp) -> GridResult<usize> {
        if points.is_empty() {
            return Err(GridError::EmptyGeometry("polyline has no points"));
        }
        let step = self.cell_size() * 0.5;
        let half_w = road.width_m.max(0.0) * 0.5;
        let mut hits = 0;

        if points.len() == 1 {
            if let Some(c) = self.cell_at(points[0]) {
                self.raise_road(c, road, 1.0, 1.0);
                hits += 1;
            }
            return Ok(hits);
        }

        for seg in points.windows(2) {
            let (a, b) = (seg[0], seg[1]);
            let len = a.distance(b);
            if len == 0.0 {
                continue;
            }
            let (ux, uy) = ((b.x - a.x) / len, (b.y - a.y) / len);
            let wx = (ux.abs() as f32).max(AXIS_FLOOR);
            let wy = (uy.abs() as f32).max(AXIS_FLOOR);
            let lateral = (half_w / step).floor() as i64;

            for k in -lateral..=lateral {
                let off = k as f64 * step;
                let shift = |p: WorldPoint| WorldPoint::new(p.x - uy * off, p.y + ux * off);
                for c in self.walk_segment(shift(a), shift(b)) {
                    self.raise_road(c, road, wx, wy);
                    hits += 1;
                }
            }
        }
        Ok(hits)
    }

    /// In-grid cells crossed by the segment `a → b`, in order, with exactly
    /// one row or column change between consecutive entries.  An exact
    /// corner crossing steps the column first.
    pub(crate) fn walk_segment(&self, a: WorldPoint, b: WorldPoint) -> Vec<CellId> {
        let (cs, o) = (self.cell_size(), self.origin());
        let (x0, y0) = ((a.x - o.x) / cs, (a.y - o.y) / cs);
        let (x1, y1) = ((b.x - o.x) / cs, (b.y - o.y) / cs);
        if !(x0.is_finite() && y0.is_finite() && x1.is_finite() && y1.is_finite()) {
            return Vec::new();
        }
        let (mut col, mut row) = (x0.floor() as i64, y0.floor() as i64);
        let steps = (x1.floor() as i64 - col).abs() + (y1.floor() as i64 - row).abs();
        let (dx, dy) = (x1 - x0, y1 - y0);
        let step_c = if dx > 0.0 { 1 } else { -1 };
        let step_r = if dy > 0.0 { 1 } else { -1 };
        let first_edge = |p: f64, cell: i64, d: f64| -> f64 {
            if d > 0.0 {
                ((cell + 1) as f64 - p) / d
            } else if d < 0.0 {
                (cell as f64 - p) / d
            } else {
                f64::INFINITY
            }
        };
        let mut t_max_x = first_edge(x0, col, dx);
        let mut t_max_y = first_edge(y0, row, dy);
        let t_delta_x = if dx != 0.0 { 1.0 / dx.abs() } else { f64::INFINITY };
        let t_delta_y = if dy != 0.0 { 1.0 / dy.abs() } else { f64::INFINITY };

        let n = self.n() as i64;
        let mut cells = Vec::with_capacity(steps as usize + 1);
        let mut visit = |row: i64, col: i64| {
            if (0..n).contains(&row) && (0..n).contains(&col) {
                cells.push(self.cell(row as usize, col as usize));
            }
        };
        visit(row, col);
        for _ in 0..steps {
            if t_max_x <= t_max_y {
                col += step_c;
                t_max_x += t_delta_x;
            } else {
                row += step_r;
                t_max_y += t_delta_y;
            }
            visit(row, col);
        }
        cells
    }

    /// Stamp a polygon: every cell whose centre lies inside gets `region`,
    /// `yard`, and full conductance on both axes.
    ///
    /// A polygon too small to cover any cell centre claims the cell under its
    /// vertex centroid, so small lots are never silently dropped.
    pub fn stamp_polygon(
        &mut self,
        polygon:     &[WorldPoint],
        region:      Region,
        yard:        YardId,
        conductance: f32,
    ) -> GridResult<Vec<CellId>> {
        if polygon.len() < 3 {
            return Err(GridError::EmptyGeometry("polygon needs at least 3 vertices"));
        }
        let (mut min_x, mut min_y) = (f64::INFINITY, f64::INFINITY);
        let (mut max_x, mut max_y) = (f64::NEG_INFINITY, f64::NEG_INFINITY);
        for p in polygon {
            min_x = min_x.min(p.x);
            min_y = min_y.min(p.y);
            max_x = max_x.max(p.x);
            max_y = max_y.max(p.y);
        }

        let cs = self.cell_size();
        let o = self.origin();
        let n = self.n() as i64;
        let col0 = (((min_x - o.x) / cs).floor() as i64).clamp(0, n - 1);
        let col1 = (((max_x - o.x) / cs).floor() as i64).clamp(0, n - 1);
        let row0 = (((min_y - o.y) / cs).floor() as i64).clamp(0, n - 1);
        let row1 = (((max_y - o.y) / cs).floor() as i64).clamp(0, n - 1);

        let mut claimed = Vec::new();
        for row in row0..=row1 {
            for col in col0..=col1 {
                let c = self.cell(row as usize, col as usize);
                if point_in_polygon(self.cell_center(c), polygon) && self.claim(c, region, yard, conductance) {
                    claimed.push(c);
                }
            }
        }

        if claimed.is_empty() {
            let k = polygon.len() as f64;
            let centroid = WorldPoint::new(
                polygon.iter().map(|p| p.x).sum::<f64>() / k,
                polygon.iter().map(|p| p.y).sum::<f64>() / k,
            );
            if let Some(c) = self.cell_at(centroid) {
                if self.claim(c, region, yard, conductance) {
                    claimed.push(c);
                }
            }
        }
        debug!(?region, %yard, cells = claimed.len(), "stamped polygon");
        Ok(claimed)
    }

    /// Stamp a single point (source or crossing) with `region`.
    pub fn stamp_point(&mut self, p: WorldPoint, region: Region, conductance: f32) -> Option<CellId> {
        let c = self.cell_at(p)?;
        self.claim(c, region, YardId::INVALID, conductance).then_some(c)
    }

    /// Raise a cell to `region` with full conductance if precedence allows.
    /// Conductance is raised regardless.  Returns whether the region took.
    pub(crate) fn claim(&mut self, c: CellId, region: Region, yard: YardId, conductance: f32) -> bool {
        let i = c.index();
        self.conductance_x[i] = self.conductance_x[i].max(conductance);
        self.conductance_y[i] = self.conductance_y[i].max(conductance);
        if region.rank() >= self.region[i].rank() {
            self.region[i] = region;
            self.yard_of[i] = yard;
            true
        } else {
            false
        }
    }

    fn raise_road(&mut self, c: CellId, road: RoadStamp, wx: f32, wy: f32) {
        let i = c.index();
        self.conductance_x[i] = self.conductance_x[i].max(road.conductance * wx);
        self.conductance_y[i] = self.conductance_y[i].max(road.conductance * wy);
        if self.region[i] == Region::Impassable {
            self.region[i] = Region::Road;
        }
        if road.speed_mps > 0.0 {
            self.speed_limit[i] = self.speed_limit[i].max(road.speed_mps);
        }
    }
}

/// Even-odd ray-casting point-in-polygon test.  The polygon is implicitly
/// closed.
pub fn point_in_polygon(p: WorldPoint, polygon: &[WorldPoint]) -> bool {
    let mut inside = false;
    let mut j = polygon.len().wrapping_sub(1);
    for i in 0..polygon.len() {
        let (a, b) = (polygon[i], polygon[j]);
        if (a.y > p.y) != (b.y > p.y) {
            let x_cross = (b.x - a.x) * (p.y - a.y) / (b.y - a.y) + a.x;
            if p.x < x_cross {
                inside = !inside;
            }
        }
        j = i;
    }
    inside
}
