//! Coordinates and the local tangent-plane projection.
//!
//! Geometry arrives either in local metres ([`WorldPoint`]) or WGS-84
//! ([`GeoPoint`]).  [`LocalProjection`] maps the latter onto a flat plane
//! centred on a reference point using a fixed metres-per-degree latitude and
//! a `cos(lat0)`-scaled longitude.  Over the few tens of kilometres a
//! border region spans the distortion is well under a grid cell.

/// Metres per degree of latitude used by the projection.
pub const METERS_PER_DEG_LAT: f64 = 111_320.0;

/// A WGS-84 geographic coordinate.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

impl GeoPoint {
    #[inline]
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

impl std::fmt::Display for GeoPoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:.6}, {:.6})", self.lat, self.lon)
    }
}

/// A point in local metres.  `x` grows east, `y` grows north.
#[derive(Copy, Clone, Debug, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct WorldPoint {
    pub x: f64,
    pub y: f64,
}

impl WorldPoint {
    #[inline]
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance in metres.
    #[inline]
    pub fn distance(self, other: WorldPoint) -> f64 {
        ((other.x - self.x).powi(2) + (other.y - self.y).powi(2)).sqrt()
    }

    /// Linear interpolation towards `other`; `t = 0` is `self`.
    #[inline]
    pub fn lerp(self, other: WorldPoint, t: f64) -> WorldPoint {
        WorldPoint::new(self.x + (other.x - self.x) * t, self.y + (other.y - self.y) * t)
    }
}

/// Equirectangular projection around a fixed origin.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LocalProjection {
    pub origin: GeoPoint,
    meters_per_deg_lon: f64,
}

impl LocalProjection {
    pub fn new(origin: GeoPoint) -> Self {
        Self {
            origin,
            meters_per_deg_lon: METERS_PER_DEG_LAT * origin.lat.to_radians().cos(),
        }
    }

    /// Project a geographic point to local metres.
    pub fn project(&self, p: GeoPoint) -> WorldPoint {
        WorldPoint {
            x: (p.lon - self.origin.lon) * self.meters_per_deg_lon,
            y: (p.lat - self.origin.lat) * METERS_PER_DEG_LAT,
        }
    }

    /// Inverse of [`project`](Self::project).
    pub fn unproject(&self, p: WorldPoint) -> GeoPoint {
        GeoPoint {
            lat: self.origin.lat + p.y / METERS_PER_DEG_LAT,
            lon: self.origin.lon + p.x / self.meters_per_deg_lon,
        }
    }
}
