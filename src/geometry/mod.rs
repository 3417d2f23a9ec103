//! Planar geometry used to place mesh edges and intersection points on links.
//!
//! Links carry their source geometry: streams own a polyline measured by arc
//! length, waterbodies own one or more polygon parts. Coordinates are
//! projected meters; no geodesic math is done here.

pub mod polygon;
pub mod polyline;

pub use polygon::Polygon;
pub use polyline::Polyline;

/// A point in projected map coordinates (meters).
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Point2 {
    pub x: f64,
    pub y: f64,
}

impl Point2 {
    #[inline]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to `other`.
    #[inline]
    pub fn distance(self, other: Point2) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    #[inline]
    pub(crate) fn lerp(self, other: Point2, t: f64) -> Point2 {
        Point2::new(
            self.x + (other.x - self.x) * t,
            self.y + (other.y - self.y) * t,
        )
    }

    #[inline]
    pub(crate) fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl From<(f64, f64)> for Point2 {
    fn from((x, y): (f64, f64)) -> Self {
        Point2::new(x, y)
    }
}

/// Owned geometry of a link.
#[derive(Clone, Debug, PartialEq)]
pub enum Shape {
    Polyline(Polyline),
    Polygon(Polygon),
}
