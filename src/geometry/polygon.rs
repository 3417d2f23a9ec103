//! Simple polygons for waterbody parts.

use crate::geometry::Point2;
use crate::network_error::NetworkError;
use itertools::Itertools;

/// A polygon exterior ring. A repeated closing vertex is dropped on
/// construction so `vertices()` lists each corner once.
#[derive(Clone, Debug, PartialEq)]
pub struct Polygon {
    exterior: Vec<Point2>,
}

impl Polygon {
    /// Build a polygon, rejecting rings with fewer than three distinct
    /// vertices or zero area.
    pub fn new(mut exterior: Vec<Point2>) -> Result<Self, NetworkError> {
        if exterior.len() > 1 && exterior.first() == exterior.last() {
            exterior.pop();
        }
        if exterior.len() < 3 {
            return Err(NetworkError::DegenerateGeometry(format!(
                "polygon needs at least 3 vertices, got {}",
                exterior.len()
            )));
        }
        if exterior.iter().any(|p| !p.is_finite()) {
            return Err(NetworkError::DegenerateGeometry(
                "polygon vertex is not finite".into(),
            ));
        }
        let polygon = Self { exterior };
        if polygon.area() <= 0.0 {
            return Err(NetworkError::DegenerateGeometry(
                "polygon has zero area".into(),
            ));
        }
        Ok(polygon)
    }

    #[inline]
    pub fn vertices(&self) -> &[Point2] {
        &self.exterior
    }

    /// Unsigned area (shoelace formula).
    pub fn area(&self) -> f64 {
        let twice: f64 = self
            .exterior
            .iter()
            .circular_tuple_windows()
            .map(|(a, b)| a.x * b.y - b.x * a.y)
            .sum();
        twice.abs() * 0.5
    }

    /// Length of the closed ring.
    pub fn perimeter(&self) -> f64 {
        self.exterior
            .iter()
            .circular_tuple_windows()
            .map(|(a, b)| a.distance(*b))
            .sum()
    }
}
