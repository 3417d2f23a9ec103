//! Arc-length parameterized polylines.

use crate::geometry::Point2;
use crate::network_error::NetworkError;
use itertools::Itertools;

const EPS: f64 = 1e-12;

/// An open polyline with cumulative arc lengths cached per vertex.
///
/// # Invariants
/// - At least two vertices, all finite.
/// - `cumulative[0] == 0` and `cumulative` is non-decreasing.
/// - Total length is strictly positive.
#[derive(Clone, Debug, PartialEq)]
pub struct Polyline {
    points: Vec<Point2>,
    cumulative: Vec<f64>,
}

impl Polyline {
    /// Build a polyline, rejecting degenerate input.
    pub fn new(points: Vec<Point2>) -> Result<Self, NetworkError> {
        if points.len() < 2 {
            return Err(NetworkError::DegenerateGeometry(format!(
                "polyline needs at least 2 points, got {}",
                points.len()
            )));
        }
        if let Some(p) = points.iter().find(|p| !p.is_finite()) {
            return Err(NetworkError::DegenerateGeometry(format!(
                "polyline vertex ({}, {}) is not finite",
                p.x, p.y
            )));
        }
        let mut cumulative = Vec::with_capacity(points.len());
        cumulative.push(0.0);
        let mut total = 0.0;
        for (a, b) in points.iter().tuple_windows() {
            total += a.distance(*b);
            cumulative.push(total);
        }
        if total <= EPS {
            return Err(NetworkError::DegenerateGeometry(
                "polyline has zero length".into(),
            ));
        }
        Ok(Self { points, cumulative })
    }

    /// Total arc length.
    #[inline]
    pub fn length(&self) -> f64 {
        self.cumulative[self.cumulative.len() - 1]
    }

    #[inline]
    pub fn points(&self) -> &[Point2] {
        &self.points
    }

    /// Arc-length position of the point on the polyline closest to `p`.
    ///
    /// Ties between equally close segments resolve to the earliest segment.
    pub fn project(&self, p: Point2) -> f64 {
        let mut best_dist = f64::INFINITY;
        let mut best_loc = 0.0;
        for (i, (a, b)) in self.points.iter().tuple_windows().enumerate() {
            let dx = b.x - a.x;
            let dy = b.y - a.y;
            let len2 = dx * dx + dy * dy;
            let t = if len2 <= EPS {
                0.0
            } else {
                (((p.x - a.x) * dx + (p.y - a.y) * dy) / len2).clamp(0.0, 1.0)
            };
            let d = p.distance(a.lerp(*b, t));
            if d < best_dist {
                best_dist = d;
                best_loc = self.cumulative[i] + t * (self.cumulative[i + 1] - self.cumulative[i]);
            }
        }
        best_loc
    }

    /// Point at arc length `s`, clamped to the polyline.
    pub fn point_at(&self, s: f64) -> Point2 {
        let s = s.clamp(0.0, self.length());
        let seg = self.segment_index(s);
        let (s0, s1) = (self.cumulative[seg], self.cumulative[seg + 1]);
        let t = if s1 - s0 <= EPS { 0.0 } else { (s - s0) / (s1 - s0) };
        self.points[seg].lerp(self.points[seg + 1], t)
    }

    /// Vertices covering `[from, to]`: the interpolated endpoints plus every
    /// original vertex strictly between them.
    pub fn vertices_between(&self, from: f64, to: f64) -> Vec<Point2> {
        let (from, to) = if from <= to { (from, to) } else { (to, from) };
        let from = from.clamp(0.0, self.length());
        let to = to.clamp(0.0, self.length());
        let mut out = vec![self.point_at(from)];
        for (i, &c) in self.cumulative.iter().enumerate() {
            if c > from + EPS && c < to - EPS {
                out.push(self.points[i]);
            }
        }
        let last = self.point_at(to);
        if out.last().is_none_or(|p| p.distance(last) > EPS) {
            out.push(last);
        }
        out
    }

    fn segment_index(&self, s: f64) -> usize {
        // index of the last vertex whose cumulative length is <= s, capped so
        // that `seg + 1` is still a valid vertex
        let idx = self.cumulative.partition_point(|&c| c <= s);
        idx.saturating_sub(1).min(self.points.len() - 2)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn l_shape() -> Polyline {
        Polyline::new(vec![
            Point2::new(0.0, 0.0),
            Point2::new(300.0, 0.0),
            Point2::new(300.0, 200.0),
        ])
        .unwrap()
    }

    #[test]
    fn length_is_sum_of_segments() {
        assert_eq!(l_shape().length(), 500.0);
    }

    #[test]
    fn rejects_degenerate() {
        assert!(Polyline::new(vec![Point2::new(1.0, 1.0)]).is_err());
        assert!(Polyline::new(vec![Point2::new(1.0, 1.0), Point2::new(1.0, 1.0)]).is_err());
        assert!(Polyline::new(vec![Point2::new(f64::NAN, 1.0), Point2::new(1.0, 1.0)]).is_err());
    }

    #[test]
    fn project_onto_each_leg() {
        let p = l_shape();
        let close = |a: f64, b: f64| (a - b).abs() < 1e-9;
        assert!(close(p.project(Point2::new(100.0, 5.0)), 100.0));
        assert!(close(p.project(Point2::new(310.0, 50.0)), 350.0));
        assert!(close(p.project(Point2::new(-20.0, 0.0)), 0.0));
        assert!(close(p.project(Point2::new(300.0, 900.0)), 500.0));
    }

    #[test]
    fn point_at_interpolates_and_clamps() {
        let p = l_shape();
        assert_eq!(p.point_at(150.0), Point2::new(150.0, 0.0));
        assert_eq!(p.point_at(400.0), Point2::new(300.0, 100.0));
        assert_eq!(p.point_at(-5.0), Point2::new(0.0, 0.0));
        assert_eq!(p.point_at(1e9), Point2::new(300.0, 200.0));
    }

    #[test]
    fn vertices_between_includes_interior_corners() {
        let p = l_shape();
        let v = p.vertices_between(150.0, 350.0);
        assert_eq!(
            v,
            vec![
                Point2::new(150.0, 0.0),
                Point2::new(300.0, 0.0),
                Point2::new(300.0, 50.0)
            ]
        );
        let straight = p.vertices_between(10.0, 20.0);
        assert_eq!(straight.len(), 2);
    }
}
