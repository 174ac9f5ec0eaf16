//! Centroid & Radial-Tangential Vector Math
//!
//! Pure geometry used by the gesture classifier's zoom gate: centroid and
//! average radial distance over a pointer set, and per-pointer decomposition
//! of displacement into a radial component (along the ray from the baseline
//! centroid) and a tangential residual (perpendicular to it). High radial
//! agreement with low tangential energy distinguishes a pinch from rotation
//! or jitter.

use serde::{Deserialize, Serialize};

/// A screen coordinate in logical pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    #[inline]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another point.
    #[inline]
    pub fn distance_to(&self, other: Point) -> f64 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        (dx * dx + dy * dy).sqrt()
    }
}

/// An axis-aligned rectangle in global screen coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub const fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    /// Whether the rectangle has a renderable area.
    #[inline]
    pub fn is_degenerate(&self) -> bool {
        self.width < 1.0 || self.height < 1.0
    }

    /// Whether a point falls inside the rectangle (edges inclusive).
    #[inline]
    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.left
            && p.x <= self.left + self.width
            && p.y >= self.top
            && p.y <= self.top + self.height
    }
}

/// Displacement split into radial and tangential components.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RadialComponents {
    /// Signed component along the baseline ray (positive = outward).
    pub radial: f64,
    /// Magnitude of the perpendicular residual.
    pub tangential: f64,
}

/// Aggregate zoom statistics over a pointer set. Derived, never persisted.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZoomMetrics {
    /// Mean signed radial displacement (positive = spreading outward).
    pub avg_radial: f64,
    /// Root-mean-square of tangential residuals.
    pub tangential_rms: f64,
    /// Fraction of pointers whose radial sign matches the majority sign.
    pub consistency: f64,
}

/// Geometric mean position of a pointer set.
///
/// Returns the origin for an empty slice; callers guard on pointer count.
pub fn centroid(points: &[Point]) -> Point {
    if points.is_empty() {
        return Point::new(0.0, 0.0);
    }
    let n = points.len() as f64;
    let sum_x: f64 = points.iter().map(|p| p.x).sum();
    let sum_y: f64 = points.iter().map(|p| p.y).sum();
    Point::new(sum_x / n, sum_y / n)
}

/// Mean Euclidean distance from `center` to each point.
pub fn average_radial_distance(points: &[Point], center: Point) -> f64 {
    if points.is_empty() {
        return 0.0;
    }
    let total: f64 = points.iter().map(|p| center.distance_to(*p)).sum();
    total / points.len() as f64
}

/// Decompose the displacement `baseline → current` against the ray from
/// `center` through `baseline`.
///
/// A baseline sitting on the centroid has no defined ray; its displacement
/// is treated as purely tangential.
pub fn radial_tangential(center: Point, baseline: Point, current: Point) -> RadialComponents {
    let rx = baseline.x - center.x;
    let ry = baseline.y - center.y;
    let r_len = (rx * rx + ry * ry).sqrt();

    let dx = current.x - baseline.x;
    let dy = current.y - baseline.y;

    if r_len <= 1e-9 {
        return RadialComponents {
            radial: 0.0,
            tangential: (dx * dx + dy * dy).sqrt(),
        };
    }

    let ux = rx / r_len;
    let uy = ry / r_len;

    let radial = dx * ux + dy * uy;
    let tx = dx - radial * ux;
    let ty = dy - radial * uy;

    RadialComponents {
        radial,
        tangential: (tx * tx + ty * ty).sqrt(),
    }
}

/// Compute aggregate zoom statistics from `(baseline, current)` position
/// pairs measured against the baseline centroid `center`.
pub fn zoom_metrics(center: Point, pairs: &[(Point, Point)]) -> ZoomMetrics {
    if pairs.is_empty() {
        return ZoomMetrics {
            avg_radial: 0.0,
            tangential_rms: 0.0,
            consistency: 0.0,
        };
    }

    let n = pairs.len() as f64;
    let mut radial_sum = 0.0;
    let mut tangential_sq_sum = 0.0;
    let mut outward = 0usize;
    let mut inward = 0usize;

    for &(baseline, current) in pairs {
        let c = radial_tangential(center, baseline, current);
        radial_sum += c.radial;
        tangential_sq_sum += c.tangential * c.tangential;
        if c.radial > 0.0 {
            outward += 1;
        } else if c.radial < 0.0 {
            inward += 1;
        }
    }

    ZoomMetrics {
        avg_radial: radial_sum / n,
        tangential_rms: (tangential_sq_sum / n).sqrt(),
        consistency: outward.max(inward) as f64 / n,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point_distance() {
        let a = Point::new(0.0, 0.0);
        let b = Point::new(3.0, 4.0);
        assert_eq!(a.distance_to(b), 5.0);
        assert_eq!(b.distance_to(a), 5.0);
        assert_eq!(a.distance_to(a), 0.0);
    }

    #[test]
    fn test_rect_contains() {
        let r = Rect::new(10.0, 20.0, 100.0, 50.0);
        assert!(r.contains(Point::new(10.0, 20.0)));
        assert!(r.contains(Point::new(110.0, 70.0)));
        assert!(r.contains(Point::new(50.0, 40.0)));
        assert!(!r.contains(Point::new(9.9, 40.0)));
        assert!(!r.contains(Point::new(50.0, 70.1)));
    }

    #[test]
    fn test_rect_degenerate() {
        assert!(Rect::new(0.0, 0.0, 0.0, 100.0).is_degenerate());
        assert!(Rect::new(0.0, 0.0, 100.0, 0.5).is_degenerate());
        assert!(!Rect::new(0.0, 0.0, 1.0, 1.0).is_degenerate());
    }

    #[test]
    fn test_centroid_of_pair() {
        let c = centroid(&[Point::new(50.0, 50.0), Point::new(150.0, 50.0)]);
        assert_eq!(c, Point::new(100.0, 50.0));
    }

    #[test]
    fn test_centroid_empty() {
        assert_eq!(centroid(&[]), Point::new(0.0, 0.0));
    }

    #[test]
    fn test_average_radial_distance() {
        let center = Point::new(100.0, 50.0);
        let points = [Point::new(50.0, 50.0), Point::new(150.0, 50.0)];
        assert_eq!(average_radial_distance(&points, center), 50.0);
    }

    #[test]
    fn test_radial_outward_motion() {
        // Baseline at (150,50), center at (100,50): radial ray points +x.
        // Moving to (170,50) is 20px outward with no tangential residual.
        let c = radial_tangential(
            Point::new(100.0, 50.0),
            Point::new(150.0, 50.0),
            Point::new(170.0, 50.0),
        );
        assert!((c.radial - 20.0).abs() < 1e-9);
        assert!(c.tangential.abs() < 1e-9);
    }

    #[test]
    fn test_radial_inward_motion() {
        let c = radial_tangential(
            Point::new(100.0, 50.0),
            Point::new(150.0, 50.0),
            Point::new(130.0, 50.0),
        );
        assert!((c.radial + 20.0).abs() < 1e-9);
        assert!(c.tangential.abs() < 1e-9);
    }

    #[test]
    fn test_tangential_rotation_motion() {
        // Perpendicular displacement is purely tangential.
        let c = radial_tangential(
            Point::new(100.0, 50.0),
            Point::new(150.0, 50.0),
            Point::new(150.0, 80.0),
        );
        assert!(c.radial.abs() < 1e-9);
        assert!((c.tangential - 30.0).abs() < 1e-9);
    }

    #[test]
    fn test_degenerate_baseline_ray() {
        let c = radial_tangential(
            Point::new(100.0, 50.0),
            Point::new(100.0, 50.0),
            Point::new(103.0, 54.0),
        );
        assert_eq!(c.radial, 0.0);
        assert!((c.tangential - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_zoom_metrics_symmetric_pinch_out() {
        let center = Point::new(100.0, 50.0);
        let pairs = [
            (Point::new(50.0, 50.0), Point::new(30.0, 50.0)),
            (Point::new(150.0, 50.0), Point::new(170.0, 50.0)),
        ];
        let m = zoom_metrics(center, &pairs);
        assert!((m.avg_radial - 20.0).abs() < 1e-9);
        assert!(m.tangential_rms.abs() < 1e-9);
        assert_eq!(m.consistency, 1.0);
    }

    #[test]
    fn test_zoom_metrics_opposing_motion_splits_consistency() {
        let center = Point::new(100.0, 50.0);
        // One pointer moves out, the other moves in: no majority.
        let pairs = [
            (Point::new(50.0, 50.0), Point::new(30.0, 50.0)),
            (Point::new(150.0, 50.0), Point::new(130.0, 50.0)),
        ];
        let m = zoom_metrics(center, &pairs);
        assert_eq!(m.consistency, 0.5);
        assert!(m.avg_radial.abs() < 1e-9);
    }

    #[test]
    fn test_zoom_metrics_rotation_is_tangential_dominated() {
        let center = Point::new(0.0, 0.0);
        let s = 100.0 / f64::sqrt(2.0);
        // Two pointers rotating 45° around the center.
        let pairs = [
            (Point::new(100.0, 0.0), Point::new(s, s)),
            (Point::new(-100.0, 0.0), Point::new(-s, -s)),
        ];
        let m = zoom_metrics(center, &pairs);
        assert!(m.avg_radial < 0.0, "chord motion pulls slightly inward");
        assert!(
            m.tangential_rms > m.avg_radial.abs(),
            "rotation must be dominated by tangential energy"
        );
    }

    #[test]
    fn test_zoom_metrics_empty() {
        let m = zoom_metrics(Point::new(0.0, 0.0), &[]);
        assert_eq!(m.avg_radial, 0.0);
        assert_eq!(m.consistency, 0.0);
    }
}
