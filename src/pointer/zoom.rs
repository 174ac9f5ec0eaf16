//! Zoom Baseline & Three-Factor Gate
//!
//! Zoom detection compares the live pointer set against a frozen
//! [`ScaleSnapshot`] baseline through three independent gates:
//!
//! 1. **Magnitude** — the average radial distance must change by more than
//!    5% relatively or 6 px absolutely.
//! 2. **Directionality over rotation** — mean radial displacement must
//!    dominate tangential jitter (`|avgRadial| > max(8 px, 1.5 × RMS)`).
//! 3. **Cross-pointer consistency** — at least 60% of pointers must move in
//!    the majority radial direction.
//!
//! The gate is deliberately conservative: rotation and jitter produce large
//! tangential energy or split radial signs and are rejected.

use std::collections::HashMap;

use crate::geometry::{self, Point};
use crate::pointer::trace::PointerId;

/// Frozen multi-pointer baseline used as the zoom reference frame.
///
/// Recomputed whenever the active pointer count transitions across the
/// 2-pointer threshold.
#[derive(Debug, Clone)]
pub struct ScaleSnapshot {
    /// Centroid of the pointer positions at snapshot time.
    pub centroid: Point,
    /// Average radial distance from the centroid at snapshot time.
    pub avg_distance: f64,
    /// Per-pointer positions at snapshot time.
    pub baselines: HashMap<PointerId, Point>,
}

impl ScaleSnapshot {
    /// Freeze the given pointer positions as the zoom baseline.
    pub fn capture(positions: &[(PointerId, Point)]) -> Self {
        let points: Vec<Point> = positions.iter().map(|&(_, p)| p).collect();
        let centroid = geometry::centroid(&points);
        Self {
            centroid,
            avg_distance: geometry::average_radial_distance(&points, centroid),
            baselines: positions.iter().copied().collect(),
        }
    }

    pub fn pointer_count(&self) -> usize {
        self.baselines.len()
    }
}

/// The zoom predicate with its named tunables.
#[derive(Debug, Clone)]
pub struct ZoomGate {
    /// Minimum relative scale change (fraction of 1.0).
    pub min_scale_delta: f64,
    /// Minimum absolute change of the average radial distance (px).
    pub min_distance_delta: f64,
    /// Radial floor: mean radial displacement must exceed this (px).
    pub min_radial_px: f64,
    /// Radial must also exceed this multiple of the tangential RMS.
    pub radial_dominance: f64,
    /// Minimum majority-sign fraction across pointers.
    pub min_consistency: f64,
}

impl ZoomGate {
    pub fn new() -> Self {
        Self {
            min_scale_delta: 0.05,
            min_distance_delta: 6.0,
            min_radial_px: 8.0,
            radial_dominance: 1.5,
            min_consistency: 0.6,
        }
    }

    /// Evaluate the gate for the live pointer positions against `snapshot`.
    ///
    /// Only pointers present in the baseline participate; fewer than two
    /// matched pointers can never zoom.
    pub fn evaluate(&self, snapshot: &ScaleSnapshot, current: &[(PointerId, Point)]) -> bool {
        // Degenerate baseline: pointers started on top of each other.
        if snapshot.avg_distance <= 1e-6 {
            return false;
        }

        let pairs: Vec<(Point, Point)> = current
            .iter()
            .filter_map(|&(id, pos)| snapshot.baselines.get(&id).map(|&base| (base, pos)))
            .collect();
        if pairs.len() < 2 {
            return false;
        }

        // Magnitude gate: relative or absolute spread change.
        let live: Vec<Point> = pairs.iter().map(|&(_, cur)| cur).collect();
        let live_centroid = geometry::centroid(&live);
        let d_now = geometry::average_radial_distance(&live, live_centroid);
        let scale = d_now / snapshot.avg_distance;
        if (scale - 1.0).abs() <= self.min_scale_delta
            && (d_now - snapshot.avg_distance).abs() <= self.min_distance_delta
        {
            return false;
        }

        // Directionality and consistency gates.
        let metrics = geometry::zoom_metrics(snapshot.centroid, &pairs);
        let radial_floor = self
            .min_radial_px
            .max(self.radial_dominance * metrics.tangential_rms);

        metrics.avg_radial.abs() > radial_floor && metrics.consistency >= self.min_consistency
    }
}

impl Default for ZoomGate {
    fn default() -> Self {
        Self::new()
    }
}
