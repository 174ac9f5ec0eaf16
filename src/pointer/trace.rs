//! Per-Pointer Movement History
//!
//! A [`PointerTrace`] records the sampled path of one pointer from contact
//! to release, together with its current gesture classification and any
//! pending long-press timer. Traces are owned exclusively by the
//! [`PointerTraceStore`] and destroyed when the pointer is released or the
//! gesture is canceled.

use std::collections::HashMap;

use crate::geometry::Point;
use crate::scheduler::TimerToken;

/// Host-assigned pointer identifier.
pub type PointerId = i64;

/// Current classification of a pointer's gesture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GestureKind {
    Tap,
    DoubleTap,
    LongPress,
    Pan,
    Zoom,
}

/// A point stamped with monotonic milliseconds. Immutable once recorded.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimedPoint {
    pub point: Point,
    pub ts: u64,
}

/// Ordered movement history of one pointer.
///
/// Points are append-only; insertion order is chronological order. A trace
/// always holds at least the contact point.
#[derive(Debug)]
pub struct PointerTrace {
    pub id: PointerId,
    points: Vec<TimedPoint>,
    pub gesture: GestureKind,
    /// Pending long-press timer, armed at contact and canceled on movement.
    pub long_press_timer: Option<TimerToken>,
}

impl PointerTrace {
    /// Start a trace at the contact point. New traces classify as `Tap`.
    pub fn new(id: PointerId, point: Point, ts: u64) -> Self {
        Self {
            id,
            points: vec![TimedPoint { point, ts }],
            gesture: GestureKind::Tap,
            long_press_timer: None,
        }
    }

    /// Append a sampled point.
    pub fn record(&mut self, point: Point, ts: u64) {
        self.points.push(TimedPoint { point, ts });
    }

    /// The contact point.
    #[inline]
    pub fn first(&self) -> TimedPoint {
        self.points[0]
    }

    /// The most recently recorded point.
    #[inline]
    pub fn last(&self) -> TimedPoint {
        self.points[self.points.len() - 1]
    }

    /// Full recorded path in chronological order.
    #[inline]
    pub fn points(&self) -> &[TimedPoint] {
        &self.points
    }

    /// Path positions without timestamps.
    pub fn path(&self) -> Vec<Point> {
        self.points.iter().map(|tp| tp.point).collect()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Exclusive owner of all live pointer traces, keyed by pointer id.
#[derive(Debug, Default)]
pub struct PointerTraceStore {
    traces: HashMap<PointerId, PointerTrace>,
}

impl PointerTraceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a fresh trace, replacing any stale one for the same pointer.
    pub fn start(&mut self, id: PointerId, point: Point, ts: u64) -> &mut PointerTrace {
        self.traces.insert(id, PointerTrace::new(id, point, ts));
        self.traces.get_mut(&id).expect("just inserted")
    }

    pub fn get(&self, id: PointerId) -> Option<&PointerTrace> {
        self.traces.get(&id)
    }

    pub fn get_mut(&mut self, id: PointerId) -> Option<&mut PointerTrace> {
        self.traces.get_mut(&id)
    }

    /// Remove and return a trace, relinquishing ownership to the caller.
    pub fn take(&mut self, id: PointerId) -> Option<PointerTrace> {
        self.traces.remove(&id)
    }

    /// Discard every trace unconditionally.
    pub fn clear(&mut self) {
        self.traces.clear();
    }

    pub fn len(&self) -> usize {
        self.traces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.traces.is_empty()
    }

    pub fn contains(&self, id: PointerId) -> bool {
        self.traces.contains_key(&id)
    }

    /// Ids of all live traces, in no particular order.
    pub fn ids(&self) -> Vec<PointerId> {
        self.traces.keys().copied().collect()
    }

    /// Latest position of each live trace.
    pub fn last_positions(&self) -> Vec<(PointerId, Point)> {
        self.traces
            .iter()
            .map(|(&id, trace)| (id, trace.last().point))
            .collect()
    }

    /// Set the gesture tag on every trace in `ids` that is still live.
    pub fn reclassify_all(&mut self, ids: &[PointerId], gesture: GestureKind) {
        for id in ids {
            if let Some(trace) = self.traces.get_mut(id) {
                trace.gesture = gesture;
            }
        }
    }
}
