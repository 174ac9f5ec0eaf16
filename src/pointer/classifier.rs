//! Per-Pointer Gesture State Machine
//!
//! Consumes pointer-down/move/up/cancel signals, maintains the
//! [`PointerTraceStore`], and emits classified events. Each pointer walks
//! `Down → {Tap, LongPress, Pan, Zoom} → released`:
//!
//! - movement beyond the slop radius cancels the long-press timer and
//!   reclassifies a tap as a pan;
//! - with two or more active pointers, pan motion is tested against the
//!   zoom gate and, on success, every active pointer becomes part of the
//!   zoom;
//! - releases dispatch on the final gesture kind, with taps deferred
//!   through the double-tap window.
//!
//! Timers are armed through the injected [`Scheduler`]; fires arrive back
//! via [`GestureClassifier::on_timer`] and stale tokens are ignored.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::trace;

use crate::capture::view::ZoneLookup;
use crate::event::{ActionEvent, ActionRecord, ExplorationEvent};
use crate::geometry::Point;
use crate::pointer::trace::{GestureKind, PointerId, PointerTrace, PointerTraceStore};
use crate::pointer::zoom::{ScaleSnapshot, ZoomGate};
use crate::scheduler::{Scheduler, TimerToken};
use crate::time::Clock;

/// Timing and distance thresholds for gesture disambiguation.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct GestureThresholds {
    /// Movement below this radius is ignored (px).
    pub movement_slop_px: f64,
    /// Minimum spacing between recorded trace points (ms).
    pub sample_throttle_ms: u64,
    /// Hold duration that turns a tap into a long-press (ms).
    pub long_press_ms: u64,
    /// Window in which a second tap forms a double-tap (ms).
    pub double_tap_window_ms: u64,
    /// Maximum distance between the two taps of a double-tap (px).
    pub double_tap_slop_px: f64,
}

impl Default for GestureThresholds {
    fn default() -> Self {
        Self {
            movement_slop_px: 8.0,
            sample_throttle_ms: 100,
            long_press_ms: 500,
            double_tap_window_ms: 300,
            double_tap_slop_px: 100.0,
        }
    }
}

/// A classified event leaving the state machine.
#[derive(Debug, Clone, PartialEq)]
pub enum ClassifiedEvent {
    Action(ActionEvent),
    Exploration(ExplorationEvent),
}

/// A released tap waiting out the double-tap window.
struct PendingTap {
    trace: PointerTrace,
    token: TimerToken,
    /// Absolute deadline of the window; a late second tap is two taps.
    deadline: u64,
    /// Timestamp of the release that produced this tap.
    up_ts: u64,
}

/// The gesture classification engine.
///
/// Single-threaded: all entry points are called from the interaction
/// thread (or a test driving it synchronously). Nothing here blocks.
pub struct GestureClassifier {
    thresholds: GestureThresholds,
    clock: Arc<dyn Clock>,
    scheduler: Box<dyn Scheduler>,
    zones: Arc<dyn ZoneLookup>,
    gate: ZoomGate,

    traces: PointerTraceStore,
    /// Pointers currently in contact. A pointer can be active without a
    /// trace after a zoom-to-pan drop.
    active: HashSet<PointerId>,
    /// Zoom baseline, refreshed on 2-pointer threshold transitions.
    snapshot: Option<ScaleSnapshot>,
    /// Pointers participating in the current zoom.
    zoom_pointers: HashSet<PointerId>,
    pending_tap: Option<PendingTap>,
    /// While a scroll owns the pointer path, pan emission is suppressed.
    scroll_active: bool,
}

impl GestureClassifier {
    pub fn new(
        thresholds: GestureThresholds,
        clock: Arc<dyn Clock>,
        scheduler: Box<dyn Scheduler>,
        zones: Arc<dyn ZoneLookup>,
    ) -> Self {
        Self {
            thresholds,
            clock,
            scheduler,
            zones,
            gate: ZoomGate::new(),
            traces: PointerTraceStore::new(),
            active: HashSet::new(),
            snapshot: None,
            zoom_pointers: HashSet::new(),
            pending_tap: None,
            scroll_active: false,
        }
    }

    /// Number of pointers currently in contact.
    pub fn active_pointers(&self) -> usize {
        self.active.len()
    }

    /// Mark whether scroll handling currently owns the pointer path.
    pub fn set_scroll_active(&mut self, active: bool) {
        self.scroll_active = active;
    }

    /// Pointer made contact.
    pub fn on_pointer_down(&mut self, id: PointerId, point: Point) -> Vec<ClassifiedEvent> {
        let now = self.clock.now_ms();
        let token = self.scheduler.schedule_once(self.thresholds.long_press_ms);

        let trace = self.traces.start(id, point, now);
        trace.long_press_timer = Some(token);

        self.active.insert(id);

        // Reaching (or re-entering) two pointers re-bases the zoom reference.
        if self.active.len() >= 2 {
            self.rebase_snapshot();
        }

        Vec::new()
    }

    /// Pointer moved while in contact.
    pub fn on_pointer_move(&mut self, id: PointerId, point: Point) -> Vec<ClassifiedEvent> {
        if !self.active.contains(&id) {
            return Vec::new();
        }
        let now = self.clock.now_ms();

        // A dropped zoom trace restarts here as a pan.
        if !self.traces.contains(id) {
            let trace = self.traces.start(id, point, now);
            trace.gesture = GestureKind::Pan;
            return Vec::new();
        }

        let (last, gesture) = {
            let trace = self.traces.get(id).expect("checked above");
            (trace.last(), trace.gesture)
        };
        if last.point.distance_to(point) < self.thresholds.movement_slop_px {
            return Vec::new();
        }

        // Real movement: the press can no longer become a long-press.
        let throttle = self.thresholds.sample_throttle_ms;
        {
            let trace = self.traces.get_mut(id).expect("checked above");
            if let Some(token) = trace.long_press_timer.take() {
                self.scheduler.cancel(token);
            }
            if now.saturating_sub(last.ts) >= throttle {
                trace.record(point, now);
            }
        }

        match gesture {
            GestureKind::Tap | GestureKind::LongPress | GestureKind::DoubleTap => {
                // Single-pointer drag: no zoom evaluation on this move.
                self.traces.get_mut(id).expect("checked above").gesture = GestureKind::Pan;
            }
            GestureKind::Zoom => {
                if !self.zoom_pointers.contains(&id) {
                    // The zoom already ended and this pointer kept going:
                    // it continues as a pan on a fresh trace next move,
                    // dropping the recorded tail.
                    self.traces.take(id);
                }
            }
            GestureKind::Pan => {
                if self.active.len() >= 2 && self.zoom_pointers.is_empty() {
                    self.try_enter_zoom(id, point);
                }
            }
        }

        Vec::new()
    }

    /// Pointer released.
    pub fn on_pointer_up(&mut self, id: PointerId, point: Point) -> Vec<ClassifiedEvent> {
        let now = self.clock.now_ms();
        self.active.remove(&id);
        if self.active.len() >= 2 {
            self.rebase_snapshot();
        }

        let Some(mut released) = self.traces.take(id) else {
            return Vec::new();
        };
        if let Some(token) = released.long_press_timer.take() {
            self.scheduler.cancel(token);
        }

        match released.gesture {
            GestureKind::LongPress => {
                released.record(point, now);
                let origin = released.first().point;
                vec![ClassifiedEvent::Action(ActionEvent::LongPress {
                    record: ActionRecord {
                        ts: now,
                        zone: self.zones.zone_at(origin),
                        viewport: self.zones.viewport(),
                        point: origin,
                    },
                    duration_ms: self.thresholds.long_press_ms,
                })]
            }
            GestureKind::Zoom => self.finish_zoom(released, now),
            GestureKind::Pan => {
                if released.last().point != point {
                    released.record(point, now);
                }
                if self.scroll_active {
                    trace!(pointer = id, "pan release owned by scroll, skipping");
                    return Vec::new();
                }
                let viewport = self.zones.viewport();
                released
                    .points()
                    .iter()
                    .map(|tp| {
                        ClassifiedEvent::Exploration(ExplorationEvent::Pan {
                            ts: tp.ts,
                            viewport,
                            point: tp.point,
                        })
                    })
                    .collect()
            }
            GestureKind::Tap | GestureKind::DoubleTap => self.defer_tap(released, now),
        }
    }

    /// The gesture was canceled by the host; drop everything, emit nothing.
    pub fn on_pointer_cancel(&mut self) {
        for id in self.traces.ids() {
            if let Some(trace) = self.traces.get_mut(id) {
                if let Some(token) = trace.long_press_timer.take() {
                    self.scheduler.cancel(token);
                }
            }
        }
        self.traces.clear();
        self.active.clear();
        self.zoom_pointers.clear();
        self.snapshot = None;
        if let Some(pending) = self.pending_tap.take() {
            self.scheduler.cancel(pending.token);
        }
    }

    /// A timer armed by this classifier fired. Stale tokens are ignored.
    pub fn on_timer(&mut self, token: TimerToken) -> Vec<ClassifiedEvent> {
        // Double-tap window expiry releases the deferred tap.
        if self
            .pending_tap
            .as_ref()
            .is_some_and(|pending| pending.token == token)
        {
            let pending = self.pending_tap.take().expect("checked above");
            let origin = pending.trace.first().point;
            return vec![ClassifiedEvent::Action(ActionEvent::Tap(ActionRecord {
                ts: pending.up_ts,
                zone: self.zones.zone_at(origin),
                viewport: self.zones.viewport(),
                point: origin,
            }))];
        }

        // Long-press promotion for a still-stationary pointer.
        for id in self.traces.ids() {
            let Some(trace) = self.traces.get_mut(id) else {
                continue;
            };
            if trace.long_press_timer == Some(token) {
                trace.long_press_timer = None;
                if trace.gesture == GestureKind::Tap {
                    trace.gesture = GestureKind::LongPress;
                }
                return Vec::new();
            }
        }

        trace!(token = token.0, "stale timer fire ignored");
        Vec::new()
    }

    /// Freeze the current active-pointer positions as the zoom baseline.
    fn rebase_snapshot(&mut self) {
        let positions: Vec<(PointerId, Point)> = self
            .traces
            .last_positions()
            .into_iter()
            .filter(|(id, _)| self.active.contains(id))
            .collect();
        if positions.len() >= 2 {
            self.snapshot = Some(ScaleSnapshot::capture(&positions));
        }
    }

    /// Evaluate the zoom gate for the live pointer set; on success all
    /// active pointers become the zoom set.
    fn try_enter_zoom(&mut self, moving: PointerId, moving_point: Point) {
        let Some(snapshot) = &self.snapshot else {
            return;
        };

        let mut positions: Vec<(PointerId, Point)> = self
            .traces
            .last_positions()
            .into_iter()
            .filter(|(id, _)| self.active.contains(id))
            .collect();
        // The throttle may have skipped recording this move; evaluate
        // against the live position regardless.
        for entry in positions.iter_mut() {
            if entry.0 == moving {
                entry.1 = moving_point;
            }
        }

        if self.gate.evaluate(snapshot, &positions) {
            let ids: Vec<PointerId> = positions.iter().map(|&(id, _)| id).collect();
            self.traces.reclassify_all(&ids, GestureKind::Zoom);
            self.zoom_pointers = ids.into_iter().collect();
            trace!(pointers = self.zoom_pointers.len(), "zoom gesture entered");
        }
    }

    /// Emit zoom exploration events for every participating trace.
    fn finish_zoom(&mut self, released: PointerTrace, now: u64) -> Vec<ClassifiedEvent> {
        if self.zoom_pointers.len() < 2 {
            return Vec::new();
        }
        let viewport = self.zones.viewport();
        let mut events = Vec::new();

        let participants: Vec<PointerId> = self.zoom_pointers.drain().collect();
        for id in participants {
            let path = if id == released.id {
                released.path()
            } else if let Some(trace) = self.traces.get(id) {
                trace.path()
            } else {
                continue;
            };
            events.push(ClassifiedEvent::Exploration(ExplorationEvent::Zoom {
                ts: now,
                viewport,
                path,
            }));
        }
        events
    }

    /// Hold a released tap through the double-tap window, or fuse it with a
    /// pending one.
    fn defer_tap(&mut self, mut released: PointerTrace, now: u64) -> Vec<ClassifiedEvent> {
        if let Some(pending) = self.pending_tap.take() {
            self.scheduler.cancel(pending.token);

            let first = pending.trace.first().point;
            let second = released.first().point;
            let in_window = now < pending.deadline;
            let in_reach = first.distance_to(second) <= self.thresholds.double_tap_slop_px;

            if in_window && in_reach {
                released.gesture = GestureKind::DoubleTap;
                let mut fused = pending.trace;
                fused.gesture = GestureKind::DoubleTap;
                return vec![ClassifiedEvent::Action(ActionEvent::DoubleTap(
                    ActionRecord {
                        ts: now,
                        zone: self.zones.zone_at(first),
                        viewport: self.zones.viewport(),
                        point: first,
                    },
                ))];
            }

            // Too far or too late: flush the old tap and defer the new one.
            let mut events = vec![ClassifiedEvent::Action(ActionEvent::Tap(ActionRecord {
                ts: pending.up_ts,
                zone: self.zones.zone_at(first),
                viewport: self.zones.viewport(),
                point: first,
            }))];
            events.extend(self.arm_tap_window(released, now));
            return events;
        }

        self.arm_tap_window(released, now)
    }

    fn arm_tap_window(&mut self, trace: PointerTrace, now: u64) -> Vec<ClassifiedEvent> {
        let token = self
            .scheduler
            .schedule_once(self.thresholds.double_tap_window_ms);
        self.pending_tap = Some(PendingTap {
            trace,
            token,
            deadline: now + self.thresholds.double_tap_window_ms,
            up_ts: now,
        });
        Vec::new()
    }
}
