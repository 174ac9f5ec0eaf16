//! Top-Level Recording Coordinator
//!
//! [`Recorder`] wires the classifier, scroll translator, capture engine and
//! session state together and routes every signal between them. It is the
//! single writer of the active chunk on the interaction side.
//!
//! The recorder is deliberately synchronous: timers fire into
//! [`Recorder::timer_fired`], and the capture pipeline's offloadable steps
//! are returned to the caller ([`PendingCapture`] → hash →
//! [`MaterializeJob`]) instead of being spawned here. The [`runtime`]
//! module provides the tokio driver; tests drive the same methods inline.
//!
//! [`runtime`]: crate::runtime

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::capture::engine::{HashOutcome, MaterializeJob, MaterializedCapture, TreeCaptureEngine};
use crate::capture::signature::{self, PendingCapture};
use crate::capture::view::{HitTest, SharedZoneTable, ViewTree, ZoneResolver};
use crate::capture::LomEntry;
use crate::chunk::SessionState;
use crate::config::Config;
use crate::event::ExplorationEvent;
use crate::geometry::{Point, Rect};
use crate::pointer::classifier::{ClassifiedEvent, GestureClassifier};
use crate::pointer::trace::PointerId;
use crate::pointer::ScrollTranslator;
use crate::scheduler::{Scheduler, TimerToken};
use crate::time::Clock;

/// Coordinates classification, capture and chunk accumulation.
pub struct Recorder {
    classifier: GestureClassifier,
    scroll: ScrollTranslator,
    engine: TreeCaptureEngine,
    session: Arc<Mutex<SessionState>>,
    tree: Arc<dyn ViewTree>,
    clock: Arc<dyn Clock>,
    scheduler: Box<dyn Scheduler>,
    debounce: Option<TimerToken>,
    debounce_ms: u64,
}

impl Recorder {
    /// Build a recorder from explicitly injected collaborators.
    ///
    /// `classifier_scheduler` and `capture_scheduler` must share a token
    /// space (clones of one scheduler) so timer fires route unambiguously.
    /// Initializes the session if the shared state has none yet.
    pub fn new(
        config: &Config,
        tree: Arc<dyn ViewTree>,
        hit_test: Arc<dyn HitTest>,
        clock: Arc<dyn Clock>,
        classifier_scheduler: Box<dyn Scheduler>,
        capture_scheduler: Box<dyn Scheduler>,
        session: Arc<Mutex<SessionState>>,
    ) -> Self {
        let zone_table = SharedZoneTable::new();
        let zones = Arc::new(ZoneResolver::new(
            hit_test,
            zone_table.clone(),
            Arc::clone(&tree),
        ));

        let classifier = GestureClassifier::new(
            config.gestures.clone(),
            Arc::clone(&clock),
            classifier_scheduler,
            zones,
        );
        let engine = TreeCaptureEngine::new(
            config.capture.cache_capacity,
            config.capture.excluded_types.clone(),
            zone_table,
        );

        {
            let mut state = session.lock();
            if !state.is_initialized() {
                state.init_session();
            }
        }

        Self {
            classifier,
            scroll: ScrollTranslator::new(),
            engine,
            session,
            tree,
            clock,
            scheduler: capture_scheduler,
            debounce: None,
            debounce_ms: config.capture.debounce_ms,
        }
    }

    // ------------------------------------------------------------------
    // Pointer input
    // ------------------------------------------------------------------

    pub fn pointer_down(&mut self, id: PointerId, point: Point) {
        let events = self.classifier.on_pointer_down(id, point);
        self.append(events);
    }

    pub fn pointer_move(&mut self, id: PointerId, point: Point) {
        let events = self.classifier.on_pointer_move(id, point);
        self.append(events);
    }

    pub fn pointer_up(&mut self, id: PointerId, point: Point) {
        let events = self.classifier.on_pointer_up(id, point);
        self.append(events);
    }

    pub fn pointer_cancel(&mut self) {
        self.classifier.on_pointer_cancel();
    }

    // ------------------------------------------------------------------
    // Scroll input
    // ------------------------------------------------------------------

    /// A scroll-position notification with the current drag point.
    pub fn scroll_update(&mut self, viewport: Rect, drag: Point) {
        let now = self.clock.now_ms();
        self.scroll.record(now, viewport, drag);
        self.classifier.set_scroll_active(true);
    }

    /// The scroll settled.
    pub fn scroll_idle(&mut self) {
        let events = self.scroll.on_idle();
        self.classifier.set_scroll_active(false);
        self.append_exploration(events);
    }

    // ------------------------------------------------------------------
    // Structural capture
    // ------------------------------------------------------------------

    /// The host reported a view-hierarchy mutation. Re-arms the capture
    /// debounce; bursts of mutations collapse into one capture.
    pub fn tree_changed(&mut self) {
        if let Some(token) = self.debounce.take() {
            self.scheduler.cancel(token);
        }
        self.debounce = Some(self.scheduler.schedule_once(self.debounce_ms));
    }

    /// A timer fired. Classifier timers are handled inline; the capture
    /// debounce returns a [`PendingCapture`] for the caller to hash (off
    /// the interaction thread in production).
    pub fn timer_fired(&mut self, token: TimerToken) -> Option<PendingCapture> {
        if self.debounce == Some(token) {
            self.debounce = None;
            let now = self.clock.now_ms();
            return match self.engine.begin_capture(self.tree.as_ref(), now) {
                Ok(pending) => Some(pending),
                Err(e) => {
                    debug!(error = %e, "capture skipped");
                    None
                }
            };
        }

        let events = self.classifier.on_timer(token);
        self.append(events);
        None
    }

    /// Apply a computed signature hash. A cache hit records the reference
    /// immediately; a miss returns the materialization job for offload.
    pub fn capture_hashed(&mut self, pending: PendingCapture, hash: u64) -> Option<MaterializeJob> {
        match self.engine.apply_hash(pending, hash) {
            HashOutcome::Stale => None,
            HashOutcome::Ref(lom_ref) => {
                self.append_lom(LomEntry::Ref(lom_ref));
                None
            }
            HashOutcome::Materialize(job) => Some(job),
        }
    }

    /// Apply a finished materialization.
    pub fn capture_materialized(&mut self, capture: MaterializedCapture) {
        if let Some(lom) = self.engine.apply_materialized(capture) {
            self.append_lom(LomEntry::Full(lom));
        }
    }

    /// Run a full capture inline: traversal, hash, materialization, chunk
    /// append. For tests and hosts without a background worker.
    pub fn run_capture_now(&mut self) {
        let now = self.clock.now_ms();
        let pending = match self.engine.begin_capture(self.tree.as_ref(), now) {
            Ok(pending) => pending,
            Err(e) => {
                debug!(error = %e, "capture skipped");
                return;
            }
        };
        let hash = signature::signature_hash(&pending.signature);
        if let Some(job) = self.capture_hashed(pending, hash) {
            let materialized = job.run();
            self.capture_materialized(materialized);
        }
    }

    // ------------------------------------------------------------------
    // Chunk appends
    // ------------------------------------------------------------------

    fn append(&mut self, events: Vec<ClassifiedEvent>) {
        if events.is_empty() {
            return;
        }
        let mut exploration: Vec<ExplorationEvent> = Vec::new();
        let mut session = self.session.lock();
        for event in events {
            match event {
                ClassifiedEvent::Action(action) => {
                    if let Err(e) = session.add_action_event(&action) {
                        warn!(error = %e, "action event dropped");
                    }
                }
                ClassifiedEvent::Exploration(event) => exploration.push(event),
            }
        }
        if !exploration.is_empty() {
            if let Err(e) = session.add_exploration_events(&exploration) {
                warn!(error = %e, "exploration events dropped");
            }
        }
    }

    fn append_exploration(&mut self, events: Vec<ExplorationEvent>) {
        if events.is_empty() {
            return;
        }
        if let Err(e) = self.session.lock().add_exploration_events(&events) {
            warn!(error = %e, "exploration events dropped");
        }
    }

    fn append_lom(&mut self, entry: LomEntry) {
        if let Err(e) = self.session.lock().add_lom(entry) {
            warn!(error = %e, "capture entry dropped");
        }
    }
}
