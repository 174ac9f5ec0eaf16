//! Tokio Runtime Glue
//!
//! [`Telemetry`] is the host-facing entry point. It owns a single engine
//! task fed by an unbounded signal channel (the async equivalent of the
//! interaction thread) plus the upload scheduler task. Everything the
//! recorder does stays single-threaded inside the engine task; only
//! signature hashing, LOM materialization and chunk serialization leave it
//! via `spawn_blocking`, and their results re-enter the channel to be
//! validated against the capture generation.
//!
//! Timer fires take the same path: the [`TokioScheduler`] delivers tokens
//! into the channel, and stale tokens die in the recorder's validation.
//!
//! Must be started from within a tokio runtime.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc::{self, UnboundedSender};
use tracing::{debug, info};

use crate::capture::engine::MaterializedCapture;
use crate::capture::signature::{self, PendingCapture};
use crate::capture::view::{HitTest, ViewTree};
use crate::chunk::SessionState;
use crate::config::Config;
use crate::geometry::{Point, Rect};
use crate::pointer::trace::PointerId;
use crate::recorder::Recorder;
use crate::scheduler::{TimerToken, TokioScheduler};
use crate::time::{Clock, SystemClock};
use crate::upload::scheduler::{ActivityGate, UploadScheduler, UploadStop};
use crate::upload::sink::{HttpSink, UploadSink};
use crate::Result;

/// Signals entering the engine task.
enum Signal {
    PointerDown(PointerId, Point),
    PointerMove(PointerId, Point),
    PointerUp(PointerId, Point),
    PointerCancel,
    ScrollUpdate(Rect, Point),
    ScrollIdle,
    TreeChanged,
    Timer(TimerToken),
    CaptureHashed(PendingCapture, u64),
    CaptureMaterialized(MaterializedCapture),
    Shutdown,
}

struct Inner {
    tx: UnboundedSender<Signal>,
    gate: Arc<ActivityGate>,
    upload_stop: UploadStop,
}

/// Running telemetry engine handle. Cheap to clone via `Arc` on the host
/// side; all methods take `&self`.
pub struct Telemetry {
    /// `None` when recording is disabled: every signal is dropped at the
    /// handle, nothing is spawned.
    inner: Option<Inner>,
}

impl Telemetry {
    /// Validate the configuration and start the engine with the HTTP sink.
    ///
    /// A disabled configuration yields an inert handle; an empty endpoint
    /// yields [`InvalidConfiguration`] and nothing starts.
    ///
    /// [`InvalidConfiguration`]: crate::Error::InvalidConfiguration
    pub fn start(
        config: Config,
        tree: Arc<dyn ViewTree>,
        hit_test: Arc<dyn HitTest>,
    ) -> Result<Self> {
        config.validate()?;
        if config.disable {
            info!("telemetry disabled by configuration");
            return Ok(Self { inner: None });
        }
        let sink = Arc::new(HttpSink::new(
            &config.upload.endpoint,
            config.upload.request_timeout_ms,
        )?);
        Self::start_with(config, tree, hit_test, Arc::new(SystemClock::new()), sink)
    }

    /// Start with an injected clock and sink. Test entry point.
    pub fn start_with(
        config: Config,
        tree: Arc<dyn ViewTree>,
        hit_test: Arc<dyn HitTest>,
        clock: Arc<dyn Clock>,
        sink: Arc<dyn UploadSink>,
    ) -> Result<Self> {
        config.validate()?;
        if config.disable {
            info!("telemetry disabled by configuration");
            return Ok(Self { inner: None });
        }

        let (tx, mut rx) = mpsc::unbounded_channel::<Signal>();

        // Timer fires route through the signal channel like any other input.
        let (timer_tx, mut timer_rx) = mpsc::unbounded_channel::<TimerToken>();
        let scheduler = TokioScheduler::new(timer_tx);
        {
            let tx = tx.clone();
            tokio::spawn(async move {
                while let Some(token) = timer_rx.recv().await {
                    if tx.send(Signal::Timer(token)).is_err() {
                        break;
                    }
                }
            });
        }

        let session = Arc::new(Mutex::new(SessionState::new()));
        let mut recorder = Recorder::new(
            &config,
            tree,
            hit_test,
            Arc::clone(&clock),
            Box::new(scheduler.clone()),
            Box::new(scheduler),
            Arc::clone(&session),
        );

        let gate = Arc::new(ActivityGate::new(
            clock,
            config.upload.inactivity_timeout_ms,
            config.upload.activity_throttle_ms,
        ));
        let uploader = UploadScheduler::new(
            session,
            sink,
            Arc::clone(&gate),
            config.upload.interval_ms,
        );
        let upload_stop = uploader.stopper();
        tokio::spawn(uploader.run());

        let engine_tx = tx.clone();
        tokio::spawn(async move {
            while let Some(signal) = rx.recv().await {
                match signal {
                    Signal::PointerDown(id, point) => recorder.pointer_down(id, point),
                    Signal::PointerMove(id, point) => recorder.pointer_move(id, point),
                    Signal::PointerUp(id, point) => recorder.pointer_up(id, point),
                    Signal::PointerCancel => recorder.pointer_cancel(),
                    Signal::ScrollUpdate(viewport, drag) => {
                        recorder.scroll_update(viewport, drag)
                    }
                    Signal::ScrollIdle => recorder.scroll_idle(),
                    Signal::TreeChanged => recorder.tree_changed(),
                    Signal::Timer(token) => {
                        if let Some(pending) = recorder.timer_fired(token) {
                            let tx = engine_tx.clone();
                            tokio::task::spawn_blocking(move || {
                                let hash = signature::signature_hash(&pending.signature);
                                let _ = tx.send(Signal::CaptureHashed(pending, hash));
                            });
                        }
                    }
                    Signal::CaptureHashed(pending, hash) => {
                        if let Some(job) = recorder.capture_hashed(pending, hash) {
                            let tx = engine_tx.clone();
                            tokio::task::spawn_blocking(move || {
                                let _ = tx.send(Signal::CaptureMaterialized(job.run()));
                            });
                        }
                    }
                    Signal::CaptureMaterialized(capture) => {
                        recorder.capture_materialized(capture)
                    }
                    Signal::Shutdown => break,
                }
            }
            debug!("telemetry engine task stopped");
        });

        info!("telemetry started");
        Ok(Self {
            inner: Some(Inner {
                tx,
                gate,
                upload_stop,
            }),
        })
    }

    /// Whether signals are being recorded.
    pub fn is_enabled(&self) -> bool {
        self.inner.is_some()
    }

    pub fn pointer_down(&self, id: PointerId, point: Point) {
        self.send_input(Signal::PointerDown(id, point));
    }

    pub fn pointer_move(&self, id: PointerId, point: Point) {
        self.send_input(Signal::PointerMove(id, point));
    }

    pub fn pointer_up(&self, id: PointerId, point: Point) {
        self.send_input(Signal::PointerUp(id, point));
    }

    pub fn pointer_cancel(&self) {
        self.send_input(Signal::PointerCancel);
    }

    pub fn scroll_update(&self, viewport: Rect, drag: Point) {
        self.send_input(Signal::ScrollUpdate(viewport, drag));
    }

    pub fn scroll_idle(&self) {
        self.send_input(Signal::ScrollIdle);
    }

    /// Report a view-hierarchy mutation. Not an input event: it does not
    /// reset the inactivity gate.
    pub fn tree_changed(&self) {
        if let Some(inner) = &self.inner {
            let _ = inner.tx.send(Signal::TreeChanged);
        }
    }

    /// Stop the engine and upload tasks. In-flight work is abandoned.
    pub fn shutdown(&self) {
        if let Some(inner) = &self.inner {
            inner.upload_stop.stop();
            let _ = inner.tx.send(Signal::Shutdown);
        }
    }

    fn send_input(&self, signal: Signal) {
        if let Some(inner) = &self.inner {
            inner.gate.note_activity();
            let _ = inner.tx.send(signal);
        }
    }
}

impl Drop for Telemetry {
    fn drop(&mut self) {
        // The engine task keeps a sender clone for capture completions, so
        // the channel never closes on its own: stop explicitly.
        self.shutdown();
    }
}
