//! Upload Scheduling
//!
//! The periodic flush driver and its inactivity gate. Every flush window
//! the scheduler drains the active chunk, serializes it off the interaction
//! thread, and hands the body to the sink. When no input has been seen for
//! the inactivity timeout the periodic loop parks; the first input after
//! idle wakes it again.
//!
//! Flush outcomes are logged only. A failed delivery discards that window's
//! chunk; the buffer has already moved on to a fresh one.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::Notify;
use tracing::{debug, info, warn};

use crate::chunk::SessionState;
use crate::time::Clock;
use crate::upload::sink::UploadSink;

/// Tracks input recency and gates the periodic uploader.
///
/// Activity notes are throttled so high-frequency input (move streams)
/// does not thrash the timestamp; the throttle window is far below the
/// inactivity timeout, so gating precision is unaffected.
pub struct ActivityGate {
    clock: Arc<dyn Clock>,
    inactivity_timeout_ms: u64,
    throttle_ms: u64,
    state: Mutex<GateState>,
    wakeup: Notify,
}

struct GateState {
    last_activity_ms: u64,
    last_reset_ms: u64,
}

impl ActivityGate {
    pub fn new(clock: Arc<dyn Clock>, inactivity_timeout_ms: u64, throttle_ms: u64) -> Self {
        let now = clock.now_ms();
        Self {
            clock,
            inactivity_timeout_ms,
            throttle_ms,
            state: Mutex::new(GateState {
                last_activity_ms: now,
                last_reset_ms: now,
            }),
            wakeup: Notify::new(),
        }
    }

    /// Record an input event, waking the uploader if it was parked.
    pub fn note_activity(&self) {
        let now = self.clock.now_ms();
        let was_idle;
        {
            let mut state = self.state.lock();
            if now.saturating_sub(state.last_reset_ms) < self.throttle_ms {
                return;
            }
            was_idle = self.idle_at(now, state.last_activity_ms);
            state.last_reset_ms = now;
            state.last_activity_ms = now;
        }
        if was_idle {
            debug!("input resumed after idle");
            self.wakeup.notify_one();
        }
    }

    /// Whether input has been silent past the inactivity timeout.
    pub fn is_idle(&self) -> bool {
        let now = self.clock.now_ms();
        let state = self.state.lock();
        self.idle_at(now, state.last_activity_ms)
    }

    /// Wait for the first activity after idle.
    pub async fn resumed(&self) {
        self.wakeup.notified().await;
    }

    fn idle_at(&self, now: u64, last_activity: u64) -> bool {
        now.saturating_sub(last_activity) > self.inactivity_timeout_ms
    }
}

/// Handle for stopping a running [`UploadScheduler`].
#[derive(Clone)]
pub struct UploadStop {
    flag: Arc<AtomicBool>,
    wake: Arc<Notify>,
}

impl UploadStop {
    pub fn stop(&self) {
        self.flag.store(true, Ordering::SeqCst);
        self.wake.notify_one();
    }
}

/// Periodic + inactivity-gated chunk flusher.
pub struct UploadScheduler {
    session: Arc<Mutex<SessionState>>,
    sink: Arc<dyn UploadSink>,
    gate: Arc<ActivityGate>,
    interval_ms: u64,
    stop: Arc<AtomicBool>,
    stop_wake: Arc<Notify>,
}

impl UploadScheduler {
    pub fn new(
        session: Arc<Mutex<SessionState>>,
        sink: Arc<dyn UploadSink>,
        gate: Arc<ActivityGate>,
        interval_ms: u64,
    ) -> Self {
        Self {
            session,
            sink,
            gate,
            interval_ms,
            stop: Arc::new(AtomicBool::new(false)),
            stop_wake: Arc::new(Notify::new()),
        }
    }

    /// Handle that stops the run loop from anywhere.
    pub fn stopper(&self) -> UploadStop {
        UploadStop {
            flag: Arc::clone(&self.stop),
            wake: Arc::clone(&self.stop_wake),
        }
    }

    /// Drive flushes until stopped. Intended to run as its own task.
    pub async fn run(self) {
        info!(interval_ms = self.interval_ms, "upload scheduler started");
        loop {
            if self.stop.load(Ordering::SeqCst) {
                break;
            }

            if self.gate.is_idle() {
                debug!("input idle, uploads paused");
                tokio::select! {
                    _ = self.gate.resumed() => {}
                    _ = self.stop_wake.notified() => break,
                }
                continue;
            }

            tokio::select! {
                _ = tokio::time::sleep(std::time::Duration::from_millis(self.interval_ms)) => {}
                _ = self.stop_wake.notified() => break,
            }
            if self.stop.load(Ordering::SeqCst) {
                break;
            }
            self.flush_once().await;
        }
        info!("upload scheduler stopped");
    }

    /// Drain and deliver the active chunk. Returns whether a delivery was
    /// attempted and succeeded. Empty (or uninitialized) buffers skip the
    /// flush entirely.
    pub async fn flush_once(&self) -> bool {
        let chunk = {
            let mut session = self.session.lock();
            if session.is_empty() {
                return false;
            }
            match session.drain_and_reset() {
                Ok(chunk) => chunk,
                Err(_) => {
                    debug!("flush skipped: session not initialized");
                    return false;
                }
            }
        };

        let loms = chunk.loms.len();
        let events = chunk.exploration.len() + chunk.actions.len();

        // Serialization runs off the interaction thread, right before the
        // network handoff.
        let body = match tokio::task::spawn_blocking(move || {
            serde_json::to_string(&chunk.to_wire())
        })
        .await
        {
            Ok(Ok(body)) => body,
            Ok(Err(e)) => {
                warn!(error = %e, "chunk serialization failed, window dropped");
                return false;
            }
            Err(e) => {
                warn!(error = %e, "serialization task failed, window dropped");
                return false;
            }
        };

        match self.sink.upload(body).await {
            Ok(()) => {
                info!(loms, events, "chunk flushed");
                true
            }
            Err(e) => {
                warn!(error = %e, loms, events, "flush failed, window dropped");
                false
            }
        }
    }
}
