//! Single-Shot Timer Scheduling
//!
//! Gesture classification and capture debouncing need cancelable single-shot
//! timers. Rather than closures capturing mutable state, timers are modeled
//! as an explicit [`Scheduler`] trait handing out opaque [`TimerToken`]s;
//! fires are delivered back to the owning component, which validates the
//! token against its pending state and silently ignores stale fires. This
//! makes cancellation and invalidation explicit and testable.
//!
//! Two implementations are provided: [`TokioScheduler`] for production and
//! [`ManualScheduler`] for deterministic tests.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc::UnboundedSender;

use crate::time::Clock;

/// Opaque handle for a scheduled timer. Tokens are unique per scheduler for
/// its lifetime and never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerToken(pub u64);

/// Arms and cancels single-shot timers with millisecond resolution.
pub trait Scheduler: Send {
    /// Arm a single-shot timer. The fire is delivered through the owning
    /// runtime as a `timer_fired(token)` call after at least `delay_ms`.
    fn schedule_once(&mut self, delay_ms: u64) -> TimerToken;

    /// Cancel a previously armed timer. Canceling an already-fired or
    /// unknown token is a no-op.
    fn cancel(&mut self, token: TimerToken);
}

/// Production scheduler: each timer is a spawned tokio sleep that sends its
/// token into the engine channel on expiry.
///
/// Cancellation is cooperative: the sleeping task checks a shared cancel set
/// at expiry and swallows the fire. Consumers additionally validate tokens
/// at delivery, so a lost cancellation is harmless.
///
/// Clones share the token counter, so several components can arm timers
/// against the same delivery channel without token collisions.
#[derive(Clone)]
pub struct TokioScheduler {
    tx: UnboundedSender<TimerToken>,
    next: Arc<AtomicU64>,
    cancelled: Arc<Mutex<HashSet<TimerToken>>>,
}

impl TokioScheduler {
    /// Create a scheduler delivering fires into `tx`.
    pub fn new(tx: UnboundedSender<TimerToken>) -> Self {
        Self {
            tx,
            next: Arc::new(AtomicU64::new(1)),
            cancelled: Arc::new(Mutex::new(HashSet::new())),
        }
    }
}

impl Scheduler for TokioScheduler {
    fn schedule_once(&mut self, delay_ms: u64) -> TimerToken {
        let token = TimerToken(self.next.fetch_add(1, Ordering::Relaxed));
        let tx = self.tx.clone();
        let cancelled = Arc::clone(&self.cancelled);

        tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(delay_ms)).await;
            if cancelled.lock().remove(&token) {
                return;
            }
            // Receiver gone means the engine shut down; nothing to deliver.
            let _ = tx.send(token);
        });

        token
    }

    fn cancel(&mut self, token: TimerToken) {
        self.cancelled.lock().insert(token);
    }
}

/// Deterministic scheduler for tests: armed timers fire only when the caller
/// drains them via [`ManualScheduler::fire_due`].
pub struct ManualScheduler {
    clock: Arc<dyn Clock>,
    next: u64,
    armed: Vec<(TimerToken, u64)>,
}

impl ManualScheduler {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            next: 1,
            armed: Vec::new(),
        }
    }

    /// Pop every timer whose deadline is at or before `now`, in deadline
    /// order. The caller routes the returned tokens to `timer_fired`.
    pub fn fire_due(&mut self, now_ms: u64) -> Vec<TimerToken> {
        let mut due: Vec<(TimerToken, u64)> = Vec::new();
        self.armed.retain(|&(token, at)| {
            if at <= now_ms {
                due.push((token, at));
                false
            } else {
                true
            }
        });
        due.sort_by_key(|&(_, at)| at);
        due.into_iter().map(|(token, _)| token).collect()
    }

    /// Number of timers currently armed.
    pub fn armed_count(&self) -> usize {
        self.armed.len()
    }
}

impl Scheduler for ManualScheduler {
    fn schedule_once(&mut self, delay_ms: u64) -> TimerToken {
        let token = TimerToken(self.next);
        self.next += 1;
        self.armed.push((token, self.clock.now_ms() + delay_ms));
        token
    }

    fn cancel(&mut self, token: TimerToken) {
        self.armed.retain(|&(t, _)| t != token);
    }
}

/// Cloneable wrapper sharing one [`ManualScheduler`] between a test harness
/// and the components under test, mirroring how [`TokioScheduler`] clones
/// share a token counter.
#[derive(Clone)]
pub struct SharedManualScheduler(Arc<Mutex<ManualScheduler>>);

impl SharedManualScheduler {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self(Arc::new(Mutex::new(ManualScheduler::new(clock))))
    }

    /// See [`ManualScheduler::fire_due`].
    pub fn fire_due(&self, now_ms: u64) -> Vec<TimerToken> {
        self.0.lock().fire_due(now_ms)
    }

    /// See [`ManualScheduler::armed_count`].
    pub fn armed_count(&self) -> usize {
        self.0.lock().armed_count()
    }
}

impl Scheduler for SharedManualScheduler {
    fn schedule_once(&mut self, delay_ms: u64) -> TimerToken {
        self.0.lock().schedule_once(delay_ms)
    }

    fn cancel(&mut self, token: TimerToken) {
        self.0.lock().cancel(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::ManualClock;

    fn make_manual() -> (Arc<ManualClock>, ManualScheduler) {
        let clock = Arc::new(ManualClock::new());
        let scheduler = ManualScheduler::new(Arc::clone(&clock) as Arc<dyn Clock>);
        (clock, scheduler)
    }

    #[test]
    fn test_manual_scheduler_fires_in_deadline_order() {
        let (clock, mut scheduler) = make_manual();

        let late = scheduler.schedule_once(300);
        let early = scheduler.schedule_once(100);

        clock.advance(50);
        assert!(scheduler.fire_due(clock.now_ms()).is_empty());

        clock.advance(300);
        let fired = scheduler.fire_due(clock.now_ms());
        assert_eq!(fired, vec![early, late]);
        assert_eq!(scheduler.armed_count(), 0);
    }

    #[test]
    fn test_manual_scheduler_cancel() {
        let (clock, mut scheduler) = make_manual();

        let token = scheduler.schedule_once(100);
        scheduler.cancel(token);

        clock.advance(200);
        assert!(scheduler.fire_due(clock.now_ms()).is_empty());
    }

    #[test]
    fn test_manual_scheduler_tokens_unique() {
        let (_clock, mut scheduler) = make_manual();
        let a = scheduler.schedule_once(10);
        let b = scheduler.schedule_once(10);
        assert_ne!(a, b);
    }

    #[test]
    fn test_cancel_unknown_token_is_noop() {
        let (_clock, mut scheduler) = make_manual();
        scheduler.cancel(TimerToken(999));
        assert_eq!(scheduler.armed_count(), 0);
    }

    #[test]
    fn test_shared_scheduler_clones_share_tokens() {
        let clock = Arc::new(ManualClock::new());
        let shared = SharedManualScheduler::new(Arc::clone(&clock) as Arc<dyn Clock>);
        let mut a = shared.clone();
        let mut b = shared.clone();

        let t1 = a.schedule_once(10);
        let t2 = b.schedule_once(10);
        assert_ne!(t1, t2, "clones must never hand out the same token");

        clock.advance(10);
        assert_eq!(shared.fire_due(clock.now_ms()).len(), 2);
    }

    #[tokio::test]
    async fn test_tokio_scheduler_clones_share_tokens() {
        let (tx, _rx) = tokio::sync::mpsc::unbounded_channel();
        let mut a = TokioScheduler::new(tx);
        let mut b = a.clone();
        assert_ne!(a.schedule_once(1_000), b.schedule_once(1_000));
    }

    #[tokio::test]
    async fn test_tokio_scheduler_delivers_token() {
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let mut scheduler = TokioScheduler::new(tx);

        let token = scheduler.schedule_once(5);
        let fired = tokio::time::timeout(std::time::Duration::from_secs(1), rx.recv())
            .await
            .expect("timer should fire within a second")
            .expect("channel should stay open");

        assert_eq!(fired, token);
    }

    #[tokio::test]
    async fn test_tokio_scheduler_cancel_swallows_fire() {
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let mut scheduler = TokioScheduler::new(tx);

        let token = scheduler.schedule_once(20);
        scheduler.cancel(token);

        let result =
            tokio::time::timeout(std::time::Duration::from_millis(100), rx.recv()).await;
        assert!(result.is_err(), "cancelled timer must not deliver");
    }
}
