//! Scroll-to-Event Translation
//!
//! Hosts report scroll progress as a stream of (timestamp → viewport
//! rectangle) and (timestamp → drag point) samples. While a scroll is in
//! progress the translator only accumulates; when the host signals
//! scroll-idle it collapses the accumulated samples into a
//! `Scroll(start) … Pan* … Scroll(end)` event sequence.
//!
//! Intermediate pans are decimated with an adaptive threshold: normally one
//! sample per 50 ms, tightened to 20 ms for short scrolls (fewer than ten
//! drag samples) so brief flicks keep useful granularity.

use std::collections::BTreeMap;

use crate::event::{ExplorationEvent, ScrollPhase};
use crate::geometry::{Point, Rect};

/// Accumulates in-progress scroll samples and emits events on idle.
#[derive(Debug)]
pub struct ScrollTranslator {
    viewport_samples: BTreeMap<u64, Rect>,
    drag_samples: BTreeMap<u64, Point>,
    /// Pan decimation interval for normal scrolls (ms).
    pub pan_interval_ms: u64,
    /// Pan decimation interval for short scrolls (ms).
    pub short_pan_interval_ms: u64,
    /// Below this many drag samples a scroll counts as short.
    pub short_scroll_samples: usize,
}

impl ScrollTranslator {
    pub fn new() -> Self {
        Self {
            viewport_samples: BTreeMap::new(),
            drag_samples: BTreeMap::new(),
            pan_interval_ms: 50,
            short_pan_interval_ms: 20,
            short_scroll_samples: 10,
        }
    }

    /// Record one scroll progress sample.
    pub fn record(&mut self, ts: u64, viewport: Rect, drag: Point) {
        self.viewport_samples.insert(ts, viewport);
        self.drag_samples.insert(ts, drag);
    }

    /// Whether a scroll is currently being accumulated.
    pub fn is_active(&self) -> bool {
        !self.viewport_samples.is_empty()
    }

    /// The scroll settled: emit the event sequence and reset.
    ///
    /// A scroll whose first and last viewport samples are identical was a
    /// no-op and emits nothing. Sample maps are cleared unconditionally.
    pub fn on_idle(&mut self) -> Vec<ExplorationEvent> {
        let events = self.build_events();
        self.viewport_samples.clear();
        self.drag_samples.clear();
        events
    }

    fn build_events(&self) -> Vec<ExplorationEvent> {
        let (&first_ts, &first_rect) = match self.viewport_samples.first_key_value() {
            Some(entry) => entry,
            None => return Vec::new(),
        };
        let (&last_ts, &last_rect) = self
            .viewport_samples
            .last_key_value()
            .expect("non-empty map has a last entry");

        if first_rect == last_rect {
            return Vec::new();
        }

        let mut events = vec![ExplorationEvent::Scroll {
            ts: first_ts,
            viewport: first_rect,
            phase: ScrollPhase::Start,
        }];

        let interval = if self.drag_samples.len() < self.short_scroll_samples {
            self.short_pan_interval_ms
        } else {
            self.pan_interval_ms
        };

        let mut last_kept: Option<u64> = None;
        for (&ts, &point) in &self.drag_samples {
            if last_kept.is_some_and(|kept| ts.saturating_sub(kept) < interval) {
                continue;
            }
            last_kept = Some(ts);
            events.push(ExplorationEvent::Pan {
                ts,
                viewport: self.viewport_at(ts).unwrap_or(first_rect),
                point,
            });
        }

        events.push(ExplorationEvent::Scroll {
            ts: last_ts,
            viewport: last_rect,
            phase: ScrollPhase::End,
        });
        events
    }

    /// Latest viewport sample at or before `ts`.
    fn viewport_at(&self, ts: u64) -> Option<Rect> {
        self.viewport_samples
            .range(..=ts)
            .next_back()
            .map(|(_, &rect)| rect)
    }
}
