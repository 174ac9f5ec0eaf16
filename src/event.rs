//! Action & Exploration Events
//!
//! Classified interaction events and their wire encoding. Discrete,
//! localized actions (tap, double-tap, long-press) become [`ActionEvent`]s;
//! continuous trajectory interactions (pan, zoom, scroll) become
//! [`ExplorationEvent`]s.
//!
//! On the wire each event is a single colon-joined string with a fixed field
//! order; consumers parse them positionally, so the order is part of the
//! contract and locked by round-trip tests:
//!
//! ```text
//! ae  tap        <ts>:tap:<zone>:<l>:<t>:<w>:<h>:<x>:<y>
//! ae  doubletap  <ts>:doubletap:<zone>:<l>:<t>:<w>:<h>:<x>:<y>
//! ae  longpress  <ts>:longpress:<zone>:<l>:<t>:<w>:<h>:<x>:<y>:<duration>
//! ee  pan        <ts>:pan:<l>:<t>:<w>:<h>:<x>:<y>
//! ee  zoom       <ts>:zoom:<l>:<t>:<w>:<h>:<x1>,<y1>;<x2>,<y2>;...
//! ee  scroll     <ts>:scroll:<phase>:<l>:<t>:<w>:<h>
//! ```
//!
//! Geometric values are rounded to integers; timestamps are monotonic
//! milliseconds since engine start.

use crate::geometry::{Point, Rect};

/// Zone id meaning "no captured zone resolved for this point".
pub const ZONE_UNRESOLVED: u32 = 0;

/// Common fields carried by every action event.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ActionRecord {
    /// Milliseconds since engine start.
    pub ts: u64,
    /// Originating zone id from the current capture, or [`ZONE_UNRESOLVED`].
    pub zone: u32,
    /// Viewport rectangle at emission time.
    pub viewport: Rect,
    /// Screen position of the action.
    pub point: Point,
}

/// A discrete, localized user action.
#[derive(Debug, Clone, PartialEq)]
pub enum ActionEvent {
    Tap(ActionRecord),
    DoubleTap(ActionRecord),
    LongPress {
        record: ActionRecord,
        duration_ms: u64,
    },
}

/// Scroll lifecycle phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollPhase {
    Start,
    Update,
    End,
}

impl ScrollPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScrollPhase::Start => "start",
            ScrollPhase::Update => "update",
            ScrollPhase::End => "end",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "start" => Some(ScrollPhase::Start),
            "update" => Some(ScrollPhase::Update),
            "end" => Some(ScrollPhase::End),
            _ => None,
        }
    }
}

/// A continuous or trajectory-based interaction.
#[derive(Debug, Clone, PartialEq)]
pub enum ExplorationEvent {
    Pan {
        ts: u64,
        viewport: Rect,
        point: Point,
    },
    Zoom {
        /// Timestamp of the zoom's end (pointer release).
        ts: u64,
        viewport: Rect,
        /// Full recorded path of one participating pointer.
        path: Vec<Point>,
    },
    Scroll {
        ts: u64,
        viewport: Rect,
        phase: ScrollPhase,
    },
}

#[inline]
fn wire_int(v: f64) -> i64 {
    v.round() as i64
}

fn push_rect(out: &mut String, r: &Rect) {
    use std::fmt::Write;
    let _ = write!(
        out,
        "{}:{}:{}:{}",
        wire_int(r.left),
        wire_int(r.top),
        wire_int(r.width),
        wire_int(r.height)
    );
}

fn parse_rect(fields: &[&str]) -> Option<Rect> {
    if fields.len() < 4 {
        return None;
    }
    Some(Rect::new(
        fields[0].parse::<i64>().ok()? as f64,
        fields[1].parse::<i64>().ok()? as f64,
        fields[2].parse::<i64>().ok()? as f64,
        fields[3].parse::<i64>().ok()? as f64,
    ))
}

impl ActionEvent {
    /// The record shared by all variants.
    pub fn record(&self) -> &ActionRecord {
        match self {
            ActionEvent::Tap(r) | ActionEvent::DoubleTap(r) => r,
            ActionEvent::LongPress { record, .. } => record,
        }
    }

    /// Wire type tag.
    pub fn tag(&self) -> &'static str {
        match self {
            ActionEvent::Tap(_) => "tap",
            ActionEvent::DoubleTap(_) => "doubletap",
            ActionEvent::LongPress { .. } => "longpress",
        }
    }

    /// Encode to the positional colon-string wire form.
    pub fn encode(&self) -> String {
        use std::fmt::Write;
        let r = self.record();
        let mut out = String::with_capacity(48);
        let _ = write!(out, "{}:{}:{}:", r.ts, self.tag(), r.zone);
        push_rect(&mut out, &r.viewport);
        let _ = write!(out, ":{}:{}", wire_int(r.point.x), wire_int(r.point.y));
        if let ActionEvent::LongPress { duration_ms, .. } = self {
            let _ = write!(out, ":{}", duration_ms);
        }
        out
    }

    /// Parse a wire colon-string back into an event. Returns `None` for an
    /// unknown tag or malformed field list.
    pub fn decode(s: &str) -> Option<ActionEvent> {
        let fields: Vec<&str> = s.split(':').collect();
        if fields.len() < 9 {
            return None;
        }
        let record = ActionRecord {
            ts: fields[0].parse().ok()?,
            zone: fields[2].parse().ok()?,
            viewport: parse_rect(&fields[3..7])?,
            point: Point::new(
                fields[7].parse::<i64>().ok()? as f64,
                fields[8].parse::<i64>().ok()? as f64,
            ),
        };
        match fields[1] {
            "tap" => Some(ActionEvent::Tap(record)),
            "doubletap" => Some(ActionEvent::DoubleTap(record)),
            "longpress" => Some(ActionEvent::LongPress {
                record,
                duration_ms: fields.get(9)?.parse().ok()?,
            }),
            _ => None,
        }
    }
}

impl ExplorationEvent {
    /// Timestamp carried by the event.
    pub fn ts(&self) -> u64 {
        match self {
            ExplorationEvent::Pan { ts, .. }
            | ExplorationEvent::Zoom { ts, .. }
            | ExplorationEvent::Scroll { ts, .. } => *ts,
        }
    }

    /// Wire type tag.
    pub fn tag(&self) -> &'static str {
        match self {
            ExplorationEvent::Pan { .. } => "pan",
            ExplorationEvent::Zoom { .. } => "zoom",
            ExplorationEvent::Scroll { .. } => "scroll",
        }
    }

    /// Encode to the positional colon-string wire form.
    pub fn encode(&self) -> String {
        use std::fmt::Write;
        let mut out = String::with_capacity(48);
        match self {
            ExplorationEvent::Pan { ts, viewport, point } => {
                let _ = write!(out, "{}:pan:", ts);
                push_rect(&mut out, viewport);
                let _ = write!(out, ":{}:{}", wire_int(point.x), wire_int(point.y));
            }
            ExplorationEvent::Zoom { ts, viewport, path } => {
                let _ = write!(out, "{}:zoom:", ts);
                push_rect(&mut out, viewport);
                out.push(':');
                for (i, p) in path.iter().enumerate() {
                    if i > 0 {
                        out.push(';');
                    }
                    let _ = write!(out, "{},{}", wire_int(p.x), wire_int(p.y));
                }
            }
            ExplorationEvent::Scroll {
                ts,
                viewport,
                phase,
            } => {
                let _ = write!(out, "{}:scroll:{}:", ts, phase.as_str());
                push_rect(&mut out, viewport);
            }
        }
        out
    }

    /// Parse a wire colon-string back into an event.
    pub fn decode(s: &str) -> Option<ExplorationEvent> {
        let fields: Vec<&str> = s.split(':').collect();
        if fields.len() < 2 {
            return None;
        }
        let ts: u64 = fields[0].parse().ok()?;
        match fields[1] {
            "pan" => {
                if fields.len() < 8 {
                    return None;
                }
                Some(ExplorationEvent::Pan {
                    ts,
                    viewport: parse_rect(&fields[2..6])?,
                    point: Point::new(
                        fields[6].parse::<i64>().ok()? as f64,
                        fields[7].parse::<i64>().ok()? as f64,
                    ),
                })
            }
            "zoom" => {
                if fields.len() < 7 {
                    return None;
                }
                let mut path = Vec::new();
                if !fields[6].is_empty() {
                    for pair in fields[6].split(';') {
                        let (x, y) = pair.split_once(',')?;
                        path.push(Point::new(
                            x.parse::<i64>().ok()? as f64,
                            y.parse::<i64>().ok()? as f64,
                        ));
                    }
                }
                Some(ExplorationEvent::Zoom {
                    ts,
                    viewport: parse_rect(&fields[2..6])?,
                    path,
                })
            }
            "scroll" => {
                if fields.len() < 7 {
                    return None;
                }
                Some(ExplorationEvent::Scroll {
                    ts,
                    viewport: parse_rect(&fields[3..7])?,
                    phase: ScrollPhase::parse(fields[2])?,
                })
            }
            _ => None,
        }
    }
}
