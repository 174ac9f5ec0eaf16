//! Pointer Input Classification
//!
//! Turns raw pointer and scroll signals into classified action and
//! exploration events:
//!
//! - [`trace`]: per-pointer movement history ([`trace::PointerTraceStore`])
//! - [`zoom`]: the multi-pointer zoom baseline and three-factor gate
//! - [`classifier`]: the per-pointer gesture state machine
//! - [`scroll`]: viewport-sample accumulation for scroll gestures

pub mod trace;
pub mod zoom;
pub mod classifier;
pub mod scroll;

pub use classifier::GestureClassifier;
pub use scroll::ScrollTranslator;
pub use trace::{GestureKind, PointerId, PointerTrace, PointerTraceStore, TimedPoint};
pub use zoom::{ScaleSnapshot, ZoomGate};
