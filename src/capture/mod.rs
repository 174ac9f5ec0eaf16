//! Structural View-Tree Capture
//!
//! Produces deduplicated structural+geometric snapshots of the host's view
//! hierarchy:
//!
//! - [`view`]: the collaborator traits ([`view::ViewTree`], [`view::HitTest`])
//!   and the published zone table
//! - [`signature`]: single-pass traversal into a hashable signature string
//!   plus flat node records
//! - [`lom`]: the Layout Object Model artifact and its wire serialization
//! - [`engine`]: signature caching, generation tracking, materialization

pub mod view;
pub mod signature;
pub mod lom;
pub mod engine;

pub use engine::TreeCaptureEngine;
pub use lom::{Lom, LomEntry, LomRef, ViewNode};
pub use signature::PendingCapture;
pub use view::{HitTest, NodeIdentity, ViewTree, ZoneLookup};
