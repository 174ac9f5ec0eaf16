//! # uxtrace
//!
//! A client-side interaction telemetry engine. It observes raw pointer and
//! scroll input together with structural changes to the on-screen view
//! hierarchy, classifies them into a compact, privacy-safe semantic event
//! log, and batches that log for periodic upload.
//!
//! ## Overview
//!
//! The engine never sees pixels or text. Pointer input is distilled into
//! discrete *action events* (tap, double-tap, long-press) and trajectory
//! *exploration events* (pan, zoom, scroll); the view hierarchy is distilled
//! into *LOMs* — structural snapshots whose nodes carry only type labels and
//! bounding rectangles. Structurally identical frames are deduplicated via a
//! signature hash, so a repeat capture costs a traversal, never a
//! materialization.
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use uxtrace::config::Config;
//! use uxtrace::geometry::Point;
//! use uxtrace::runtime::Telemetry;
//! # use uxtrace::capture::view::{ViewTree, HitTest};
//! # fn collaborators() -> (Arc<dyn ViewTree>, Arc<dyn HitTest>) { unimplemented!() }
//!
//! # fn demo() -> uxtrace::Result<()> {
//! let mut config = Config::default();
//! config.upload.endpoint = "https://ingest.example.com/v1/chunks".into();
//!
//! let (tree, hit_test) = collaborators();
//! let telemetry = Telemetry::start(config, tree, hit_test)?;
//!
//! // Feed input from the host framework's event dispatch:
//! telemetry.pointer_down(0, Point::new(100.0, 100.0));
//! telemetry.pointer_up(0, Point::new(100.0, 100.0));
//! telemetry.tree_changed();
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - [`geometry`]: pure vector math (centroid, radial/tangential decomposition)
//! - [`pointer`]: per-pointer gesture state machine and scroll translation
//! - [`capture`]: view-tree signature hashing, caching, LOM materialization
//! - [`event`]: action/exploration event types and their wire encoding
//! - [`chunk`]: session state and the append-only upload accumulator
//! - [`upload`]: periodic, inactivity-gated flush to an HTTP sink
//! - [`recorder`]: the synchronous coordinator wiring the above together
//! - [`runtime`]: tokio glue (timers, background offload, upload task)
//! - [`time`], [`scheduler`]: injectable clock and timer primitives
//! - [`config`]: TOML-backed configuration with validation
//!
//! ## Event Pipeline
//!
//! ```text
//! ┌─────────────┐    ┌──────────────┐    ┌─────────────┐    ┌────────────┐
//! │ Pointer /   │───▶│   Gesture    │───▶│   Chunk     │───▶│   Upload   │
//! │ Scroll input│    │  Classifier  │    │   Buffer    │    │  Scheduler │
//! └─────────────┘    └──────────────┘    └─────────────┘    └────────────┘
//!                                               ▲
//! ┌─────────────┐    ┌──────────────┐           │
//! │ Tree change │───▶│ Tree Capture │───────────┘
//! │  signals    │    │   Engine     │  (LOM or LomRef)
//! └─────────────┘    └──────────────┘
//! ```

pub mod time;
pub mod scheduler;
pub mod geometry;
pub mod event;
pub mod pointer;
pub mod capture;
pub mod chunk;
pub mod upload;
pub mod config;
pub mod recorder;
pub mod runtime;

// Re-export commonly used types
pub use chunk::{Chunk, ChunkBuffer, SessionState};
pub use event::{ActionEvent, ExplorationEvent};
pub use geometry::{Point, Rect};
pub use recorder::Recorder;
pub use runtime::Telemetry;

/// Result type alias for the telemetry engine
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for the telemetry engine
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Session or chunk accessed before initialization.
    #[error("telemetry not initialized")]
    NotInitialized,

    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// A structural capture could not be taken. Always non-fatal: the
    /// capture is skipped and prior state is retained.
    #[error("capture failed: {0}")]
    CaptureFailure(String),

    /// A flush could not be delivered. Always non-fatal: the chunk for that
    /// window is discarded.
    #[error("transport failure: {0}")]
    TransportFailure(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
