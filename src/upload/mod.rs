//! Batched Upload
//!
//! - [`sink`]: the delivery boundary ([`sink::UploadSink`]) and its HTTP
//!   implementation
//! - [`scheduler`]: the periodic, inactivity-gated flush driver

pub mod sink;
pub mod scheduler;

pub use scheduler::{ActivityGate, UploadScheduler};
pub use sink::{HttpSink, UploadSink};
