//! Upload Sink
//!
//! The delivery boundary for serialized chunks. The contract is
//! deliberately minimal: one POST per flush, 2xx is success, and anything
//! else (network failure, timeout, non-2xx status) is a
//! [`TransportFailure`] that loses the chunk for that window. No retry, no
//! backoff, no re-queueing.
//!
//! [`TransportFailure`]: crate::Error::TransportFailure

use async_trait::async_trait;
use reqwest::Client;

use crate::{Error, Result};

/// Accepts one serialized chunk body per flush.
#[async_trait]
pub trait UploadSink: Send + Sync {
    /// Deliver a JSON chunk body. An `Err` means the chunk is dropped.
    async fn upload(&self, body: String) -> Result<()>;
}

/// HTTP sink: one JSON POST per chunk to the configured endpoint.
pub struct HttpSink {
    client: Client,
    endpoint: String,
}

impl HttpSink {
    pub fn new(endpoint: &str, request_timeout_ms: u64) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_millis(request_timeout_ms))
            .build()
            .map_err(|e| Error::TransportFailure(format!("http client: {}", e)))?;
        Ok(Self {
            client,
            endpoint: endpoint.to_string(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl UploadSink for HttpSink {
    async fn upload(&self, body: String) -> Result<()> {
        let response = self
            .client
            .post(&self.endpoint)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .map_err(|e| Error::TransportFailure(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(Error::TransportFailure(format!(
                "endpoint answered {}",
                status
            )))
        }
    }
}
