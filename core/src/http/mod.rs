pub mod client;

pub use client::HttpClient;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

/// Failure talking to a remote endpoint.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("{url} responded with HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("request to {url} timed out")]
    Timeout { url: String },

    #[error("request to {url} failed: {message}")]
    Connection { url: String, message: String },

    #[error("could not decode response from {url}: {message}")]
    Decode { url: String, message: String },
}

impl TransportError {
    pub fn url(&self) -> &str {
        match self {
            TransportError::Status { url, .. }
            | TransportError::Timeout { url }
            | TransportError::Connection { url, .. }
            | TransportError::Decode { url, .. } => url,
        }
    }
}

/// The two request shapes the archiver needs from the network.
///
/// `HttpClient` is the production implementation; tests drive the pipeline
/// with an in-memory implementation instead.
#[async_trait]
pub trait Transport: Send + Sync {
    /// POSTs `body` as JSON and decodes the response body as JSON.
    async fn post_json(&self, url: &str, body: &Value) -> Result<Value, TransportError>;

    /// GETs `url` and returns the raw response body.
    async fn get_bytes(&self, url: &str) -> Result<Vec<u8>, TransportError>;

    /// GETs `url` and decodes the response body as JSON.
    async fn get_json(&self, url: &str) -> Result<Value, TransportError> {
        let bytes = self.get_bytes(url).await?;
        serde_json::from_slice(&bytes).map_err(|e| TransportError::Decode {
            url: url.to_string(),
            message: e.to_string(),
        })
    }
}
