use async_trait::async_trait;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::{Client, ClientBuilder, RequestBuilder};
use serde_json::Value;
use std::time::Duration;

use super::{Transport, TransportError};

const USER_AGENT: &str = concat!("disclosure-archiver/", env!("CARGO_PKG_VERSION"));
const JSON: &str = "application/json";

/// reqwest-backed transport with a bounded per-request timeout.
///
/// Only the JSON calls advertise `Accept: application/json`; attachment
/// downloads go out without an `Accept` header.
pub struct HttpClient {
    inner: Client,
}

impl HttpClient {
    pub fn new(timeout_seconds: u64) -> Self {
        let inner = ClientBuilder::new()
            .timeout(Duration::from_secs(timeout_seconds))
            .user_agent(USER_AGENT)
            .build()
            .unwrap_or_else(|_| Client::new());

        Self { inner }
    }

    fn post_json_request(&self, url: &str, body: &Value) -> RequestBuilder {
        self.inner
            .post(url)
            .header(ACCEPT, JSON)
            .header(CONTENT_TYPE, JSON)
            .json(body)
    }

    fn get_json_request(&self, url: &str) -> RequestBuilder {
        self.inner.get(url).header(ACCEPT, JSON)
    }

    fn get_request(&self, url: &str) -> RequestBuilder {
        self.inner.get(url)
    }

    async fn send(url: &str, request: RequestBuilder) -> Result<Vec<u8>, TransportError> {
        let response = request.send().await.map_err(|e| map_reqwest_error(url, e))?;
        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        let bytes = response.bytes().await.map_err(|e| map_reqwest_error(url, e))?;
        Ok(bytes.to_vec())
    }
}

fn decode_json(url: &str, bytes: &[u8]) -> Result<Value, TransportError> {
    serde_json::from_slice(bytes).map_err(|e| TransportError::Decode {
        url: url.to_string(),
        message: e.to_string(),
    })
}

#[async_trait]
impl Transport for HttpClient {
    async fn post_json(&self, url: &str, body: &Value) -> Result<Value, TransportError> {
        let bytes = Self::send(url, self.post_json_request(url, body)).await?;
        decode_json(url, &bytes)
    }

    async fn get_bytes(&self, url: &str) -> Result<Vec<u8>, TransportError> {
        Self::send(url, self.get_request(url)).await
    }

    async fn get_json(&self, url: &str) -> Result<Value, TransportError> {
        let bytes = Self::send(url, self.get_json_request(url)).await?;
        decode_json(url, &bytes)
    }
}

fn map_reqwest_error(url: &str, err: reqwest::Error) -> TransportError {
    if err.is_timeout() {
        TransportError::Timeout { url: url.to_string() }
    } else if err.is_decode() || err.is_body() {
        TransportError::Decode {
            url: url.to_string(),
            message: err.to_string(),
        }
    } else if let Some(status) = err.status() {
        TransportError::Status {
            url: url.to_string(),
            status: status.as_u16(),
        }
    } else {
        TransportError::Connection {
            url: url.to_string(),
            message: err.to_string(),
        }
    }
}
