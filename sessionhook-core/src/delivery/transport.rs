//! HTTP transport abstraction
//!
//! The webhook sender only needs "POST these bytes, tell me the status
//! code". Keeping that behind a trait lets tests script endpoint behavior
//! without a network.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use url::Url;

use crate::error::ConfigError;

/// Media type of every webhook body
pub const OCTET_STREAM: &str = "application/octet-stream";

/// A POST that could not produce a status code
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportFailure(pub String);

/// Something that can POST an opaque body and report the response status
#[async_trait]
pub trait WebhookTransport: Send + Sync {
    /// POST `body` to `url` as `application/octet-stream`
    async fn post(&self, url: &Url, body: Vec<u8>) -> Result<u16, TransportFailure>;
}

/// reqwest-backed transport with a per-request timeout
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// Build a client whose requests give up after `timeout`
    ///
    /// Redirects are not followed: a 3xx is reported to the sender as-is.
    pub fn new(timeout: Duration) -> Result<Self, ConfigError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| ConfigError::HttpClient(e.to_string()))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl WebhookTransport for HttpTransport {
    async fn post(&self, url: &Url, body: Vec<u8>) -> Result<u16, TransportFailure> {
        let response = self
            .client
            .post(url.clone())
            .header(CONTENT_TYPE, OCTET_STREAM)
            .body(body)
            .send()
            .await
            .map_err(|e| TransportFailure(describe(&e)))?;

        Ok(response.status().as_u16())
    }
}

fn describe(error: &reqwest::Error) -> String {
    if error.is_timeout() {
        format!("timed out: {}", error)
    } else if error.is_connect() {
        format!("connect failed: {}", error)
    } else {
        error.to_string()
    }
}
