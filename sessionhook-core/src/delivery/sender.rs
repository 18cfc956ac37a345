//! Webhook sender: one POST, strict status classification

use std::sync::Arc;

use url::Url;

use super::transport::WebhookTransport;
use crate::error::SendError;

/// Status codes that count as a successful delivery
pub const ACCEPTED_STATUSES: [u16; 2] = [200, 204];

/// POSTs session payloads and classifies the outcome
///
/// Only 200 and 204 are successes; every other status, 2xx included, fails.
#[derive(Clone)]
pub struct WebhookSender {
    transport: Arc<dyn WebhookTransport>,
}

impl WebhookSender {
    pub fn new(transport: Arc<dyn WebhookTransport>) -> Self {
        Self { transport }
    }

    /// Send `payload` to `endpoint` exactly once
    pub async fn send(&self, endpoint: &Url, payload: Vec<u8>) -> Result<(), SendError> {
        let status = self
            .transport
            .post(endpoint, payload)
            .await
            .map_err(|failure| SendError::Transport(failure.0))?;

        classify(status)
    }
}

/// Map a response status onto the delivery outcome
pub fn classify(status: u16) -> Result<(), SendError> {
    if ACCEPTED_STATUSES.contains(&status) {
        Ok(())
    } else {
        Err(SendError::InvalidStatus(status))
    }
}
