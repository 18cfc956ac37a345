//! Delivery worker
//!
//! A single long-lived task. Each dispatch notification is only a wake-up:
//! the worker asks the store whether the session is due and, if so, sends
//! the snapshot the store hands back. One slow endpoint therefore delays
//! every delivery queued behind it; the transport timeout bounds the stall.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use url::Url;

use super::events::DeliveryEvent;
use super::retry::RetryPolicy;
use super::sender::WebhookSender;
use crate::dispatch::{DispatchReceiver, DispatchSender};
use crate::session::{Claim, SessionStore};

/// Consumes dispatch notifications and delivers finished sessions
pub struct DeliveryWorker {
    store: Arc<SessionStore>,
    sender: WebhookSender,
    endpoint: Url,
    retry: RetryPolicy,
    requeue: DispatchSender,
    events: broadcast::Sender<DeliveryEvent>,
    shutdown: CancellationToken,
}

impl DeliveryWorker {
    pub fn new(
        store: Arc<SessionStore>,
        sender: WebhookSender,
        endpoint: Url,
        retry: RetryPolicy,
        requeue: DispatchSender,
        events: broadcast::Sender<DeliveryEvent>,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            store,
            sender,
            endpoint,
            retry,
            requeue,
            events,
            shutdown,
        }
    }

    /// Run until shutdown is requested, then drain what is already queued
    pub async fn run(self, mut rx: DispatchReceiver) {
        info!(endpoint = %self.endpoint, "Delivery worker started");

        loop {
            tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => {
                    rx.close();
                    break;
                }
                next = rx.recv() => match next {
                    Some(session_id) => self.evaluate(&session_id).await,
                    None => break,
                }
            }
        }

        while let Some(session_id) = rx.recv().await {
            self.evaluate(&session_id).await;
        }

        info!("Delivery worker stopped");
    }

    /// Re-derive what to do for `session_id` from its current record
    pub async fn evaluate(&self, session_id: &str) {
        match self.store.claim_delivery(session_id, Instant::now()).await {
            Claim::Deliver { attempt, payload } => {
                self.deliver(session_id, attempt, payload).await;
            }
            Claim::Missing => debug!(session_id, "No record for notification, discarding"),
            Claim::NotFinished => debug!(session_id, "Session not finished yet"),
            Claim::NotDue => debug!(session_id, "Session not due for delivery"),
        }
    }

    async fn deliver(&self, session_id: &str, attempt: u32, payload: Vec<u8>) {
        let bytes = payload.len();
        debug!(session_id, attempt, bytes, "Sending session to webhook");

        let event = match self.sender.send(&self.endpoint, payload).await {
            Ok(()) => {
                self.store
                    .complete_delivery(session_id, bytes, attempt)
                    .await;
                info!(session_id, attempt, bytes, "Session delivered");
                DeliveryEvent::Delivered {
                    session_id: session_id.to_string(),
                    bytes,
                    attempt,
                }
            }
            Err(e) => {
                let retry_in = self.retry.next_delay(attempt);
                let retry_at = retry_in.map(|delay| Instant::now() + delay);
                self.store
                    .fail_delivery(session_id, attempt, retry_at)
                    .await;

                error!(session_id, attempt, error = %e, "Error while sending to webhook");
                if let Some(delay) = retry_in {
                    self.schedule_retry(session_id, delay);
                }

                DeliveryEvent::Failed {
                    session_id: session_id.to_string(),
                    attempt,
                    error: e,
                    retry_in,
                }
            }
        };

        // No subscribers is fine
        let _ = self.events.send(event);
    }

    fn schedule_retry(&self, session_id: &str, delay: Duration) {
        debug!(session_id, delay_ms = delay.as_millis() as u64, "Retry scheduled");

        let requeue = self.requeue.clone();
        let shutdown = self.shutdown.clone();
        let session_id = session_id.to_string();
        tokio::spawn(async move {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    warn!(session_id, "Shutdown before scheduled retry");
                }
                _ = tokio::time::sleep(delay) => {
                    requeue.notify(&session_id).await;
                }
            }
        });
    }
}
