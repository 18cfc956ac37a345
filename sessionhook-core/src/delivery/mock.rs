//! Scriptable transport for tests
//!
//! Queue outcomes with `queue_status()` / `queue_failure()`; each POST
//! consumes one. When the queue is empty the transport answers with the
//! default status (204 unless changed).

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use url::Url;

use super::transport::{TransportFailure, WebhookTransport};

/// A request seen by [`MockTransport`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedPost {
    pub url: Url,
    pub body: Vec<u8>,
}

#[derive(Debug)]
struct MockState {
    outcomes: VecDeque<Result<u16, TransportFailure>>,
    default_status: u16,
    posts: Vec<RecordedPost>,
}

/// In-memory [`WebhookTransport`]
///
/// Cloning shares the script and the request log, so a test can keep one
/// handle while the client owns another.
#[derive(Debug, Clone)]
pub struct MockTransport {
    state: Arc<Mutex<MockState>>,
    delay: Duration,
}

impl MockTransport {
    /// Create a transport that answers 204 to everything
    pub fn new() -> Self {
        Self::with_default_status(204)
    }

    /// Create a transport that answers `status` once the script runs out
    pub fn with_default_status(status: u16) -> Self {
        Self {
            state: Arc::new(Mutex::new(MockState {
                outcomes: VecDeque::new(),
                default_status: status,
                posts: Vec::new(),
            })),
            delay: Duration::ZERO,
        }
    }

    /// Sleep this long before answering each POST
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Answer the next unscripted POST with `status`
    pub fn queue_status(&self, status: u16) {
        self.lock().outcomes.push_back(Ok(status));
    }

    /// Fail the next unscripted POST at the transport level
    pub fn queue_failure(&self, cause: &str) {
        self.lock()
            .outcomes
            .push_back(Err(TransportFailure(cause.to_string())));
    }

    /// Every POST received so far, in order
    pub fn posts(&self) -> Vec<RecordedPost> {
        self.lock().posts.clone()
    }

    /// Number of POSTs received so far
    pub fn post_count(&self) -> usize {
        self.lock().posts.len()
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        // A panic while holding the lock only happens inside a failing test
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl WebhookTransport for MockTransport {
    async fn post(&self, url: &Url, body: Vec<u8>) -> Result<u16, TransportFailure> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let mut state = self.lock();
        state.posts.push(RecordedPost {
            url: url.clone(),
            body,
        });
        let default_status = state.default_status;
        state.outcomes.pop_front().unwrap_or(Ok(default_status))
    }
}
