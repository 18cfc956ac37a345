//! Dispatch signal queue
//!
//! Carries "re-evaluate this session" wake-ups from producers to the single
//! delivery worker. Notifications are delivered in send order and never
//! coalesced; the worker re-reads record state for each one, so duplicates
//! are harmless.

use tokio::sync::mpsc;
use tracing::warn;

use crate::config::QueueConfig;

/// Producer side of the dispatch queue
#[derive(Debug, Clone)]
pub enum DispatchSender {
    Unbounded(mpsc::UnboundedSender<String>),
    Bounded(mpsc::Sender<String>),
}

/// Consumer side of the dispatch queue, owned by the delivery worker
#[derive(Debug)]
pub enum DispatchReceiver {
    Unbounded(mpsc::UnboundedReceiver<String>),
    Bounded(mpsc::Receiver<String>),
}

/// Create a dispatch queue with the configured capacity
///
/// `capacity == 0` selects the unbounded queue.
pub fn channel(config: &QueueConfig) -> (DispatchSender, DispatchReceiver) {
    if config.capacity == 0 {
        let (tx, rx) = mpsc::unbounded_channel();
        (DispatchSender::Unbounded(tx), DispatchReceiver::Unbounded(rx))
    } else {
        let (tx, rx) = mpsc::channel(config.capacity);
        (DispatchSender::Bounded(tx), DispatchReceiver::Bounded(rx))
    }
}

impl DispatchSender {
    /// Queue a wake-up for `session_id`
    ///
    /// Waits for room on a bounded queue. Returns false if the worker is
    /// gone, in which case the notification is dropped.
    pub async fn notify(&self, session_id: &str) -> bool {
        let sent = match self {
            Self::Unbounded(tx) => tx.send(session_id.to_string()).is_ok(),
            Self::Bounded(tx) => tx.send(session_id.to_string()).await.is_ok(),
        };
        if !sent {
            warn!(session_id, "Dispatch queue closed, dropping notification");
        }
        sent
    }
}

impl DispatchReceiver {
    /// Next notification, or `None` once the queue is closed and drained
    pub async fn recv(&mut self) -> Option<String> {
        match self {
            Self::Unbounded(rx) => rx.recv().await,
            Self::Bounded(rx) => rx.recv().await,
        }
    }

    /// Next notification if one is already buffered
    pub fn try_recv(&mut self) -> Option<String> {
        match self {
            Self::Unbounded(rx) => rx.try_recv().ok(),
            Self::Bounded(rx) => rx.try_recv().ok(),
        }
    }

    /// Refuse new notifications while keeping the buffered ones readable
    pub fn close(&mut self) {
        match self {
            Self::Unbounded(rx) => rx.close(),
            Self::Bounded(rx) => rx.close(),
        }
    }
}
