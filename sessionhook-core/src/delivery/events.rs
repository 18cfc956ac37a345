//! Delivery outcomes broadcast by the worker

use std::time::Duration;

use crate::error::SendError;

/// Default capacity of the delivery event broadcast channel
pub const DEFAULT_EVENT_CAPACITY: usize = 256;

/// What happened to one delivery attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryEvent {
    /// The endpoint accepted the payload
    Delivered {
        session_id: String,
        bytes: usize,
        attempt: u32,
    },
    /// The attempt failed; `retry_in` is set when another one is scheduled
    Failed {
        session_id: String,
        attempt: u32,
        error: SendError,
        retry_in: Option<Duration>,
    },
}

impl DeliveryEvent {
    pub fn session_id(&self) -> &str {
        match self {
            Self::Delivered { session_id, .. } | Self::Failed { session_id, .. } => session_id,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Delivered { .. })
    }
}
