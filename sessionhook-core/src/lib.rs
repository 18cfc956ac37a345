//! sessionhook-core: buffer captured traffic per session and deliver
//! completed sessions to a webhook
//!
//! Producers (a traffic interception pipeline) push small [`Fragment`]s
//! tagged with a session id. Fragments accumulate in the [`SessionStore`];
//! once a fragment carries the completion flag, a background
//! [`DeliveryWorker`] POSTs the whole buffer to the configured endpoint.
//! Producers never wait on the endpoint.
//!
//! # Quick Start
//!
//! ```no_run
//! use sessionhook_core::{Fragment, SessionhookConfig, WebhookClient, WebhookConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let url = WebhookConfig::parse_url("https://collector.example.com/sessions")?;
//! let client = WebhookClient::new(&SessionhookConfig::for_endpoint(url))?;
//!
//! client.ingest(Fragment::new("s1", b"GET / HTTP/1.1\r\n\r\n".to_vec(), false)).await;
//! client.ingest(Fragment::new("s1", b"HTTP/1.1 200 OK\r\n\r\n".to_vec(), true)).await;
//!
//! // Waits for the queued delivery of "s1"
//! client.shutdown().await;
//! # Ok(())
//! # }
//! ```
//!
//! # Architecture
//!
//! ```text
//! producer ──ingest──▶ SessionStore ──notify──▶ dispatch queue
//!                           ▲                        │
//!                    claim / complete                ▼
//!                           └────────────────── DeliveryWorker ──POST──▶ webhook
//! ```

pub mod client;
pub mod config;
pub mod delivery;
pub mod dispatch;
pub mod error;
pub mod fragment;
pub mod session;

// Re-export key types for convenience
pub use client::WebhookClient;
pub use config::{QueueConfig, RetentionConfig, RetryConfig, SessionhookConfig, WebhookConfig};
pub use delivery::{
    DeliveryEvent, DeliveryWorker, HttpTransport, MockTransport, RetryPolicy, WebhookSender,
    WebhookTransport,
};
pub use error::{ConfigError, IngestAnomaly, SendError};
pub use fragment::Fragment;
pub use session::{DeliveryState, SessionSnapshot, SessionStore};
