//! Webhook delivery: transport seam, sender, retry policy and worker

pub mod events;
pub mod mock;
pub mod retry;
pub mod sender;
pub mod transport;
pub mod worker;

pub use events::{DEFAULT_EVENT_CAPACITY, DeliveryEvent};
pub use mock::{MockTransport, RecordedPost};
pub use retry::RetryPolicy;
pub use sender::{ACCEPTED_STATUSES, WebhookSender, classify};
pub use transport::{HttpTransport, OCTET_STREAM, TransportFailure, WebhookTransport};
pub use worker::DeliveryWorker;
