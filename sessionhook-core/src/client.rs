//! WebhookClient wires the store, dispatch queue, worker and sweeper together

use std::sync::Arc;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::config::SessionhookConfig;
use crate::delivery::{
    DEFAULT_EVENT_CAPACITY, DeliveryEvent, DeliveryWorker, HttpTransport, RetryPolicy,
    WebhookSender, WebhookTransport,
};
use crate::dispatch;
use crate::error::ConfigError;
use crate::fragment::Fragment;
use crate::session::{SessionStore, run_sweeper};

/// Entry point for producers
///
/// Owns the background delivery worker and retention sweeper. Both stop
/// when [`WebhookClient::shutdown`] is awaited or the client is dropped;
/// only `shutdown` waits for queued deliveries to finish.
pub struct WebhookClient {
    store: Arc<SessionStore>,
    events: broadcast::Sender<DeliveryEvent>,
    shutdown: CancellationToken,
    worker: JoinHandle<()>,
    sweeper: JoinHandle<()>,
}

impl WebhookClient {
    /// Start a client that POSTs over HTTP
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(config: &SessionhookConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let transport = HttpTransport::new(config.webhook.timeout)?;
        Self::with_transport(config, Arc::new(transport))
    }

    /// Start a client on a custom transport
    pub fn with_transport(
        config: &SessionhookConfig,
        transport: Arc<dyn WebhookTransport>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let endpoint = config.endpoint()?.clone();

        let (dispatch_tx, dispatch_rx) = dispatch::channel(&config.queue);
        let store = Arc::new(SessionStore::new(dispatch_tx.clone()));
        let (events, _) = broadcast::channel(DEFAULT_EVENT_CAPACITY);
        let shutdown = CancellationToken::new();

        let worker = DeliveryWorker::new(
            Arc::clone(&store),
            WebhookSender::new(transport),
            endpoint.clone(),
            RetryPolicy::new(&config.retry),
            dispatch_tx,
            events.clone(),
            shutdown.clone(),
        );
        let worker = tokio::spawn(worker.run(dispatch_rx));
        let sweeper = tokio::spawn(run_sweeper(
            Arc::clone(&store),
            config.retention.clone(),
            shutdown.clone(),
        ));

        info!(
            endpoint = %endpoint,
            queue_capacity = config.queue.capacity,
            max_attempts = config.retry.max_attempts,
            "Webhook client started"
        );

        Ok(Self {
            store,
            events,
            shutdown,
            worker,
            sweeper,
        })
    }

    /// Buffer a fragment and wake the delivery worker
    ///
    /// Never fails; anomalies such as late data are logged.
    pub async fn ingest(&self, fragment: Fragment) {
        self.store
            .ingest(&fragment.session_id, &fragment.data, fragment.has_response)
            .await;
    }

    /// Receive delivery outcomes from now on
    pub fn subscribe(&self) -> broadcast::Receiver<DeliveryEvent> {
        self.events.subscribe()
    }

    /// The session store, for inspection
    pub fn store(&self) -> &Arc<SessionStore> {
        &self.store
    }

    /// Stop accepting notifications, deliver what is queued, then stop
    pub async fn shutdown(mut self) {
        self.shutdown.cancel();
        if let Err(e) = (&mut self.worker).await {
            error!("Delivery worker ended abnormally: {}", e);
        }
        if let Err(e) = (&mut self.sweeper).await {
            error!("Retention sweeper ended abnormally: {}", e);
        }
        info!("Webhook client stopped");
    }
}

impl Drop for WebhookClient {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}
