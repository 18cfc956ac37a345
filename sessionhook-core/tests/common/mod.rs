//! Shared test utilities for sessionhook-core integration tests

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::Router;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode, header};
use axum::routing::post;
use sessionhook_core::SessionhookConfig;
use tokio::net::TcpListener;
use url::Url;

/// A request received by the stub webhook
#[derive(Debug, Clone)]
pub struct StubRequest {
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

#[derive(Clone)]
struct StubState {
    status: StatusCode,
    delay: Duration,
    requests: Arc<Mutex<Vec<StubRequest>>>,
}

/// In-process HTTP endpoint answering every POST with a fixed status
pub struct WebhookStub {
    pub addr: SocketAddr,
    requests: Arc<Mutex<Vec<StubRequest>>>,
}

#[allow(dead_code)]
impl WebhookStub {
    pub fn url(&self) -> Url {
        Url::parse(&format!("http://{}/hook", self.addr)).unwrap()
    }

    pub fn config(&self) -> SessionhookConfig {
        SessionhookConfig::for_endpoint(self.url())
    }

    pub fn requests(&self) -> Vec<StubRequest> {
        self.requests.lock().unwrap().clone()
    }
}

/// Spawn a stub webhook answering `status`
#[allow(dead_code)]
pub async fn spawn_webhook(status: u16) -> WebhookStub {
    spawn_webhook_with_delay(status, Duration::ZERO).await
}

/// Spawn a stub webhook that waits `delay` before answering
pub async fn spawn_webhook_with_delay(status: u16, delay: Duration) -> WebhookStub {
    let requests = Arc::new(Mutex::new(Vec::new()));
    let state = StubState {
        status: StatusCode::from_u16(status).unwrap(),
        delay,
        requests: Arc::clone(&requests),
    };

    let app = Router::new()
        .route("/hook", post(handle))
        .with_state(state);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    WebhookStub { addr, requests }
}

async fn handle(State(state): State<StubState>, headers: HeaderMap, body: Bytes) -> StatusCode {
    state.requests.lock().unwrap().push(StubRequest {
        content_type: headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
        body: body.to_vec(),
    });
    if !state.delay.is_zero() {
        tokio::time::sleep(state.delay).await;
    }
    state.status
}

/// A URL nothing is listening on
#[allow(dead_code)]
pub async fn unreachable_url() -> Url {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    Url::parse(&format!("http://{}/hook", addr)).unwrap()
}
