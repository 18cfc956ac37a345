//! Session store shared by producers and the delivery worker
//!
//! All map access goes through one `RwLock`. Mutations take the write lock
//! for a short, bounded section (insert, append, flag flip); the worker
//! copies the buffer out under that same lock before sending, so a producer
//! appending late data never races with an in-flight delivery.

use std::collections::HashMap;

use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::{debug, warn};

use super::record::{DeliveryState, SessionRecord, SessionSnapshot};
use crate::config::RetentionConfig;
use crate::dispatch::DispatchSender;
use crate::error::IngestAnomaly;

/// Outcome of asking the store for a delivery snapshot
#[derive(Debug, PartialEq, Eq)]
pub enum Claim {
    /// The record was marked in flight; send this payload as `attempt`
    Deliver { attempt: u32, payload: Vec<u8> },
    /// No record for this id
    Missing,
    /// The session has not received its completion flag
    NotFinished,
    /// Already in flight, delivered, failed, or waiting for a retry
    NotDue,
}

/// Counts of records removed by one eviction pass
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct EvictionReport {
    pub delivered: usize,
    pub failed: usize,
    pub abandoned: usize,
}

impl EvictionReport {
    pub fn total(&self) -> usize {
        self.delivered + self.failed + self.abandoned
    }
}

/// Concurrent map from session id to [`SessionRecord`]
pub struct SessionStore {
    sessions: RwLock<HashMap<String, SessionRecord>>,
    dispatch: DispatchSender,
}

impl SessionStore {
    /// Create an empty store that signals `dispatch` on every ingest
    pub fn new(dispatch: DispatchSender) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            dispatch,
        }
    }

    /// Create or extend the record for `session_id`
    ///
    /// The bytes and the completion flag are written in one critical
    /// section, which ends before the dispatch notification is sent, so the
    /// worker woken by this call sees both. Exactly one notification is
    /// queued per call.
    pub async fn ingest(&self, session_id: &str, data: &[u8], is_final: bool) {
        if let Some(anomaly) = self.record_fragment(session_id, data, is_final).await {
            warn!(session_id, "{}", anomaly);
        }

        self.dispatch.notify(session_id).await;
    }

    /// The locked half of [`ingest`](Self::ingest): create or append only
    async fn record_fragment(
        &self,
        session_id: &str,
        data: &[u8],
        is_final: bool,
    ) -> Option<IngestAnomaly> {
        let mut sessions = self.sessions.write().await;
        match sessions.get_mut(session_id) {
            Some(record) => record.append(data, is_final),
            None => {
                debug!(session_id, bytes = data.len(), "New capture session");
                sessions.insert(
                    session_id.to_string(),
                    SessionRecord::new(session_id, data.to_vec(), is_final),
                );
                None
            }
        }
    }

    /// Mark the record in flight and copy out its payload, if it is due
    pub async fn claim_delivery(&self, session_id: &str, now: Instant) -> Claim {
        let mut sessions = self.sessions.write().await;
        let Some(record) = sessions.get_mut(session_id) else {
            return Claim::Missing;
        };
        if !record.is_finished() {
            return Claim::NotFinished;
        }
        match record.due_attempt(now) {
            Some(attempt) => {
                record.set_delivery(DeliveryState::InFlight { attempt });
                Claim::Deliver {
                    attempt,
                    payload: record.buffer().to_vec(),
                }
            }
            None => Claim::NotDue,
        }
    }

    /// Record a successful delivery of the first `delivered_len` bytes
    ///
    /// The delivered bytes are released right away; the record itself
    /// stays until the retention sweep so late fragments still find it.
    pub async fn complete_delivery(&self, session_id: &str, delivered_len: usize, attempts: u32) {
        let mut sessions = self.sessions.write().await;
        if let Some(record) = sessions.get_mut(session_id) {
            record.release_delivered(delivered_len);
            record.set_delivery(DeliveryState::Delivered { attempts });
        }
    }

    /// Record a failed attempt, scheduling the next one if `retry_at` is set
    pub async fn fail_delivery(&self, session_id: &str, attempt: u32, retry_at: Option<Instant>) {
        let mut sessions = self.sessions.write().await;
        if let Some(record) = sessions.get_mut(session_id) {
            let state = match retry_at {
                Some(not_before) => DeliveryState::RetryScheduled {
                    attempt: attempt + 1,
                    not_before,
                },
                None => DeliveryState::Failed { attempts: attempt },
            };
            record.set_delivery(state);
        }
    }

    /// Remove records that have been quiet for longer than their TTL
    ///
    /// In-flight and retry-scheduled records are never evicted. Unfinished
    /// records past `idle_ttl` are dropped without delivery.
    pub async fn evict_expired(&self, now: Instant, retention: &RetentionConfig) -> EvictionReport {
        let mut report = EvictionReport::default();
        let mut sessions = self.sessions.write().await;

        sessions.retain(|id, record| {
            let idle = now.saturating_duration_since(record.touched_at());
            let expired = match record.delivery() {
                DeliveryState::Delivered { .. } => {
                    let hit = idle >= retention.delivered_ttl;
                    if hit {
                        report.delivered += 1;
                        if !record.buffer().is_empty() {
                            warn!(
                                session_id = %id,
                                bytes = record.buffer().len(),
                                "Evicting delivered session with undelivered late data"
                            );
                        }
                    }
                    hit
                }
                DeliveryState::Failed { .. } => {
                    let hit = idle >= retention.failed_ttl;
                    if hit {
                        report.failed += 1;
                    }
                    hit
                }
                DeliveryState::Pending if !record.is_finished() => {
                    let hit = idle >= retention.idle_ttl;
                    if hit {
                        warn!(
                            session_id = %id,
                            bytes = record.buffer().len(),
                            "Evicting session that never completed"
                        );
                        report.abandoned += 1;
                    }
                    hit
                }
                _ => false,
            };
            !expired
        });

        report
    }

    /// Metadata for one session
    pub async fn get(&self, session_id: &str) -> Option<SessionSnapshot> {
        self.sessions
            .read()
            .await
            .get(session_id)
            .map(SessionRecord::snapshot)
    }

    /// Copy of the bytes currently buffered for a session
    pub async fn buffer(&self, session_id: &str) -> Option<Vec<u8>> {
        self.sessions
            .read()
            .await
            .get(session_id)
            .map(|record| record.buffer().to_vec())
    }

    /// All session ids currently held
    pub async fn ids(&self) -> Vec<String> {
        self.sessions.read().await.keys().cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}
