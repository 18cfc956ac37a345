//! Per-session buffer and delivery state

use chrono::{DateTime, Utc};
use tokio::time::Instant;

use crate::error::IngestAnomaly;

/// Where a session stands with respect to webhook delivery
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryState {
    /// No attempt made yet (the session may not be finished)
    Pending,
    /// The worker holds a snapshot and is sending it
    InFlight { attempt: u32 },
    /// A previous attempt failed; the next one is due at `not_before`
    RetryScheduled { attempt: u32, not_before: Instant },
    /// The endpoint accepted the payload
    Delivered { attempts: u32 },
    /// Every allowed attempt failed
    Failed { attempts: u32 },
}

impl DeliveryState {
    /// Whether the worker will never attempt this record again
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Delivered { .. } | Self::Failed { .. })
    }
}

/// Accumulated bytes for one capture session
#[derive(Debug)]
pub struct SessionRecord {
    id: String,
    buffer: Vec<u8>,
    created_at: DateTime<Utc>,
    touched_at: Instant,
    finished: bool,
    late_writes: u64,
    delivery: DeliveryState,
}

impl SessionRecord {
    /// Create a record from the first fragment of a session
    pub fn new(id: impl Into<String>, data: Vec<u8>, finished: bool) -> Self {
        Self {
            id: id.into(),
            buffer: data,
            created_at: Utc::now(),
            touched_at: Instant::now(),
            finished,
            late_writes: 0,
            delivery: DeliveryState::Pending,
        }
    }

    /// Append a fragment, marking the session finished if `is_final`
    ///
    /// Bytes are appended even when the session already finished; that case
    /// is reported back as an anomaly for the caller to log.
    pub fn append(&mut self, data: &[u8], is_final: bool) -> Option<IngestAnomaly> {
        let anomaly = if self.finished {
            self.late_writes += 1;
            Some(IngestAnomaly::LateDataAfterCompletion {
                session_id: self.id.clone(),
                bytes: data.len(),
            })
        } else {
            None
        };

        self.buffer.extend_from_slice(data);
        if is_final {
            self.finished = true;
        }
        // Once delivery is settled, retention counts from the outcome
        if !self.delivery.is_terminal() {
            self.touched_at = Instant::now();
        }
        anomaly
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn buffer(&self) -> &[u8] {
        &self.buffer
    }

    pub fn touched_at(&self) -> Instant {
        self.touched_at
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn late_writes(&self) -> u64 {
        self.late_writes
    }

    pub fn delivery(&self) -> DeliveryState {
        self.delivery
    }

    /// The attempt number the worker should use next, if one is due at `now`
    pub(crate) fn due_attempt(&self, now: Instant) -> Option<u32> {
        if !self.finished {
            return None;
        }
        match self.delivery {
            DeliveryState::Pending => Some(1),
            DeliveryState::RetryScheduled {
                attempt,
                not_before,
            } if now >= not_before => Some(attempt),
            _ => None,
        }
    }

    pub(crate) fn set_delivery(&mut self, state: DeliveryState) {
        self.delivery = state;
        self.touched_at = Instant::now();
    }

    /// Drop the first `len` bytes, which the endpoint already accepted
    ///
    /// Anything appended after the delivery snapshot was taken survives.
    pub(crate) fn release_delivered(&mut self, len: usize) {
        let len = len.min(self.buffer.len());
        self.buffer.drain(..len);
        self.buffer.shrink_to_fit();
    }

    /// Read-only view for callers outside the store lock
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            id: self.id.clone(),
            buffered_bytes: self.buffer.len(),
            created_at: self.created_at,
            finished: self.finished,
            late_writes: self.late_writes,
            delivery: self.delivery,
        }
    }
}

/// Point-in-time copy of a record's metadata
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub id: String,
    pub buffered_bytes: usize,
    pub created_at: DateTime<Utc>,
    pub finished: bool,
    pub late_writes: u64,
    pub delivery: DeliveryState,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn new_record_is_seeded_with_first_fragment() {
        let record = SessionRecord::new("s1", b"AB".to_vec(), false);
        assert_eq!(record.id(), "s1");
        assert_eq!(record.buffer(), b"AB");
        assert!(!record.is_finished());
        assert_eq!(record.delivery(), DeliveryState::Pending);
    }

    #[test]
    fn append_preserves_arrival_order() {
        let mut record = SessionRecord::new("s1", b"AB".to_vec(), false);
        assert!(record.append(b"CD", false).is_none());
        assert!(record.append(b"EF", true).is_none());
        assert_eq!(record.buffer(), b"ABCDEF");
        assert!(record.is_finished());
    }

    #[test]
    fn finished_is_monotonic() {
        let mut record = SessionRecord::new("s1", Vec::new(), true);
        record.append(b"x", false);
        assert!(record.is_finished());
    }

    #[test]
    fn late_data_is_appended_and_reported() {
        let mut record = SessionRecord::new("s1", b"AB".to_vec(), true);
        let anomaly = record.append(b"CD", false);
        assert_eq!(
            anomaly,
            Some(IngestAnomaly::LateDataAfterCompletion {
                session_id: "s1".to_string(),
                bytes: 2,
            })
        );
        assert_eq!(record.buffer(), b"ABCD");
        assert_eq!(record.late_writes(), 1);
    }

    #[test]
    fn repeated_final_flag_only_counts_late_writes() {
        let mut record = SessionRecord::new("s1", b"A".to_vec(), true);
        assert!(record.append(b"B", true).is_some());
        assert!(record.is_finished());
        assert_eq!(record.late_writes(), 1);
    }

    #[test]
    fn unfinished_record_is_never_due() {
        let record = SessionRecord::new("s1", b"AB".to_vec(), false);
        assert_eq!(record.due_attempt(Instant::now()), None);
    }

    #[test]
    fn finished_pending_record_is_due_for_first_attempt() {
        let record = SessionRecord::new("s1", b"AB".to_vec(), true);
        assert_eq!(record.due_attempt(Instant::now()), Some(1));
    }

    #[test]
    fn in_flight_and_terminal_records_are_not_due() {
        let mut record = SessionRecord::new("s1", b"AB".to_vec(), true);
        let now = Instant::now();

        record.set_delivery(DeliveryState::InFlight { attempt: 1 });
        assert_eq!(record.due_attempt(now), None);

        record.set_delivery(DeliveryState::Failed { attempts: 1 });
        assert_eq!(record.due_attempt(now), None);

        record.set_delivery(DeliveryState::Delivered { attempts: 1 });
        assert_eq!(record.due_attempt(now), None);
    }

    #[test]
    fn retry_is_due_only_after_not_before() {
        let mut record = SessionRecord::new("s1", b"AB".to_vec(), true);
        let now = Instant::now();
        record.set_delivery(DeliveryState::RetryScheduled {
            attempt: 2,
            not_before: now + Duration::from_secs(5),
        });

        assert_eq!(record.due_attempt(now), None);
        assert_eq!(record.due_attempt(now + Duration::from_secs(5)), Some(2));
    }

    #[test]
    fn release_keeps_bytes_appended_after_snapshot() {
        let mut record = SessionRecord::new("s1", b"ABCD".to_vec(), true);
        let delivered = record.buffer().len();
        record.append(b"EF", false);

        record.release_delivered(delivered);
        assert_eq!(record.buffer(), b"EF");
    }

    #[test]
    fn late_writes_after_outcome_do_not_extend_retention() {
        let mut record = SessionRecord::new("s1", b"AB".to_vec(), true);
        record.set_delivery(DeliveryState::Delivered { attempts: 1 });
        let settled_at = record.touched_at();

        std::thread::sleep(Duration::from_millis(5));
        record.append(b"CD", false);
        assert_eq!(record.touched_at(), settled_at);

        let mut open = SessionRecord::new("s2", b"AB".to_vec(), false);
        let created = open.touched_at();
        std::thread::sleep(Duration::from_millis(5));
        open.append(b"CD", false);
        assert!(open.touched_at() > created);
    }

    #[test]
    fn snapshot_reports_metadata() {
        let mut record = SessionRecord::new("s1", b"AB".to_vec(), true);
        record.append(b"C", false);
        let snap = record.snapshot();
        assert_eq!(snap.id, "s1");
        assert_eq!(snap.buffered_bytes, 3);
        assert!(snap.finished);
        assert_eq!(snap.late_writes, 1);
    }

    #[test]
    fn terminal_states() {
        assert!(DeliveryState::Delivered { attempts: 1 }.is_terminal());
        assert!(DeliveryState::Failed { attempts: 3 }.is_terminal());
        assert!(!DeliveryState::Pending.is_terminal());
        assert!(!DeliveryState::InFlight { attempt: 1 }.is_terminal());
    }
}
