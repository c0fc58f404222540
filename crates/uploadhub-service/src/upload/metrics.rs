//! Upload counters.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Process-wide upload counters.
#[derive(Debug, Default)]
pub struct UploadMetrics {
    /// Sessions opened
    pub sessions_created: AtomicU64,
    /// Status reads of an active session that already holds chunks
    pub sessions_resumed: AtomicU64,
    /// Chunks accepted
    pub chunks_uploaded: AtomicU64,
    /// Chunks refused (inactive session, bad index, size mismatch)
    pub chunks_rejected: AtomicU64,
    /// Sessions completed
    pub sessions_completed: AtomicU64,
    /// Sessions cancelled by their owner
    pub sessions_cancelled: AtomicU64,
    /// Sessions expired by a client touch or the sweep
    pub sessions_expired: AtomicU64,
}

impl UploadMetrics {
    /// Create new zeroed metrics
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn inc(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn add(counter: &AtomicU64, n: u64) {
        counter.fetch_add(n, Ordering::Relaxed);
    }

    /// Get a snapshot of all metrics
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            sessions_created: self.sessions_created.load(Ordering::Relaxed),
            sessions_resumed: self.sessions_resumed.load(Ordering::Relaxed),
            chunks_uploaded: self.chunks_uploaded.load(Ordering::Relaxed),
            chunks_rejected: self.chunks_rejected.load(Ordering::Relaxed),
            sessions_completed: self.sessions_completed.load(Ordering::Relaxed),
            sessions_cancelled: self.sessions_cancelled.load(Ordering::Relaxed),
            sessions_expired: self.sessions_expired.load(Ordering::Relaxed),
        }
    }
}

/// Serializable metrics snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    /// Sessions opened
    pub sessions_created: u64,
    /// Resumed status reads
    pub sessions_resumed: u64,
    /// Chunks accepted
    pub chunks_uploaded: u64,
    /// Chunks refused
    pub chunks_rejected: u64,
    /// Sessions completed
    pub sessions_completed: u64,
    /// Sessions cancelled
    pub sessions_cancelled: u64,
    /// Sessions expired
    pub sessions_expired: u64,
}
