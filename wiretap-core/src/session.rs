//! Session identity and per-session statistics

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use uuid::Uuid;

/// Opaque identifier of one capture session
///
/// Generated fresh for every started session; never reused within one
/// running instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct SessionId(Uuid);

impl SessionId {
    /// Generate a new collision-resistant random id
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for SessionId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// Snapshot of one session's pipeline statistics
#[derive(Debug, Clone, Default, Serialize)]
pub struct SessionStats {
    /// Frames received from the capture device
    pub frames_captured: u64,
    /// Records successfully formatted
    pub records_formatted: u64,
    /// Records dropped by per-record format failures
    pub records_dropped: u64,
    /// Frames handed to the sink
    pub frames_delivered: u64,
    /// Bytes handed to the sink
    pub bytes_delivered: u64,
    /// Seconds the session has been running
    pub uptime_secs: u64,
}

/// Thread-safe statistics counters shared across pipeline stages
#[derive(Debug, Default)]
pub struct SessionStatsCounters {
    pub frames_captured: AtomicU64,
    pub records_formatted: AtomicU64,
    pub records_dropped: AtomicU64,
    pub frames_delivered: AtomicU64,
    pub bytes_delivered: AtomicU64,
}

impl SessionStatsCounters {
    pub fn record_frame_captured(&self) {
        self.frames_captured.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_formatted(&self) {
        self.records_formatted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_dropped(&self) {
        self.records_dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_delivered(&self, bytes: u64) {
        self.frames_delivered.fetch_add(1, Ordering::Relaxed);
        self.bytes_delivered.fetch_add(bytes, Ordering::Relaxed);
    }

    /// Take a consistent-enough snapshot for display
    pub fn to_stats(&self, started_at: DateTime<Utc>) -> SessionStats {
        let uptime = (Utc::now() - started_at).num_seconds().max(0) as u64;
        SessionStats {
            frames_captured: self.frames_captured.load(Ordering::Relaxed),
            records_formatted: self.records_formatted.load(Ordering::Relaxed),
            records_dropped: self.records_dropped.load(Ordering::Relaxed),
            frames_delivered: self.frames_delivered.load(Ordering::Relaxed),
            bytes_delivered: self.bytes_delivered.load(Ordering::Relaxed),
            uptime_secs: uptime,
        }
    }
}
