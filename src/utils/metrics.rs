//! Session Metrics
//!
//! Per-session counters shared by the transport and the session loop.
//! Uses atomic counters so the receive loop and concurrent senders can update
//! them without locking.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tracing::info;

#[derive(Debug)]
pub struct SessionMetrics {
    /// Frames written to the transport
    pub frames_sent: AtomicU64,
    /// Frames read from the transport
    pub frames_received: AtomicU64,
    /// Frame body bytes written, before compression and encryption
    pub bytes_sent: AtomicU64,
    /// Frame body bytes read, after decryption and inflation
    pub bytes_received: AtomicU64,
    /// Game packets dropped because their id is unknown
    pub unknown_packets_skipped: AtomicU64,
    /// Server keep-alives echoed automatically
    pub keep_alives_answered: AtomicU64,
    start_time: Instant,
}

impl Default for SessionMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionMetrics {
    pub fn new() -> Self {
        Self {
            frames_sent: AtomicU64::new(0),
            frames_received: AtomicU64::new(0),
            bytes_sent: AtomicU64::new(0),
            bytes_received: AtomicU64::new(0),
            unknown_packets_skipped: AtomicU64::new(0),
            keep_alives_answered: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    pub fn frame_sent(&self, body_len: usize) {
        self.frames_sent.fetch_add(1, Ordering::Relaxed);
        self.bytes_sent
            .fetch_add(body_len as u64, Ordering::Relaxed);
    }

    pub fn frame_received(&self, body_len: usize) {
        self.frames_received.fetch_add(1, Ordering::Relaxed);
        self.bytes_received
            .fetch_add(body_len as u64, Ordering::Relaxed);
    }

    pub fn unknown_packet_skipped(&self) {
        self.unknown_packets_skipped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn keep_alive_answered(&self) {
        self.keep_alives_answered.fetch_add(1, Ordering::Relaxed);
    }

    pub fn uptime(&self) -> Duration {
        self.start_time.elapsed()
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            frames_sent: self.frames_sent.load(Ordering::Relaxed),
            frames_received: self.frames_received.load(Ordering::Relaxed),
            bytes_sent: self.bytes_sent.load(Ordering::Relaxed),
            bytes_received: self.bytes_received.load(Ordering::Relaxed),
            unknown_packets_skipped: self.unknown_packets_skipped.load(Ordering::Relaxed),
            keep_alives_answered: self.keep_alives_answered.load(Ordering::Relaxed),
            uptime: self.uptime(),
        }
    }

    pub fn log_summary(&self) {
        let s = self.snapshot();
        info!(
            frames_sent = s.frames_sent,
            frames_received = s.frames_received,
            bytes_sent = s.bytes_sent,
            bytes_received = s.bytes_received,
            unknown_packets_skipped = s.unknown_packets_skipped,
            keep_alives_answered = s.keep_alives_answered,
            uptime_ms = s.uptime.as_millis() as u64,
            "Session metrics"
        );
    }
}

/// Point-in-time copy of [`SessionMetrics`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub frames_sent: u64,
    pub frames_received: u64,
    pub bytes_sent: u64,
    pub bytes_received: u64,
    pub unknown_packets_skipped: u64,
    pub keep_alives_answered: u64,
    pub uptime: Duration,
}
