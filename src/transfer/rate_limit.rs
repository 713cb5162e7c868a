//! Transfer rate limiting
//!
//! Fixed-window token bucket: once per one-second window the pump is granted
//! `elapsed_whole_seconds * bytes_per_sec` bytes.

use std::fmt;
use std::time::Duration;
use tokio::time::{Instant, sleep_until};

const WINDOW: Duration = Duration::from_secs(1);

/// Throughput cap for data transfers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimit {
    Unlimited,
    BytesPerSec(u64),
}

impl RateLimit {
    /// Zero or negative means unlimited.
    pub fn from_bytes_per_sec(bytes: i64) -> Self {
        if bytes <= 0 {
            RateLimit::Unlimited
        } else {
            RateLimit::BytesPerSec(bytes as u64)
        }
    }

    /// Converts an operator supplied KiB/s value (`setlimit`).
    pub fn from_kib_per_sec(kib: f64) -> Self {
        if kib.is_nan() || kib <= 0.0 {
            return RateLimit::Unlimited;
        }
        let bytes = (kib * 1024.0).round();
        if bytes >= u64::MAX as f64 {
            RateLimit::Unlimited
        } else {
            RateLimit::BytesPerSec((bytes as u64).max(1))
        }
    }
}

impl fmt::Display for RateLimit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RateLimit::Unlimited => write!(f, "unlimited"),
            RateLimit::BytesPerSec(rate) => write!(f, "{} bytes/s", rate),
        }
    }
}

/// Quota for a window that lasted `elapsed_secs` whole seconds
pub fn window_quota(bytes_per_sec: u64, elapsed_secs: u64) -> u64 {
    bytes_per_sec.saturating_mul(elapsed_secs)
}

/// Hands out byte quotas to the transfer loop.
pub struct RateLimiter {
    limit: RateLimit,
    chunk_size: u64,
    window_start: Instant,
}

impl RateLimiter {
    pub fn new(limit: RateLimit, chunk_size: usize) -> Self {
        Self {
            limit,
            chunk_size: chunk_size.max(1) as u64,
            window_start: Instant::now(),
        }
    }

    pub fn limit(&self) -> RateLimit {
        self.limit
    }

    /// Waits for the current window to close and returns how many bytes may
    /// be moved before asking again. Unlimited transfers get one chunk per
    /// call and never wait.
    pub async fn next_quota(&mut self) -> u64 {
        let rate = match self.limit {
            RateLimit::Unlimited => return self.chunk_size,
            RateLimit::BytesPerSec(rate) => rate,
        };

        sleep_until(self.window_start + WINDOW).await;
        let elapsed = Instant::now()
            .duration_since(self.window_start)
            .as_secs()
            .max(1);
        self.window_start += Duration::from_secs(elapsed);
        window_quota(rate, elapsed)
    }
}
