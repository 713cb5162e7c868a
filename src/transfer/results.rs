//! Transfer result types
//!
//! Defines the per-invocation transfer description, the resume decision taken
//! before any data moves, and the result reported once a transfer ends.

use std::fmt;
use std::path::PathBuf;

use crate::transfer::modes::Direction;
use crate::transfer::rate_limit::RateLimit;

/// One `get` or `put` invocation; discarded once it completes or fails
#[derive(Debug, Clone)]
pub struct TransferSession {
    pub direction: Direction,
    pub local_path: PathBuf,
    pub remote_path: String,
    /// Resume point, nonzero only when a partial transfer is being continued
    pub offset: u64,
    pub rate_limit: RateLimit,
}

impl TransferSession {
    pub fn new(
        direction: Direction,
        local_path: impl Into<PathBuf>,
        remote_path: impl Into<String>,
        rate_limit: RateLimit,
    ) -> Self {
        Self {
            direction,
            local_path: local_path.into(),
            remote_path: remote_path.into(),
            offset: 0,
            rate_limit,
        }
    }
}

/// What to do after comparing local and remote sizes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResumePlan {
    /// Transfer everything from offset 0
    Fresh,
    /// Continue from this offset
    Resume(u64),
    /// Both sides already hold this many bytes
    Skip(u64),
}

/// Result of a completed `get` or `put`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferOutcome {
    /// `bytes` were moved, starting at `offset`
    Completed { bytes: u64, offset: u64 },
    /// Local and remote sizes matched; no data connection was opened
    AlreadyExists { size: u64 },
}

impl TransferOutcome {
    pub fn bytes_transferred(&self) -> u64 {
        match self {
            TransferOutcome::Completed { bytes, .. } => *bytes,
            TransferOutcome::AlreadyExists { .. } => 0,
        }
    }
}

impl fmt::Display for TransferOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransferOutcome::Completed { bytes, offset: 0 } => {
                write!(f, "{} bytes transferred", bytes)
            }
            TransferOutcome::Completed { bytes, offset } => {
                write!(f, "{} bytes transferred (resumed at {})", bytes, offset)
            }
            TransferOutcome::AlreadyExists { size } => {
                write!(f, "File already exists ({} bytes), skipped", size)
            }
        }
    }
}
