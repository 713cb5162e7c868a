//! Transfer module for the FTP client
//!
//! Handles data channel negotiation, the rate-limited byte pump and the
//! resumable upload/download operations built on top of them.

pub mod data_channel;
pub mod engine;
pub mod file_ops;
pub mod modes;
pub mod rate_limit;
pub mod results;

// Re-export key types and functions
pub use data_channel::DataChannelManager;
pub use engine::transmit;
pub use file_ops::{
    download, list, open_transfer, plan_download, plan_upload, probe_remote_size, remote_size,
    upload,
};
pub use modes::{DataMode, Direction};
pub use rate_limit::{RateLimit, RateLimiter};
pub use results::{ResumePlan, TransferOutcome, TransferSession};
