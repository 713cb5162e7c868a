//! RAX FTP Client
//!
//! Interactive FTP client with active/passive data connections and
//! resumable, rate-limited transfers.

pub mod client;
pub mod commands;
pub mod config;
pub mod control;
pub mod error;
pub mod protocol;
pub mod session;
pub mod transfer;

pub use config::ClientConfig;
pub use error::{FtpClientError, FtpResult};
pub use session::Session;
