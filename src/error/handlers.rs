//! Error handlers
//!
//! Decides what an error means for the running session.

use crate::error::types::FtpClientError;
use log::{error, warn};

/// Log an error that aborted a command
pub fn handle_error(err: &FtpClientError) {
    if is_session_fatal(err) {
        error!("FTP session error: {}", err);
    } else {
        warn!("FTP command aborted: {}", err);
    }
}

/// Whether the command loop must end after this error.
///
/// A 421 reply always ends the session. A network failure ends it only when
/// it happened on the control connection; data connection failures leave the
/// control channel usable for the next command.
pub fn is_session_fatal(err: &FtpClientError) -> bool {
    match err {
        FtpClientError::SessionTerminated(_) => true,
        FtpClientError::Network { control, .. } => *control,
        _ => false,
    }
}
