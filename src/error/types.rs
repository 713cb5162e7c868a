//! Error types
//!
//! Defines domain-specific error types for each layer of the FTP client.

use std::fmt;
use std::io;
use std::net::SocketAddr;

use crate::protocol::Reply;

/// Control-channel reply framing errors
#[derive(Debug)]
pub enum ReplyError {
    /// Line does not start with three digits followed by a space or hyphen
    Malformed(String),
    LineTooLong(usize),
    TooManyLines(usize),
    NotUtf8,
}

impl fmt::Display for ReplyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReplyError::Malformed(line) => write!(f, "Malformed reply: {:?}", line),
            ReplyError::LineTooLong(max) => {
                write!(f, "Reply line exceeds {} bytes", max)
            }
            ReplyError::TooManyLines(max) => {
                write!(f, "Multi-line reply exceeds {} lines", max)
            }
            ReplyError::NotUtf8 => write!(f, "Reply line is not valid UTF-8"),
        }
    }
}

impl std::error::Error for ReplyError {}

/// Data channel and transfer errors
#[derive(Debug)]
pub enum TransferError {
    DataChannelNotInitialized,
    InvalidPassiveReply(String),
    UnsupportedAddress(String),
    BindFailed(SocketAddr, io::Error),
    ConnectFailed(SocketAddr, io::Error),
    AcceptFailed(io::Error),
    WriteFailed {
        bytes_transferred: u64,
        source: io::Error,
    },
    RemoteAhead { local: u64, remote: u64 },
    LocalAhead { local: u64, remote: u64 },
}

impl fmt::Display for TransferError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransferError::DataChannelNotInitialized => write!(f, "Data channel not initialized"),
            TransferError::InvalidPassiveReply(text) => {
                write!(f, "Cannot parse passive address from reply: {}", text)
            }
            TransferError::UnsupportedAddress(addr) => {
                write!(f, "Address {} cannot be encoded as a PORT argument", addr)
            }
            TransferError::BindFailed(addr, e) => write!(f, "Failed to bind to {}: {}", addr, e),
            TransferError::ConnectFailed(addr, e) => {
                write!(f, "Failed to connect to data endpoint {}: {}", addr, e)
            }
            TransferError::AcceptFailed(e) => {
                write!(f, "Failed to accept data connection: {}", e)
            }
            TransferError::WriteFailed {
                bytes_transferred,
                source,
            } => write!(
                f,
                "Write failed after {} bytes: {}",
                bytes_transferred, source
            ),
            TransferError::RemoteAhead { local, remote } => write!(
                f,
                "Remote file ({} bytes) is larger than local file ({} bytes)",
                remote, local
            ),
            TransferError::LocalAhead { local, remote } => write!(
                f,
                "Local file ({} bytes) is larger than remote file ({} bytes)",
                local, remote
            ),
        }
    }
}

impl std::error::Error for TransferError {}

/// General FTP client error that encompasses all error types
#[derive(Debug)]
pub enum FtpClientError {
    /// Socket failure; `control` is set when the control connection itself failed
    Network { control: bool, source: io::Error },
    /// Reply code did not match what the command expects
    Protocol { command: String, reply: Reply },
    Auth(Reply),
    LocalIo { path: String, source: io::Error },
    /// The server sent 421 and is closing the control connection
    SessionTerminated(String),
    Reply(ReplyError),
    Transfer(TransferError),
    InvalidArgument(String),
}

impl FtpClientError {
    pub fn control(source: io::Error) -> Self {
        FtpClientError::Network {
            control: true,
            source,
        }
    }

    pub fn data(source: io::Error) -> Self {
        FtpClientError::Network {
            control: false,
            source,
        }
    }

    pub fn local_io(path: impl Into<String>, source: io::Error) -> Self {
        FtpClientError::LocalIo {
            path: path.into(),
            source,
        }
    }
}

impl fmt::Display for FtpClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FtpClientError::Network { control, source } => {
                let side = if *control { "control" } else { "data" };
                write!(f, "Network error on {} connection: {}", side, source)
            }
            FtpClientError::Protocol { command, reply } => {
                write!(f, "{} failed. {}", command, reply)
            }
            FtpClientError::Auth(reply) => write!(f, "Login failed. {}", reply),
            FtpClientError::LocalIo { path, source } => write!(f, "{}: {}", path, source),
            FtpClientError::SessionTerminated(text) => {
                write!(f, "Connection closed by server: {}", text)
            }
            FtpClientError::Reply(e) => write!(f, "Reply error: {}", e),
            FtpClientError::Transfer(e) => write!(f, "Transfer error: {}", e),
            FtpClientError::InvalidArgument(msg) => write!(f, "Invalid argument: {}", msg),
        }
    }
}

impl std::error::Error for FtpClientError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FtpClientError::Network { source, .. } => Some(source),
            FtpClientError::LocalIo { source, .. } => Some(source),
            FtpClientError::Reply(e) => Some(e),
            FtpClientError::Transfer(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ReplyError> for FtpClientError {
    fn from(error: ReplyError) -> Self {
        FtpClientError::Reply(error)
    }
}

impl From<TransferError> for FtpClientError {
    fn from(error: TransferError) -> Self {
        FtpClientError::Transfer(error)
    }
}

pub type FtpResult<T> = Result<T, FtpClientError>;
