//! FTP data connection modes
//!
//! Who opens the data connection: the server (active, PORT) or the client
//! (passive, PASV).

use serde::Deserialize;
use std::fmt;

/// Data connection mode of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataMode {
    /// Neither PORT nor PASV has been negotiated yet
    Uninitialized,
    /// Client listens, server connects
    Active,
    /// Server listens, client connects
    Passive,
}

impl fmt::Display for DataMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataMode::Uninitialized => write!(f, "uninitialized"),
            DataMode::Active => write!(f, "active"),
            DataMode::Passive => write!(f, "passive"),
        }
    }
}

/// Direction of a file transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Upload,
    Download,
}
