//! FTP Protocol implementation
//!
//! Handles command rendering, reply parsing and reply classification.

pub mod commands;
pub mod host_port;
pub mod reply;
pub mod responses;

pub use commands::{Command, TransferType};
pub use host_port::{encode_host_port, parse_host_port, parse_pasv_reply};
pub use reply::{Reply, ReplyClass, ReplyLine};
