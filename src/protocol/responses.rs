//! FTP Response codes
//!
//! Reply codes the client checks for, named after RFC 959 section 4.2.

pub const DATA_CONNECTION_ALREADY_OPEN: u16 = 125;
pub const FILE_STATUS_OKAY: u16 = 150;

pub const COMMAND_OKAY: u16 = 200;
pub const FILE_STATUS: u16 = 213;
pub const SERVICE_READY: u16 = 220;
pub const SERVICE_CLOSING: u16 = 221;
pub const TRANSFER_COMPLETE: u16 = 226;
pub const ENTERING_PASSIVE_MODE: u16 = 227;
pub const LOGGED_IN: u16 = 230;
pub const FILE_ACTION_OKAY: u16 = 250;
pub const PATH_CREATED: u16 = 257;

pub const NEED_PASSWORD: u16 = 331;
pub const FILE_ACTION_PENDING: u16 = 350;

pub const SERVICE_NOT_AVAILABLE: u16 = 421;

/// Preliminary replies that open a data transfer
pub const TRANSFER_STARTING: &[u16] = &[DATA_CONNECTION_ALREADY_OPEN, FILE_STATUS_OKAY];
