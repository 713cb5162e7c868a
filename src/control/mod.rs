//! Control connection
//!
//! Command/reply exchange with the server over the persistent control socket.

pub mod channel;

pub use channel::{ControlChannel, ReplyLimits, resolve};
