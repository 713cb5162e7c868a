//! Interactive front end
//!
//! The login prompt and the command shell that drive a session.

pub mod handler;

pub use handler::{ShellExit, login_interactive, run_shell};
