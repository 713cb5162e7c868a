//! Shell command dispatch
//!
//! Parses operator input into [`UserCommand`]s and runs them against a
//! [`crate::session::Session`].

mod handlers;
mod parser;

pub use handlers::handle_command;
pub use parser::{
    COMMAND_TABLE, CommandResult, CommandStatus, PortArg, UserCommand, parse_user_command,
};
