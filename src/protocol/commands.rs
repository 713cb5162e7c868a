//! Module `commands`
//!
//! Defines the FTP commands the client emits on the control channel, how each
//! one is rendered on the wire and which reply codes count as success for it.

use std::fmt;
use std::net::SocketAddrV4;

use crate::protocol::host_port::encode_host_port;
use crate::protocol::responses::*;

/// Representation type negotiated with `TYPE`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferType {
    Ascii,
    Binary,
}

impl TransferType {
    fn code(self) -> char {
        match self {
            TransferType::Ascii => 'A',
            TransferType::Binary => 'I',
        }
    }
}

impl fmt::Display for TransferType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransferType::Ascii => write!(f, "ascii"),
            TransferType::Binary => write!(f, "binary"),
        }
    }
}

/// A command sent to the server.
///
/// Commands carrying a path store it as `String` variants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    User(String),
    Pass(String),
    Pasv,
    Port(SocketAddrV4),
    Type(TransferType),
    Cwd(String),
    Pwd,
    Mkd(String),
    Rmd(String),
    Dele(String),
    Rnfr(String),
    Rnto(String),
    Stor(String),
    Appe(String),
    Retr(String),
    Rest(u64),
    Size(String),
    List(Option<String>),
    Quit,
}

impl Command {
    pub fn verb(&self) -> &'static str {
        match self {
            Command::User(_) => "USER",
            Command::Pass(_) => "PASS",
            Command::Pasv => "PASV",
            Command::Port(_) => "PORT",
            Command::Type(_) => "TYPE",
            Command::Cwd(_) => "CWD",
            Command::Pwd => "PWD",
            Command::Mkd(_) => "MKD",
            Command::Rmd(_) => "RMD",
            Command::Dele(_) => "DELE",
            Command::Rnfr(_) => "RNFR",
            Command::Rnto(_) => "RNTO",
            Command::Stor(_) => "STOR",
            Command::Appe(_) => "APPE",
            Command::Retr(_) => "RETR",
            Command::Rest(_) => "REST",
            Command::Size(_) => "SIZE",
            Command::List(_) => "LIST",
            Command::Quit => "QUIT",
        }
    }

    /// Reply codes that mean the command was accepted.
    ///
    /// For data transfer commands these are the preliminary replies; the
    /// completion reply is checked against [`Command::completion_codes`].
    pub fn expected_codes(&self) -> &'static [u16] {
        match self {
            Command::User(_) => &[NEED_PASSWORD],
            Command::Pass(_) => &[LOGGED_IN],
            Command::Pasv => &[ENTERING_PASSIVE_MODE],
            Command::Port(_) | Command::Type(_) => &[COMMAND_OKAY],
            Command::Cwd(_)
            | Command::Rmd(_)
            | Command::Dele(_)
            | Command::Rnto(_) => &[FILE_ACTION_OKAY],
            Command::Pwd | Command::Mkd(_) => &[PATH_CREATED],
            Command::Rnfr(_) | Command::Rest(_) => &[FILE_ACTION_PENDING],
            Command::Size(_) => &[FILE_STATUS],
            Command::Stor(_) | Command::Appe(_) | Command::Retr(_) | Command::List(_) => {
                TRANSFER_STARTING
            }
            Command::Quit => &[SERVICE_CLOSING],
        }
    }

    /// Reply codes closing a data transfer.
    pub fn completion_codes(&self) -> &'static [u16] {
        &[TRANSFER_COMPLETE]
    }

    /// Whether the command moves bytes over a data connection
    pub fn uses_data_channel(&self) -> bool {
        matches!(
            self,
            Command::Stor(_) | Command::Appe(_) | Command::Retr(_) | Command::List(_)
        )
    }

    /// The command line as sent, without the trailing CRLF
    pub fn to_line(&self) -> String {
        match self {
            Command::User(arg)
            | Command::Pass(arg)
            | Command::Cwd(arg)
            | Command::Mkd(arg)
            | Command::Rmd(arg)
            | Command::Dele(arg)
            | Command::Rnfr(arg)
            | Command::Rnto(arg)
            | Command::Stor(arg)
            | Command::Appe(arg)
            | Command::Retr(arg)
            | Command::Size(arg) => format!("{} {}", self.verb(), arg),
            Command::Port(addr) => format!("PORT {}", encode_host_port(addr)),
            Command::Type(ty) => format!("TYPE {}", ty.code()),
            Command::Rest(offset) => format!("REST {}", offset),
            Command::List(Some(path)) => format!("LIST {}", path),
            Command::Pasv | Command::Pwd | Command::List(None) | Command::Quit => {
                self.verb().to_string()
            }
        }
    }
}

/// Display form used for logs and error messages; never shows the password.
impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Pass(_) => write!(f, "PASS ****"),
            _ => write!(f, "{}", self.to_line()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    #[test]
    fn test_wire_lines() {
        assert_eq!(Command::Pasv.to_line(), "PASV");
        assert_eq!(Command::Rest(4096).to_line(), "REST 4096");
        assert_eq!(Command::Type(TransferType::Ascii).to_line(), "TYPE A");
        assert_eq!(Command::Type(TransferType::Binary).to_line(), "TYPE I");
        assert_eq!(Command::List(None).to_line(), "LIST");
        assert_eq!(
            Command::List(Some("pub".into())).to_line(),
            "LIST pub"
        );
        assert_eq!(
            Command::Stor("my file.txt".into()).to_line(),
            "STOR my file.txt"
        );
        assert_eq!(
            Command::Port(SocketAddrV4::new(Ipv4Addr::new(192, 168, 1, 2), 5001)).to_line(),
            "PORT 192,168,1,2,19,137"
        );
    }

    #[test]
    fn test_password_masked_in_display() {
        let pass = Command::Pass("hunter2".into());
        assert_eq!(pass.to_line(), "PASS hunter2");
        assert_eq!(pass.to_string(), "PASS ****");
    }

    #[test]
    fn test_data_commands() {
        assert!(Command::Retr("a".into()).uses_data_channel());
        assert!(Command::List(None).uses_data_channel());
        assert!(!Command::Size("a".into()).uses_data_channel());
        assert_eq!(Command::Appe("a".into()).expected_codes(), &[125, 150]);
    }
}
