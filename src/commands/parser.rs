use std::net::SocketAddrV4;

use crate::protocol::parse_host_port;

/// Operator command typed at the shell prompt
#[derive(Debug, PartialEq)]
pub enum UserCommand {
    Cd(String),
    List(Option<String>),
    Pwd,
    Mkdir(String),
    /// Local path, optional remote name
    Put(String, Option<String>),
    /// Remote path, optional local name
    Get(String, Option<String>),
    /// KiB/s, zero or negative for unlimited
    SetLimit(f64),
    Size(String),
    Port(Option<PortArg>),
    Pasv,
    Delete(String),
    Rmdir(String),
    Rename(String, String),
    Ascii,
    Binary,
    Quit,
    Help,
    Empty,
    Unknown(String),
    /// Known verb with the wrong arguments: verb and its usage line
    Invalid(String, &'static str),
}

/// Argument of `port`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortArg {
    /// `h1,h2,h3,h4,p1,p2`; only the port part is used
    Tuple(SocketAddrV4),
    Port(u16),
}

impl PortArg {
    pub fn port(&self) -> u16 {
        match self {
            PortArg::Tuple(addr) => addr.port(),
            PortArg::Port(port) => *port,
        }
    }
}

#[derive(Debug, PartialEq)]
pub enum CommandStatus {
    Success,
    Failure(String),
    CloseConnection,
}

#[derive(Debug, PartialEq)]
pub struct CommandResult {
    pub status: CommandStatus,
    pub message: Option<String>,
}

/// Verb, usage and description of every shell command
pub const COMMAND_TABLE: &[(&str, &str, &str)] = &[
    ("cd", "cd [dir]", "change remote directory"),
    ("ls", "ls [path]", "list remote directory"),
    ("list", "list [path]", "list remote directory"),
    ("pwd", "pwd", "print remote directory"),
    ("mkdir", "mkdir <dir>", "create remote directory"),
    ("put", "put <local> [remote]", "upload a file, resuming if partial"),
    ("get", "get <remote> [local]", "download a file, resuming if partial"),
    ("setlimit", "setlimit <KiB/s>", "cap transfer rate, <= 0 for unlimited"),
    ("size", "size <file>", "show remote file size"),
    ("port", "port [h1,h2,h3,h4,p1,p2 | port]", "use active mode"),
    ("pasv", "pasv", "use passive mode"),
    ("delete", "delete <file>", "delete remote file"),
    ("rmdir", "rmdir <dir>", "remove remote directory"),
    ("rename", "rename <from> <to>", "rename remote file"),
    ("ascii", "ascii", "ASCII representation type"),
    ("binary", "binary", "binary representation type"),
    ("quit", "quit", "close the connection and exit"),
    ("help", "help", "show this list"),
];

fn usage(verb: &str) -> &'static str {
    COMMAND_TABLE
        .iter()
        .find(|(name, _, _)| *name == verb)
        .map(|(_, usage, _)| *usage)
        .unwrap_or("")
}

fn parse_port_arg(arg: &str) -> Option<PortArg> {
    if arg.contains(',') {
        parse_host_port(arg).map(PortArg::Tuple)
    } else {
        arg.parse::<u16>().ok().map(PortArg::Port)
    }
}

/// Parses a shell line. Verbs are matched as whole, case-insensitive tokens.
pub fn parse_user_command(raw: &str) -> UserCommand {
    let mut parts = raw.split_whitespace();
    let verb = match parts.next() {
        Some(verb) => verb.to_ascii_lowercase(),
        None => return UserCommand::Empty,
    };
    let args: Vec<String> = parts.map(str::to_string).collect();

    let command = match (verb.as_str(), args.as_slice()) {
        ("cd", []) => Some(UserCommand::Cd(".".into())),
        ("cd", [dir]) => Some(UserCommand::Cd(dir.clone())),
        ("ls" | "list", []) => Some(UserCommand::List(None)),
        ("ls" | "list", [path]) => Some(UserCommand::List(Some(path.clone()))),
        ("pwd", []) => Some(UserCommand::Pwd),
        ("mkdir", [dir]) => Some(UserCommand::Mkdir(dir.clone())),
        ("put", [local]) => Some(UserCommand::Put(local.clone(), None)),
        ("put", [local, remote]) => Some(UserCommand::Put(local.clone(), Some(remote.clone()))),
        ("get", [remote]) => Some(UserCommand::Get(remote.clone(), None)),
        ("get", [remote, local]) => Some(UserCommand::Get(remote.clone(), Some(local.clone()))),
        ("setlimit", [kib]) => kib
            .parse::<f64>()
            .ok()
            .filter(|kib| !kib.is_nan())
            .map(UserCommand::SetLimit),
        ("size", [file]) => Some(UserCommand::Size(file.clone())),
        ("port", []) => Some(UserCommand::Port(None)),
        ("port", [arg]) => parse_port_arg(arg).map(|arg| UserCommand::Port(Some(arg))),
        ("pasv", []) => Some(UserCommand::Pasv),
        ("delete", [file]) => Some(UserCommand::Delete(file.clone())),
        ("rmdir", [dir]) => Some(UserCommand::Rmdir(dir.clone())),
        ("rename", [from, to]) => Some(UserCommand::Rename(from.clone(), to.clone())),
        ("ascii", []) => Some(UserCommand::Ascii),
        ("binary", []) => Some(UserCommand::Binary),
        ("quit", []) => Some(UserCommand::Quit),
        ("help" | "?", _) => Some(UserCommand::Help),
        _ => None,
    };

    match command {
        Some(command) => command,
        None if usage(&verb).is_empty() => UserCommand::Unknown(verb),
        None => {
            let usage = usage(&verb);
            UserCommand::Invalid(verb, usage)
        }
    }
}
