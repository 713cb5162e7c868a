use log::info;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWrite;

use crate::commands::parser::{COMMAND_TABLE, CommandResult, CommandStatus, PortArg, UserCommand};
use crate::error::{FtpClientError, FtpResult, handle_error, is_session_fatal};
use crate::protocol::TransferType;
use crate::session::Session;
use crate::transfer::RateLimit;

// Execute one shell command against the session; listing output goes to `out`
pub async fn handle_command<W>(session: &mut Session, command: UserCommand, out: &mut W) -> CommandResult
where
    W: AsyncWrite + Unpin,
{
    let result = match command {
        UserCommand::Empty => Ok(None),
        UserCommand::Help => Ok(Some(help_text())),
        UserCommand::Unknown(verb) => {
            return failure(format!("Unknown command '{}', type 'help'", verb));
        }
        UserCommand::Invalid(verb, usage) => {
            return failure(format!("Usage for {}: {}", verb, usage));
        }
        UserCommand::Quit => return handle_quit(session).await,
        UserCommand::Cd(dir) => session.cwd(&dir).await.map(Some),
        UserCommand::Pwd => session.pwd().await.map(|dir| Some(format!("\"{}\"", dir))),
        UserCommand::Mkdir(dir) => session
            .mkdir(&dir)
            .await
            .map(|dir| Some(format!("Created \"{}\"", dir))),
        UserCommand::Rmdir(dir) => session
            .rmdir(&dir)
            .await
            .map(|_| Some(format!("Removed {}", dir))),
        UserCommand::Delete(file) => session
            .delete(&file)
            .await
            .map(|_| Some(format!("Deleted {}", file))),
        UserCommand::Rename(from, to) => session
            .rename(&from, &to)
            .await
            .map(|_| Some(format!("Renamed {} to {}", from, to))),
        UserCommand::Size(file) => session
            .size(&file)
            .await
            .map(|size| Some(format!("{}: {} bytes", file, size))),
        UserCommand::Ascii => set_type(session, TransferType::Ascii).await,
        UserCommand::Binary => set_type(session, TransferType::Binary).await,
        UserCommand::SetLimit(kib) => {
            let limit = RateLimit::from_kib_per_sec(kib);
            session.set_rate_limit(limit);
            Ok(Some(format!("Rate limit: {}", limit)))
        }
        UserCommand::Pasv => session
            .enter_passive()
            .await
            .map(|addr| Some(format!("Passive mode, server data endpoint {}", addr))),
        UserCommand::Port(arg) => session
            .enter_active(arg.as_ref().map(PortArg::port))
            .await
            .map(|addr| Some(format!("Active mode, listening on {}", addr))),
        UserCommand::List(path) => session.list(path.as_deref(), out).await.map(|_| None),
        UserCommand::Put(local, remote) => handle_put(session, &local, remote).await,
        UserCommand::Get(remote, local) => handle_get(session, &remote, local).await,
    };

    match result {
        Ok(message) => CommandResult {
            status: CommandStatus::Success,
            message,
        },
        Err(e) => from_error(e),
    }
}

fn failure(message: String) -> CommandResult {
    CommandResult {
        status: CommandStatus::Failure(message),
        message: None,
    }
}

fn from_error(err: FtpClientError) -> CommandResult {
    handle_error(&err);
    if is_session_fatal(&err) {
        CommandResult {
            status: CommandStatus::CloseConnection,
            message: Some(err.to_string()),
        }
    } else {
        failure(err.to_string())
    }
}

fn help_text() -> String {
    COMMAND_TABLE
        .iter()
        .map(|(_, usage, description)| format!("  {:<36}{}", usage, description))
        .collect::<Vec<_>>()
        .join("\n")
}

async fn set_type(session: &mut Session, transfer_type: TransferType) -> FtpResult<Option<String>> {
    session.set_type(transfer_type).await?;
    Ok(Some(format!("Transfer type set to {}", transfer_type)))
}

async fn handle_quit(session: &mut Session) -> CommandResult {
    match session.quit().await {
        Ok(message) => CommandResult {
            status: CommandStatus::CloseConnection,
            message: Some(message),
        },
        Err(e) => {
            handle_error(&e);
            // The control socket is closed either way
            CommandResult {
                status: CommandStatus::CloseConnection,
                message: Some(e.to_string()),
            }
        }
    }
}

/// Last segment of a remote path, used as the default local name for `get`
fn remote_file_name(remote: &str) -> Option<&str> {
    remote.rsplit('/').next().filter(|name| !name.is_empty())
}

async fn handle_put(
    session: &mut Session,
    local: &str,
    remote: Option<String>,
) -> FtpResult<Option<String>> {
    let local_path = Path::new(local);
    let remote = match remote {
        Some(remote) => remote,
        None => local_path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .ok_or_else(|| {
                FtpClientError::InvalidArgument(format!("{} has no file name", local))
            })?,
    };

    let outcome = session.put(local_path, &remote).await?;
    info!("put {} -> {}: {}", local, remote, outcome);
    Ok(Some(outcome.to_string()))
}

async fn handle_get(
    session: &mut Session,
    remote: &str,
    local: Option<String>,
) -> FtpResult<Option<String>> {
    let local_path = match local {
        Some(local) => PathBuf::from(local),
        None => remote_file_name(remote)
            .map(PathBuf::from)
            .ok_or_else(|| {
                FtpClientError::InvalidArgument(format!("{} has no file name", remote))
            })?,
    };

    let outcome = session.get(remote, &local_path).await?;
    info!("get {} -> {}: {}", remote, local_path.display(), outcome);
    Ok(Some(outcome.to_string()))
}
