use log::{error, info, warn};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

use crate::commands::{CommandStatus, UserCommand, handle_command, parse_user_command};
use crate::error::{FtpClientError, FtpResult};
use crate::session::Session;

const PROMPT: &str = "=> ";
const MAX_COMMAND_LENGTH: usize = 4096;

/// How the command shell ended
#[derive(Debug, PartialEq)]
pub enum ShellExit {
    /// `quit` was issued
    Quit,
    /// The server ended the session (421 or a lost control connection)
    Closed(String),
    /// Operator input reached end of file
    EndOfInput,
}

async fn write_out<W: AsyncWrite + Unpin>(output: &mut W, text: &str) {
    if let Err(e) = output.write_all(text.as_bytes()).await {
        warn!("Failed to write to terminal: {}", e);
    }
    if let Err(e) = output.flush().await {
        warn!("Failed to flush terminal output: {}", e);
    }
}

async fn read_input<R: AsyncBufRead + Unpin>(input: &mut R, line: &mut String) -> Option<usize> {
    line.clear();
    match input.read_line(line).await {
        Ok(0) => None,
        Ok(n) => Some(n),
        Err(e) => {
            error!("Failed to read operator input: {}", e);
            None
        }
    }
}

/// Prompts for credentials until the server accepts them.
///
/// A rejected USER/PASS prompts again; any other failure, or end of input,
/// is returned.
pub async fn login_interactive<R, W>(
    session: &mut Session,
    user: Option<String>,
    input: &mut R,
    output: &mut W,
) -> FtpResult<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut preset_user = user;
    let mut line = String::new();
    let input_closed =
        || FtpClientError::InvalidArgument("input closed before login completed".into());

    loop {
        let user = match preset_user.take() {
            Some(user) => user,
            None => {
                write_out(output, "Name: ").await;
                read_input(input, &mut line).await.ok_or_else(input_closed)?;
                line.trim().to_string()
            }
        };

        write_out(output, "Password: ").await;
        read_input(input, &mut line).await.ok_or_else(input_closed)?;
        let pass = line.trim_end_matches(['\r', '\n']).to_string();

        match session.login(&user, &pass).await {
            Ok(()) => {
                write_out(output, "Login successful.\n").await;
                return Ok(());
            }
            Err(FtpClientError::Auth(reply)) => {
                warn!("Login as {} rejected: {}", user, reply);
                write_out(output, &format!("Login failed. {}\n", reply)).await;
            }
            Err(e) => return Err(e),
        }
    }
}

/// Reads commands from `input` and runs them until `quit`, the end of input
/// or the server ending the session.
pub async fn run_shell<R, W>(session: &mut Session, input: &mut R, output: &mut W) -> ShellExit
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut line = String::new();

    loop {
        write_out(output, PROMPT).await;
        if read_input(input, &mut line).await.is_none() {
            info!("End of operator input");
            return ShellExit::EndOfInput;
        }

        if line.len() > MAX_COMMAND_LENGTH {
            write_out(output, "Command too long\n").await;
            continue;
        }

        let command = parse_user_command(&line);
        if command == UserCommand::Empty {
            continue;
        }
        let is_quit = command == UserCommand::Quit;

        let result = handle_command(session, command, output).await;
        match result.status {
            CommandStatus::Success => {
                if let Some(msg) = result.message {
                    write_out(output, &format!("{}\n", msg)).await;
                }
            }
            CommandStatus::Failure(msg) => {
                write_out(output, &format!("{}\n", msg)).await;
            }
            CommandStatus::CloseConnection => {
                let msg = result.message.unwrap_or_default();
                if !msg.is_empty() {
                    write_out(output, &format!("{}\n", msg)).await;
                }
                if is_quit {
                    return ShellExit::Quit;
                }
                return ShellExit::Closed(msg);
            }
        }
    }
}
