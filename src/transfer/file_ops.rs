//! Module `file_ops`
//!
//! Upload, download and listing over the data channel, including the
//! size-based resume policy:
//!
//! - Upload: `SIZE` failing means the remote file is absent and a fresh `STOR`
//!   is sent. Equal sizes skip the transfer. A smaller remote file is resumed
//!   by seeking the local file and sending the tail with `APPE`. A larger
//!   remote file aborts.
//! - Download: only an existing local file triggers a `SIZE` probe. Equal
//!   sizes skip, a shorter local file is resumed with `REST`. A local file
//!   longer than the remote one aborts with `LocalAhead` instead of sending
//!   `REST` past the end of the remote file. A `REST` rejection aborts rather
//!   than restarting from zero.
//!
//! There is exactly one attempt per invocation.

use log::{debug, error, info, warn};
use std::io::{self, ErrorKind, SeekFrom};
use std::path::Path;
use tokio::fs::{self, File, OpenOptions};
use tokio::io::{AsyncSeekExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;

use crate::control::ControlChannel;
use crate::error::{FtpClientError, FtpResult, TransferError, is_session_fatal};
use crate::protocol::Command;
use crate::transfer::data_channel::DataChannelManager;
use crate::transfer::engine::transmit;
use crate::transfer::modes::{DataMode, Direction};
use crate::transfer::rate_limit::RateLimit;
use crate::transfer::results::{ResumePlan, TransferOutcome, TransferSession};

/// Resume decision for an upload given the local size and the remote size
/// (`None` when `SIZE` failed).
pub fn plan_upload(local: u64, remote: Option<u64>) -> Result<ResumePlan, TransferError> {
    match remote {
        None => Ok(ResumePlan::Fresh),
        Some(remote) if remote == local => Ok(ResumePlan::Skip(local)),
        Some(0) => Ok(ResumePlan::Fresh),
        Some(remote) if remote < local => Ok(ResumePlan::Resume(remote)),
        Some(remote) => Err(TransferError::RemoteAhead { local, remote }),
    }
}

/// Resume decision for a download given the existing local size (`None` when
/// there is no local file) and the remote size.
pub fn plan_download(local: Option<u64>, remote: u64) -> Result<ResumePlan, TransferError> {
    match local {
        None => Ok(ResumePlan::Fresh),
        Some(local) if local == remote => Ok(ResumePlan::Skip(local)),
        Some(local) if local < remote => Ok(ResumePlan::Resume(local)),
        Some(local) => Err(TransferError::LocalAhead { local, remote }),
    }
}

/// `SIZE` of a remote file; any reply other than 213 is an error.
pub async fn remote_size(control: &mut ControlChannel, path: &str) -> FtpResult<u64> {
    let command = Command::Size(path.to_string());
    let reply = control.execute(&command).await?;
    match reply.size_value() {
        Some(size) => Ok(size),
        None => Err(FtpClientError::Protocol {
            command: command.verb().to_string(),
            reply,
        }),
    }
}

/// `SIZE` of a remote file, `None` when the server refuses it (absent file).
pub async fn probe_remote_size(control: &mut ControlChannel, path: &str) -> FtpResult<Option<u64>> {
    match remote_size(control, path).await {
        Ok(size) => Ok(Some(size)),
        Err(FtpClientError::Protocol { reply, .. }) => {
            debug!("SIZE {} refused, treating as absent: {}", path, reply);
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

/// Negotiates the data channel, sends `command` and returns the connected
/// data socket.
///
/// In passive mode the socket is connected before the command is sent; in
/// active mode the listener accepts after the preliminary reply. A `restart`
/// offset is sent as `REST` right before the command.
pub async fn open_transfer(
    control: &mut ControlChannel,
    data: &mut DataChannelManager,
    restart: Option<u64>,
    command: &Command,
) -> FtpResult<TcpStream> {
    data.prepare(control).await?;

    let early = match data.mode() {
        DataMode::Passive => Some(data.open_data_connection(control).await?),
        _ => None,
    };

    if let Some(offset) = restart {
        control.execute(&Command::Rest(offset)).await?;
    }
    control.execute(command).await?;

    match early {
        Some(stream) => Ok(stream),
        None => data.open_data_connection(control).await,
    }
}

/// Closes the data socket and reads the completion reply.
///
/// When the pump failed, the pending reply is still consumed so the control
/// channel stays in step, and the pump error is returned.
async fn finish_transfer(
    control: &mut ControlChannel,
    command: &Command,
    mut stream: TcpStream,
    result: Result<u64, TransferError>,
) -> FtpResult<u64> {
    if let Err(e) = stream.shutdown().await {
        debug!("Data connection shutdown: {}", e);
    }
    drop(stream);

    match result {
        Ok(bytes) => {
            control
                .expect_reply(command.verb(), command.completion_codes())
                .await?;
            Ok(bytes)
        }
        Err(e) => {
            error!("{} aborted: {}", command.verb(), e);
            match control.read_reply().await {
                Ok(reply) => warn!("Server reply after aborted {}: {}", command.verb(), reply),
                Err(err) if is_session_fatal(&err) => return Err(err),
                Err(err) => warn!("No reply after aborted {}: {}", command.verb(), err),
            }
            Err(e.into())
        }
    }
}

fn is_a_directory(path: &str) -> FtpClientError {
    FtpClientError::local_io(path, io::Error::new(ErrorKind::InvalidInput, "is a directory"))
}

/// The pump stops quietly on a local read error, so a short count means the
/// local file could not be read to the end.
fn check_upload_complete(path: &str, sent: u64, expected: u64) -> FtpResult<()> {
    if sent < expected {
        error!("Upload of {} stopped after {} of {} bytes", path, sent, expected);
        return Err(FtpClientError::local_io(
            path,
            io::Error::new(
                ErrorKind::UnexpectedEof,
                format!("read stopped after {} of {} bytes", sent, expected),
            ),
        ));
    }
    Ok(())
}

/// Sends `transfer.local_path` to `transfer.remote_path`.
pub async fn upload(
    control: &mut ControlChannel,
    data: &mut DataChannelManager,
    transfer: &mut TransferSession,
    buffer_size: usize,
) -> FtpResult<TransferOutcome> {
    debug_assert_eq!(transfer.direction, Direction::Upload);
    let local_name = transfer.local_path.display().to_string();

    let mut file = File::open(&transfer.local_path)
        .await
        .map_err(|e| FtpClientError::local_io(&local_name, e))?;
    let meta = file
        .metadata()
        .await
        .map_err(|e| FtpClientError::local_io(&local_name, e))?;
    if meta.is_dir() {
        return Err(is_a_directory(&local_name));
    }
    let local_size = meta.len();

    let remote = probe_remote_size(control, &transfer.remote_path).await?;
    let command = match plan_upload(local_size, remote)? {
        ResumePlan::Skip(size) => {
            info!("{} already exists on the server ({} bytes)", transfer.remote_path, size);
            return Ok(TransferOutcome::AlreadyExists { size });
        }
        ResumePlan::Fresh => {
            transfer.offset = 0;
            Command::Stor(transfer.remote_path.clone())
        }
        ResumePlan::Resume(offset) => {
            file.seek(SeekFrom::Start(offset))
                .await
                .map_err(|e| FtpClientError::local_io(&local_name, e))?;
            transfer.offset = offset;
            Command::Appe(transfer.remote_path.clone())
        }
    };

    info!(
        "Uploading {} -> {} ({} of {} bytes, {})",
        local_name,
        transfer.remote_path,
        local_size - transfer.offset,
        local_size,
        transfer.rate_limit
    );

    let mut stream = open_transfer(control, data, None, &command).await?;
    let result = transmit(&mut file, &mut stream, transfer.rate_limit, buffer_size).await;
    let bytes = finish_transfer(control, &command, stream, result).await?;
    check_upload_complete(&local_name, bytes, local_size - transfer.offset)?;

    info!("Upload of {} complete, {} bytes sent", local_name, bytes);
    Ok(TransferOutcome::Completed {
        bytes,
        offset: transfer.offset,
    })
}

async fn local_file_size(path: &Path) -> FtpResult<Option<u64>> {
    match fs::metadata(path).await {
        Ok(meta) if meta.is_dir() => Err(is_a_directory(&path.display().to_string())),
        Ok(meta) => Ok(Some(meta.len())),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(FtpClientError::local_io(path.display().to_string(), e)),
    }
}

/// Fetches `transfer.remote_path` into `transfer.local_path`.
pub async fn download(
    control: &mut ControlChannel,
    data: &mut DataChannelManager,
    transfer: &mut TransferSession,
    buffer_size: usize,
) -> FtpResult<TransferOutcome> {
    debug_assert_eq!(transfer.direction, Direction::Download);
    let local_name = transfer.local_path.display().to_string();

    let existing = local_file_size(&transfer.local_path).await?;
    let plan = match existing {
        None => ResumePlan::Fresh,
        Some(local) => {
            let remote = remote_size(control, &transfer.remote_path).await?;
            plan_download(Some(local), remote)?
        }
    };

    let (mut file, restart) = match plan {
        ResumePlan::Skip(size) => {
            info!("{} already exists locally ({} bytes)", local_name, size);
            return Ok(TransferOutcome::AlreadyExists { size });
        }
        ResumePlan::Fresh => {
            let file = File::create(&transfer.local_path)
                .await
                .map_err(|e| FtpClientError::local_io(&local_name, e))?;
            transfer.offset = 0;
            (file, None)
        }
        ResumePlan::Resume(offset) => {
            let file = OpenOptions::new()
                .append(true)
                .open(&transfer.local_path)
                .await
                .map_err(|e| FtpClientError::local_io(&local_name, e))?;
            transfer.offset = offset;
            (file, Some(offset))
        }
    };

    info!(
        "Downloading {} -> {} from offset {} ({})",
        transfer.remote_path, local_name, transfer.offset, transfer.rate_limit
    );

    let command = Command::Retr(transfer.remote_path.clone());
    let mut stream = match open_transfer(control, data, restart, &command).await {
        Ok(stream) => stream,
        Err(e) => {
            if restart.is_none() {
                drop(file);
                if let Err(rm) = fs::remove_file(&transfer.local_path).await {
                    warn!("Could not remove {}: {}", local_name, rm);
                }
            }
            return Err(e);
        }
    };

    let result = transmit(&mut stream, &mut file, transfer.rate_limit, buffer_size).await;
    let bytes = finish_transfer(control, &command, stream, result).await?;

    info!("Download of {} complete, {} bytes received", local_name, bytes);
    Ok(TransferOutcome::Completed {
        bytes,
        offset: transfer.offset,
    })
}

/// Runs `LIST` and copies the listing into `out`.
pub async fn list<W>(
    control: &mut ControlChannel,
    data: &mut DataChannelManager,
    path: Option<&str>,
    out: &mut W,
    buffer_size: usize,
) -> FtpResult<u64>
where
    W: AsyncWrite + Unpin,
{
    let command = Command::List(path.map(str::to_string));
    let mut stream = open_transfer(control, data, None, &command).await?;
    let result = transmit(&mut stream, out, RateLimit::Unlimited, buffer_size).await;
    finish_transfer(control, &command, stream, result).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upload_plan() {
        assert_eq!(plan_upload(100, None).unwrap(), ResumePlan::Fresh);
        assert_eq!(plan_upload(100, Some(0)).unwrap(), ResumePlan::Fresh);
        assert_eq!(plan_upload(0, None).unwrap(), ResumePlan::Fresh);
        assert_eq!(plan_upload(100, Some(100)).unwrap(), ResumePlan::Skip(100));
        assert_eq!(plan_upload(0, Some(0)).unwrap(), ResumePlan::Skip(0));
        assert_eq!(plan_upload(100, Some(40)).unwrap(), ResumePlan::Resume(40));
        assert!(matches!(
            plan_upload(10, Some(40)),
            Err(TransferError::RemoteAhead {
                local: 10,
                remote: 40
            })
        ));
    }

    #[test]
    fn test_short_upload_is_local_error() {
        assert!(check_upload_complete("a.bin", 100, 100).is_ok());
        assert!(check_upload_complete("a.bin", 0, 0).is_ok());
        let err = check_upload_complete("a.bin", 40, 100).unwrap_err();
        match err {
            FtpClientError::LocalIo { path, source } => {
                assert_eq!(path, "a.bin");
                assert_eq!(source.kind(), ErrorKind::UnexpectedEof);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_download_plan() {
        assert_eq!(plan_download(None, 500).unwrap(), ResumePlan::Fresh);
        assert_eq!(plan_download(Some(500), 500).unwrap(), ResumePlan::Skip(500));
        assert_eq!(plan_download(Some(0), 500).unwrap(), ResumePlan::Resume(0));
        assert_eq!(plan_download(Some(120), 500).unwrap(), ResumePlan::Resume(120));
        assert!(matches!(
            plan_download(Some(600), 500),
            Err(TransferError::LocalAhead {
                local: 600,
                remote: 500
            })
        ));
    }
}
