//! Remote operations on a session
//!
//! Each operation maps to one or a few control commands, plus a data
//! connection for `list`, `put` and `get`.

use log::{debug, info};
use std::net::SocketAddr;
use std::path::Path;
use tokio::io::AsyncWrite;

use crate::error::{FtpClientError, FtpResult};
use crate::protocol::{Command, TransferType};
use crate::session::Session;
use crate::transfer::{self, Direction, TransferOutcome, TransferSession};

impl Session {
    pub async fn cwd(&mut self, path: &str) -> FtpResult<String> {
        let reply = self.control.execute(&Command::Cwd(path.to_string())).await?;
        Ok(reply.message().to_string())
    }

    /// Current remote directory, taken from the quoted part of the 257 reply
    /// when present.
    pub async fn pwd(&mut self) -> FtpResult<String> {
        let reply = self.control.execute(&Command::Pwd).await?;
        Ok(reply
            .quoted_path()
            .unwrap_or_else(|| reply.message().to_string()))
    }

    pub async fn mkdir(&mut self, path: &str) -> FtpResult<String> {
        let reply = self.control.execute(&Command::Mkd(path.to_string())).await?;
        Ok(reply
            .quoted_path()
            .unwrap_or_else(|| path.to_string()))
    }

    pub async fn rmdir(&mut self, path: &str) -> FtpResult<()> {
        self.control.execute(&Command::Rmd(path.to_string())).await?;
        Ok(())
    }

    pub async fn delete(&mut self, path: &str) -> FtpResult<()> {
        self.control.execute(&Command::Dele(path.to_string())).await?;
        Ok(())
    }

    /// RNFR then RNTO; RNTO is not sent when RNFR is refused.
    pub async fn rename(&mut self, from: &str, to: &str) -> FtpResult<()> {
        self.control.execute(&Command::Rnfr(from.to_string())).await?;
        self.control.execute(&Command::Rnto(to.to_string())).await?;
        info!("Renamed {} to {}", from, to);
        Ok(())
    }

    pub async fn size(&mut self, path: &str) -> FtpResult<u64> {
        transfer::remote_size(&mut self.control, path).await
    }

    pub async fn set_type(&mut self, transfer_type: TransferType) -> FtpResult<()> {
        self.control.execute(&Command::Type(transfer_type)).await?;
        debug!("Representation type is now {}", transfer_type);
        self.transfer_type = Some(transfer_type);
        Ok(())
    }

    /// Switches to passive mode (`pasv`).
    pub async fn enter_passive(&mut self) -> FtpResult<SocketAddr> {
        self.data.enter_passive(&mut self.control).await
    }

    /// Switches to active mode (`port`), listening on `port` or on the
    /// configured active port.
    pub async fn enter_active(&mut self, port: Option<u16>) -> FtpResult<SocketAddr> {
        let port = port.unwrap_or(self.active_port);
        self.data.enter_active(&mut self.control, port).await
    }

    /// Copies the listing of `path` (or the current directory) into `out`.
    pub async fn list<W>(&mut self, path: Option<&str>, out: &mut W) -> FtpResult<u64>
    where
        W: AsyncWrite + Unpin,
    {
        transfer::list(&mut self.control, &mut self.data, path, out, self.buffer_size).await
    }

    /// Uploads `local` to `remote`, resuming or skipping by size.
    pub async fn put(&mut self, local: &Path, remote: &str) -> FtpResult<TransferOutcome> {
        let mut transfer = TransferSession::new(Direction::Upload, local, remote, self.rate_limit);
        transfer::upload(&mut self.control, &mut self.data, &mut transfer, self.buffer_size).await
    }

    /// Downloads `remote` to `local`, resuming or skipping by size.
    pub async fn get(&mut self, remote: &str, local: &Path) -> FtpResult<TransferOutcome> {
        let mut transfer =
            TransferSession::new(Direction::Download, local, remote, self.rate_limit);
        transfer::download(&mut self.control, &mut self.data, &mut transfer, self.buffer_size)
            .await
    }

    /// Sends QUIT, then closes the data resources and the control socket.
    ///
    /// The control socket is closed even when the server does not answer 221.
    pub async fn quit(&mut self) -> FtpResult<String> {
        let result = self.control.execute(&Command::Quit).await;
        self.data.release();
        self.control.shutdown().await;
        match result {
            Ok(reply) => {
                info!("Disconnected: {}", reply.message());
                Ok(reply.message().to_string())
            }
            Err(FtpClientError::SessionTerminated(text)) => Ok(text),
            Err(e) => Err(e),
        }
    }
}
