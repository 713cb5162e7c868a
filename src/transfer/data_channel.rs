//! Module `data_channel`
//!
//! Tracks the session's data connection mode and produces a connected data
//! socket for each transfer.
//!
//! - Passive: `PASV` yields a server endpoint that is good for exactly one
//!   connection, so it is renegotiated before every transfer.
//! - Active: a listener is bound on the client's control-connection IP and
//!   announced with `PORT`; the server connects to it for each transfer.
//!
//! Switching mode always releases the previous mode's resources first, so at
//! most one listener or passive endpoint exists at a time.

use log::{debug, info, warn};
use std::net::{IpAddr, SocketAddr, SocketAddrV4};
use tokio::net::{TcpListener, TcpStream};

use crate::control::ControlChannel;
use crate::error::{FtpClientError, FtpResult, TransferError};
use crate::protocol::{Command, parse_pasv_reply};
use crate::transfer::modes::DataMode;

/// Resources held for the current mode
#[derive(Debug)]
enum DataEndpoint {
    None,
    /// Server endpoint from the last PASV, taken by the next connect
    Passive(Option<SocketAddr>),
    Active(TcpListener),
}

#[derive(Debug)]
pub struct DataChannelManager {
    endpoint: DataEndpoint,
    default_mode: DataMode,
    active_port: u16,
}

impl DataChannelManager {
    /// `default_mode` is entered by [`DataChannelManager::prepare`] while no
    /// mode has been chosen; `active_port` is the listener port it uses for
    /// active mode (0 for ephemeral).
    pub fn new(default_mode: DataMode, active_port: u16) -> Self {
        Self {
            endpoint: DataEndpoint::None,
            default_mode,
            active_port,
        }
    }

    pub fn mode(&self) -> DataMode {
        match self.endpoint {
            DataEndpoint::None => DataMode::Uninitialized,
            DataEndpoint::Passive(_) => DataMode::Passive,
            DataEndpoint::Active(_) => DataMode::Active,
        }
    }

    /// Stored passive endpoint, if one is waiting to be used
    pub fn passive_endpoint(&self) -> Option<SocketAddr> {
        match self.endpoint {
            DataEndpoint::Passive(addr) => addr,
            _ => None,
        }
    }

    /// Address of the active-mode listener
    pub fn active_addr(&self) -> Option<SocketAddr> {
        match &self.endpoint {
            DataEndpoint::Active(listener) => listener.local_addr().ok(),
            _ => None,
        }
    }

    /// Drops the listener or passive endpoint of the current mode.
    pub fn release(&mut self) {
        match std::mem::replace(&mut self.endpoint, DataEndpoint::None) {
            DataEndpoint::Active(listener) => {
                if let Ok(addr) = listener.local_addr() {
                    info!("Closing active mode listener on {}", addr);
                }
            }
            DataEndpoint::Passive(Some(addr)) => {
                debug!("Discarding passive endpoint {}", addr);
            }
            DataEndpoint::Passive(None) | DataEndpoint::None => {}
        }
    }

    /// Sends PASV and stores the announced endpoint.
    pub async fn enter_passive(&mut self, control: &mut ControlChannel) -> FtpResult<SocketAddr> {
        self.release();

        let reply = control.execute(&Command::Pasv).await?;
        let announced = parse_pasv_reply(&reply)
            .ok_or_else(|| TransferError::InvalidPassiveReply(reply.to_string()))?;

        // Servers behind NAT sometimes announce 0.0.0.0
        let addr = if announced.ip().is_unspecified() {
            SocketAddr::new(control.peer_ip(), announced.port())
        } else {
            SocketAddr::V4(announced)
        };

        info!("Passive mode, data endpoint {}", addr);
        self.endpoint = DataEndpoint::Passive(Some(addr));
        Ok(addr)
    }

    /// Binds a listener on the client IP at `local_port` (0 = ephemeral) and
    /// announces it with PORT.
    pub async fn enter_active(
        &mut self,
        control: &mut ControlChannel,
        local_port: u16,
    ) -> FtpResult<SocketAddr> {
        self.release();

        let ip = match control.local_ip() {
            IpAddr::V4(ip) => ip,
            other => {
                return Err(TransferError::UnsupportedAddress(other.to_string()).into());
            }
        };
        let bind_addr = SocketAddr::new(IpAddr::V4(ip), local_port);
        let listener = TcpListener::bind(bind_addr)
            .await
            .map_err(|e| TransferError::BindFailed(bind_addr, e))?;
        let local = listener.local_addr().map_err(FtpClientError::data)?;

        announce_port(control, SocketAddrV4::new(ip, local.port())).await?;

        info!("Active mode, listening for data connections on {}", local);
        self.endpoint = DataEndpoint::Active(listener);
        Ok(local)
    }

    /// Negotiates the data channel before a transfer command.
    ///
    /// Passive mode asks for a fresh endpoint, active mode re-announces the
    /// existing listener, and an uninitialized session enters the default
    /// mode.
    pub async fn prepare(&mut self, control: &mut ControlChannel) -> FtpResult<()> {
        match self.mode() {
            DataMode::Passive => {
                self.enter_passive(control).await?;
            }
            DataMode::Active => {
                let addr = match self.active_addr() {
                    Some(SocketAddr::V4(addr)) => addr,
                    _ => return Err(TransferError::DataChannelNotInitialized.into()),
                };
                announce_port(control, addr).await?;
            }
            DataMode::Uninitialized => match self.default_mode {
                DataMode::Active => {
                    self.enter_active(control, self.active_port).await?;
                }
                _ => {
                    self.enter_passive(control).await?;
                }
            },
        }
        Ok(())
    }

    /// Returns a connected data socket.
    ///
    /// Passive: connects to the stored endpoint and consumes it; if it was
    /// already used, PASV is sent again first. Active: waits for the server
    /// to connect to the listener.
    pub async fn open_data_connection(
        &mut self,
        control: &mut ControlChannel,
    ) -> FtpResult<TcpStream> {
        if let DataEndpoint::Passive(None) = self.endpoint {
            self.enter_passive(control).await?;
        }

        match &mut self.endpoint {
            DataEndpoint::None => Err(TransferError::DataChannelNotInitialized.into()),
            DataEndpoint::Passive(endpoint) => {
                let addr = endpoint
                    .take()
                    .ok_or(TransferError::DataChannelNotInitialized)?;
                debug!("Connecting data channel to {}", addr);
                let stream = TcpStream::connect(addr)
                    .await
                    .map_err(|e| TransferError::ConnectFailed(addr, e))?;
                Ok(stream)
            }
            DataEndpoint::Active(listener) => {
                let (stream, peer) = listener.accept().await.map_err(TransferError::AcceptFailed)?;
                if peer.ip() != control.peer_ip() {
                    warn!(
                        "Data connection from {} does not match server {}",
                        peer,
                        control.peer_ip()
                    );
                }
                debug!("Accepted data connection from {}", peer);
                Ok(stream)
            }
        }
    }
}

async fn announce_port(control: &mut ControlChannel, addr: SocketAddrV4) -> FtpResult<()> {
    control.execute(&Command::Port(addr)).await?;
    Ok(())
}
