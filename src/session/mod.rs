//! Client session context
//!
//! A [`Session`] owns everything one connection to a server needs: the
//! control channel, the data channel state, the rate limit and the last
//! negotiated representation type. It is passed by `&mut` to every operation.

pub mod operations;

use log::info;

use crate::config::{RuntimeConfig, StartupConfig};
use crate::control::{ControlChannel, ReplyLimits};
use crate::error::FtpResult;
use crate::protocol::{Reply, TransferType};
use crate::transfer::{DataChannelManager, DataMode, RateLimit};

pub struct Session {
    control: ControlChannel,
    data: DataChannelManager,
    rate_limit: RateLimit,
    transfer_type: Option<TransferType>,
    buffer_size: usize,
    active_port: u16,
}

impl Session {
    /// Wraps an established control channel whose greeting has been read.
    pub fn new(control: ControlChannel, startup: &StartupConfig, runtime: &RuntimeConfig) -> Self {
        Self {
            control,
            data: DataChannelManager::new(startup.default_data_mode, startup.active_port),
            rate_limit: runtime.rate_limit(),
            transfer_type: None,
            buffer_size: startup.buffer_size.max(1),
            active_port: startup.active_port,
        }
    }

    /// Connects to `host` on the configured control port and reads the 220
    /// greeting.
    pub async fn connect(
        host: &str,
        startup: &StartupConfig,
        runtime: &RuntimeConfig,
    ) -> FtpResult<(Self, Reply)> {
        let limits = ReplyLimits {
            max_line: startup.max_reply_line,
            max_lines: startup.max_reply_lines,
        };
        let mut control = ControlChannel::connect(host, startup.control_port, limits).await?;
        let greeting = control.read_greeting().await?;
        Ok((Self::new(control, startup, runtime), greeting))
    }

    pub async fn login(&mut self, user: &str, pass: &str) -> FtpResult<()> {
        self.control.login(user, pass).await
    }

    pub fn control(&self) -> &ControlChannel {
        &self.control
    }

    pub fn data_mode(&self) -> DataMode {
        self.data.mode()
    }

    pub fn data_channel(&self) -> &DataChannelManager {
        &self.data
    }

    pub fn rate_limit(&self) -> RateLimit {
        self.rate_limit
    }

    pub fn set_rate_limit(&mut self, limit: RateLimit) {
        info!("Rate limit set to {}", limit);
        self.rate_limit = limit;
    }

    /// Last representation type acknowledged by the server, if any
    pub fn transfer_type(&self) -> Option<TransferType> {
        self.transfer_type
    }

    pub fn buffer_size(&self) -> usize {
        self.buffer_size
    }

    /// Configured active-mode port, 0 for ephemeral
    pub fn active_port(&self) -> u16 {
        self.active_port
    }
}
