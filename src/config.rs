//! Configuration management for RAX FTP Client
//!
//! Separates startup configuration (fixed for the life of a session) from
//! runtime configuration (can be changed from the command shell).

use config::{Config, Environment, File};
use serde::Deserialize;

use crate::transfer::{DataMode, RateLimit};

/// Complete client configuration with startup/runtime separation
#[derive(Debug, Deserialize, Clone, Default)]
pub struct ClientConfig {
    #[serde(flatten)]
    pub startup: StartupConfig,

    #[serde(flatten)]
    pub runtime: RuntimeConfig,
}

/// Configuration read once when the session is opened
#[derive(Debug, Deserialize, Clone)]
pub struct StartupConfig {
    /// Control connection port on the server
    pub control_port: u16,

    /// Data connection mode used until `port`/`pasv` is issued
    pub default_data_mode: DataMode,

    /// Local port for the active-mode listener, 0 for an ephemeral port
    pub active_port: u16,

    /// Chunk size for data transfers
    pub buffer_size: usize,

    /// Longest accepted reply line, in bytes
    pub max_reply_line: usize,

    /// Most lines accepted in one multi-line reply
    pub max_reply_lines: usize,
}

/// Configuration that can be updated from the command shell
#[derive(Debug, Deserialize, Clone)]
pub struct RuntimeConfig {
    /// Transfer rate cap in KiB/s; zero or negative disables the cap
    /// Environment: RAX_FTP_CLIENT__RATE_LIMIT_KIB
    pub rate_limit_kib: f64,
}

pub const DEFAULT_CONFIG_FILE: &str = "config";
pub const ENV_PREFIX: &str = "RAX_FTP_CLIENT";

impl ClientConfig {
    /// Load configuration from defaults, an optional config file and the
    /// environment, in increasing order of precedence.
    pub fn load(config_path: Option<&str>) -> Result<Self, config::ConfigError> {
        let settings = Config::builder()
            .set_default("control_port", 21_i64)?
            .set_default("default_data_mode", "passive")?
            .set_default("active_port", 0_i64)?
            .set_default("buffer_size", 1024_i64)?
            .set_default("max_reply_line", 8192_i64)?
            .set_default("max_reply_lines", 128_i64)?
            .set_default("rate_limit_kib", -1.0_f64)?
            .add_source(
                File::with_name(config_path.unwrap_or(DEFAULT_CONFIG_FILE))
                    .required(config_path.is_some()),
            )
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: ClientConfig = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Split into startup (immutable) and runtime (mutable) parts
    pub fn split(self) -> (StartupConfig, RuntimeConfig) {
        (self.startup, self.runtime)
    }

    /// Validation for all configuration values
    pub fn validate(&self) -> Result<(), config::ConfigError> {
        if self.startup.control_port == 0 {
            return Err(config::ConfigError::Message(
                "control_port cannot be 0".into(),
            ));
        }

        if self.startup.default_data_mode == DataMode::Uninitialized {
            return Err(config::ConfigError::Message(
                "default_data_mode must be \"active\" or \"passive\"".into(),
            ));
        }

        if self.startup.buffer_size == 0 {
            return Err(config::ConfigError::Message(
                "buffer_size must be greater than 0".into(),
            ));
        }

        if self.startup.max_reply_line < 4 {
            return Err(config::ConfigError::Message(
                "max_reply_line must hold at least a reply code".into(),
            ));
        }

        if self.startup.max_reply_lines == 0 {
            return Err(config::ConfigError::Message(
                "max_reply_lines must be greater than 0".into(),
            ));
        }

        if self.runtime.rate_limit_kib.is_nan() {
            return Err(config::ConfigError::Message(
                "rate_limit_kib must be a number".into(),
            ));
        }

        Ok(())
    }
}

impl Default for StartupConfig {
    fn default() -> Self {
        Self {
            control_port: 21,
            default_data_mode: DataMode::Passive,
            active_port: 0,
            buffer_size: 1024,
            max_reply_line: 8192,
            max_reply_lines: 128,
        }
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            rate_limit_kib: -1.0,
        }
    }
}

impl RuntimeConfig {
    /// Get the configured rate cap
    pub fn rate_limit(&self) -> RateLimit {
        RateLimit::from_kib_per_sec(self.rate_limit_kib)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = ClientConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.runtime.rate_limit(), RateLimit::Unlimited);
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let mut config = ClientConfig::default();
        config.startup.buffer_size = 0;
        assert!(config.validate().is_err());

        let mut config = ClientConfig::default();
        config.startup.default_data_mode = DataMode::Uninitialized;
        assert!(config.validate().is_err());

        let mut config = ClientConfig::default();
        config.startup.control_port = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_layers_file_over_defaults() {
        let config = ClientConfig::load(Some("does/not/exist"));
        assert!(config.is_err(), "an explicit path must exist");

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("client.toml");
        std::fs::write(
            &path,
            "control_port = 2121\ndefault_data_mode = \"active\"\nrate_limit_kib = 64.0\n",
        )
        .unwrap();
        let config = ClientConfig::load(path.to_str()).unwrap();
        assert_eq!(config.startup.control_port, 2121);
        assert_eq!(config.startup.default_data_mode, DataMode::Active);
        assert_eq!(config.startup.buffer_size, 1024);
        assert_eq!(config.runtime.rate_limit(), RateLimit::BytesPerSec(64 * 1024));
    }
}
