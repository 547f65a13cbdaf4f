//! Server configuration
//!
//! Layered configuration: built-in defaults, an optional TOML file, then
//! `POOLFTP_*` environment variables. The CLI applies its overrides on top.

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::net::Ipv4Addr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::FtpServerError;

/// Configuration file looked up in the working directory when no explicit
/// path is given.
pub const DEFAULT_CONFIG_FILE: &str = "poolftp";

/// Server configuration structure
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    /// IP address to bind the FTP control connection
    pub bind_address: String,
    /// Port for the FTP control connection (0 picks an ephemeral port)
    pub control_port: u16,

    /// Fixed number of session worker threads
    pub worker_threads: usize,
    /// Backlog for the control listener and passive data listeners
    pub listen_backlog: i32,

    /// Initial working directory of every session
    pub root_dir: String,
    /// Text of the 220 greeting
    pub welcome_message: String,

    /// IPv4 address advertised in PASV replies instead of the local one
    pub passive_address: Option<String>,
    pub passive_port_min: u16,
    pub passive_port_max: u16,
    /// Random ports tried before PASV/EPSV gives up
    pub passive_bind_attempts: usize,

    /// Deadline for active-mode connects; 0 waits indefinitely
    pub connection_timeout_secs: u64,
    pub max_command_length: usize,
    /// Chunk size of the transfer engine
    pub buffer_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".to_string(),
            control_port: 2121,
            worker_threads: 5,
            listen_backlog: 5,
            root_dir: ".".to_string(),
            welcome_message: "CoolFTPServer".to_string(),
            passive_address: None,
            passive_port_min: 1000,
            passive_port_max: 65535,
            passive_bind_attempts: 16,
            connection_timeout_secs: 10,
            max_command_length: 4096,
            buffer_size: 8192,
        }
    }
}

impl ServerConfig {
    /// Load configuration from a TOML file with environment overrides.
    ///
    /// An explicitly named file must exist; the default `poolftp.toml` is
    /// optional.
    pub fn load(path: Option<&Path>) -> Result<Self, FtpServerError> {
        let file = match path {
            Some(path) => File::from(path).required(true),
            None => File::with_name(DEFAULT_CONFIG_FILE).required(false),
        };

        let settings = Config::builder()
            .add_source(file)
            .add_source(Environment::with_prefix("POOLFTP").try_parsing(true))
            .build()?;

        let config: ServerConfig = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Validation for all configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.worker_threads == 0 {
            return Err(ConfigError::Message(
                "worker_threads must be greater than 0".into(),
            ));
        }

        if self.listen_backlog <= 0 {
            return Err(ConfigError::Message(
                "listen_backlog must be greater than 0".into(),
            ));
        }

        if self.root_dir.is_empty() {
            return Err(ConfigError::Message("root_dir cannot be empty".into()));
        }

        if self.passive_port_min > self.passive_port_max {
            return Err(ConfigError::Message(
                "passive_port_min must not exceed passive_port_max".into(),
            ));
        }

        if self.passive_port_min == 0 {
            return Err(ConfigError::Message(
                "passive_port_min must be greater than 0".into(),
            ));
        }

        if self.passive_bind_attempts == 0 {
            return Err(ConfigError::Message(
                "passive_bind_attempts must be greater than 0".into(),
            ));
        }

        if self.max_command_length == 0 || self.buffer_size == 0 {
            return Err(ConfigError::Message(
                "max_command_length and buffer_size must be greater than 0".into(),
            ));
        }

        if let Some(address) = &self.passive_address {
            address.parse::<Ipv4Addr>().map_err(|_| {
                ConfigError::Message(format!("passive_address is not an IPv4 address: {address}"))
            })?;
        }

        Ok(())
    }

    /// Get bind address and control port as socket address string
    pub fn control_socket(&self) -> String {
        format!("{}:{}", self.bind_address, self.control_port)
    }

    pub fn root_dir_path(&self) -> PathBuf {
        PathBuf::from(&self.root_dir)
    }

    /// Parsed passive address override. Checked by `validate`.
    pub fn passive_ipv4(&self) -> Option<Ipv4Addr> {
        self.passive_address.as_deref().and_then(|a| a.parse().ok())
    }

    /// Get the active-mode connect deadline
    pub fn connection_timeout(&self) -> Option<Duration> {
        match self.connection_timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }
}
