//! Configuration management for the FTP server
//!
//! Settings come from an optional TOML file layered with `FTPSERV_*`
//! environment overrides. Command line arguments are applied on top by
//! `cli::Cli::apply`.

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::collections::HashMap;
use std::net::Ipv4Addr;
use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::auth::credentials::default_users;

/// Config file read when no explicit path is given. It may be absent.
pub const DEFAULT_CONFIG_FILE: &str = "ftpserv.toml";

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    /// Address for the control connection. Empty or `::` means every
    /// interface, IPv6 first with an IPv4 fallback.
    pub bind_address: String,
    pub control_port: u16,

    /// Port range for PASV/EPSV listeners
    pub data_port_min: u16,
    pub data_port_max: u16,
    /// Random draws before a passive allocation gives up with 425
    pub max_bind_attempts: usize,
    /// IPv4 address advertised in 227 replies instead of the control
    /// socket's local address
    pub passive_address: Option<String>,

    pub pasv_enabled: bool,
    pub port_enabled: bool,

    /// Directory under which each user gets `<home_root>/<user>`
    pub home_root: PathBuf,

    pub passive_timeout_secs: u64,
    pub connect_timeout_secs: u64,
    pub max_command_length: usize,

    pub log_file: Option<PathBuf>,
    pub users: HashMap<String, String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "::".to_string(),
            control_port: 2121,
            data_port_min: 50000,
            data_port_max: 60000,
            max_bind_attempts: 100,
            passive_address: None,
            pasv_enabled: true,
            port_enabled: true,
            home_root: PathBuf::from("home"),
            passive_timeout_secs: 30,
            connect_timeout_secs: 10,
            max_command_length: 512,
            log_file: None,
            users: default_users(),
        }
    }
}

impl ServerConfig {
    /// Loads `path` (or `ftpserv.toml` if present) with environment overrides.
    ///
    /// An explicitly named file must exist; the default one may be missing.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let file = match path {
            Some(path) => File::from(path).required(true),
            None => File::from(Path::new(DEFAULT_CONFIG_FILE)).required(false),
        };

        let settings = Config::builder()
            .add_source(file)
            .add_source(Environment::with_prefix("FTPSERV").try_parsing(true))
            .build()?;

        let config: ServerConfig = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.control_port == 0 {
            return Err(ConfigError::Message("control_port cannot be 0".into()));
        }

        if self.data_port_min == 0 || self.data_port_min > self.data_port_max {
            return Err(ConfigError::Message(format!(
                "invalid data port range {}-{}",
                self.data_port_min, self.data_port_max
            )));
        }

        if self.max_bind_attempts == 0 {
            return Err(ConfigError::Message(
                "max_bind_attempts must be greater than 0".into(),
            ));
        }

        if self.home_root.as_os_str().is_empty() {
            return Err(ConfigError::Message("home_root cannot be empty".into()));
        }

        if self.users.is_empty() {
            return Err(ConfigError::Message(
                "at least one user must be configured".into(),
            ));
        }

        if self.max_command_length == 0 {
            return Err(ConfigError::Message(
                "max_command_length must be greater than 0".into(),
            ));
        }

        if let Some(address) = &self.passive_address {
            address.parse::<Ipv4Addr>().map_err(|_| {
                ConfigError::Message(format!("passive_address is not an IPv4 address: {address}"))
            })?;
        }

        Ok(())
    }

    pub fn data_port_range(&self) -> RangeInclusive<u16> {
        self.data_port_min..=self.data_port_max
    }

    /// The configured 227 address, if any. Unparsable values are rejected
    /// by `validate`.
    pub fn advertised_address(&self) -> Option<Ipv4Addr> {
        self.passive_address
            .as_deref()
            .and_then(|address| address.parse().ok())
    }

    pub fn passive_timeout(&self) -> Duration {
        Duration::from_secs(self.passive_timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}
