//! Command line interface

use clap::Parser;
use std::path::PathBuf;

use crate::config::ServerConfig;

/// FTP server with active and passive data channels
#[derive(Clone, Debug, Parser)]
#[command(name = "ftpserv", version)]
pub struct Cli {
    /// File that receives the server log
    pub log_file: PathBuf,

    /// Control connection port
    #[arg(value_parser = clap::value_parser!(u16).range(1024..))]
    pub port: u16,

    /// TOML configuration file (defaults to ./ftpserv.toml when present)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Address to bind the control connection on
    #[arg(long)]
    pub bind: Option<String>,
}

impl Cli {
    /// Overrides `config` with the values given on the command line.
    pub fn apply(&self, config: &mut ServerConfig) {
        config.log_file = Some(self.log_file.clone());
        config.control_port = self.port;
        if let Some(bind) = &self.bind {
            config.bind_address = bind.clone();
        }
    }
}
