//! ftpserv: an FTP server with active and passive data channels.
//!
//! The `server::Listener` accepts control connections and runs one session
//! task per client. Sessions authenticate against an `auth::CredentialStore`,
//! work on files through a `storage::Filesystem`, and move data over a
//! single-use `transfer::DataChannel` negotiated with PASV, EPSV, PORT or
//! EPRT.

pub mod auth;
pub mod cli;
pub mod client;
pub mod config;
pub mod error;
pub mod logging;
pub mod navigate;
pub mod protocol;
pub mod server;
pub mod storage;
pub mod transfer;

pub use config::ServerConfig;
pub use server::{Listener, ServerContext};
