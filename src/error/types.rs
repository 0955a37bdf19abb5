//! Error types
//!
//! Defines domain-specific error types for each area of the FTP server.
//! Every per-command error knows the reply it turns into; only transport
//! failures on the control socket end a session, and only `ServerError`
//! ends the process.

use std::io;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::protocol::responses::{
    self, BAD_SEQUENCE, CANT_OPEN_DATA, FILE_UNAVAILABLE, NAME_NOT_ALLOWED, NOT_IMPLEMENTED,
    NOT_LOGGED_IN, PROTOCOL_NOT_SUPPORTED, Reply, SYNTAX_ERROR, TRANSFER_ABORTED,
};

/// Malformed or unsupported command arguments.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("Syntax error, command unrecognized")]
    UnknownCommand,

    #[error("Command line too long")]
    CommandTooLong,

    #[error("Invalid PORT argument: {0}")]
    InvalidPortField(&'static str),

    #[error("Invalid PORT argument: expected h1,h2,h3,h4,p1,p2")]
    TooManyPortFields,

    #[error("Invalid EPRT argument: expected |proto|host|port|")]
    MalformedEprt,

    #[error("Network protocol not supported, use (1,2)")]
    UnsupportedNetworkProtocol(String),

    #[error("Invalid host address: {0}")]
    InvalidHost(String),

    #[error("Port must be between {min} and {max}")]
    PortOutOfRange { min: u16, max: u16 },

    #[error("{0} command is disabled")]
    Disabled(&'static str),
}

impl ProtocolError {
    pub fn reply(&self) -> Reply {
        let code = match self {
            ProtocolError::UnsupportedNetworkProtocol(_)
            | ProtocolError::InvalidHost(_)
            | ProtocolError::PortOutOfRange { .. } => PROTOCOL_NOT_SUPPORTED,
            ProtocolError::Disabled(_) => NOT_IMPLEMENTED,
            _ => SYNTAX_ERROR,
        };
        Reply::new(code, format!("{self}."))
    }
}

/// Login sequencing and credential failures.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Please login with USER and PASS")]
    NotLoggedIn,

    #[error("Login with USER first")]
    BadSequence,

    #[error("Login incorrect")]
    InvalidCredentials,

    #[error("Login failed, home directory unavailable")]
    HomeUnavailable(#[source] io::Error),
}

impl AuthError {
    pub fn reply(&self) -> Reply {
        let code = match self {
            AuthError::BadSequence => BAD_SEQUENCE,
            _ => NOT_LOGGED_IN,
        };
        Reply::new(code, format!("{self}."))
    }
}

/// Missing, unreadable or unwritable paths.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Failed to change directory")]
    NotADirectory(PathBuf),

    #[error("Failed to open directory")]
    DirectoryUnavailable(PathBuf),

    #[error("Failed to open file")]
    FileUnavailable(PathBuf),

    #[error("Could not create file")]
    NotWritable(PathBuf),

    #[error("Failed to read file")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Could not create file")]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl StorageError {
    pub fn reply(&self) -> Reply {
        let code = match self {
            StorageError::NotWritable(_) | StorageError::WriteFailed { .. } => NAME_NOT_ALLOWED,
            _ => FILE_UNAVAILABLE,
        };
        Reply::new(code, format!("{self}."))
    }
}

/// Data channel negotiation and transfer failures.
#[derive(Debug, Error)]
pub enum TransferError {
    #[error("Use PORT, PASV, EPRT or EPSV first")]
    NoDataChannel,

    #[error("Can't open data connection, no free port after {attempts} attempts")]
    NoAvailablePort {
        attempts: usize,
        #[source]
        last_error: Option<io::Error>,
    },

    #[error("Can't open data connection")]
    ListenerSetup(#[source] io::Error),

    #[error("Failed to establish connection to {addr}")]
    ConnectFailed {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },

    #[error("Timed out after {0:?} waiting for data connection")]
    AcceptTimeout(Duration),

    #[error("Can't open data connection")]
    AcceptFailed(#[source] io::Error),

    #[error("Connection closed; transfer aborted")]
    Io(#[source] io::Error),
}

impl TransferError {
    pub fn reply(&self) -> Reply {
        let code = match self {
            TransferError::ConnectFailed { .. } => FILE_UNAVAILABLE,
            TransferError::Io(_) => TRANSFER_ABORTED,
            _ => CANT_OPEN_DATA,
        };
        Reply::new(code, format!("{self}."))
    }
}

/// Fatal startup errors.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Failed to bind to {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: io::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Reply sent on every control channel when the server shuts down.
pub fn shutdown_reply() -> Reply {
    Reply::new(
        responses::SERVICE_UNAVAILABLE,
        "Service not available, closing control connection.",
    )
}
