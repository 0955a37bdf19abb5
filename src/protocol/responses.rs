//! FTP Response handling
//!
//! Defines FTP reply codes and the `Reply` a session flushes onto its
//! control channel.

use std::fmt;
use tokio::io::{AsyncWrite, AsyncWriteExt};

/// Standard FTP reply codes
pub const OPENING_DATA: u16 = 150;
pub const OK: u16 = 200;
pub const READY: u16 = 220;
pub const GOODBYE: u16 = 221;
pub const TRANSFER_COMPLETE: u16 = 226;
pub const ENTERING_PASSIVE: u16 = 227;
pub const ENTERING_EXTENDED_PASSIVE: u16 = 229;
pub const LOGIN_SUCCESS: u16 = 230;
pub const FILE_ACTION_OK: u16 = 250;
pub const PATHNAME: u16 = 257;
pub const PASSWORD_REQUIRED: u16 = 331;
pub const SERVICE_UNAVAILABLE: u16 = 421;
pub const CANT_OPEN_DATA: u16 = 425;
pub const TRANSFER_ABORTED: u16 = 426;
pub const SYNTAX_ERROR: u16 = 500;
pub const NOT_IMPLEMENTED: u16 = 502;
pub const BAD_SEQUENCE: u16 = 503;
pub const PROTOCOL_NOT_SUPPORTED: u16 = 522;
pub const NOT_LOGGED_IN: u16 = 530;
pub const FILE_UNAVAILABLE: u16 = 550;
pub const NAME_NOT_ALLOWED: u16 = 553;

/// A three-digit reply code plus its human readable message.
///
/// Each session owns exactly one `Reply`: handlers overwrite it and the
/// session loop flushes it before reading the next command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    code: u16,
    message: String,
}

impl Reply {
    pub fn new(code: u16, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Greeting sent when a control connection opens (and after REIN).
    pub fn greeting() -> Self {
        Self::new(READY, "Service ready for new user.")
    }

    pub fn code(&self) -> u16 {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Renders the reply as it travels on the wire, CRLF included.
    pub fn to_wire(&self) -> String {
        format_response(self.code, &self.message)
    }
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.code, self.message)
    }
}

/// Format an FTP response message
pub fn format_response(code: u16, message: &str) -> String {
    format!("{} {}\r\n", code, message)
}

/// Writes a reply onto the control channel and flushes it immediately.
pub async fn write_reply<W>(writer: &mut W, reply: &Reply) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    writer.write_all(reply.to_wire().as_bytes()).await?;
    writer.flush().await
}
