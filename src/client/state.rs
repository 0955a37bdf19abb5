//! Module `state`
//!
//! Per-connection session state: login progress, working directory, the
//! pending reply and at most one negotiated data channel.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use crate::protocol::responses::Reply;
use crate::transfer::DataChannel;

/// Login progress of a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginState {
    NoUser,
    UserGiven(String),
    Authenticated(String),
}

/// Server-side state for one client over one control connection.
#[derive(Debug)]
pub struct Session {
    peer: SocketAddr,
    local: SocketAddr,
    login: LoginState,
    cwd: PathBuf,
    reply: Reply,
    data_channel: Option<DataChannel>,
}

impl Session {
    /// A fresh session whose first reply is the 220 greeting.
    pub fn new(peer: SocketAddr, local: SocketAddr) -> Self {
        Self {
            peer,
            local,
            login: LoginState::NoUser,
            cwd: PathBuf::from("/"),
            reply: Reply::greeting(),
            data_channel: None,
        }
    }

    /// Returns to the just-connected state (REIN). The reply becomes 220.
    pub fn reset(&mut self) {
        self.login = LoginState::NoUser;
        self.cwd = PathBuf::from("/");
        self.reply = Reply::greeting();
        self.data_channel = None;
    }

    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    /// Local address of the control connection.
    pub fn local(&self) -> SocketAddr {
        self.local
    }

    pub fn login(&self) -> &LoginState {
        &self.login
    }

    pub fn set_login(&mut self, login: LoginState) {
        self.login = login;
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self.login, LoginState::Authenticated(_))
    }

    /// The authenticated user, if any.
    pub fn username(&self) -> Option<&str> {
        match &self.login {
            LoginState::Authenticated(name) => Some(name),
            _ => None,
        }
    }

    pub fn cwd(&self) -> &Path {
        &self.cwd
    }

    pub fn set_cwd(&mut self, cwd: PathBuf) {
        self.cwd = cwd;
    }

    pub fn reply(&self) -> &Reply {
        &self.reply
    }

    pub fn set_reply(&mut self, reply: Reply) {
        self.reply = reply;
    }

    pub fn has_data_channel(&self) -> bool {
        self.data_channel.is_some()
    }

    /// Removes the channel for a transfer; it is never put back.
    pub fn take_data_channel(&mut self) -> Option<DataChannel> {
        self.data_channel.take()
    }

    pub fn set_data_channel(&mut self, channel: DataChannel) {
        self.data_channel = Some(channel);
    }

    /// Drops any negotiated channel, closing a passive listener.
    pub fn drop_data_channel(&mut self) {
        self.data_channel = None;
    }
}
