//! Module `commands`
//!
//! Defines the closed set of FTP verbs the server understands and the
//! `Command` a control line turns into.

use crate::protocol::parser::parse;

/// Represents an FTP verb parsed from the client input.
///
/// Anything the server does not implement maps to `Unknown`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verb {
    User,
    Pass,
    Cwd,
    Cdup,
    Pwd,
    Pasv,
    Epsv,
    Port,
    Eprt,
    List,
    Retr,
    Stor,
    Rein,
    Quit,
    Unknown,
}

impl Verb {
    /// Maps a verb token onto the enum, ignoring ASCII case.
    pub fn from_token(token: &str) -> Self {
        match token.to_ascii_uppercase().as_str() {
            "USER" => Verb::User,
            "PASS" => Verb::Pass,
            "CWD" => Verb::Cwd,
            "CDUP" => Verb::Cdup,
            "PWD" => Verb::Pwd,
            "PASV" => Verb::Pasv,
            "EPSV" => Verb::Epsv,
            "PORT" => Verb::Port,
            "EPRT" => Verb::Eprt,
            "LIST" => Verb::List,
            "RETR" => Verb::Retr,
            "STOR" => Verb::Stor,
            "REIN" => Verb::Rein,
            "QUIT" => Verb::Quit,
            _ => Verb::Unknown,
        }
    }

    /// Verbs accepted before the session is authenticated.
    pub fn allowed_before_login(self) -> bool {
        matches!(self, Verb::User | Verb::Pass)
    }

    /// Verbs that consume the session's data channel.
    pub fn is_transfer(self) -> bool {
        matches!(self, Verb::List | Verb::Retr | Verb::Stor)
    }
}

/// A parsed control line. `verb` is `None` for a blank line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    pub verb: Option<Verb>,
    pub argument: String,
}

impl Command {
    pub fn from_line(line: &str) -> Self {
        let parsed = parse(line);
        Self {
            verb: parsed.verb.as_deref().map(Verb::from_token),
            argument: parsed.value,
        }
    }
}
