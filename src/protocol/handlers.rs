//! Command handlers module
//!
//! `dispatch` routes a parsed command to its handler after the login gate.
//! Handlers leave their outcome in the session's reply, which the session
//! loop flushes before reading the next line. Only transfer handlers write
//! to the control channel themselves (the interim 150).

use log::{debug, info, warn};
use std::io;
use tokio::io::AsyncWrite;

use crate::client::{LoginState, Session};
use crate::error::{AuthError, ProtocolError};
use crate::navigate;
use crate::protocol::commands::{Command, Verb};
use crate::protocol::responses::{GOODBYE, LOGIN_SUCCESS, PASSWORD_REQUIRED, Reply};
use crate::server::ServerContext;
use crate::transfer;

/// What the session loop does after flushing the reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Close,
}

/// Runs `command` against `session`.
///
/// An `Err` means the control connection itself failed and the session
/// must end; every per-command failure is turned into a reply instead.
pub async fn dispatch<W>(
    session: &mut Session,
    command: &Command,
    ctx: &ServerContext,
    control: &mut W,
) -> io::Result<Flow>
where
    W: AsyncWrite + Unpin,
{
    let Some(verb) = command.verb else {
        session.set_reply(ProtocolError::UnknownCommand.reply());
        return Ok(Flow::Continue);
    };

    if !session.is_authenticated() && !verb.allowed_before_login() {
        debug!("Client {} sent {:?} before logging in", session.peer(), verb);
        session.set_reply(AuthError::NotLoggedIn.reply());
        return Ok(Flow::Continue);
    }

    if verb.is_transfer() {
        info!(
            "Client {} requested {:?} {}",
            session.peer(),
            verb,
            command.argument
        );
    }

    let argument = command.argument.as_str();
    match verb {
        Verb::User => handle_user(session, argument),
        Verb::Pass => handle_pass(session, argument, ctx),
        Verb::Rein => handle_rein(session),
        Verb::Quit => {
            handle_quit(session);
            return Ok(Flow::Close);
        }
        Verb::Cwd => navigate::handle_cwd(session, argument, ctx),
        Verb::Cdup => navigate::handle_cdup(session),
        Verb::Pwd => navigate::handle_pwd(session),
        Verb::Pasv => transfer::handle_pasv(session, ctx),
        Verb::Epsv => transfer::handle_epsv(session, argument, ctx),
        Verb::Port => transfer::handle_port(session, argument, ctx),
        Verb::Eprt => transfer::handle_eprt(session, argument, ctx),
        Verb::List => transfer::handle_list(session, argument, ctx, control).await?,
        Verb::Retr => transfer::handle_retr(session, argument, ctx, control).await?,
        Verb::Stor => transfer::handle_stor(session, argument, ctx, control).await?,
        Verb::Unknown => session.set_reply(ProtocolError::UnknownCommand.reply()),
    }

    Ok(Flow::Continue)
}

/// USER always re-prompts for a password and drops any previous login.
fn handle_user(session: &mut Session, username: &str) {
    let username = username.trim();
    info!("Client {} USER {}", session.peer(), username);
    session.set_login(LoginState::UserGiven(username.to_string()));
    session.set_reply(Reply::new(
        PASSWORD_REQUIRED,
        "User name okay, need password.",
    ));
}

fn handle_pass(session: &mut Session, password: &str, ctx: &ServerContext) {
    let LoginState::UserGiven(username) = session.login().clone() else {
        session.set_reply(AuthError::BadSequence.reply());
        return;
    };

    if !ctx.credentials.verify(&username, password) {
        warn!("Client {} failed login as {}", session.peer(), username);
        session.set_login(LoginState::NoUser);
        session.set_reply(AuthError::InvalidCredentials.reply());
        return;
    }

    match ctx.filesystem.home_directory(&username) {
        Ok(home) => {
            info!(
                "Client {} logged in as {} (home {})",
                session.peer(),
                username,
                home.display()
            );
            session.set_cwd(home);
            session.set_login(LoginState::Authenticated(username));
            session.set_reply(Reply::new(LOGIN_SUCCESS, "User logged in, proceed."));
        }
        Err(e) => {
            warn!(
                "Client {}: home directory for {} unavailable: {}",
                session.peer(),
                username,
                e
            );
            session.set_login(LoginState::NoUser);
            session.set_reply(AuthError::HomeUnavailable(e).reply());
        }
    }
}

fn handle_rein(session: &mut Session) {
    info!("Client {} reinitialized the session", session.peer());
    session.reset();
}

fn handle_quit(session: &mut Session) {
    info!("Client {} requested to quit", session.peer());
    session.drop_data_channel();
    session.set_reply(Reply::new(GOODBYE, "Goodbye."));
}
