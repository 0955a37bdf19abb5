//! Data channel negotiation: PASV, EPSV, PORT and EPRT.
//!
//! Each verb first discards whatever channel the session already holds, so
//! a session never owns more than one.

use log::{info, warn};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use crate::client::Session;
use crate::error::ProtocolError;
use crate::protocol::responses::{ENTERING_EXTENDED_PASSIVE, ENTERING_PASSIVE, OK, Reply};
use crate::server::ServerContext;
use crate::transfer::data_channel::DataChannel;
use crate::transfer::modes::{
    AddressFamily, advertised_ipv4, format_epsv_reply, format_pasv_reply, parse_eprt_argument,
    parse_epsv_argument, parse_port_argument,
};

pub fn handle_pasv(session: &mut Session, ctx: &ServerContext) {
    session.drop_data_channel();
    if !ctx.config.pasv_enabled {
        session.set_reply(ProtocolError::Disabled("PASV").reply());
        return;
    }

    let local_ip = session.local().ip();
    let Some(channel) = open_passive(session, wildcard(AddressFamily::of(&local_ip)), ctx) else {
        return;
    };

    let host = ctx
        .config
        .advertised_address()
        .unwrap_or_else(|| advertised_ipv4(local_ip));
    let port = channel.endpoint().port();
    session.set_data_channel(channel);
    session.set_reply(Reply::new(ENTERING_PASSIVE, format_pasv_reply(host, port)));
}

pub fn handle_epsv(session: &mut Session, argument: &str, ctx: &ServerContext) {
    session.drop_data_channel();
    if !ctx.config.pasv_enabled {
        session.set_reply(ProtocolError::Disabled("EPSV").reply());
        return;
    }

    let family = match parse_epsv_argument(argument) {
        Ok(Some(family)) => family,
        Ok(None) => AddressFamily::of(&session.local().ip()),
        Err(e) => {
            session.set_reply(e.reply());
            return;
        }
    };

    let Some(channel) = open_passive(session, wildcard(family), ctx) else {
        return;
    };
    let port = channel.endpoint().port();
    session.set_data_channel(channel);
    session.set_reply(Reply::new(ENTERING_EXTENDED_PASSIVE, format_epsv_reply(port)));
}

pub fn handle_port(session: &mut Session, argument: &str, ctx: &ServerContext) {
    session.drop_data_channel();
    if !ctx.config.port_enabled {
        session.set_reply(ProtocolError::Disabled("PORT").reply());
        return;
    }

    match parse_port_argument(argument) {
        Ok(target) => {
            info!("Client {} set active target {}", session.peer(), target);
            session.set_data_channel(DataChannel::active(target));
            session.set_reply(Reply::new(OK, "PORT command successful."));
        }
        Err(e) => session.set_reply(e.reply()),
    }
}

pub fn handle_eprt(session: &mut Session, argument: &str, ctx: &ServerContext) {
    session.drop_data_channel();
    if !ctx.config.port_enabled {
        session.set_reply(ProtocolError::Disabled("EPRT").reply());
        return;
    }

    match parse_eprt_argument(argument) {
        Ok(target) => {
            info!("Client {} set active target {}", session.peer(), target);
            session.set_data_channel(DataChannel::active(target));
            session.set_reply(Reply::new(OK, "EPRT command successful."));
        }
        Err(e) => session.set_reply(e.reply()),
    }
}

/// Binds a passive listener, or records the failure reply and returns `None`.
fn open_passive(session: &mut Session, bind_ip: IpAddr, ctx: &ServerContext) -> Option<DataChannel> {
    match DataChannel::listen(
        bind_ip,
        ctx.config.data_port_range(),
        ctx.config.max_bind_attempts,
    ) {
        Ok(channel) => {
            info!(
                "Client {} passive listener on {}",
                session.peer(),
                channel.endpoint()
            );
            Some(channel)
        }
        Err(e) => {
            warn!("Client {} passive allocation failed: {}", session.peer(), e);
            session.set_reply(e.reply());
            None
        }
    }
}

fn wildcard(family: AddressFamily) -> IpAddr {
    match family {
        AddressFamily::Ipv4 => IpAddr::V4(Ipv4Addr::UNSPECIFIED),
        AddressFamily::Ipv6 => IpAddr::V6(Ipv6Addr::UNSPECIFIED),
    }
}
