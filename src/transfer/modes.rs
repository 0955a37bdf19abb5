//! FTP Transfer modes
//!
//! Active/passive mode types plus the argument formats the negotiation
//! verbs use: `PORT h1,h2,h3,h4,p1,p2`, `EPRT |proto|host|port|`,
//! `EPSV [proto]` and the matching 227/229 reply bodies.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};

use crate::error::ProtocolError;

/// Lowest port a client may ask the server to connect out to via EPRT.
pub const MIN_CLIENT_PORT: u16 = 1024;

const PORT_FIELDS: [&str; 6] = ["h1", "h2", "h3", "h4", "p1", "p2"];

/// FTP transfer modes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferMode {
    /// Server connects out to the client (PORT/EPRT).
    Active,
    /// Client connects in to a server listener (PASV/EPSV).
    Passive,
}

/// Network protocol of a data channel endpoint (RFC 2428 `net-prt`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressFamily {
    Ipv4,
    Ipv6,
}

impl AddressFamily {
    /// Parses an RFC 2428 protocol code: `1` is IPv4, `2` is IPv6.
    pub fn from_net_prt(code: &str) -> Result<Self, ProtocolError> {
        match code.trim() {
            "1" => Ok(AddressFamily::Ipv4),
            "2" => Ok(AddressFamily::Ipv6),
            other => Err(ProtocolError::UnsupportedNetworkProtocol(other.to_string())),
        }
    }

    pub fn of(ip: &IpAddr) -> Self {
        match ip {
            IpAddr::V4(_) => AddressFamily::Ipv4,
            IpAddr::V6(_) => AddressFamily::Ipv6,
        }
    }
}

/// Splits a port into the `(p1, p2)` pair used by PORT and PASV.
pub fn encode_port(port: u16) -> (u8, u8) {
    ((port >> 8) as u8, (port & 0xff) as u8)
}

pub fn decode_port(p1: u8, p2: u8) -> u16 {
    u16::from(p1) * 256 + u16::from(p2)
}

/// Parses a PORT argument into the endpoint the server should connect to.
///
/// Every field must be an integer in `[0, 255]`; the error names the first
/// field that is missing or invalid.
pub fn parse_port_argument(argument: &str) -> Result<SocketAddr, ProtocolError> {
    let fields: Vec<&str> = argument.trim().split(',').collect();
    if fields.len() > PORT_FIELDS.len() {
        return Err(ProtocolError::TooManyPortFields);
    }

    let mut values = [0u8; 6];
    for (index, name) in PORT_FIELDS.iter().enumerate() {
        values[index] = fields
            .get(index)
            .map(|field| field.trim())
            .filter(|field| field.bytes().all(|b| b.is_ascii_digit()))
            .and_then(|field| field.parse::<u8>().ok())
            .ok_or(ProtocolError::InvalidPortField(name))?;
    }

    let host = Ipv4Addr::new(values[0], values[1], values[2], values[3]);
    let port = decode_port(values[4], values[5]);
    Ok(SocketAddr::new(IpAddr::V4(host), port))
}

/// Parses an EPRT argument of the form `|net-prt|host|port|`.
pub fn parse_eprt_argument(argument: &str) -> Result<SocketAddr, ProtocolError> {
    let fields: Vec<&str> = argument.trim().split('|').collect();
    if fields.len() != 5 || !fields[0].is_empty() || !fields[4].is_empty() {
        return Err(ProtocolError::MalformedEprt);
    }

    let family = AddressFamily::from_net_prt(fields[1])?;
    let host = fields[2];
    let ip = match family {
        AddressFamily::Ipv4 => {
            if host.split('.').count() != 4 {
                return Err(ProtocolError::InvalidHost(host.to_string()));
            }
            host.parse::<Ipv4Addr>()
                .map(IpAddr::V4)
                .map_err(|_| ProtocolError::InvalidHost(host.to_string()))?
        }
        AddressFamily::Ipv6 => host
            .parse::<Ipv6Addr>()
            .map(IpAddr::V6)
            .map_err(|_| ProtocolError::InvalidHost(host.to_string()))?,
    };

    let port = fields[3]
        .trim()
        .parse::<u32>()
        .ok()
        .filter(|port| (u32::from(MIN_CLIENT_PORT)..=u32::from(u16::MAX)).contains(port))
        .ok_or(ProtocolError::PortOutOfRange {
            min: MIN_CLIENT_PORT,
            max: u16::MAX,
        })?;

    Ok(SocketAddr::new(ip, port as u16))
}

/// Parses the optional EPSV protocol argument. An empty argument means any.
pub fn parse_epsv_argument(argument: &str) -> Result<Option<AddressFamily>, ProtocolError> {
    let argument = argument.trim();
    if argument.is_empty() {
        return Ok(None);
    }
    AddressFamily::from_net_prt(argument).map(Some)
}

/// The IPv4 address advertised in a 227 reply for a control socket bound
/// to `local`.
pub fn advertised_ipv4(local: IpAddr) -> Ipv4Addr {
    match local {
        IpAddr::V4(ip) => ip,
        IpAddr::V6(ip) => match ip.to_ipv4_mapped() {
            Some(mapped) => mapped,
            None if ip.is_loopback() => Ipv4Addr::LOCALHOST,
            None => Ipv4Addr::UNSPECIFIED,
        },
    }
}

pub fn format_pasv_reply(host: Ipv4Addr, port: u16) -> String {
    let [h1, h2, h3, h4] = host.octets();
    let (p1, p2) = encode_port(port);
    format!("Entering Passive Mode ({h1},{h2},{h3},{h4},{p1},{p2}).")
}

pub fn format_epsv_reply(port: u16) -> String {
    format!("Entering Extended Passive Mode (|||{port}|).")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn port_argument_decodes_host_and_port() {
        let addr = parse_port_argument("127,0,0,1,195,80").unwrap();
        assert_eq!(addr, "127.0.0.1:50000".parse().unwrap());

        let addr = parse_port_argument("10,1,2,3,0,21").unwrap();
        assert_eq!(addr, "10.1.2.3:21".parse().unwrap());
    }

    #[test]
    fn port_argument_names_the_bad_field() {
        let cases = [
            ("300,0,0,1,4,0", "h1"),
            ("127,x,0,1,4,0", "h2"),
            ("127,0,-1,1,4,0", "h3"),
            ("127,0,0,,4,0", "h4"),
            ("127,0,0,1,256,0", "p1"),
            ("127,0,0,1,4", "p2"),
        ];
        for (argument, field) in cases {
            match parse_port_argument(argument) {
                Err(ProtocolError::InvalidPortField(name)) => assert_eq!(name, field, "{argument}"),
                other => panic!("{argument}: unexpected {other:?}"),
            }
        }
        assert!(matches!(
            parse_port_argument("1,2,3,4,5,6,7"),
            Err(ProtocolError::TooManyPortFields)
        ));
    }

    #[test]
    fn port_encoding_round_trips_every_port() {
        for port in 0..=u16::MAX {
            let (p1, p2) = encode_port(port);
            assert_eq!(decode_port(p1, p2), port);
        }
        assert_eq!(encode_port(50000), (195, 80));
    }

    #[test]
    fn eprt_accepts_ipv4_and_ipv6() {
        assert_eq!(
            parse_eprt_argument("|1|132.235.1.2|6275|").unwrap(),
            "132.235.1.2:6275".parse().unwrap()
        );
        assert_eq!(
            parse_eprt_argument("|2|::1|5282|").unwrap(),
            "[::1]:5282".parse().unwrap()
        );
    }

    #[test]
    fn eprt_rejects_unknown_protocol_with_522() {
        let err = parse_eprt_argument("|9|127.0.0.1|4000|").unwrap_err();
        assert!(matches!(err, ProtocolError::UnsupportedNetworkProtocol(_)));
        assert_eq!(err.reply().code(), 522);
    }

    #[test]
    fn eprt_rejects_out_of_range_port_with_522() {
        for argument in ["|1|127.0.0.1|99999999|", "|1|127.0.0.1|1023|", "|1|127.0.0.1|abc|"] {
            let err = parse_eprt_argument(argument).unwrap_err();
            assert!(matches!(err, ProtocolError::PortOutOfRange { .. }), "{argument}");
            assert_eq!(err.reply().code(), 522);
        }
    }

    #[test]
    fn eprt_rejects_bad_hosts_and_layouts() {
        assert!(matches!(
            parse_eprt_argument("|1|127.0.1|4000|"),
            Err(ProtocolError::InvalidHost(_))
        ));
        assert!(matches!(
            parse_eprt_argument("|2|not-an-address|4000|"),
            Err(ProtocolError::InvalidHost(_))
        ));
        assert!(matches!(
            parse_eprt_argument("1|127.0.0.1|4000"),
            Err(ProtocolError::MalformedEprt)
        ));
    }

    #[test]
    fn epsv_argument_is_optional() {
        assert_eq!(parse_epsv_argument("").unwrap(), None);
        assert_eq!(parse_epsv_argument("2").unwrap(), Some(AddressFamily::Ipv6));
        assert!(parse_epsv_argument("3").is_err());
        assert!(parse_epsv_argument("ALL").is_err());
    }

    #[test]
    fn pasv_reply_uses_octets_and_split_port() {
        assert_eq!(
            format_pasv_reply(Ipv4Addr::new(192, 168, 1, 20), 50000),
            "Entering Passive Mode (192,168,1,20,195,80)."
        );
        assert_eq!(format_epsv_reply(51234), "Entering Extended Passive Mode (|||51234|).");
    }

    #[test]
    fn advertised_address_unmaps_ipv6() {
        assert_eq!(
            advertised_ipv4("::ffff:10.0.0.7".parse().unwrap()),
            Ipv4Addr::new(10, 0, 0, 7)
        );
        assert_eq!(advertised_ipv4("::1".parse().unwrap()), Ipv4Addr::LOCALHOST);
        assert_eq!(
            advertised_ipv4("192.0.2.1".parse().unwrap()),
            Ipv4Addr::new(192, 0, 2, 1)
        );
    }
}
