//! Module `data_channel`
//!
//! Negotiation and establishment of FTP data connections.
//!
//! Passive mode (PASV/EPSV): the server binds a listener on a random port
//! and advertises it; the listener is only `accept`ed once a transfer
//! command actually starts. Active mode (PORT): the client advertises a
//! port and the server connects back to the control peer's address on it.

use log::{debug, info, warn};
use rand::Rng;
use std::io;
use std::net::{IpAddr, Ipv4Addr, SocketAddr, TcpListener, TcpStream, ToSocketAddrs};
use std::time::Duration;

use crate::error::{DataChannelError, ProtocolError};
use crate::server::config::ServerConfig;
use crate::utils::network::open_listener;

/// A bound passive-mode listener waiting for the client's data connection.
#[derive(Debug)]
pub struct PassiveListener {
    listener: TcpListener,
    port: u16,
}

impl PassiveListener {
    /// Binds a listener on `bind_ip` using a random port from the configured
    /// passive range, retrying other ports when a bind fails.
    pub fn open(bind_ip: IpAddr, config: &ServerConfig) -> Result<Self, DataChannelError> {
        let mut rng = rand::thread_rng();
        let mut last_error = None;

        for attempt in 1..=config.passive_bind_attempts {
            let port = random_port(&mut rng, config.passive_port_min, config.passive_port_max);
            match open_listener(SocketAddr::new(bind_ip, port), config.listen_backlog) {
                Ok(listener) => {
                    debug!("Passive listener bound on {}:{} (attempt {})", bind_ip, port, attempt);
                    return Ok(Self { listener, port });
                }
                Err(e) => {
                    debug!("Passive bind on {}:{} failed: {}", bind_ip, port, e);
                    last_error = Some(e);
                }
            }
        }

        Err(DataChannelError::Bind {
            attempts: config.passive_bind_attempts,
            source: last_error.unwrap_or_else(|| io::Error::from(io::ErrorKind::AddrNotAvailable)),
        })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Blocks until the client connects, consuming the listener.
    pub fn accept(self) -> Result<TcpStream, DataChannelError> {
        let (stream, peer) = self.listener.accept().map_err(DataChannelError::Accept)?;
        info!("Passive data connection accepted from {} on port {}", peer, self.port);
        Ok(stream)
    }
}

/// Picks a port uniformly from `[min, max]`.
pub fn random_port<R: Rng>(rng: &mut R, min: u16, max: u16) -> u16 {
    rng.gen_range(min..=max)
}

/// Formats an IPv4 address and port as the FTP `(h1,h2,h3,h4,p1,p2)` tuple.
pub fn format_pasv_tuple(ip: Ipv4Addr, port: u16) -> String {
    let [a, b, c, d] = ip.octets();
    format!("({},{},{},{},{},{})", a, b, c, d, port >> 8, port & 0xFF)
}

/// Formats a port as the extended passive `(|||port|)` tuple.
pub fn format_epsv_tuple(port: u16) -> String {
    format!("(|||{}|)", port)
}

/// Extracts the data port from a PORT argument `h1,h2,h3,h4,p1,p2`.
///
/// The host fields must be well-formed but are otherwise discarded: the
/// server always connects back to the control connection's peer address.
pub fn parse_port_argument(arg: &str) -> Result<u16, ProtocolError> {
    let invalid = || ProtocolError::InvalidPortArgument(arg.to_string());

    let fields = arg
        .trim()
        .split(',')
        .map(|field| field.trim().parse::<u8>())
        .collect::<Result<Vec<u8>, _>>()
        .map_err(|_| invalid())?;

    match fields.as_slice() {
        [_, _, _, _, hi, lo] => Ok(((*hi as u16) << 8) + *lo as u16),
        _ => Err(invalid()),
    }
}

/// Resolves `host:port` and opens an outbound data connection to the first
/// address that accepts it.
pub fn connect_active(
    host: IpAddr,
    port: u16,
    timeout: Option<Duration>,
) -> Result<TcpStream, DataChannelError> {
    let host = host.to_string();
    let addrs: Vec<SocketAddr> = (host.as_str(), port)
        .to_socket_addrs()
        .map_err(|source| DataChannelError::Resolve {
            host: host.clone(),
            port,
            source,
        })?
        .collect();

    let mut last_error = None;
    for addr in addrs {
        let attempt = match timeout {
            Some(limit) => TcpStream::connect_timeout(&addr, limit),
            None => TcpStream::connect(addr),
        };
        match attempt {
            Ok(stream) => {
                info!("Active data connection established to {}", addr);
                return Ok(stream);
            }
            Err(source) => {
                warn!("Active data connection to {} failed: {}", addr, source);
                last_error = Some(DataChannelError::Connect { addr, source });
            }
        }
    }

    Err(last_error.unwrap_or(DataChannelError::NoAddress { host, port }))
}
