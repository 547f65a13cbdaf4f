//! Network utilities
//!
//! Listener setup shared by the control port and passive data ports, and
//! discovery of the IPv4 address advertised in PASV replies.

use log::debug;
use socket2::{Domain, Protocol, Socket, Type};
use std::io;
use std::net::{IpAddr, Ipv4Addr, SocketAddr, TcpListener};

/// Binds a blocking TCP listener on `addr` with an explicit backlog.
pub fn open_listener(addr: SocketAddr, backlog: i32) -> io::Result<TcpListener> {
    let socket = Socket::new(Domain::for_address(addr), Type::STREAM, Some(Protocol::TCP))?;
    socket.set_reuse_address(true)?;
    socket.bind(&addr.into())?;
    socket.listen(backlog)?;
    Ok(socket.into())
}

/// Chooses the IPv4 address to advertise for passive mode.
///
/// Order of preference: the configured override, the local address of the
/// control connection when it is a specific IPv4 address, then the first
/// non-loopback IPv4 interface address.
pub fn passive_ipv4(configured: Option<Ipv4Addr>, control_local: SocketAddr) -> Option<Ipv4Addr> {
    if let Some(ip) = configured {
        return Some(ip);
    }

    let local = match control_local.ip() {
        IpAddr::V4(ip) => Some(ip),
        IpAddr::V6(ip) => ip.to_ipv4_mapped(),
    };
    match local {
        Some(ip) if !ip.is_unspecified() => Some(ip),
        _ => first_routable_ipv4(),
    }
}

/// First non-loopback IPv4 address among the local interfaces.
pub fn first_routable_ipv4() -> Option<Ipv4Addr> {
    let interfaces = match get_if_addrs::get_if_addrs() {
        Ok(interfaces) => interfaces,
        Err(e) => {
            debug!("Interface enumeration failed: {}", e);
            return None;
        }
    };

    interfaces
        .into_iter()
        .filter(|iface| !iface.is_loopback())
        .find_map(|iface| match iface.ip() {
            IpAddr::V4(ip) => Some(ip),
            IpAddr::V6(_) => None,
        })
}
