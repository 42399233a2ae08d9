//! Network module - Handles the TCP connection to the game server
//!
//! Provides:
//! - Client for connecting to a server
//! - Connection framing and decoding on the receive task

mod client;
mod connection;

pub use client::*;
pub use connection::*;

use std::net::SocketAddr;

use crate::protocol::MAX_PACKET_SIZE;

/// Configuration for network operations
#[derive(Debug, Clone)]
pub struct NetworkConfig {
    /// Connection timeout in milliseconds
    pub connect_timeout_ms: u64,
    /// Largest packet accepted from the server
    pub max_packet_size: usize,
    /// Decoded packets buffered between receive and apply
    pub event_queue: usize,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            connect_timeout_ms: 5000,
            max_packet_size: MAX_PACKET_SIZE,
            event_queue: 1024,
        }
    }
}

impl NetworkConfig {
    pub fn new(connect_timeout_ms: u64) -> Self {
        Self {
            connect_timeout_ms,
            ..Default::default()
        }
    }

    pub fn with_max_packet_size(mut self, max_packet_size: usize) -> Self {
        self.max_packet_size = max_packet_size;
        self
    }
}

/// Split a `host[:port]` server string, falling back to `default_port`
///
/// Bracketed IPv6 literals (`[::1]:2593`) keep their address; a bare IPv6
/// literal has no port to split off.
pub fn split_host_port(server: &str, default_port: u16) -> (&str, u16) {
    if let Some((host, port)) = server.rsplit_once(':') {
        let host = host.trim_start_matches('[').trim_end_matches(']');
        let bare_ipv6 = host.contains(':') && !server.starts_with('[');
        if !bare_ipv6 {
            if let Ok(port) = port.parse() {
                return (host, port);
            }
        }
    }
    (server.trim_start_matches('[').trim_end_matches(']'), default_port)
}

/// Resolve a `host[:port]` server string to a socket address
pub async fn resolve_server(server: &str, default_port: u16) -> std::io::Result<SocketAddr> {
    let (host, port) = split_host_port(server, default_port);
    if let Ok(ip) = host.parse::<std::net::IpAddr>() {
        return Ok(SocketAddr::new(ip, port));
    }
    resolve_host(host, port).await
}

/// Resolve a hostname to a socket address
pub async fn resolve_host(host: &str, port: u16) -> std::io::Result<SocketAddr> {
    use tokio::net::lookup_host;

    let addr_string = format!("{}:{}", host, port);
    let mut addrs = lookup_host(&addr_string).await?;

    addrs.next().ok_or_else(|| {
        std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("Could not resolve host: {}", host),
        )
    })
}
