//! Host address discovery
//!
//! Resolves the address this host is reachable at on the local network so it
//! can be pushed to every client for display. The trick is a throwaway UDP
//! socket "connected" to an external address: no packet is sent, the OS just
//! selects the outbound interface. Resolution failure is non-fatal and falls
//! back to loopback.

use log::{error, info};
use std::io;
use std::net::UdpSocket;

pub const FALLBACK_ADDRESS: &str = "127.0.0.1";

pub fn resolve_local_address() -> String {
    match local_address_via_route() {
        Ok(address) => {
            info!("Host address resolved to {}", address);
            address
        }
        Err(e) => {
            error!(
                "Could not resolve local address ({}); falling back to {}",
                e, FALLBACK_ADDRESS
            );
            FALLBACK_ADDRESS.to_string()
        }
    }
}

fn local_address_via_route() -> io::Result<String> {
    let socket = UdpSocket::bind("0.0.0.0:0")?;
    socket.connect("8.8.8.8:65530")?;
    Ok(socket.local_addr()?.ip().to_string())
}
