//! The RSVP HTTP server.

mod instrument;
mod server;

use std::net::{Ipv4Addr, SocketAddr, ToSocketAddrs};

use anyhow::Context;
use clap::Args;

pub use instrument::MatchedRoute;
pub use rsvp_http::Body;
pub use server::{HttpServer, MAX_BODY_SIZE};

/// Paths under this prefix are answered by the server itself.
pub const WELL_KNOWN_PREFIX: &str = "/.well-known/rsvp/";

#[derive(Args, Debug)]
pub struct CliArgs {
    /// IP address and port to listen on
    #[clap(
        long = "listen",
        env = "RSVP_LISTEN",
        default_value = "0.0.0.0:8080",
        value_parser = parse_listen_addr
    )]
    pub address: SocketAddr,

    /// Port to listen on, replacing the port of the listen address
    #[clap(long, env = "PORT")]
    pub port: Option<u16>,
}

impl CliArgs {
    /// The address to bind, with `--port` applied.
    pub fn listen_addr(&self) -> SocketAddr {
        let mut addr = self.address;
        if let Some(port) = self.port {
            addr.set_port(port);
        }
        addr
    }
}

fn parse_listen_addr(addr: &str) -> anyhow::Result<SocketAddr> {
    let addrs: Vec<SocketAddr> = addr.to_socket_addrs()?.collect();
    // Prefer 127.0.0.1 over e.g. [::1]
    if let Some(addr) = addrs
        .iter()
        .find(|addr| addr.is_ipv4() && addr.ip() == Ipv4Addr::LOCALHOST)
    {
        return Ok(*addr);
    }
    // Otherwise, take the first addr (OS preference)
    addrs.into_iter().next().context("couldn't resolve address")
}
