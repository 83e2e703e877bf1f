//! Environment bootstrap.
//!
//! The node's keys and overlay parameters are environment inputs; anything
//! missing that is required fails startup.

use base64::prelude::BASE64_STANDARD;
use base64::Engine;
use color_eyre::eyre::{eyre, Result, WrapErr};

use vladiator_network::multiaddr::Protocol;
use vladiator_network::Multiaddr;

#[derive(Clone, Debug, Default)]
pub struct NodeEnv {
    /// Node signing key (hex). Required.
    pub node_private_key: String,

    /// Node identity announced as the frame author. Required.
    pub node_public_key: String,

    /// Base64 protobuf overlay identity; generated when absent.
    pub p2p_private_key: Option<Vec<u8>>,

    /// Listen on the announced port instead of an ephemeral one.
    pub bootnode: bool,

    pub bootstrap_peers: Vec<Multiaddr>,

    pub announce_address: Option<Multiaddr>,

    /// Enables the external data-stream broadcaster.
    pub data_stream_port: Option<u16>,

    pub debug: bool,
}

impl NodeEnv {
    pub fn from_env() -> Result<Self> {
        let node_private_key = require("NODE_PRIVATE_KEY")?;
        let node_public_key = require("NODE_PUBLIC_KEY")?;

        let p2p_private_key = match optional("P2P_PRIVATE_KEY") {
            Some(encoded) => Some(
                BASE64_STANDARD
                    .decode(encoded.trim())
                    .wrap_err("P2P_PRIVATE_KEY is not valid base64")?,
            ),
            None => None,
        };

        let bootstrap_peers = match optional("BOOTSTRAP_PEERS") {
            Some(peers) => peers
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(|s| {
                    s.parse()
                        .wrap_err_with(|| format!("bad bootstrap peer address {s:?}"))
                })
                .collect::<Result<Vec<Multiaddr>>>()?,
            None => Vec::new(),
        };

        let announce_address = match optional("ANNOUNCE_ADDRESS") {
            Some(addr) => Some(
                addr.parse::<Multiaddr>()
                    .wrap_err_with(|| format!("bad announce address {addr:?}"))?,
            ),
            None => None,
        };

        let data_stream_port = match optional("DATA_STREAM_PORT") {
            Some(port) => Some(
                port.parse()
                    .wrap_err_with(|| format!("bad data stream port {port:?}"))?,
            ),
            None => None,
        };

        Ok(Self {
            node_private_key,
            node_public_key,
            p2p_private_key,
            bootnode: flag("BOOTNODE"),
            bootstrap_peers,
            announce_address,
            data_stream_port,
            debug: flag("DEBUG"),
        })
    }

    /// TCP port of the announce address, if one is set.
    pub fn announce_port(&self) -> Option<u16> {
        let addr = self.announce_address.as_ref()?;

        addr.iter().find_map(|proto| match proto {
            Protocol::Tcp(port) => Some(port),
            _ => None,
        })
    }

    /// Port handed to the external WebSocket data-stream broadcaster:
    /// announced TCP port + 1.
    pub fn ws_port(&self) -> Option<u16> {
        self.announce_port().map(|port| port + 1)
    }

    /// Where the overlay listens: the announced port for bootnodes, an
    /// ephemeral port otherwise.
    pub fn listen_addr(&self) -> Result<Multiaddr> {
        let port = if self.bootnode {
            self.announce_port().ok_or_else(|| {
                eyre!("BOOTNODE=true requires ANNOUNCE_ADDRESS with a TCP port")
            })?
        } else {
            0
        };

        format!("/ip4/0.0.0.0/tcp/{port}")
            .parse()
            .wrap_err("failed to build listen address")
    }
}

fn require(name: &str) -> Result<String> {
    optional(name).ok_or_else(|| eyre!("required environment variable {name} is not set"))
}

fn optional(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|value| !value.is_empty())
}

fn flag(name: &str) -> bool {
    optional(name).is_some_and(|value| value == "true")
}
