use crate::network::device::DeviceId;
use std::fmt::{Display, Formatter};
use std::net::Ipv6Addr;

pub mod bits;
mod trie;

pub use trie::{PatriciaTrie, TrieError};

/// What a matched prefix in the forwarding table resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteEntry {
    /// Directly attached network, reachable through the given device.
    Connected(DeviceId),
    Network {
        next_hop: Ipv6Addr,
    },
}

impl Display for RouteEntry {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            RouteEntry::Connected(device) => write!(f, "connected dev {}", device),
            RouteEntry::Network { next_hop } => write!(f, "via {}", next_hop),
        }
    }
}

pub type Fib = PatriciaTrie<RouteEntry>;
