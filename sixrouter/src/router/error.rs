use crate::network::device::DeviceId;
use crate::network::packet::PacketError;
use crate::route::TrieError;
use pnet_datalink::MacAddr;
use std::io;
use std::net::Ipv6Addr;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RouterError {
    #[error("Malformed packet: {0}")]
    Packet(#[from] PacketError),
    #[error("Unknown device {0}")]
    UnknownDevice(DeviceId),
    #[error("Device {0} has no IPv6 address")]
    NotConfigured(String),
    #[error("Frame to {0} is not addressed to us")]
    NotForUs(MacAddr),
    #[error("Frame sent by ourselves")]
    OwnFrame,
    #[error("Unsupported ether type {0:#06x}")]
    UnsupportedEtherType(u16),
    #[error("Unsupported next header {0}")]
    UnsupportedNextHeader(u8),
    #[error("Unsupported ICMPv6 type {0}")]
    UnsupportedIcmpv6(u8),
    #[error("Multicast group {0} is not joined")]
    ForeignMulticast(Ipv6Addr),
    #[error("Solicitation target {0} is not ours")]
    ForeignTarget(Ipv6Addr),
    #[error("Bad ICMPv6 checksum from {0}")]
    BadChecksum(Ipv6Addr),
    #[error("Hop limit exceeded for {0}")]
    HopLimitExceeded(Ipv6Addr),
    #[error("No route to {0}")]
    NoRoute(Ipv6Addr),
    #[error("Neighbor {0} not resolved yet")]
    Unresolved(Ipv6Addr),
    #[error("Next hop {0} does not resolve to a connected network")]
    RouteLoop(Ipv6Addr),
    #[error("Route error: {0}")]
    Trie(#[from] TrieError),
    #[error("Link io error: {0}")]
    Io(#[from] io::Error),
}

impl RouterError {
    /// Whether this is an ordinary packet drop rather than a local failure.
    pub fn is_drop(&self) -> bool {
        !matches!(
            self,
            RouterError::Io(_) | RouterError::UnknownDevice(_) | RouterError::Trie(_)
        )
    }
}
