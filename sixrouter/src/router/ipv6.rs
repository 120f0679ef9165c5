use crate::network::device::DeviceId;
use crate::network::packet::ethernet::{ipv6_multicast_mac, EtherType, EthernetHeader};
use crate::network::packet::ipv6::{
    same_low24, Ipv6Header, NextHeader, DEFAULT_HOP_LIMIT, IPV6_HEADER_LEN,
};
use crate::route::RouteEntry;
use crate::router::icmpv6::ND_HOP_LIMIT;
use crate::router::{Router, RouterError};
use bytes::{BufMut, Bytes, BytesMut};
use pnet_datalink::MacAddr;
use std::net::Ipv6Addr;

/// Static routes may point at next hops that are themselves behind static
/// routes; give up after this many indirections.
pub const MAX_NEXT_HOP_DEPTH: usize = 8;

impl Router {
    pub(crate) fn ipv6_input(
        &mut self,
        id: DeviceId,
        eth: &EthernetHeader,
        packet: &[u8],
    ) -> Result<(), RouterError> {
        let config = self.device_ipv6(id)?;
        let header = Ipv6Header::parse(packet)?;
        // anything past the payload length is link-layer padding
        let packet = header.covered(packet)?;
        tracing::trace!("[IPv6] Received {}", header);

        if header.dst.is_multicast() {
            if !same_low24(&header.dst, &config.address) {
                return Err(RouterError::ForeignMulticast(header.dst));
            }
            return self.ipv6_local_input(id, eth, &header, &packet[IPV6_HEADER_LEN..]);
        }
        if self.is_local_address(&header.dst) {
            return self.ipv6_local_input(id, eth, &header, &packet[IPV6_HEADER_LEN..]);
        }
        self.ipv6_forward(&header, packet)
    }

    fn ipv6_local_input(
        &mut self,
        id: DeviceId,
        eth: &EthernetHeader,
        header: &Ipv6Header,
        payload: &[u8],
    ) -> Result<(), RouterError> {
        match header.next_header {
            NextHeader::Icmpv6 => self.icmpv6_input(id, eth, header.src, header.dst, payload),
            NextHeader::Unknown(proto) => Err(RouterError::UnsupportedNextHeader(proto)),
        }
    }

    fn ipv6_forward(&mut self, header: &Ipv6Header, packet: &[u8]) -> Result<(), RouterError> {
        if header.hop_limit <= 1 {
            return Err(RouterError::HopLimitExceeded(header.dst));
        }
        let route = match self.fib.search(header.dst) {
            Some(found) => {
                tracing::debug!(
                    "[Route] Forwarding {} -> {} via {} ({})",
                    header.src,
                    header.dst,
                    found,
                    found.route
                );
                *found.route
            }
            None => return Err(RouterError::NoRoute(header.dst)),
        };

        let forwarded = Ipv6Header {
            hop_limit: header.hop_limit - 1,
            ..*header
        };
        let mut out = BytesMut::with_capacity(packet.len());
        forwarded.emit(&mut out);
        out.put_slice(&packet[IPV6_HEADER_LEN..]);
        let out = out.freeze();

        match route {
            RouteEntry::Connected(out_dev) => self.output_to_host(out_dev, header.dst, out),
            RouteEntry::Network { next_hop } => self.output_to_next_hop(next_hop, out),
        }
    }

    /// Build an IPv6 packet and send it wherever the forwarding table says.
    pub fn ipv6_encap_output(
        &mut self,
        dst: Ipv6Addr,
        src: Ipv6Addr,
        payload: &[u8],
        next_header: NextHeader,
    ) -> Result<(), RouterError> {
        let packet = build_packet(src, dst, next_header, DEFAULT_HOP_LIMIT, payload);
        match self.fib.search(dst).map(|found| *found.route) {
            Some(RouteEntry::Connected(out_dev)) => self.output_to_host(out_dev, dst, packet),
            Some(RouteEntry::Network { next_hop }) => self.output_to_next_hop(next_hop, packet),
            None => Err(RouterError::NoRoute(dst)),
        }
    }

    /// Send straight to a known link-layer address, sourced from the device's address.
    pub fn ipv6_encap_dev_output(
        &mut self,
        id: DeviceId,
        dst_mac: MacAddr,
        dst: Ipv6Addr,
        payload: &[u8],
        next_header: NextHeader,
        hop_limit: u8,
    ) -> Result<(), RouterError> {
        let src = self.device_ipv6(id)?.address;
        let packet = build_packet(src, dst, next_header, hop_limit, payload);
        self.ethernet_output(id, dst_mac, &packet, EtherType::Ipv6)
    }

    /// Send to a multicast group on one link. Used for neighbor solicitations.
    pub fn ipv6_encap_dev_mcast_output(
        &mut self,
        id: DeviceId,
        group: Ipv6Addr,
        payload: &[u8],
        next_header: NextHeader,
    ) -> Result<(), RouterError> {
        let dst_mac = ipv6_multicast_mac(&group);
        self.ipv6_encap_dev_output(id, dst_mac, group, payload, next_header, ND_HOP_LIMIT)
    }

    /// Deliver to a host on a directly connected network.
    pub(crate) fn output_to_host(
        &mut self,
        id: DeviceId,
        dst: Ipv6Addr,
        packet: Bytes,
    ) -> Result<(), RouterError> {
        match self.neighbors.lookup(&dst).map(|entry| entry.mac) {
            Some(mac) => self.ethernet_output(id, mac, &packet, EtherType::Ipv6),
            None => {
                self.send_neighbor_solicitation(id, dst)?;
                self.hold_or_drop(dst, id, packet)
            }
        }
    }

    /// Deliver through a gateway, following static routes until the gateway
    /// sits on a connected network.
    pub(crate) fn output_to_next_hop(
        &mut self,
        next_hop: Ipv6Addr,
        packet: Bytes,
    ) -> Result<(), RouterError> {
        let mut hop = next_hop;
        for _ in 0..MAX_NEXT_HOP_DEPTH {
            if let Some(entry) = self.neighbors.lookup(&hop).copied() {
                return self.ethernet_output(entry.device, entry.mac, &packet, EtherType::Ipv6);
            }
            match self.fib.search(hop).map(|found| *found.route) {
                Some(RouteEntry::Connected(out_dev)) => {
                    self.send_neighbor_solicitation(out_dev, hop)?;
                    return self.hold_or_drop(hop, out_dev, packet);
                }
                Some(RouteEntry::Network { next_hop }) => {
                    tracing::trace!("[Route] Next hop {} is behind {}", hop, next_hop);
                    hop = next_hop;
                }
                None => return Err(RouterError::NoRoute(hop)),
            }
        }
        Err(RouterError::RouteLoop(next_hop))
    }

    fn hold_or_drop(
        &mut self,
        neighbor: Ipv6Addr,
        id: DeviceId,
        packet: Bytes,
    ) -> Result<(), RouterError> {
        if self.pending.push(neighbor, id, packet) {
            tracing::debug!("[ND] Holding packet until {} is resolved", neighbor);
            Ok(())
        } else {
            Err(RouterError::Unresolved(neighbor))
        }
    }

    /// Transmit everything that was waiting for `neighbor`.
    pub(crate) fn flush_pending(&mut self, neighbor: &Ipv6Addr, mac: MacAddr) {
        let Some(frames) = self.pending.take(neighbor) else {
            return;
        };
        tracing::debug!("[ND] Releasing {} packets for {}", frames.len(), neighbor);
        for frame in frames {
            if let Err(e) = self.ethernet_output(frame.device, mac, &frame.packet, EtherType::Ipv6)
            {
                tracing::warn!("[ND] Failed to release packet for {}: {}", neighbor, e);
            }
        }
    }
}

fn build_packet(
    src: Ipv6Addr,
    dst: Ipv6Addr,
    next_header: NextHeader,
    hop_limit: u8,
    payload: &[u8],
) -> Bytes {
    let mut buf = BytesMut::with_capacity(IPV6_HEADER_LEN + payload.len());
    // payloads are bounded by the frame size
    Ipv6Header::new(src, dst, next_header, payload.len() as u16, hop_limit).emit(&mut buf);
    buf.put_slice(payload);
    buf.freeze()
}
