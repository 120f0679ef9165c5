use crate::network::device::DeviceId;
use crate::network::packet::ethernet::EthernetHeader;
use crate::network::packet::icmpv6::{
    verify_icmpv6_checksum, EchoMessage, Icmpv6Header, Icmpv6Type, NdOptionType, NeighborMessage,
    NA_FLAG_OVERRIDE, NA_FLAG_SOLICITED,
};
use crate::network::packet::ipv6::{solicited_node_multicast, NextHeader};
use crate::router::{Router, RouterError};
use std::net::Ipv6Addr;

/// Hop limit of every Neighbor Discovery message we originate (RFC 4861).
pub const ND_HOP_LIMIT: u8 = 255;

impl Router {
    pub(crate) fn icmpv6_input(
        &mut self,
        id: DeviceId,
        eth: &EthernetHeader,
        src: Ipv6Addr,
        dst: Ipv6Addr,
        message: &[u8],
    ) -> Result<(), RouterError> {
        let header = Icmpv6Header::parse(message)?;
        if !verify_icmpv6_checksum(src, dst, message) {
            return Err(RouterError::BadChecksum(src));
        }
        tracing::trace!(
            "[ICMPv6] type={} code={} from {}",
            u8::from(header.msg_type),
            header.code,
            src
        );
        match header.msg_type {
            Icmpv6Type::EchoRequest => self.icmpv6_echo_request(id, src, message),
            Icmpv6Type::NeighborSolicitation => {
                self.icmpv6_neighbor_solicitation(id, eth, src, message)
            }
            Icmpv6Type::NeighborAdvertisement => self.icmpv6_neighbor_advertisement(id, message),
            other => Err(RouterError::UnsupportedIcmpv6(other.into())),
        }
    }

    fn icmpv6_echo_request(
        &mut self,
        id: DeviceId,
        src: Ipv6Addr,
        message: &[u8],
    ) -> Result<(), RouterError> {
        let request = EchoMessage::parse(message)?;
        let local = self.device_ipv6(id)?.address;
        tracing::debug!(
            "[ICMPv6] Echo request id={} seq={} from {}",
            request.identifier,
            request.sequence,
            src
        );
        let reply = request.reply().to_bytes(local, src);
        self.ipv6_encap_output(src, local, &reply, NextHeader::Icmpv6)
    }

    fn icmpv6_neighbor_solicitation(
        &mut self,
        id: DeviceId,
        eth: &EthernetHeader,
        src: Ipv6Addr,
        message: &[u8],
    ) -> Result<(), RouterError> {
        let ns = NeighborMessage::parse(message)?;
        let config = self.device_ipv6(id)?;
        if ns.target != config.address {
            return Err(RouterError::ForeignTarget(ns.target));
        }
        let solicitor_mac = match ns.option_type {
            NdOptionType::SourceLinkLayerAddress => ns.link_addr,
            // no usable option, answer whoever sent the frame
            _ => eth.src,
        };
        tracing::debug!(
            "[ND] Solicitation for {} from {} ({})",
            ns.target,
            src,
            solicitor_mac
        );
        self.update_neighbor(id, solicitor_mac, src);

        let mac = self.device(id)?.mac();
        let na = NeighborMessage::advertisement(ns.target, mac, NA_FLAG_SOLICITED | NA_FLAG_OVERRIDE)
            .to_bytes(config.address, src);
        self.ipv6_encap_dev_output(
            id,
            solicitor_mac,
            src,
            &na,
            NextHeader::Icmpv6,
            ND_HOP_LIMIT,
        )
    }

    fn icmpv6_neighbor_advertisement(
        &mut self,
        id: DeviceId,
        message: &[u8],
    ) -> Result<(), RouterError> {
        let na = NeighborMessage::parse(message)?;
        if na.option_type != NdOptionType::TargetLinkLayerAddress {
            tracing::trace!(
                "[ND] Advertisement for {} carries option type {}",
                na.target,
                u8::from(na.option_type)
            );
        }
        tracing::debug!("[ND] Advertisement {} is at {}", na.target, na.link_addr);
        self.update_neighbor(id, na.link_addr, na.target);
        Ok(())
    }

    /// Ask the solicited-node group on `id` for the link-layer address of `target`.
    pub fn send_neighbor_solicitation(
        &mut self,
        id: DeviceId,
        target: Ipv6Addr,
    ) -> Result<(), RouterError> {
        let config = self.device_ipv6(id)?;
        let mac = self.device(id)?.mac();
        let group = solicited_node_multicast(&target);
        let ns = NeighborMessage::solicitation(target, mac).to_bytes(config.address, group);
        tracing::debug!("[ND] Soliciting {} via {} on {}", target, group, id);
        self.ipv6_encap_dev_mcast_output(id, group, &ns, NextHeader::Icmpv6)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::packet::icmpv6::NEIGHBOR_MSG_LEN;
    use crate::network::packet::ipv6::DEFAULT_HOP_LIMIT;
    use crate::router::testing::*;
    use pnet_datalink::MacAddr;
    use tracing_test::traced_test;

    const HOST: &str = "2001:db8:0:1001::2";

    fn echo_request_frame(host: &Link) -> bytes::BytesMut {
        let request = EchoMessage::request(0x1234, 9, b"abcdefgh").to_bytes(addr(HOST), host.addr);
        ipv6_frame(host.mac, HOST_MAC, addr(HOST), host.addr, 64, &request)
    }

    #[test]
    fn test_echo_reply_with_neighbor() {
        let (mut router, host, peer) = two_link_router(0);
        router
            .configure_static_nd_entry(host.id, HOST_MAC, addr(HOST))
            .unwrap();
        router
            .ethernet_input(host.id, &echo_request_frame(&host))
            .unwrap();

        let sent = host.sent();
        assert_eq!(sent.len(), 1);
        let (eth, ip, body) = split_frame(&sent[0]);
        assert_eq!(eth.dst, HOST_MAC);
        assert_eq!(eth.src, host.mac);
        assert_eq!(ip.src, host.addr);
        assert_eq!(ip.dst, addr(HOST));
        assert_eq!(ip.hop_limit, DEFAULT_HOP_LIMIT);
        assert_eq!(ip.next_header, NextHeader::Icmpv6);

        let reply = EchoMessage::parse(body).unwrap();
        assert_eq!(reply.header.msg_type, Icmpv6Type::EchoReply);
        assert_eq!(reply.identifier, 0x1234);
        assert_eq!(reply.sequence, 9);
        assert_eq!(reply.data, b"abcdefgh");
        assert!(verify_icmpv6_checksum(ip.src, ip.dst, body));
        assert!(peer.sent().is_empty());
    }

    #[test]
    fn test_echo_to_other_interface_address() {
        let (mut router, host, peer) = two_link_router(0);
        router
            .configure_static_nd_entry(host.id, HOST_MAC, addr(HOST))
            .unwrap();
        let request = EchoMessage::request(0x42, 3, b"far side").to_bytes(addr(HOST), peer.addr);
        let frame = ipv6_frame(host.mac, HOST_MAC, addr(HOST), peer.addr, 64, &request);
        router.ethernet_input(host.id, &frame).unwrap();

        // answered locally from the receiving link, never forwarded
        assert!(peer.sent().is_empty());
        let sent = host.sent();
        assert_eq!(sent.len(), 1);
        let (eth, ip, body) = split_frame(&sent[0]);
        assert_eq!(eth.dst, HOST_MAC);
        assert_eq!(ip.src, host.addr);
        assert_eq!(ip.dst, addr(HOST));
        let reply = EchoMessage::parse(body).unwrap();
        assert_eq!(reply.header.msg_type, Icmpv6Type::EchoReply);
        assert_eq!(reply.identifier, 0x42);
        assert_eq!(reply.data, b"far side");
        assert!(verify_icmpv6_checksum(ip.src, ip.dst, body));
    }

    #[test]
    fn test_echo_reply_without_neighbor() {
        let (mut router, host, _peer) = two_link_router(0);
        assert!(matches!(
            router.ethernet_input(host.id, &echo_request_frame(&host)),
            Err(RouterError::Unresolved(a)) if a == addr(HOST)
        ));

        // the reply is lost, but the host gets solicited
        let sent = host.sent();
        assert_eq!(sent.len(), 1);
        let (eth, ip, body) = split_frame(&sent[0]);
        assert_eq!(eth.dst, MacAddr::new(0x33, 0x33, 0xff, 0, 0, 2));
        assert_eq!(ip.dst, addr("ff02::1:ff00:2"));
        assert_eq!(ip.hop_limit, ND_HOP_LIMIT);
        let ns = NeighborMessage::parse(body).unwrap();
        assert_eq!(ns.header.msg_type, Icmpv6Type::NeighborSolicitation);
        assert_eq!(ns.target, addr(HOST));
        assert_eq!(ns.option_type, NdOptionType::SourceLinkLayerAddress);
        assert_eq!(ns.link_addr, host.mac);
    }

    #[test]
    fn test_solicitation_answered() {
        let (mut router, host, _peer) = two_link_router(0);
        let group = solicited_node_multicast(&host.addr);
        let ns = NeighborMessage::solicitation(host.addr, HOST_MAC).to_bytes(addr(HOST), group);
        let frame = ipv6_frame(
            MacAddr::new(0x33, 0x33, 0xff, 0, 0, 1),
            HOST_MAC,
            addr(HOST),
            group,
            ND_HOP_LIMIT,
            &ns,
        );
        router.ethernet_input(host.id, &frame).unwrap();

        let entry = router.neighbors().lookup(&addr(HOST)).unwrap();
        assert_eq!(entry.mac, HOST_MAC);
        assert_eq!(entry.device, host.id);

        let sent = host.sent();
        assert_eq!(sent.len(), 1);
        let (eth, ip, body) = split_frame(&sent[0]);
        assert_eq!(eth.dst, HOST_MAC);
        assert_eq!(ip.src, host.addr);
        assert_eq!(ip.dst, addr(HOST));
        assert_eq!(ip.hop_limit, ND_HOP_LIMIT);
        assert_eq!(body.len(), NEIGHBOR_MSG_LEN);
        let na = NeighborMessage::parse(body).unwrap();
        assert_eq!(na.header.msg_type, Icmpv6Type::NeighborAdvertisement);
        assert!(na.is_solicited());
        assert!(na.is_override());
        assert_eq!(na.target, host.addr);
        assert_eq!(na.option_type, NdOptionType::TargetLinkLayerAddress);
        assert_eq!(na.link_addr, host.mac);
        assert!(verify_icmpv6_checksum(ip.src, ip.dst, body));
    }

    #[test]
    fn test_solicitation_for_other_target() {
        let (mut router, host, _peer) = two_link_router(0);
        let target = addr("2001:db8:0:1001::99");
        let ns = NeighborMessage::solicitation(target, HOST_MAC).to_bytes(addr(HOST), host.addr);
        let frame = ipv6_frame(host.mac, HOST_MAC, addr(HOST), host.addr, ND_HOP_LIMIT, &ns);
        assert!(matches!(
            router.ethernet_input(host.id, &frame),
            Err(RouterError::ForeignTarget(a)) if a == target
        ));
        assert!(router.neighbors().is_empty());
        assert!(host.sent().is_empty());
    }

    #[traced_test]
    #[test]
    fn test_advertisement_updates_cache() {
        let (mut router, host, _peer) = two_link_router(0);
        let na = NeighborMessage::advertisement(addr(HOST), HOST_MAC, NA_FLAG_SOLICITED)
            .to_bytes(addr(HOST), host.addr);
        let frame = ipv6_frame(host.mac, HOST_MAC, addr(HOST), host.addr, ND_HOP_LIMIT, &na);
        router.ethernet_input(host.id, &frame).unwrap();
        assert_eq!(router.neighbors().lookup(&addr(HOST)).unwrap().mac, HOST_MAC);
        assert!(logs_contain("[ND] Inserted"));

        let moved = MacAddr::new(0xaa, 0xbb, 0xcc, 0, 0, 0x22);
        let na = NeighborMessage::advertisement(addr(HOST), moved, NA_FLAG_OVERRIDE)
            .to_bytes(addr(HOST), host.addr);
        let frame = ipv6_frame(host.mac, HOST_MAC, addr(HOST), host.addr, ND_HOP_LIMIT, &na);
        router.ethernet_input(host.id, &frame).unwrap();
        assert_eq!(router.neighbors().lookup(&addr(HOST)).unwrap().mac, moved);
        assert_eq!(router.neighbors().len(), 1);
    }

    #[test]
    fn test_advertisement_with_source_option() {
        let (mut router, host, _peer) = two_link_router(0);
        let mut na = NeighborMessage::advertisement(addr(HOST), HOST_MAC, NA_FLAG_SOLICITED);
        na.option_type = NdOptionType::SourceLinkLayerAddress;
        let na = na.to_bytes(addr(HOST), host.addr);
        let frame = ipv6_frame(host.mac, HOST_MAC, addr(HOST), host.addr, ND_HOP_LIMIT, &na);
        router.ethernet_input(host.id, &frame).unwrap();

        let entry = router.neighbors().lookup(&addr(HOST)).unwrap();
        assert_eq!(entry.mac, HOST_MAC);
        assert_eq!(entry.device, host.id);
        assert!(host.sent().is_empty());
    }

    #[test]
    fn test_rejects_bad_messages() {
        let (mut router, host, _peer) = two_link_router(0);
        let mut request = EchoMessage::request(1, 1, b"x").to_bytes(addr(HOST), host.addr);
        request[3] ^= 0xff;
        let frame = ipv6_frame(host.mac, HOST_MAC, addr(HOST), host.addr, 64, &request);
        assert!(matches!(
            router.ethernet_input(host.id, &frame),
            Err(RouterError::BadChecksum(_))
        ));

        let frame = ipv6_frame(host.mac, HOST_MAC, addr(HOST), host.addr, 64, &[128, 0, 0]);
        assert!(matches!(
            router.ethernet_input(host.id, &frame),
            Err(RouterError::Packet(_))
        ));

        let reply = EchoMessage::request(1, 1, b"x")
            .reply()
            .to_bytes(addr(HOST), host.addr);
        let frame = ipv6_frame(host.mac, HOST_MAC, addr(HOST), host.addr, 64, &reply);
        assert!(matches!(
            router.ethernet_input(host.id, &frame),
            Err(RouterError::UnsupportedIcmpv6(129))
        ));

        // a solicitation too short to carry its option
        let ns = NeighborMessage::solicitation(host.addr, HOST_MAC).to_bytes(addr(HOST), host.addr);
        let mut short = ns[..24].to_vec();
        crate::network::packet::icmpv6::fill_icmpv6_checksum(addr(HOST), host.addr, &mut short);
        let frame = ipv6_frame(host.mac, HOST_MAC, addr(HOST), host.addr, ND_HOP_LIMIT, &short);
        assert!(matches!(
            router.ethernet_input(host.id, &frame),
            Err(RouterError::Packet(_))
        ));
        assert!(host.sent().is_empty());
    }
}
