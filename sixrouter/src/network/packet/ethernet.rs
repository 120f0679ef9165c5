use crate::network::packet::{ensure_len, PacketError};
use bytes::BufMut;
use pnet_datalink::MacAddr;
use std::fmt::{Display, Formatter};
use std::net::Ipv6Addr;

pub const ETHERNET_HEADER_LEN: usize = 14;
pub const ETHER_ADDR_IPV6_MCAST_PREFIX: [u8; 2] = [0x33, 0x33];

const ETHER_TYPE_IPV6: u16 = 0x86dd;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EtherType {
    Ipv6,
    Unknown(u16),
}

impl From<u16> for EtherType {
    fn from(value: u16) -> Self {
        match value {
            ETHER_TYPE_IPV6 => EtherType::Ipv6,
            other => EtherType::Unknown(other),
        }
    }
}

impl From<EtherType> for u16 {
    fn from(value: EtherType) -> Self {
        match value {
            EtherType::Ipv6 => ETHER_TYPE_IPV6,
            EtherType::Unknown(other) => other,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EthernetHeader {
    pub dst: MacAddr,
    pub src: MacAddr,
    pub ether_type: EtherType,
}

impl EthernetHeader {
    pub fn parse(buf: &[u8]) -> Result<Self, PacketError> {
        ensure_len("Ethernet header", buf, ETHERNET_HEADER_LEN)?;
        Ok(Self {
            dst: MacAddr::new(buf[0], buf[1], buf[2], buf[3], buf[4], buf[5]),
            src: MacAddr::new(buf[6], buf[7], buf[8], buf[9], buf[10], buf[11]),
            ether_type: u16::from_be_bytes([buf[12], buf[13]]).into(),
        })
    }

    pub fn emit<B: BufMut>(&self, buf: &mut B) {
        buf.put_slice(&self.dst.octets());
        buf.put_slice(&self.src.octets());
        buf.put_u16(self.ether_type.into());
    }
}

impl Display for EthernetHeader {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[src={}, dst={}, type={:#06x}]",
            self.src,
            self.dst,
            u16::from(self.ether_type)
        )
    }
}

/// `33:33` followed by the low 32 bits of the IPv6 multicast group (RFC 2464 section 7).
pub fn ipv6_multicast_mac(group: &Ipv6Addr) -> MacAddr {
    let o = group.octets();
    MacAddr::new(
        ETHER_ADDR_IPV6_MCAST_PREFIX[0],
        ETHER_ADDR_IPV6_MCAST_PREFIX[1],
        o[12],
        o[13],
        o[14],
        o[15],
    )
}

pub fn is_ipv6_multicast_mac(mac: &MacAddr) -> bool {
    let o = mac.octets();
    o[..2] == ETHER_ADDR_IPV6_MCAST_PREFIX
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::BytesMut;

    #[test]
    fn test_parse_header() {
        let frame = [
            0x33, 0x33, 0xff, 0x00, 0x00, 0x02, 0xaa, 0xbb, 0xcc, 0xdd, 0xee, 0xff, 0x86, 0xdd,
            0x60,
        ];
        let header = EthernetHeader::parse(&frame).unwrap();
        assert_eq!(header.dst, MacAddr::new(0x33, 0x33, 0xff, 0, 0, 2));
        assert_eq!(header.src, MacAddr::new(0xaa, 0xbb, 0xcc, 0xdd, 0xee, 0xff));
        assert_eq!(header.ether_type, EtherType::Ipv6);
        assert!(is_ipv6_multicast_mac(&header.dst));
        assert!(!is_ipv6_multicast_mac(&header.src));
    }

    #[test]
    fn test_short_frame() {
        let err = EthernetHeader::parse(&[0u8; 13]).unwrap_err();
        assert_eq!(
            err,
            PacketError::Truncated {
                what: "Ethernet header",
                need: 14,
                got: 13
            }
        );
    }

    #[test]
    fn test_emit_unknown_type() {
        let header = EthernetHeader {
            dst: MacAddr::broadcast(),
            src: MacAddr::new(2, 0, 0, 0, 0, 1),
            ether_type: 0x0806u16.into(),
        };
        assert_eq!(header.ether_type, EtherType::Unknown(0x0806));
        let mut buf = BytesMut::new();
        header.emit(&mut buf);
        assert_eq!(&buf[..], &[0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 2, 0, 0, 0, 0, 1, 0x08, 0x06]);
    }

    #[test]
    fn test_multicast_mac() {
        let group: Ipv6Addr = "ff02::1:ff12:3456".parse().unwrap();
        assert_eq!(
            ipv6_multicast_mac(&group),
            MacAddr::new(0x33, 0x33, 0xff, 0x12, 0x34, 0x56)
        );
    }
}
