use crate::network::packet::{ensure_len, PacketError};
use bytes::BufMut;
use std::fmt::{Display, Formatter};
use std::net::Ipv6Addr;

pub const IPV6_HEADER_LEN: usize = 40;
pub const PSEUDO_HEADER_LEN: usize = 40;
pub const DEFAULT_HOP_LIMIT: u8 = 64;

const IPV6_PROTOCOL_NUM_ICMP: u8 = 0x3a;
// ff02::1:ff00:0/104
const SOLICITED_NODE_PREFIX: [u8; 13] = [
    0xff, 0x02, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0x01, 0xff,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NextHeader {
    Icmpv6,
    Unknown(u8),
}

impl From<u8> for NextHeader {
    fn from(value: u8) -> Self {
        match value {
            IPV6_PROTOCOL_NUM_ICMP => NextHeader::Icmpv6,
            other => NextHeader::Unknown(other),
        }
    }
}

impl From<NextHeader> for u8 {
    fn from(value: NextHeader) -> Self {
        match value {
            NextHeader::Icmpv6 => IPV6_PROTOCOL_NUM_ICMP,
            NextHeader::Unknown(other) => other,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ipv6Header {
    pub traffic_class: u8,
    // only the low 20 bits are carried on the wire
    pub flow_label: u32,
    pub payload_len: u16,
    pub next_header: NextHeader,
    pub hop_limit: u8,
    pub src: Ipv6Addr,
    pub dst: Ipv6Addr,
}

impl Ipv6Header {
    pub fn new(
        src: Ipv6Addr,
        dst: Ipv6Addr,
        next_header: NextHeader,
        payload_len: u16,
        hop_limit: u8,
    ) -> Self {
        Self {
            traffic_class: 0,
            flow_label: 0,
            payload_len,
            next_header,
            hop_limit,
            src,
            dst,
        }
    }

    pub fn parse(buf: &[u8]) -> Result<Self, PacketError> {
        ensure_len("IPv6 header", buf, IPV6_HEADER_LEN)?;
        let word = u32::from_be_bytes([buf[0], buf[1], buf[2], buf[3]]);
        let version = (word >> 28) as u8;
        if version != 6 {
            return Err(PacketError::BadVersion(version));
        }
        Ok(Self {
            traffic_class: (word >> 20) as u8,
            flow_label: word & 0x000f_ffff,
            payload_len: u16::from_be_bytes([buf[4], buf[5]]),
            next_header: buf[6].into(),
            hop_limit: buf[7],
            src: read_addr(buf, 8),
            dst: read_addr(buf, 24),
        })
    }

    pub fn emit<B: BufMut>(&self, buf: &mut B) {
        let word =
            (6u32 << 28) | ((self.traffic_class as u32) << 20) | (self.flow_label & 0x000f_ffff);
        buf.put_u32(word);
        buf.put_u16(self.payload_len);
        buf.put_u8(self.next_header.into());
        buf.put_u8(self.hop_limit);
        buf.put_slice(&self.src.octets());
        buf.put_slice(&self.dst.octets());
    }

    /// The bytes this header covers inside `packet`, dropping link-layer padding.
    pub fn covered<'a>(&self, packet: &'a [u8]) -> Result<&'a [u8], PacketError> {
        let end = IPV6_HEADER_LEN + self.payload_len as usize;
        if packet.len() < end {
            return Err(PacketError::PayloadLength {
                declared: self.payload_len as usize,
                available: packet.len().saturating_sub(IPV6_HEADER_LEN),
            });
        }
        Ok(&packet[..end])
    }
}

impl Display for Ipv6Header {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[src={}, dst={}, len={}, next={}, hop={}]",
            self.src,
            self.dst,
            self.payload_len,
            u8::from(self.next_header),
            self.hop_limit
        )
    }
}

/// Checksum input for upper-layer protocols; never transmitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PseudoHeader {
    pub src: Ipv6Addr,
    pub dst: Ipv6Addr,
    pub upper_len: u32,
    pub next_header: NextHeader,
}

impl PseudoHeader {
    pub fn to_bytes(&self) -> [u8; PSEUDO_HEADER_LEN] {
        let mut out = [0u8; PSEUDO_HEADER_LEN];
        out[..16].copy_from_slice(&self.src.octets());
        out[16..32].copy_from_slice(&self.dst.octets());
        out[32..36].copy_from_slice(&self.upper_len.to_be_bytes());
        // 3 bytes of zero padding
        out[39] = self.next_header.into();
        out
    }
}

pub(crate) fn read_addr(buf: &[u8], offset: usize) -> Ipv6Addr {
    let mut octets = [0u8; 16];
    octets.copy_from_slice(&buf[offset..offset + 16]);
    Ipv6Addr::from(octets)
}

/// ff02::1:ffXX:XXXX carrying the low 24 bits of `addr`.
pub fn solicited_node_multicast(addr: &Ipv6Addr) -> Ipv6Addr {
    let mut octets = [0u8; 16];
    octets[..13].copy_from_slice(&SOLICITED_NODE_PREFIX);
    octets[13..].copy_from_slice(&addr.octets()[13..]);
    Ipv6Addr::from(octets)
}

pub fn same_low24(a: &Ipv6Addr, b: &Ipv6Addr) -> bool {
    a.octets()[13..] == b.octets()[13..]
}
