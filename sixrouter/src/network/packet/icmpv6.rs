use crate::network::packet::checksum::checksum16;
use crate::network::packet::ipv6::{read_addr, NextHeader, PseudoHeader};
use crate::network::packet::{ensure_len, PacketError};
use bytes::{BufMut, BytesMut};
use pnet_datalink::MacAddr;
use std::net::Ipv6Addr;

pub const ICMPV6_HEADER_LEN: usize = 4;
pub const ECHO_HEADER_LEN: usize = 8;
/// NS/NA with exactly one link-layer address option.
pub const NEIGHBOR_MSG_LEN: usize = 32;

pub const NA_FLAG_ROUTER: u32 = 0x8000_0000;
pub const NA_FLAG_SOLICITED: u32 = 0x4000_0000;
pub const NA_FLAG_OVERRIDE: u32 = 0x2000_0000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Icmpv6Type {
    EchoRequest,
    EchoReply,
    RouterSolicitation,
    RouterAdvertisement,
    NeighborSolicitation,
    NeighborAdvertisement,
    Unknown(u8),
}

impl From<u8> for Icmpv6Type {
    fn from(value: u8) -> Self {
        match value {
            128 => Icmpv6Type::EchoRequest,
            129 => Icmpv6Type::EchoReply,
            133 => Icmpv6Type::RouterSolicitation,
            134 => Icmpv6Type::RouterAdvertisement,
            135 => Icmpv6Type::NeighborSolicitation,
            136 => Icmpv6Type::NeighborAdvertisement,
            other => Icmpv6Type::Unknown(other),
        }
    }
}

impl From<Icmpv6Type> for u8 {
    fn from(value: Icmpv6Type) -> Self {
        match value {
            Icmpv6Type::EchoRequest => 128,
            Icmpv6Type::EchoReply => 129,
            Icmpv6Type::RouterSolicitation => 133,
            Icmpv6Type::RouterAdvertisement => 134,
            Icmpv6Type::NeighborSolicitation => 135,
            Icmpv6Type::NeighborAdvertisement => 136,
            Icmpv6Type::Unknown(other) => other,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NdOptionType {
    SourceLinkLayerAddress,
    TargetLinkLayerAddress,
    Unknown(u8),
}

impl From<u8> for NdOptionType {
    fn from(value: u8) -> Self {
        match value {
            1 => NdOptionType::SourceLinkLayerAddress,
            2 => NdOptionType::TargetLinkLayerAddress,
            other => NdOptionType::Unknown(other),
        }
    }
}

impl From<NdOptionType> for u8 {
    fn from(value: NdOptionType) -> Self {
        match value {
            NdOptionType::SourceLinkLayerAddress => 1,
            NdOptionType::TargetLinkLayerAddress => 2,
            NdOptionType::Unknown(other) => other,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Icmpv6Header {
    pub msg_type: Icmpv6Type,
    pub code: u8,
    pub checksum: u16,
}

impl Icmpv6Header {
    pub fn new(msg_type: Icmpv6Type) -> Self {
        Self {
            msg_type,
            code: 0,
            checksum: 0,
        }
    }

    pub fn parse(buf: &[u8]) -> Result<Self, PacketError> {
        ensure_len("ICMPv6 header", buf, ICMPV6_HEADER_LEN)?;
        Ok(Self {
            msg_type: buf[0].into(),
            code: buf[1],
            checksum: u16::from_be_bytes([buf[2], buf[3]]),
        })
    }

    pub fn emit<B: BufMut>(&self, buf: &mut B) {
        buf.put_u8(self.msg_type.into());
        buf.put_u8(self.code);
        buf.put_u16(self.checksum);
    }
}

/// Neighbor Solicitation / Advertisement carrying one link-layer address option.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NeighborMessage {
    pub header: Icmpv6Header,
    pub flags: u32,
    pub target: Ipv6Addr,
    pub option_type: NdOptionType,
    // in units of 8 bytes
    pub option_len: u8,
    pub link_addr: MacAddr,
}

impl NeighborMessage {
    pub fn solicitation(target: Ipv6Addr, source_link_addr: MacAddr) -> Self {
        Self {
            header: Icmpv6Header::new(Icmpv6Type::NeighborSolicitation),
            flags: 0,
            target,
            option_type: NdOptionType::SourceLinkLayerAddress,
            option_len: 1,
            link_addr: source_link_addr,
        }
    }

    pub fn advertisement(target: Ipv6Addr, target_link_addr: MacAddr, flags: u32) -> Self {
        Self {
            header: Icmpv6Header::new(Icmpv6Type::NeighborAdvertisement),
            flags,
            target,
            option_type: NdOptionType::TargetLinkLayerAddress,
            option_len: 1,
            link_addr: target_link_addr,
        }
    }

    pub fn parse(buf: &[u8]) -> Result<Self, PacketError> {
        ensure_len("ICMPv6 neighbor message", buf, NEIGHBOR_MSG_LEN)?;
        Ok(Self {
            header: Icmpv6Header::parse(buf)?,
            flags: u32::from_be_bytes([buf[4], buf[5], buf[6], buf[7]]),
            target: read_addr(buf, 8),
            option_type: buf[24].into(),
            option_len: buf[25],
            link_addr: MacAddr::new(buf[26], buf[27], buf[28], buf[29], buf[30], buf[31]),
        })
    }

    pub fn emit<B: BufMut>(&self, buf: &mut B) {
        self.header.emit(buf);
        buf.put_u32(self.flags);
        buf.put_slice(&self.target.octets());
        buf.put_u8(self.option_type.into());
        buf.put_u8(self.option_len);
        buf.put_slice(&self.link_addr.octets());
    }

    pub fn is_solicited(&self) -> bool {
        self.flags & NA_FLAG_SOLICITED != 0
    }

    pub fn is_override(&self) -> bool {
        self.flags & NA_FLAG_OVERRIDE != 0
    }

    /// Serialize with the checksum computed for the given IPv6 endpoints.
    pub fn to_bytes(&self, src: Ipv6Addr, dst: Ipv6Addr) -> BytesMut {
        let mut buf = BytesMut::with_capacity(NEIGHBOR_MSG_LEN);
        self.emit(&mut buf);
        fill_icmpv6_checksum(src, dst, &mut buf);
        buf
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EchoMessage<'a> {
    pub header: Icmpv6Header,
    pub identifier: u16,
    pub sequence: u16,
    pub data: &'a [u8],
}

impl<'a> EchoMessage<'a> {
    pub fn request(identifier: u16, sequence: u16, data: &'a [u8]) -> Self {
        Self {
            header: Icmpv6Header::new(Icmpv6Type::EchoRequest),
            identifier,
            sequence,
            data,
        }
    }

    pub fn parse(buf: &'a [u8]) -> Result<Self, PacketError> {
        ensure_len("ICMPv6 echo", buf, ECHO_HEADER_LEN)?;
        Ok(Self {
            header: Icmpv6Header::parse(buf)?,
            identifier: u16::from_be_bytes([buf[4], buf[5]]),
            sequence: u16::from_be_bytes([buf[6], buf[7]]),
            data: &buf[ECHO_HEADER_LEN..],
        })
    }

    /// Echo Reply with the same identifier, sequence and payload.
    pub fn reply(&self) -> EchoMessage<'a> {
        Self {
            header: Icmpv6Header::new(Icmpv6Type::EchoReply),
            ..*self
        }
    }

    pub fn emit<B: BufMut>(&self, buf: &mut B) {
        self.header.emit(buf);
        buf.put_u16(self.identifier);
        buf.put_u16(self.sequence);
        buf.put_slice(self.data);
    }

    pub fn to_bytes(&self, src: Ipv6Addr, dst: Ipv6Addr) -> BytesMut {
        let mut buf = BytesMut::with_capacity(ECHO_HEADER_LEN + self.data.len());
        self.emit(&mut buf);
        fill_icmpv6_checksum(src, dst, &mut buf);
        buf
    }
}

/// Checksum of an ICMPv6 message: the pseudo-header sum seeds the message sum.
/// The checksum field of `message` is included as-is.
pub fn icmpv6_checksum(src: Ipv6Addr, dst: Ipv6Addr, message: &[u8]) -> u16 {
    let phdr = PseudoHeader {
        src,
        dst,
        upper_len: message.len() as u32,
        next_header: NextHeader::Icmpv6,
    };
    let psum = checksum16(&phdr.to_bytes(), 0);
    checksum16(message, psum ^ 0xffff)
}

pub fn fill_icmpv6_checksum(src: Ipv6Addr, dst: Ipv6Addr, message: &mut [u8]) {
    if message.len() < ICMPV6_HEADER_LEN {
        return;
    }
    message[2..4].copy_from_slice(&[0, 0]);
    let sum = icmpv6_checksum(src, dst, message);
    message[2..4].copy_from_slice(&sum.to_be_bytes());
}

pub fn verify_icmpv6_checksum(src: Ipv6Addr, dst: Ipv6Addr, message: &[u8]) -> bool {
    icmpv6_checksum(src, dst, message) == 0
}
