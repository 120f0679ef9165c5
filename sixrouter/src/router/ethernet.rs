use crate::network::device::DeviceId;
use crate::network::packet::ethernet::{
    is_ipv6_multicast_mac, EtherType, EthernetHeader, ETHERNET_HEADER_LEN,
};
use crate::router::{Router, RouterError};
use bytes::{BufMut, BytesMut};
use pnet_datalink::MacAddr;

impl Router {
    /// Entry point for every frame read from a device.
    pub fn ethernet_input(&mut self, id: DeviceId, frame: &[u8]) -> Result<(), RouterError> {
        let dev = self.device(id)?;
        let header = EthernetHeader::parse(frame)?;
        // raw sockets also see what we transmit
        if header.src == dev.mac() {
            return Err(RouterError::OwnFrame);
        }
        if header.dst != dev.mac()
            && !header.dst.is_broadcast()
            && !is_ipv6_multicast_mac(&header.dst)
        {
            return Err(RouterError::NotForUs(header.dst));
        }
        tracing::trace!("[Eth] {} received {}", dev.name(), header);
        match header.ether_type {
            EtherType::Ipv6 => self.ipv6_input(id, &header, &frame[ETHERNET_HEADER_LEN..]),
            EtherType::Unknown(ether_type) => Err(RouterError::UnsupportedEtherType(ether_type)),
        }
    }

    pub fn ethernet_output(
        &mut self,
        id: DeviceId,
        dst: MacAddr,
        payload: &[u8],
        ether_type: EtherType,
    ) -> Result<(), RouterError> {
        let dev = self.device_mut(id)?;
        let header = EthernetHeader {
            dst,
            src: dev.mac(),
            ether_type,
        };
        let mut frame = BytesMut::with_capacity(ETHERNET_HEADER_LEN + payload.len());
        header.emit(&mut frame);
        frame.put_slice(payload);
        tracing::trace!("[Eth] {} sending {} bytes {}", dev.name(), frame.len(), header);
        dev.transmit(&frame)?;
        Ok(())
    }
}
