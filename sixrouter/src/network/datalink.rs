use crate::common::{io_err, MAX_FRAME_SIZE};
use crate::network::device::{DeviceId, Ipv6Scope, LinkTx};
use bytes::Bytes;
use pnet_datalink::{Channel, DataLinkReceiver, DataLinkSender, MacAddr, NetworkInterface};
use std::io;
use std::io::ErrorKind;
use std::net::{IpAddr, Ipv6Addr};
use std::time::Duration;

pub const DEFAULT_IGNORED_INTERFACES: [&str; 5] = ["lo", "bond0", "dummy0", "tunl0", "sit0"];

// Bounds how long a reader takes to notice shutdown.
const READ_TIMEOUT: Duration = Duration::from_millis(500);

pub fn is_ignored(name: &str, ignore: &[String]) -> bool {
    ignore.iter().any(|n| n == name)
}

/// Usable link-layer address of an interface; loopback-like ones have none.
pub fn interface_mac(iface: &NetworkInterface) -> Option<MacAddr> {
    iface.mac.filter(|mac| *mac != MacAddr::zero())
}

/// First global unicast IPv6 address the OS assigned to the interface.
pub fn interface_ipv6(iface: &NetworkInterface) -> Option<(Ipv6Addr, u8)> {
    iface.ips.iter().find_map(|ip| match ip.ip() {
        IpAddr::V6(addr) if Ipv6Scope::of(&addr) == Ipv6Scope::Global => {
            Some((addr, ip.prefix()))
        }
        _ => None,
    })
}

/// Interfaces the router takes over: not ignored and with a MAC address.
pub fn enumerate_interfaces(ignore: &[String]) -> Vec<NetworkInterface> {
    pnet_datalink::interfaces()
        .into_iter()
        .filter(|iface| {
            if is_ignored(&iface.name, ignore) {
                tracing::debug!("[Eth] Ignoring interface {}", iface.name);
                return false;
            }
            if interface_mac(iface).is_none() {
                tracing::debug!("[Eth] Skipping {}: no link-layer address", iface.name);
                return false;
            }
            true
        })
        .collect()
}

pub fn open_channel(iface: &NetworkInterface) -> io::Result<(DatalinkTx, DatalinkRx)> {
    let config = pnet_datalink::Config {
        read_timeout: Some(READ_TIMEOUT),
        read_buffer_size: MAX_FRAME_SIZE,
        write_buffer_size: MAX_FRAME_SIZE,
        ..Default::default()
    };
    match pnet_datalink::channel(iface, config)? {
        Channel::Ethernet(tx, rx) => Ok((
            DatalinkTx { inner: tx },
            DatalinkRx {
                name: iface.name.clone(),
                inner: rx,
            },
        )),
        _ => Err(io_err("Unsupported datalink channel type")),
    }
}

pub struct DatalinkTx {
    inner: Box<dyn DataLinkSender>,
}

impl LinkTx for DatalinkTx {
    fn transmit(&mut self, frame: &[u8]) -> io::Result<()> {
        self.inner
            .send_to(frame, None)
            .unwrap_or_else(|| Err(io_err("Frame exceeds the write buffer")))
    }
}

pub struct DatalinkRx {
    name: String,
    inner: Box<dyn DataLinkReceiver>,
}

impl DatalinkRx {
    /// Blocking read loop. Returns once `sink` is closed or the socket fails.
    pub fn run(mut self, id: DeviceId, sink: flume::Sender<(DeviceId, Bytes)>) {
        tracing::debug!("[Eth] Reader for {} started", self.name);
        loop {
            match self.inner.next() {
                Ok(frame) => {
                    if sink.send((id, Bytes::copy_from_slice(frame))).is_err() {
                        break;
                    }
                }
                Err(e)
                    if matches!(
                        e.kind(),
                        ErrorKind::TimedOut | ErrorKind::WouldBlock | ErrorKind::Interrupted
                    ) =>
                {
                    if sink.is_disconnected() {
                        break;
                    }
                }
                Err(e) => {
                    tracing::error!("[Eth] Receive on {} failed: {}", self.name, e);
                    break;
                }
            }
        }
        tracing::debug!("[Eth] Reader for {} stopped", self.name);
    }
}
