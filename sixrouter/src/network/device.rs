use crate::common::io_err;
use bytes::Bytes;
use pnet_datalink::MacAddr;
use std::fmt::{Display, Formatter};
use std::io;
use std::net::Ipv6Addr;

/// Index of a device in the router's device table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DeviceId(pub usize);

impl Display for DeviceId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Sending half of a link. One complete Ethernet frame per call.
pub trait LinkTx: Send {
    fn transmit(&mut self, frame: &[u8]) -> io::Result<()>;
}

impl LinkTx for flume::Sender<Bytes> {
    fn transmit(&mut self, frame: &[u8]) -> io::Result<()> {
        self.send(Bytes::copy_from_slice(frame))
            .map_err(|_| io_err("Link receiver dropped"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ipv6Scope {
    LinkLocal,
    Global,
}

impl Ipv6Scope {
    pub fn of(addr: &Ipv6Addr) -> Self {
        if addr.segments()[0] & 0xffc0 == 0xfe80 {
            Ipv6Scope::LinkLocal
        } else {
            Ipv6Scope::Global
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ipv6Config {
    pub address: Ipv6Addr,
    pub prefix_len: u8,
    pub scope: Ipv6Scope,
}

impl Ipv6Config {
    pub fn new(address: Ipv6Addr, prefix_len: u8) -> Self {
        Self {
            address,
            prefix_len,
            scope: Ipv6Scope::of(&address),
        }
    }
}

impl Display for Ipv6Config {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.address, self.prefix_len)
    }
}

pub struct NetDevice {
    name: String,
    mac: MacAddr,
    ipv6: Option<Ipv6Config>,
    tx: Box<dyn LinkTx>,
}

impl NetDevice {
    pub fn new(name: impl Into<String>, mac: MacAddr, tx: Box<dyn LinkTx>) -> Self {
        Self {
            name: name.into(),
            mac,
            ipv6: None,
            tx,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn mac(&self) -> MacAddr {
        self.mac
    }

    pub fn ipv6(&self) -> Option<&Ipv6Config> {
        self.ipv6.as_ref()
    }

    pub fn set_ipv6(&mut self, config: Ipv6Config) {
        self.ipv6 = Some(config);
    }

    pub fn transmit(&mut self, frame: &[u8]) -> io::Result<()> {
        self.tx.transmit(frame)
    }
}

impl Display for NetDevice {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match &self.ipv6 {
            Some(config) => write!(f, "{} ({}, {})", self.name, self.mac, config),
            None => write!(f, "{} ({})", self.name, self.mac),
        }
    }
}
