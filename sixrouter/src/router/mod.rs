use crate::neighbor::{NdCache, NdUpdate, PendingQueue};
use crate::network::device::{DeviceId, Ipv6Config, NetDevice};
use crate::route::{Fib, RouteEntry};
use pnet_datalink::MacAddr;
use std::net::Ipv6Addr;

mod error;
mod ethernet;
mod icmpv6;
mod ipv6;

pub use error::RouterError;

/// All forwarding state. Owned by a single processing task; every packet
/// runs to completion before the next one is looked at.
pub struct Router {
    devices: Vec<NetDevice>,
    fib: Fib,
    neighbors: NdCache,
    pending: PendingQueue,
}

impl Router {
    /// `pending_per_neighbor` of zero drops packets that miss in the neighbor cache.
    pub fn new(pending_per_neighbor: usize) -> Self {
        Self {
            devices: Vec::new(),
            fib: Fib::new(),
            neighbors: NdCache::new(),
            pending: PendingQueue::new(pending_per_neighbor),
        }
    }

    pub fn add_device(&mut self, device: NetDevice) -> DeviceId {
        let id = DeviceId(self.devices.len());
        tracing::debug!("Registered device {} as {}", device, id);
        self.devices.push(device);
        id
    }

    pub fn device(&self, id: DeviceId) -> Result<&NetDevice, RouterError> {
        self.devices.get(id.0).ok_or(RouterError::UnknownDevice(id))
    }

    pub fn device_mut(&mut self, id: DeviceId) -> Result<&mut NetDevice, RouterError> {
        self.devices
            .get_mut(id.0)
            .ok_or(RouterError::UnknownDevice(id))
    }

    pub fn device_by_name(&self, name: &str) -> Option<DeviceId> {
        self.devices
            .iter()
            .position(|d| d.name() == name)
            .map(DeviceId)
    }

    pub fn devices(&self) -> impl Iterator<Item = (DeviceId, &NetDevice)> {
        self.devices
            .iter()
            .enumerate()
            .map(|(idx, dev)| (DeviceId(idx), dev))
    }

    pub fn fib(&self) -> &Fib {
        &self.fib
    }

    pub fn neighbors(&self) -> &NdCache {
        &self.neighbors
    }

    pub fn pending(&self) -> &PendingQueue {
        &self.pending
    }

    /// Assign an address to a device and install its connected route.
    pub fn configure_address(
        &mut self,
        id: DeviceId,
        address: Ipv6Addr,
        prefix_len: u8,
    ) -> Result<(), RouterError> {
        let config = Ipv6Config::new(address, prefix_len);
        self.device(id)?;
        self.fib
            .insert(address, prefix_len, RouteEntry::Connected(id))?;
        let dev = self.device_mut(id)?;
        dev.set_ipv6(config);
        tracing::info!("[Route] Configured {} on {}", config, dev.name());
        Ok(())
    }

    pub fn configure_static_route(
        &mut self,
        prefix: Ipv6Addr,
        prefix_len: u8,
        next_hop: Ipv6Addr,
    ) -> Result<(), RouterError> {
        let route = RouteEntry::Network { next_hop };
        if let Some(old) = self.fib.insert(prefix, prefix_len, route)? {
            tracing::warn!(
                "[Route] {}/{} replaced existing route ({})",
                prefix,
                prefix_len,
                old
            );
        }
        tracing::info!("[Route] Static route {}/{} {}", prefix, prefix_len, route);
        Ok(())
    }

    pub fn configure_static_nd_entry(
        &mut self,
        id: DeviceId,
        mac: MacAddr,
        address: Ipv6Addr,
    ) -> Result<(), RouterError> {
        self.device(id)?;
        self.update_neighbor(id, mac, address);
        Ok(())
    }

    pub(crate) fn device_ipv6(&self, id: DeviceId) -> Result<Ipv6Config, RouterError> {
        let dev = self.device(id)?;
        dev.ipv6()
            .copied()
            .ok_or_else(|| RouterError::NotConfigured(dev.name().to_string()))
    }

    /// Whether `addr` is assigned to any of our devices.
    pub fn is_local_address(&self, addr: &Ipv6Addr) -> bool {
        self.devices
            .iter()
            .any(|d| d.ipv6().is_some_and(|c| c.address == *addr))
    }

    /// Record a neighbor and release anything held for it.
    pub(crate) fn update_neighbor(&mut self, id: DeviceId, mac: MacAddr, address: Ipv6Addr) {
        match self.neighbors.update(id, mac, address) {
            NdUpdate::Inserted => {
                tracing::debug!("[ND] Inserted {} => {} on {}", address, mac, id)
            }
            NdUpdate::Updated => tracing::trace!("[ND] Refreshed {} => {}", address, mac),
        }
        self.flush_pending(&address, mac);
    }
}


#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;
    use crate::route::TrieError;

    #[test]
    fn test_configure() {
        let (mut router, host, peer) = two_link_router(0);
        assert_eq!(router.device_by_name("router1-router2"), Some(peer.id));
        assert_eq!(router.device_by_name("eth9"), None);
        assert!(router.is_local_address(&host.addr));
        assert!(!router.is_local_address(&addr("2001:db8:0:1001::2")));

        let connected = router.fib().search(addr("2001:db8:0:1001::77")).unwrap();
        assert_eq!(*connected.route, RouteEntry::Connected(host.id));

        router
            .configure_static_route(addr("2001:db8:0:1002::"), 64, addr("2001:db8:0:1000::2"))
            .unwrap();
        let remote = router.fib().search(addr("2001:db8:0:1002::9")).unwrap();
        assert_eq!(
            *remote.route,
            RouteEntry::Network {
                next_hop: addr("2001:db8:0:1000::2")
            }
        );
        assert_eq!(router.fib().len(), 3);

        assert!(matches!(
            router.configure_static_route(addr("::"), 200, addr("::1")),
            Err(RouterError::Trie(TrieError::InvalidPrefixLen(200)))
        ));
    }

    #[test]
    fn test_static_nd_entry() {
        let (mut router, host, _peer) = two_link_router(0);
        router
            .configure_static_nd_entry(host.id, HOST_MAC, addr("2001:db8:0:1001::2"))
            .unwrap();
        let entry = router.neighbors().lookup(&addr("2001:db8:0:1001::2")).unwrap();
        assert_eq!(entry.mac, HOST_MAC);
        assert_eq!(entry.device, host.id);
        assert!(matches!(
            router.configure_static_nd_entry(DeviceId(7), HOST_MAC, addr("::2")),
            Err(RouterError::UnknownDevice(DeviceId(7)))
        ));
    }

    #[test]
    fn test_unconfigured_device() {
        let mut router = Router::new(0);
        let (tx, _rx) = flume::unbounded();
        let id = router.add_device(NetDevice::new("eth0", HOST_MAC, Box::new(tx)));
        assert!(matches!(
            router.device_ipv6(id),
            Err(RouterError::NotConfigured(name)) if name == "eth0"
        ));
    }
}
