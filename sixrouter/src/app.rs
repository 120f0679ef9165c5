use crate::config::{ConfigError, RawRootCfg};
use crate::network::datalink::{
    enumerate_interfaces, interface_ipv6, interface_mac, open_channel, DatalinkRx,
};
use crate::network::device::{DeviceId, NetDevice};
use crate::router::{Router, RouterError};
use anyhow::anyhow;
use bytes::Bytes;

// Frames buffered between the interface readers and the router.
const FRAME_QUEUE_DEPTH: usize = 4096;

pub struct App {
    router: Router,
    readers: Vec<(DeviceId, DatalinkRx)>,
}

impl App {
    /// Take over every usable interface and apply the configuration.
    pub fn create(config: &RawRootCfg) -> anyhow::Result<Self> {
        let mut router = Router::new(config.pending_per_neighbor);
        let mut readers = Vec::new();
        for iface in enumerate_interfaces(&config.ignore_interfaces) {
            let Some(mac) = interface_mac(&iface) else {
                continue;
            };
            let (tx, rx) = match open_channel(&iface) {
                Ok(channel) => channel,
                Err(e) => {
                    tracing::warn!("[Eth] Failed to open {}: {}", iface.name, e);
                    continue;
                }
            };
            let id = router.add_device(NetDevice::new(iface.name.clone(), mac, Box::new(tx)));
            if let Some((addr, prefix_len)) = interface_ipv6(&iface) {
                if let Err(e) = router.configure_address(id, addr, prefix_len) {
                    tracing::warn!("[IPv6] Ignoring address {} of {}: {}", addr, iface.name, e);
                }
            }
            readers.push((id, rx));
        }
        if readers.is_empty() {
            return Err(anyhow!("No usable network interface"));
        }
        apply_config(&mut router, config);
        for (id, dev) in router.devices() {
            tracing::info!("[Eth] Routing on {} {}", id, dev);
        }
        for entry in router.fib().routes() {
            tracing::info!("[Route] {} {}", entry, entry.route);
        }
        Ok(Self { router, readers })
    }

    /// Process frames until Ctrl-C or until every reader has stopped.
    pub async fn run(self) {
        let Self {
            mut router,
            readers,
        } = self;
        let (frame_tx, frame_rx) = flume::bounded::<(DeviceId, Bytes)>(FRAME_QUEUE_DEPTH);
        for (id, reader) in readers {
            let frame_tx = frame_tx.clone();
            tokio::task::spawn_blocking(move || reader.run(id, frame_tx));
        }
        drop(frame_tx);

        loop {
            tokio::select! {
                frame = frame_rx.recv_async() => match frame {
                    Ok((id, frame)) => process(&mut router, id, &frame),
                    Err(_) => {
                        tracing::error!("All interface readers stopped");
                        break;
                    }
                },
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("Received Ctrl-C, stopping");
                    break;
                }
            }
        }
        // readers exit on their next timeout once the receiver is gone
    }
}

fn process(router: &mut Router, id: DeviceId, frame: &[u8]) {
    match router.ethernet_input(id, frame) {
        Ok(()) => {}
        Err(e @ (RouterError::NotForUs(_) | RouterError::OwnFrame)) => {
            tracing::trace!("[Eth] Dropped frame on {}: {}", id, e)
        }
        Err(e) if e.is_drop() => tracing::debug!("Dropped frame on {}: {}", id, e),
        Err(e) => tracing::warn!("Failed to process frame on {}: {}", id, e),
    }
}

/// Entries that do not fit the discovered interfaces are reported and skipped.
pub(crate) fn apply_config(router: &mut Router, config: &RawRootCfg) {
    for iface in &config.interfaces {
        let result: anyhow::Result<()> = router
            .device_by_name(&iface.name)
            .ok_or_else(|| ConfigError::Interface(iface.name.clone()).into())
            .and_then(|id| {
                router
                    .configure_address(id, iface.address.addr(), iface.address.prefix_len())
                    .map_err(anyhow::Error::from)
            });
        if let Err(e) = result {
            tracing::warn!("Skipping address {}: {}", iface.address, e);
        }
    }
    for route in &config.routes {
        if let Err(e) = router.configure_static_route(
            route.prefix.network(),
            route.prefix.prefix_len(),
            route.next_hop,
        ) {
            tracing::warn!("Skipping route {}: {}", route.prefix, e);
        }
    }
    for neighbor in &config.neighbors {
        let result: anyhow::Result<()> = router
            .device_by_name(&neighbor.interface)
            .ok_or_else(|| ConfigError::Interface(neighbor.interface.clone()).into())
            .and_then(|id| Ok((id, neighbor.mac_addr()?)))
            .and_then(|(id, mac)| {
                router
                    .configure_static_nd_entry(id, mac, neighbor.address)
                    .map_err(anyhow::Error::from)
            });
        if let Err(e) = result {
            tracing::warn!("Skipping neighbor {}: {}", neighbor.address, e);
        }
    }
}
