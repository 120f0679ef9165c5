use crate::network::device::DeviceId;
use pnet_datalink::MacAddr;
use std::net::Ipv6Addr;

pub const ND_TABLE_SIZE: usize = 1111;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NdEntry {
    pub address: Ipv6Addr,
    pub mac: MacAddr,
    pub device: DeviceId,
}

struct Link {
    entry: NdEntry,
    next: Option<Box<Link>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NdUpdate {
    Inserted,
    Updated,
}

/// Neighbor cache: IPv6 address to link-layer address and owning device.
/// Entries never expire.
pub struct NdCache {
    buckets: Vec<Option<Box<Link>>>,
    len: usize,
}

impl Default for NdCache {
    fn default() -> Self {
        Self::new()
    }
}

impl NdCache {
    pub fn new() -> Self {
        let mut buckets = Vec::with_capacity(ND_TABLE_SIZE);
        buckets.resize_with(ND_TABLE_SIZE, || None);
        Self { buckets, len: 0 }
    }

    pub fn update(&mut self, device: DeviceId, mac: MacAddr, address: Ipv6Addr) -> NdUpdate {
        let head = &mut self.buckets[bucket_index(&address)];
        let mut cursor = head.as_deref_mut();
        while let Some(link) = cursor {
            if link.entry.address == address {
                link.entry.mac = mac;
                link.entry.device = device;
                return NdUpdate::Updated;
            }
            cursor = link.next.as_deref_mut();
        }
        let next = head.take();
        *head = Some(Box::new(Link {
            entry: NdEntry {
                address,
                mac,
                device,
            },
            next,
        }));
        self.len += 1;
        NdUpdate::Inserted
    }

    pub fn lookup(&self, address: &Ipv6Addr) -> Option<&NdEntry> {
        let mut cursor = self.buckets[bucket_index(address)].as_deref();
        while let Some(link) = cursor {
            if link.entry.address == *address {
                return Some(&link.entry);
            }
            cursor = link.next.as_deref();
        }
        None
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = &NdEntry> {
        self.buckets.iter().flat_map(|bucket| {
            std::iter::successors(bucket.as_deref(), |link| link.next.as_deref())
                .map(|link| &link.entry)
        })
    }
}

impl Drop for NdCache {
    // unlink chains iteratively so long buckets cannot overflow the stack
    fn drop(&mut self) {
        for bucket in self.buckets.iter_mut() {
            let mut cursor = bucket.take();
            while let Some(mut link) = cursor {
                cursor = link.next.take();
            }
        }
    }
}

/// XOR of the four big-endian 32-bit words, reduced modulo the table size.
pub fn bucket_index(address: &Ipv6Addr) -> usize {
    let o = address.octets();
    let hash = o
        .chunks_exact(4)
        .map(|w| u32::from_be_bytes([w[0], w[1], w[2], w[3]]))
        .fold(0u32, |acc, w| acc ^ w);
    hash as usize % ND_TABLE_SIZE
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mac(last: u8) -> MacAddr {
        MacAddr::new(0xaa, 0xbb, 0xcc, 0xdd, 0xee, last)
    }

    fn addr(s: &str) -> Ipv6Addr {
        s.parse().unwrap()
    }

    #[test]
    fn test_update_and_lookup() {
        let mut cache = NdCache::new();
        assert!(cache.lookup(&addr("2001:db8::1")).is_none());
        assert_eq!(
            cache.update(DeviceId(0), mac(1), addr("2001:db8::1")),
            NdUpdate::Inserted
        );
        let entry = cache.lookup(&addr("2001:db8::1")).unwrap();
        assert_eq!(entry.mac, mac(1));
        assert_eq!(entry.device, DeviceId(0));

        assert_eq!(
            cache.update(DeviceId(1), mac(2), addr("2001:db8::1")),
            NdUpdate::Updated
        );
        let entry = cache.lookup(&addr("2001:db8::1")).unwrap();
        assert_eq!(entry.mac, mac(2));
        assert_eq!(entry.device, DeviceId(1));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_bucket_collision() {
        // swapping words leaves the XOR fold unchanged
        let a = addr("2001:db8:0:1::5");
        let b = addr("0:1:2001:db8::5");
        assert_eq!(bucket_index(&a), bucket_index(&b));

        let mut cache = NdCache::new();
        cache.update(DeviceId(0), mac(1), a);
        cache.update(DeviceId(1), mac(2), b);
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.lookup(&a).unwrap().mac, mac(1));
        assert_eq!(cache.lookup(&b).unwrap().mac, mac(2));

        cache.update(DeviceId(2), mac(3), a);
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.lookup(&a).unwrap().device, DeviceId(2));
        assert_eq!(cache.lookup(&b).unwrap().device, DeviceId(1));
    }

    #[test]
    fn test_iter() {
        let mut cache = NdCache::new();
        for i in 1..=20u16 {
            cache.update(DeviceId(0), mac(i as u8), Ipv6Addr::new(0x2001, 0xdb8, 0, 0, 0, 0, 0, i));
        }
        assert_eq!(cache.iter().count(), 20);
        assert!(cache.iter().all(|e| e.mac.octets()[5] as u16 == e.address.segments()[7]));
    }

    #[test]
    fn test_bucket_index_range() {
        assert_eq!(bucket_index(&Ipv6Addr::UNSPECIFIED), 0);
        assert!(bucket_index(&addr("ffff:ffff:0:1::")) < ND_TABLE_SIZE);
        assert_eq!(bucket_index(&addr("::1")), 1);
        assert_eq!(bucket_index(&addr("::1112")), 0x1112 % ND_TABLE_SIZE);
    }
}
