use crate::network::device::DeviceId;
use bytes::Bytes;
use std::collections::{HashMap, VecDeque};
use std::net::Ipv6Addr;

/// An IPv6 packet waiting for its link-layer destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingFrame {
    pub device: DeviceId,
    pub packet: Bytes,
}

/// Unresolved neighbors tracked at once; the oldest is forgotten beyond this.
pub const MAX_PENDING_NEIGHBORS: usize = 256;

/// Bounded per-neighbor hold queue. A capacity of zero disables queueing.
#[derive(Debug, Default)]
pub struct PendingQueue {
    capacity: usize,
    max_neighbors: usize,
    queues: HashMap<Ipv6Addr, VecDeque<PendingFrame>>,
    // neighbors in the order their first packet was held
    order: VecDeque<Ipv6Addr>,
}

impl PendingQueue {
    pub fn new(capacity: usize) -> Self {
        Self::with_neighbor_limit(capacity, MAX_PENDING_NEIGHBORS)
    }

    pub fn with_neighbor_limit(capacity: usize, max_neighbors: usize) -> Self {
        Self {
            capacity,
            max_neighbors,
            queues: HashMap::new(),
            order: VecDeque::new(),
        }
    }

    pub fn enabled(&self) -> bool {
        self.capacity > 0
    }

    /// Hold `packet` until `neighbor` is resolved. Returns false if queueing is disabled.
    pub fn push(&mut self, neighbor: Ipv6Addr, device: DeviceId, packet: Bytes) -> bool {
        if !self.enabled() || self.max_neighbors == 0 {
            return false;
        }
        if !self.queues.contains_key(&neighbor) {
            while self.order.len() >= self.max_neighbors {
                let Some(stale) = self.order.pop_front() else {
                    break;
                };
                if let Some(dropped) = self.queues.remove(&stale) {
                    tracing::debug!(
                        "[ND] Too many unresolved neighbors, dropped {} packets for {}",
                        dropped.len(),
                        stale
                    );
                }
            }
            self.order.push_back(neighbor);
        }
        let queue = self.queues.entry(neighbor).or_default();
        if queue.len() >= self.capacity {
            queue.pop_front();
            tracing::debug!("[ND] Pending queue for {} full, evicted oldest", neighbor);
        }
        queue.push_back(PendingFrame { device, packet });
        true
    }

    pub fn take(&mut self, neighbor: &Ipv6Addr) -> Option<VecDeque<PendingFrame>> {
        let frames = self.queues.remove(neighbor)?;
        self.order.retain(|held| held != neighbor);
        Some(frames)
    }

    /// Number of neighbors with held packets.
    pub fn neighbor_count(&self) -> usize {
        self.queues.len()
    }

    /// Number of held packets across all neighbors.
    pub fn len(&self) -> usize {
        self.queues.values().map(|q| q.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.queues.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled() {
        let mut queue = PendingQueue::new(0);
        assert!(!queue.push("2001:db8::1".parse().unwrap(), DeviceId(0), Bytes::new()));
        assert!(queue.is_empty());
    }

    #[test]
    fn test_evicts_oldest() {
        let neighbor: Ipv6Addr = "2001:db8::1".parse().unwrap();
        let mut queue = PendingQueue::new(2);
        for i in 0..3u8 {
            assert!(queue.push(neighbor, DeviceId(0), Bytes::from(vec![i])));
        }
        queue.push("2001:db8::2".parse().unwrap(), DeviceId(1), Bytes::new());
        assert_eq!(queue.len(), 3);

        let held: Vec<u8> = queue
            .take(&neighbor)
            .unwrap()
            .into_iter()
            .map(|f| f.packet[0])
            .collect();
        assert_eq!(held, vec![1, 2]);
        assert!(queue.take(&neighbor).is_none());
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn test_neighbor_limit() {
        let mut queue = PendingQueue::with_neighbor_limit(2, 3);
        let neighbors: Vec<Ipv6Addr> = (1..=5u16)
            .map(|i| Ipv6Addr::new(0x2001, 0xdb8, 0, 0, 0, 0, 0, i))
            .collect();
        for (i, neighbor) in neighbors.iter().enumerate() {
            assert!(queue.push(*neighbor, DeviceId(0), Bytes::from(vec![i as u8])));
        }
        assert_eq!(queue.neighbor_count(), 3);
        assert_eq!(queue.len(), 3);
        // the two oldest neighbors were forgotten
        assert!(queue.take(&neighbors[0]).is_none());
        assert!(queue.take(&neighbors[1]).is_none());

        // more packets for a tracked neighbor do not evict anyone
        assert!(queue.push(neighbors[2], DeviceId(0), Bytes::from_static(b"x")));
        assert_eq!(queue.neighbor_count(), 3);
        assert_eq!(queue.take(&neighbors[2]).unwrap().len(), 2);

        // a resolved neighbor frees its slot
        assert!(queue.push(neighbors[0], DeviceId(0), Bytes::new()));
        assert_eq!(queue.neighbor_count(), 3);
        assert!(queue.take(&neighbors[3]).is_some());
        assert!(queue.take(&neighbors[4]).is_some());
        assert!(queue.take(&neighbors[0]).is_some());
        assert!(queue.is_empty());
    }
}
