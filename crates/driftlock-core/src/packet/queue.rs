//! Timestamp-ordered packet queue shared between the network ingestor
//! and the session consumer
//!
//! The ingestor thread pushes repaired packets as they arrive; the
//! session thread pops them for depacketization and, independently, asks
//! for the newest queued packet to estimate how much audio is buffered.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

#[cfg(test)]
use super::StreamTimestamp;
use super::{timestamp_diff, Packet};

/// Read side of the packet queue consumed by the latency monitor.
pub trait PacketQueue {
    /// The packet whose `end()` timestamp is greatest among currently
    /// enqueued packets, or `None` if the queue is empty.
    ///
    /// Must return a consistent snapshot when called concurrently with
    /// the producer (no torn reads of the timestamp).
    fn latest(&self) -> Option<Arc<Packet>>;
}

/// Packet queue ordered by stream timestamp.
///
/// Safe for one producer (network ingestor) and one consumer (session)
/// thread. Packets arriving out of order are inserted at their sorted
/// position; ordering is wrap-aware, so a session crossing the u32
/// timestamp wrap keeps a correct order.
#[derive(Debug, Default)]
pub struct SortedQueue {
    packets: Mutex<VecDeque<Arc<Packet>>>,
}

impl SortedQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a packet, keeping the queue ordered by stream timestamp.
    ///
    /// In-order arrival appends in O(1); reordered packets walk back
    /// from the tail to their slot.
    pub fn push(&self, packet: Arc<Packet>) {
        let mut packets = self.packets.lock().unwrap();

        let pos = packets
            .iter()
            .rposition(|queued| {
                timestamp_diff(packet.stream_timestamp(), queued.stream_timestamp()) >= 0
            })
            .map(|i| i + 1)
            .unwrap_or(0);

        packets.insert(pos, packet);
    }

    /// Remove and return the oldest packet.
    pub fn pop_front(&self) -> Option<Arc<Packet>> {
        self.packets.lock().unwrap().pop_front()
    }

    /// Number of queued packets.
    pub fn len(&self) -> usize {
        self.packets.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.packets.lock().unwrap().is_empty()
    }
}

impl PacketQueue for SortedQueue {
    fn latest(&self) -> Option<Arc<Packet>> {
        let packets = self.packets.lock().unwrap();

        // The queue is ordered by start timestamp, but durations vary, so
        // the greatest end() is not necessarily the last element.
        let mut latest: Option<&Arc<Packet>> = None;
        for packet in packets.iter() {
            match latest {
                Some(best) if timestamp_diff(packet.end(), best.end()) <= 0 => {}
                _ => latest = Some(packet),
            }
        }

        latest.cloned()
    }
}
