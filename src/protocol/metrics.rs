use std::sync::atomic::{AtomicU64, Ordering};

/// Counters for codec and transport events.
///
/// Each transport owns its own set so independent instances never share
/// state. Every counter is monotonic; `Relaxed` ordering is sufficient.
#[derive(Debug, Default)]
pub struct TransportMetrics {
    packets_received: AtomicU64,
    packets_inactive: AtomicU64,
    packets_rejected: AtomicU64,
    bytes_enqueued: AtomicU64,
    overflows: AtomicU64,
    deliveries: AtomicU64,
    messages_encoded: AtomicU64,
    messages_dropped: AtomicU64,
    packets_sent: AtomicU64,
    tx_attempts: AtomicU64,
    tx_retries: AtomicU64,
    tx_failures: AtomicU64,
}

/// Reason an inbound packet did not reach the byte queue.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum PacketDrop {
    Inactive,
    Rejected,
}

impl TransportMetrics {
    /// Create zeroed counters
    #[must_use]
    pub const fn new() -> Self {
        Self {
            packets_received: AtomicU64::new(0),
            packets_inactive: AtomicU64::new(0),
            packets_rejected: AtomicU64::new(0),
            bytes_enqueued: AtomicU64::new(0),
            overflows: AtomicU64::new(0),
            deliveries: AtomicU64::new(0),
            messages_encoded: AtomicU64::new(0),
            messages_dropped: AtomicU64::new(0),
            packets_sent: AtomicU64::new(0),
            tx_attempts: AtomicU64::new(0),
            tx_retries: AtomicU64::new(0),
            tx_failures: AtomicU64::new(0),
        }
    }

    #[inline]
    pub(crate) fn record_packet_received(&self) {
        self.packets_received.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_packet_dropped(&self, reason: PacketDrop) {
        match reason {
            PacketDrop::Inactive => self.packets_inactive.fetch_add(1, Ordering::Relaxed),
            PacketDrop::Rejected => self.packets_rejected.fetch_add(1, Ordering::Relaxed),
        };
    }

    #[inline]
    pub(crate) fn record_enqueued(&self, bytes: usize) {
        self.bytes_enqueued.fetch_add(to_u64(bytes), Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_overflow(&self) {
        self.overflows.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_delivery(&self) {
        self.deliveries.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_encoded(&self, messages: usize, dropped: usize) {
        self.messages_encoded.fetch_add(to_u64(messages), Ordering::Relaxed);
        self.messages_dropped.fetch_add(to_u64(dropped), Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_tx(&self, packets: usize, attempts: u32, succeeded: bool) {
        self.tx_attempts.fetch_add(u64::from(attempts), Ordering::Relaxed);
        self.tx_retries
            .fetch_add(u64::from(attempts.saturating_sub(1)), Ordering::Relaxed);
        if succeeded {
            self.packets_sent.fetch_add(to_u64(packets), Ordering::Relaxed);
        } else {
            self.tx_failures.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Read all counters at once.
    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            packets_received: self.packets_received.load(Ordering::Relaxed),
            packets_inactive: self.packets_inactive.load(Ordering::Relaxed),
            packets_rejected: self.packets_rejected.load(Ordering::Relaxed),
            bytes_enqueued: self.bytes_enqueued.load(Ordering::Relaxed),
            overflows: self.overflows.load(Ordering::Relaxed),
            deliveries: self.deliveries.load(Ordering::Relaxed),
            messages_encoded: self.messages_encoded.load(Ordering::Relaxed),
            messages_dropped: self.messages_dropped.load(Ordering::Relaxed),
            packets_sent: self.packets_sent.load(Ordering::Relaxed),
            tx_attempts: self.tx_attempts.load(Ordering::Relaxed),
            tx_retries: self.tx_retries.load(Ordering::Relaxed),
            tx_failures: self.tx_failures.load(Ordering::Relaxed),
        }
    }
}

fn to_u64(value: usize) -> u64 {
    u64::try_from(value).unwrap_or(u64::MAX)
}

/// Lightweight snapshot of transport counters.
#[allow(missing_docs)]
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub packets_received: u64,
    pub packets_inactive: u64,
    pub packets_rejected: u64,
    pub bytes_enqueued: u64,
    pub overflows: u64,
    pub deliveries: u64,
    pub messages_encoded: u64,
    pub messages_dropped: u64,
    pub packets_sent: u64,
    pub tx_attempts: u64,
    pub tx_retries: u64,
    pub tx_failures: u64,
}

impl MetricsSnapshot {
    /// Packets that never reached the byte queue.
    #[must_use]
    pub const fn packets_dropped(&self) -> u64 {
        self.packets_inactive + self.packets_rejected
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_counts() {
        let metrics = TransportMetrics::new();
        metrics.record_packet_received();
        metrics.record_packet_received();
        metrics.record_packet_dropped(PacketDrop::Inactive);
        metrics.record_packet_dropped(PacketDrop::Rejected);
        metrics.record_enqueued(3);
        metrics.record_encoded(4, 1);
        metrics.record_tx(4, 3, true);
        metrics.record_tx(1, 1, false);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.packets_received, 2);
        assert_eq!(snapshot.packets_dropped(), 2);
        assert_eq!(snapshot.bytes_enqueued, 3);
        assert_eq!(snapshot.messages_encoded, 4);
        assert_eq!(snapshot.messages_dropped, 1);
        assert_eq!(snapshot.packets_sent, 4);
        assert_eq!(snapshot.tx_attempts, 4);
        assert_eq!(snapshot.tx_retries, 2);
        assert_eq!(snapshot.tx_failures, 1);
    }
}
