//! Collaborators below the codec: the raw USB-MIDI endpoint and the retry delay.

use std::collections::VecDeque;
use std::time::Duration;

use bytes::{Buf, BytesMut};

use crate::protocol::{PACKET_SIZE, UsbMidiPacket};

/// Raw USB-MIDI endpoint moving already-framed event packets.
///
/// Implemented by the USB device stack. Writes are best effort and may be
/// short while the endpoint is busy.
pub trait RawMidiPort {
    /// Write encoded packets and return how many bytes were accepted.
    fn write(&mut self, packets: &[u8]) -> usize;

    /// Check whether an inbound packet is waiting.
    fn packet_available(&self) -> bool;

    /// Take the next inbound packet, `None` if there is none.
    fn read_packet(&mut self) -> Option<UsbMidiPacket>;
}

impl<P> RawMidiPort for Box<P>
where
    P: RawMidiPort + ?Sized,
{
    fn write(&mut self, packets: &[u8]) -> usize {
        (**self).write(packets)
    }

    fn packet_available(&self) -> bool {
        (**self).packet_available()
    }

    fn read_packet(&mut self) -> Option<UsbMidiPacket> {
        (**self).read_packet()
    }
}

/// Blocking wait used between transmit retries.
pub trait Delay {
    /// Wait for at least `duration`.
    fn delay(&mut self, duration: Duration);
}

/// [`Delay`] backed by [`std::thread::sleep`].
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadSleep;

impl Delay for ThreadSleep {
    fn delay(&mut self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// In-memory port that feeds every written packet back as inbound traffic.
///
/// A per-write byte budget simulates an endpoint that is still busy and only
/// accepts part of a write.
#[derive(Debug, Default)]
pub struct LoopbackPort {
    inbound: VecDeque<UsbMidiPacket>,
    partial: BytesMut,
    written: BytesMut,
    write_budget: Option<usize>,
    writes: usize,
}

impl LoopbackPort {
    /// Create an empty loopback port accepting every write in full.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Accept at most `budget` bytes per write call.
    #[must_use]
    pub fn with_write_budget(mut self, budget: usize) -> Self {
        self.write_budget = Some(budget);
        self
    }

    /// Change or remove the per-write byte budget.
    pub fn set_write_budget(&mut self, budget: Option<usize>) {
        self.write_budget = budget;
    }

    /// Queue a packet as if it had arrived from the host.
    pub fn push_inbound(&mut self, packet: impl Into<UsbMidiPacket>) {
        self.inbound.push_back(packet.into());
    }

    /// Packets waiting to be read.
    #[must_use]
    pub fn inbound_len(&self) -> usize {
        self.inbound.len()
    }

    /// Every byte accepted by [`RawMidiPort::write`] so far.
    #[must_use]
    pub fn written(&self) -> &[u8] {
        &self.written
    }

    /// Forget the bytes recorded by [`written`](Self::written).
    pub fn clear_written(&mut self) {
        self.written.clear();
    }

    /// Number of write calls made.
    #[must_use]
    pub const fn write_calls(&self) -> usize {
        self.writes
    }
}

impl RawMidiPort for LoopbackPort {
    fn write(&mut self, packets: &[u8]) -> usize {
        self.writes += 1;
        let accepted = self
            .write_budget
            .map_or(packets.len(), |budget| budget.min(packets.len()));
        let accepted = &packets[..accepted];
        self.written.extend_from_slice(accepted);
        self.partial.extend_from_slice(accepted);
        while self.partial.len() >= PACKET_SIZE {
            let mut packet = [0u8; PACKET_SIZE];
            self.partial.copy_to_slice(&mut packet);
            self.inbound.push_back(UsbMidiPacket::from_bytes(packet));
        }
        accepted.len()
    }

    fn packet_available(&self) -> bool {
        !self.inbound.is_empty()
    }

    fn read_packet(&mut self) -> Option<UsbMidiPacket> {
        self.inbound.pop_front()
    }
}
