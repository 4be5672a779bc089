//! Fixed-capacity buffers for the receive and transmit paths.

use bytes::{BufMut, BytesMut};
use thiserror::Error;

use crate::protocol::{self, PACKET_SIZE, PacketSink, UsbMidiPacket};

/// A write was attempted while the queue held `capacity` bytes.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("byte queue overflow: capacity {capacity} bytes")]
pub struct QueueOverflow {
    /// Queue capacity
    pub capacity: usize,
}

/// Bounded single-producer single-consumer byte ring.
///
/// Indices wrap modulo the capacity and `len` is always within
/// `0..=capacity`. There is no internal locking: the owner serializes
/// producer and consumer access (see [`SharedTransport`]).
///
/// [`SharedTransport`]: super::SharedTransport
#[derive(Debug, Clone)]
pub struct ByteQueue {
    data: Box<[u8]>,
    read: usize,
    write: usize,
    len: usize,
}

impl ByteQueue {
    /// Create an empty queue.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "capacity must be positive");
        Self {
            data: vec![0u8; capacity].into_boxed_slice(),
            read: 0,
            write: 0,
            len: 0,
        }
    }

    /// Append a byte, or drop it and report overflow if the queue is full.
    pub fn write(&mut self, byte: u8) -> Result<(), QueueOverflow> {
        if self.is_full() {
            return Err(QueueOverflow {
                capacity: self.capacity(),
            });
        }
        self.data[self.write] = byte;
        self.write = (self.write + 1) % self.capacity();
        self.len += 1;
        Ok(())
    }

    /// Pop the oldest byte, `None` if the queue is empty.
    pub fn read(&mut self) -> Option<u8> {
        if self.is_empty() {
            return None;
        }
        let byte = self.data[self.read];
        self.read = (self.read + 1) % self.capacity();
        self.len -= 1;
        Some(byte)
    }

    /// Move every queued byte to the end of `out` and return how many moved.
    pub fn drain_into(&mut self, out: &mut Vec<u8>) -> usize {
        let count = self.len;
        out.reserve(count);
        let (first, second) = self.as_slices();
        out.extend_from_slice(first);
        out.extend_from_slice(second);
        self.flush();
        count
    }

    /// Discard all queued bytes. Only the indices are reset.
    pub fn flush(&mut self) {
        self.read = 0;
        self.write = 0;
        self.len = 0;
    }

    /// Number of bytes available to read
    #[must_use]
    pub const fn readable(&self) -> usize {
        self.len
    }

    /// Number of bytes that can be written before overflow
    #[must_use]
    pub fn writable(&self) -> usize {
        self.capacity() - self.len
    }

    /// Check whether the queue is empty
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Check whether the queue is full
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.len == self.capacity()
    }

    /// Fixed capacity in bytes
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    fn as_slices(&self) -> (&[u8], &[u8]) {
        let end = self.read + self.len;
        if end <= self.capacity() {
            (&self.data[self.read..end], &self.data[..0])
        } else {
            (&self.data[self.read..], &self.data[..end - self.capacity()])
        }
    }
}

/// Fixed-capacity scratch area for encoded outbound packets.
#[derive(Debug)]
pub struct PacketBuffer {
    data: BytesMut,
    capacity: usize,
}

impl PacketBuffer {
    /// Create an empty buffer holding at most `capacity` bytes.
    ///
    /// The usable capacity is rounded down to whole packets.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity - capacity % PACKET_SIZE;
        Self {
            data: BytesMut::with_capacity(capacity),
            capacity,
        }
    }

    /// Reset the logical length of the buffer.
    pub fn reset(&mut self) {
        self.data.clear();
    }

    /// Encoded bytes written so far
    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        &self.data[..]
    }

    /// Encoded packets written so far
    pub fn packets(&self) -> impl Iterator<Item = UsbMidiPacket> + '_ {
        self.data.chunks_exact(PACKET_SIZE).filter_map(|chunk| {
            UsbMidiPacket::from_slice(chunk).ok()
        })
    }

    /// Current length in bytes
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Check whether the buffer contains no data.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Return the configured capacity.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }
}

impl PacketSink for PacketBuffer {
    fn push_packet(&mut self, packet: UsbMidiPacket) -> protocol::Result<()> {
        let needed = self.data.len() + PACKET_SIZE;
        if needed > self.capacity {
            return Err(protocol::Error::BufferTooSmall {
                needed,
                got: self.capacity,
            });
        }
        self.data.put_slice(packet.as_bytes());
        Ok(())
    }
}
