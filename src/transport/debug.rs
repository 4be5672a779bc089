//! Packet capture for inspecting USB-MIDI traffic (debug builds only).
//!
//! Packets are stored as pcap records under `LINKTYPE_USER0`. Each record is
//! five bytes: a direction marker followed by the 4-byte event packet.

use std::fs::File;
use std::io::{self, Write};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

use bytes::{BufMut, BytesMut};

use crate::protocol::PACKET_SIZE;

const PCAP_MAGIC: u32 = 0xa1b2_c3d4;
const PCAP_VERSION: (u16, u16) = (2, 4);
const PCAP_SNAPLEN: u32 = 16;
const LINKTYPE_USER0: u32 = 147;
const RECORD_LEN: u32 = 1 + PACKET_SIZE as u32;

/// Direction of a captured packet, stored as the first record byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Direction {
    /// Received from the host
    Inbound = 0,
    /// Sent to the host
    Outbound = 1,
}

/// Thread-safe pcap writer for USB-MIDI packets.
#[derive(Clone)]
pub struct PacketCapture {
    file: Arc<Mutex<File>>,
}

impl PacketCapture {
    /// Create a capture file at `path`, truncating any existing file.
    pub fn create(path: &Path) -> io::Result<Self> {
        let mut file = File::create(path)?;
        let mut header = BytesMut::with_capacity(24);
        header.put_u32_le(PCAP_MAGIC);
        header.put_u16_le(PCAP_VERSION.0);
        header.put_u16_le(PCAP_VERSION.1);
        header.put_i32_le(0);
        header.put_u32_le(0);
        header.put_u32_le(PCAP_SNAPLEN);
        header.put_u32_le(LINKTYPE_USER0);
        file.write_all(&header)?;
        Ok(Self {
            file: Arc::new(Mutex::new(file)),
        })
    }

    /// Record every whole packet in `packets` with the current timestamp.
    pub fn record(&self, direction: Direction, packets: &[u8]) -> io::Result<()> {
        let since_epoch = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();
        let secs = u32::try_from(since_epoch.as_secs()).unwrap_or(u32::MAX);
        let micros = since_epoch.subsec_micros();

        let mut records = BytesMut::new();
        for packet in packets.chunks_exact(PACKET_SIZE) {
            records.put_u32_le(secs);
            records.put_u32_le(micros);
            records.put_u32_le(RECORD_LEN);
            records.put_u32_le(RECORD_LEN);
            records.put_u8(direction as u8);
            records.put_slice(packet);
        }

        let mut file = self
            .file
            .lock()
            .map_err(|_| io::Error::other("packet capture poisoned"))?;
        file.write_all(&records)?;
        file.flush()
    }
}

impl std::fmt::Debug for PacketCapture {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PacketCapture").finish_non_exhaustive()
    }
}
