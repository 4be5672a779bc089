//! USB-MIDI wire protocol
//!
//! This module provides the event packet format, code index tables and the
//! codec translating between raw MIDI bytes and USB-MIDI packets. It does no
//! I/O and keeps no state between calls.

mod codec;
mod error;
mod metrics;
mod packet;
mod types;

pub use codec::{EncodeSummary, MessageSpans, PacketSink, decode, encode, encode_message};
pub use error::{Error, Result};
pub use metrics::{MetricsSnapshot, TransportMetrics};
pub(crate) use metrics::PacketDrop;
pub use packet::UsbMidiPacket;
pub use types::{
    CHANNEL_VOICE_SIZE, CableNumber, CodeIndex, MessageClass, PACKET_PAYLOAD_SIZE,
    STATUS_BYTE_MASK, SYSEX_END, SYSEX_START,
};

/// USB-MIDI event packet size in bytes
pub const PACKET_SIZE: usize = 4;

/// Maximum MIDI bytes carried by one packet
pub const MAX_PACKET_PAYLOAD: usize = PACKET_SIZE - 1;
