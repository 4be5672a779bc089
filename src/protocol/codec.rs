//! USB-MIDI packet codec (encode/decode)
//!
//! Decoding turns one 4-byte event packet back into the raw MIDI bytes it
//! carries. Encoding scans a raw MIDI byte buffer for status bytes, splits it
//! into single-message spans and frames each span into event packets.

use tracing::trace;

use super::{
    CableNumber, CodeIndex, Error, MessageClass, PACKET_SIZE, Result, STATUS_BYTE_MASK,
    UsbMidiPacket,
};

/// Destination for encoded packets
pub trait PacketSink {
    /// Append one packet.
    ///
    /// Bounded sinks return [`Error::BufferTooSmall`] once full.
    fn push_packet(&mut self, packet: UsbMidiPacket) -> Result<()>;
}

impl PacketSink for Vec<UsbMidiPacket> {
    fn push_packet(&mut self, packet: UsbMidiPacket) -> Result<()> {
        self.push(packet);
        Ok(())
    }
}

impl<S> PacketSink for &mut S
where
    S: PacketSink + ?Sized,
{
    fn push_packet(&mut self, packet: UsbMidiPacket) -> Result<()> {
        (**self).push_packet(packet)
    }
}

/// Outcome of encoding a raw MIDI buffer
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct EncodeSummary {
    /// Messages framed into at least one packet
    pub messages: usize,
    /// Packets pushed into the sink
    pub packets: usize,
    /// Messages dropped as malformed
    pub dropped: usize,
}

impl EncodeSummary {
    /// Encoded size in bytes
    #[must_use]
    pub const fn encoded_len(&self) -> usize {
        self.packets * PACKET_SIZE
    }
}

/// Decode a received packet into the MIDI bytes it carries.
///
/// # Format
///
/// ```text
/// [CABLE|CIN] [MIDI_0] [MIDI_1] [MIDI_2]
/// ```
///
/// Only the first `PACKET_PAYLOAD_SIZE[cin]` MIDI bytes are returned. The
/// cable nibble is ignored since a single cable is served.
///
/// # Errors
///
/// Returns an error if:
/// - Fewer than 4 bytes are supplied
/// - The code index is reserved (0x0 or 0x1)
pub fn decode(packet: &[u8]) -> Result<&[u8]> {
    let head = packet
        .get(..PACKET_SIZE)
        .ok_or(Error::PacketTooShort { len: packet.len() })?;
    let cin = CodeIndex::from_header(head[0]);
    if cin.is_reserved() {
        return Err(Error::ReservedCodeIndex { cin: cin.as_u8() });
    }
    Ok(&head[1..=cin.payload_size()])
}

/// Encode a raw MIDI byte buffer into packets.
///
/// The buffer is split at every status byte. Each span is framed with
/// [`encode_message`]; spans of the wrong length are dropped and counted in
/// the returned summary. Running status is not reconstructed, so a span
/// holding several messages behind one status byte is dropped as well.
///
/// # Errors
///
/// Only [`Error::BufferTooSmall`] from the sink aborts the encode.
pub fn encode<S>(midi: &[u8], cable: CableNumber, sink: &mut S) -> Result<EncodeSummary>
where
    S: PacketSink + ?Sized,
{
    let mut summary = EncodeSummary::default();
    for span in MessageSpans::new(midi) {
        match encode_message(span, cable, &mut *sink) {
            Ok(packets) => {
                summary.messages += 1;
                summary.packets += packets;
            }
            Err(err) if err.is_drop() => {
                trace!(error = %err, len = span.len(), "dropping malformed message");
                summary.dropped += 1;
            }
            Err(err) => return Err(err),
        }
    }
    Ok(summary)
}

/// Encode a single MIDI message and return the number of packets emitted.
///
/// | Status | Length | CIN |
/// |---|---|---|
/// | `0x80..=0xEF` | 3, or 2 for `0xC_`/`0xD_` | status high nibble |
/// | `0xF2` | 3 | `0x3`, then SysEx framing (see below) |
/// | `0xF1`, `0xF3` | 2 | `0x2` |
/// | `0xF4..=0xFF` | 1 | `0x5` |
/// | `0xF0` | any | `0x4` per full triple, `0x5..=0x7` for the tail |
///
/// A song position pointer (`0xF2`) is emitted twice: once as a three-byte
/// system common packet and once more through the SysEx tail rule as
/// `[0x07, 0xF2, lsb, msb]`. Receivers therefore see the message twice.
///
/// # Errors
///
/// - [`Error::MissingStatus`] if the span starts with a data byte
/// - [`Error::MalformedMessage`] on a length mismatch
/// - [`Error::BufferTooSmall`] if the sink is full
pub fn encode_message<S>(message: &[u8], cable: CableNumber, sink: &mut S) -> Result<usize>
where
    S: PacketSink + ?Sized,
{
    let Some(&status) = message.first() else {
        return Ok(0);
    };
    let class = MessageClass::from_status(status)?;
    if let Some(expected) = class.message_len(status) {
        if message.len() != expected {
            return Err(Error::MalformedMessage {
                status,
                expected,
                got: message.len(),
            });
        }
    }

    match class {
        MessageClass::ChannelVoice => {
            // The CIN of a channel voice message is its status nibble
            let cin = CodeIndex::from_header(status >> 4);
            sink.push_packet(UsbMidiPacket::new(cable, cin, message))?;
            Ok(1)
        }
        MessageClass::SystemCommon3 => {
            sink.push_packet(UsbMidiPacket::new(cable, CodeIndex::SystemCommon3, message))?;
            Ok(1 + encode_sysex(message, cable, sink)?)
        }
        MessageClass::SystemCommon2 => {
            sink.push_packet(UsbMidiPacket::new(cable, CodeIndex::SystemCommon2, message))?;
            Ok(1)
        }
        MessageClass::SingleByte => {
            sink.push_packet(UsbMidiPacket::new(cable, CodeIndex::SysExEnd1, message))?;
            Ok(1)
        }
        MessageClass::SysEx => encode_sysex(message, cable, sink),
    }
}

/// Frame bytes as SysEx: `CIN 0x4` for every full triple except the last
/// group, which always gets the terminal CIN for 1, 2 or 3 bytes.
fn encode_sysex<S>(message: &[u8], cable: CableNumber, sink: &mut S) -> Result<usize>
where
    S: PacketSink + ?Sized,
{
    let tail_len = match message.len() % 3 {
        0 => 3.min(message.len()),
        r => r,
    };
    if tail_len == 0 {
        return Ok(0);
    }
    let (body, tail) = message.split_at(message.len() - tail_len);
    for chunk in body.chunks_exact(3) {
        sink.push_packet(UsbMidiPacket::new(cable, CodeIndex::SysExContinue, chunk))?;
    }
    sink.push_packet(UsbMidiPacket::new(cable, CodeIndex::sysex_end(tail.len())?, tail))?;
    Ok(body.len() / 3 + 1)
}

/// Iterator over single-message spans of a raw MIDI buffer.
///
/// Each span runs from a status byte up to (not including) the next byte
/// with the high bit set, or to the end of the buffer.
#[derive(Debug, Clone)]
pub struct MessageSpans<'a> {
    rest: &'a [u8],
}

impl<'a> MessageSpans<'a> {
    /// Create a span iterator over `midi`
    #[must_use]
    pub const fn new(midi: &'a [u8]) -> Self {
        Self { rest: midi }
    }
}

impl<'a> Iterator for MessageSpans<'a> {
    type Item = &'a [u8];

    fn next(&mut self) -> Option<Self::Item> {
        if self.rest.is_empty() {
            return None;
        }
        let end = self.rest[1..]
            .iter()
            .position(|byte| byte & STATUS_BYTE_MASK != 0)
            .map_or(self.rest.len(), |offset| offset + 1);
        let (span, rest) = self.rest.split_at(end);
        self.rest = rest;
        Some(span)
    }
}
