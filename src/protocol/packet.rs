//! USB-MIDI event packet
//!
//! Every MIDI event crosses the USB bus as one fixed 4-byte packet.

use std::fmt;

use super::{CableNumber, CodeIndex, Error, MAX_PACKET_PAYLOAD, PACKET_SIZE, Result};

/// USB-MIDI event packet (4 bytes)
///
/// # Wire Format
///
/// ```text
/// 0       4       8              16              24              32
/// +-------+-------+---------------+---------------+---------------+
/// | Cable |  CIN  |    MIDI_0     |    MIDI_1     |    MIDI_2     |
/// +-------+-------+---------------+---------------+---------------+
/// ```
///
/// Unused MIDI bytes are zero.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct UsbMidiPacket([u8; PACKET_SIZE]);

impl UsbMidiPacket {
    /// Create a packet from its header parts and up to three MIDI bytes.
    ///
    /// Bytes beyond the third are ignored, missing bytes are zero padded.
    #[must_use]
    pub fn new(cable: CableNumber, cin: CodeIndex, midi: &[u8]) -> Self {
        let mut bytes = [0u8; PACKET_SIZE];
        bytes[0] = cable.header(cin);
        let len = midi.len().min(MAX_PACKET_PAYLOAD);
        bytes[1..=len].copy_from_slice(&midi[..len]);
        Self(bytes)
    }

    /// Wrap raw packet bytes
    #[must_use]
    pub const fn from_bytes(bytes: [u8; PACKET_SIZE]) -> Self {
        Self(bytes)
    }

    /// Parse the first packet of a received buffer.
    ///
    /// Anything shorter than 4 bytes is garbled framing.
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let head = bytes
            .get(..PACKET_SIZE)
            .ok_or(Error::PacketTooShort { len: bytes.len() })?;
        let mut packet = [0u8; PACKET_SIZE];
        packet.copy_from_slice(head);
        Ok(Self(packet))
    }

    /// Get raw bytes
    #[must_use]
    pub const fn to_bytes(self) -> [u8; PACKET_SIZE] {
        self.0
    }

    /// Borrow raw bytes
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; PACKET_SIZE] {
        &self.0
    }

    /// Get code index number
    #[must_use]
    pub const fn code_index(&self) -> CodeIndex {
        CodeIndex::from_header(self.0[0])
    }

    /// Get cable number
    #[must_use]
    pub const fn cable(&self) -> CableNumber {
        CableNumber::from_header(self.0[0])
    }

    /// MIDI bytes this packet carries according to its code index.
    ///
    /// Reserved code indices are reported as errors rather than guessed.
    pub fn payload(&self) -> Result<&[u8]> {
        super::decode(&self.0)
    }
}

impl fmt::Debug for UsbMidiPacket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [header, a, b, c] = self.0;
        write!(f, "UsbMidiPacket[{header:02X} {a:02X} {b:02X} {c:02X}]")
    }
}

impl From<[u8; PACKET_SIZE]> for UsbMidiPacket {
    fn from(bytes: [u8; PACKET_SIZE]) -> Self {
        Self(bytes)
    }
}

impl From<UsbMidiPacket> for [u8; PACKET_SIZE] {
    fn from(packet: UsbMidiPacket) -> Self {
        packet.0
    }
}

impl AsRef<[u8]> for UsbMidiPacket {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_pads_and_truncates() {
        let packet = UsbMidiPacket::new(CableNumber::default(), CodeIndex::SingleByte, &[0xF8]);
        assert_eq!(packet.to_bytes(), [0x0F, 0xF8, 0x00, 0x00]);

        let packet = UsbMidiPacket::new(
            CableNumber::new(1).unwrap(),
            CodeIndex::SysExContinue,
            &[0xF0, 1, 2, 3, 4],
        );
        assert_eq!(packet.to_bytes(), [0x14, 0xF0, 0x01, 0x02]);
    }

    #[test]
    fn test_from_slice_rejects_short() {
        assert_eq!(
            UsbMidiPacket::from_slice(&[0x09, 0x90, 0x3C]),
            Err(Error::PacketTooShort { len: 3 })
        );
        let packet = UsbMidiPacket::from_slice(&[0x09, 0x90, 0x3C, 0x7F, 0xAA]).unwrap();
        assert_eq!(packet.to_bytes(), [0x09, 0x90, 0x3C, 0x7F]);
    }

    #[test]
    fn test_payload_sizes() {
        let note_on = UsbMidiPacket::from_bytes([0x09, 0x90, 0x3C, 0x7F]);
        assert_eq!(note_on.payload().unwrap(), &[0x90, 0x3C, 0x7F]);

        let program = UsbMidiPacket::from_bytes([0x0C, 0xC0, 0x05, 0x00]);
        assert_eq!(program.payload().unwrap(), &[0xC0, 0x05]);

        let clock = UsbMidiPacket::from_bytes([0x0F, 0xF8, 0x00, 0x00]);
        assert_eq!(clock.payload().unwrap(), &[0xF8]);
    }

    #[test]
    fn test_payload_rejects_reserved() {
        let packet = UsbMidiPacket::from_bytes([0x01, 0x90, 0x3C, 0x7F]);
        assert_eq!(packet.payload(), Err(Error::ReservedCodeIndex { cin: 0x1 }));
    }

    #[test]
    fn test_debug_format() {
        let packet = UsbMidiPacket::from_bytes([0x09, 0x90, 0x3C, 0x7F]);
        assert_eq!(format!("{packet:?}"), "UsbMidiPacket[09 90 3C 7F]");
    }
}
