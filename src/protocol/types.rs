//! USB-MIDI code index numbers, MIDI message classes and lookup tables

use std::fmt;

use super::{Error, Result};

/// Number of valid MIDI bytes in a packet, indexed by code index number.
///
/// Values are taken verbatim from the USB Device Class Definition for MIDI
/// Devices 1.0, table 4-1.
pub const PACKET_PAYLOAD_SIZE: [u8; 16] = [3, 3, 2, 3, 3, 1, 2, 3, 3, 3, 3, 3, 2, 2, 3, 1];

/// Number of data bytes following the status byte of a channel voice
/// message, indexed by code index number. Zero for non channel voice CINs.
pub const CHANNEL_VOICE_SIZE: [u8; 16] = [0, 0, 0, 0, 0, 0, 0, 0, 2, 2, 2, 2, 1, 1, 2, 0];

/// High bit marking a MIDI status byte
pub const STATUS_BYTE_MASK: u8 = 0x80;

/// SysEx start delimiter
pub const SYSEX_START: u8 = 0xF0;

/// SysEx end delimiter
pub const SYSEX_END: u8 = 0xF7;

/// USB-MIDI code index number (low nibble of a packet's header byte)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum CodeIndex {
    /// Reserved for miscellaneous function codes
    Misc = 0x0,
    /// Reserved for cable events
    CableEvent = 0x1,
    /// Two-byte system common message
    SystemCommon2 = 0x2,
    /// Three-byte system common message
    SystemCommon3 = 0x3,
    /// SysEx starts or continues
    SysExContinue = 0x4,
    /// Single-byte system common message or SysEx ending with one byte
    SysExEnd1 = 0x5,
    /// SysEx ending with two bytes
    SysExEnd2 = 0x6,
    /// SysEx ending with three bytes
    SysExEnd3 = 0x7,
    /// Note off
    NoteOff = 0x8,
    /// Note on
    NoteOn = 0x9,
    /// Polyphonic key pressure
    PolyKeyPressure = 0xA,
    /// Control change
    ControlChange = 0xB,
    /// Program change
    ProgramChange = 0xC,
    /// Channel pressure
    ChannelPressure = 0xD,
    /// Pitch bend change
    PitchBend = 0xE,
    /// Single byte
    SingleByte = 0xF,
}

impl CodeIndex {
    /// Extract the code index from a packet header byte.
    #[must_use]
    pub const fn from_header(header: u8) -> Self {
        match header & 0x0F {
            0x0 => Self::Misc,
            0x1 => Self::CableEvent,
            0x2 => Self::SystemCommon2,
            0x3 => Self::SystemCommon3,
            0x4 => Self::SysExContinue,
            0x5 => Self::SysExEnd1,
            0x6 => Self::SysExEnd2,
            0x7 => Self::SysExEnd3,
            0x8 => Self::NoteOff,
            0x9 => Self::NoteOn,
            0xA => Self::PolyKeyPressure,
            0xB => Self::ControlChange,
            0xC => Self::ProgramChange,
            0xD => Self::ChannelPressure,
            0xE => Self::PitchBend,
            _ => Self::SingleByte,
        }
    }

    /// Convert to the 4-bit value
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    /// Number of MIDI bytes carried by a packet with this code index.
    #[must_use]
    pub const fn payload_size(self) -> usize {
        PACKET_PAYLOAD_SIZE[self as usize] as usize
    }

    /// Check if this code index is reserved and cannot be decoded
    #[must_use]
    pub const fn is_reserved(self) -> bool {
        matches!(self, Self::Misc | Self::CableEvent)
    }

    /// Check if this code index carries a channel voice message
    #[must_use]
    pub const fn is_channel_voice(self) -> bool {
        CHANNEL_VOICE_SIZE[self as usize] != 0
    }

    /// Terminal SysEx code index for a tail of `remaining` bytes (1..=3).
    pub fn sysex_end(remaining: usize) -> Result<Self> {
        match remaining {
            1 => Ok(Self::SysExEnd1),
            2 => Ok(Self::SysExEnd2),
            3 => Ok(Self::SysExEnd3),
            _ => Err(Error::MalformedMessage {
                status: SYSEX_START,
                expected: 3,
                got: remaining,
            }),
        }
    }
}

impl fmt::Display for CodeIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}(0x{:X})", self.as_u8())
    }
}

/// Category of a raw MIDI message, determined by its status byte
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageClass {
    /// `0x80..=0xEF`, addressed to a channel
    ChannelVoice,
    /// `0xF2` song position pointer
    SystemCommon3,
    /// `0xF1` and `0xF3`
    SystemCommon2,
    /// `0xF4..=0xFF`: single-byte system common and real-time messages
    SingleByte,
    /// `0xF0` system exclusive
    SysEx,
}

impl MessageClass {
    /// Classify a status byte.
    ///
    /// Data bytes (high bit clear) are rejected with [`Error::MissingStatus`].
    pub const fn from_status(status: u8) -> Result<Self> {
        if status & STATUS_BYTE_MASK == 0 {
            return Err(Error::MissingStatus { byte: status });
        }
        Ok(match status {
            0x80..=0xEF => Self::ChannelVoice,
            0xF2 => Self::SystemCommon3,
            0xF1 | 0xF3 => Self::SystemCommon2,
            0xF4..=0xFF => Self::SingleByte,
            _ => Self::SysEx,
        })
    }

    /// Expected message length including the status byte, `None` for SysEx.
    #[must_use]
    pub const fn message_len(self, status: u8) -> Option<usize> {
        match self {
            Self::ChannelVoice => Some(CHANNEL_VOICE_SIZE[(status >> 4) as usize] as usize + 1),
            Self::SystemCommon3 => Some(3),
            Self::SystemCommon2 => Some(2),
            Self::SingleByte => Some(1),
            Self::SysEx => None,
        }
    }
}

/// Virtual cable number stored in the high nibble of a packet header
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CableNumber(u8);

impl CableNumber {
    /// Highest cable number addressable by the 4-bit field
    pub const MAX: u8 = 0x0F;

    /// Create from a raw value, `None` if it does not fit in 4 bits
    #[must_use]
    pub const fn new(value: u8) -> Option<Self> {
        if value <= Self::MAX {
            Some(Self(value))
        } else {
            None
        }
    }

    /// Extract the cable number from a packet header byte
    #[must_use]
    pub const fn from_header(header: u8) -> Self {
        Self(header >> 4)
    }

    /// Convert to the 4-bit value
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self.0
    }

    /// Build a packet header byte for the given code index
    #[must_use]
    pub const fn header(self, cin: CodeIndex) -> u8 {
        (self.0 << 4) | cin.as_u8()
    }
}
