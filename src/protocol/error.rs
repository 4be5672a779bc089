//! USB-MIDI codec error types

use thiserror::Error;

/// Codec errors
///
/// Malformed wire data never panics. Most of these are reported as drop
/// reasons: the codec discards the offending packet or message, counts it,
/// and keeps going.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// USB-MIDI packet shorter than the 4-byte framing
    #[error("garbled packet: need 4 bytes, got {len}")]
    PacketTooShort {
        /// Received length
        len: usize,
    },

    /// Reserved code index number (0x0 or 0x1)
    #[error("reserved code index number: {cin:#x}")]
    ReservedCodeIndex {
        /// Code index nibble
        cin: u8,
    },

    /// Message span does not start with a status byte
    #[error("expected status byte, got data byte {byte:#04x}")]
    MissingStatus {
        /// Offending leading byte
        byte: u8,
    },

    /// Message length does not match what its status byte requires
    #[error("malformed message {status:#04x}: expected {expected} bytes, got {got}")]
    MalformedMessage {
        /// Status byte
        status: u8,
        /// Required length including the status byte
        expected: usize,
        /// Actual span length
        got: usize,
    },

    /// Output buffer cannot hold the encoded packets
    #[error("buffer too small: need {needed} bytes, got {got}")]
    BufferTooSmall {
        /// Needed size
        needed: usize,
        /// Actual size
        got: usize,
    },
}

impl Error {
    /// Check if this error only concerns the current message or packet.
    ///
    /// Everything except [`Error::BufferTooSmall`] is a drop reason; running
    /// out of output space aborts the whole encode.
    #[must_use]
    pub const fn is_drop(&self) -> bool {
        !matches!(self, Self::BufferTooSmall { .. })
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
