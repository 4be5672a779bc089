//! Transport-level error types covering codec, transmit and configuration failures.

use thiserror::Error;

use crate::protocol;

/// Unified error type for MIDI transport operations.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Encoding failure that aborted a transmission.
    #[error("codec error: {0}")]
    Codec(#[from] protocol::Error),

    /// The raw port kept reporting short writes until the retry budget ran out.
    #[error("transmit incomplete after {attempts} attempts: wrote {written} of {requested} bytes")]
    TxIncomplete {
        /// Number of write calls issued.
        attempts: u32,
        /// Bytes the port accepted in total.
        written: usize,
        /// Encoded bytes that should have been written.
        requested: usize,
    },

    /// Rejected configuration.
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    /// Packet capture file could not be written.
    #[cfg(feature = "debug-tools")]
    #[error("packet capture I/O error: {0}")]
    Capture(#[from] std::io::Error),
}

/// Configuration validation failures.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// Receive queue must hold at least one byte.
    #[error("rx_buffer_size must be positive")]
    EmptyRxBuffer,
    /// Transmit scratch must hold whole packets.
    #[error("tx_buffer_size must be a positive multiple of 4, got {size}")]
    TxBufferSize {
        /// Configured size.
        size: usize,
    },
    /// Cable numbers are 4 bits wide.
    #[error("cable_number must be in 0..=15, got {cable}")]
    CableNumber {
        /// Configured cable number.
        cable: u8,
    },
}
