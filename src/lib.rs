//! USB-MIDI transport codec
//!
//! This library translates between raw MIDI byte streams (running status,
//! variable-length messages, arbitrarily long SysEx dumps) and USB-MIDI event
//! packets, the fixed 4-byte units exchanged with a USB-MIDI host or device.
//! It also provides the controller that buffers received bytes and retries
//! busy writes on top of any raw USB-MIDI endpoint.
//!
//! # Quick Start
//!
//! ```rust
//! use usbmidi::{CableNumber, UsbMidiPacket, decode, encode};
//!
//! // Note On, channel 1, note 60, velocity 127
//! let mut packets: Vec<UsbMidiPacket> = Vec::new();
//! let summary = encode(&[0x90, 60, 127], CableNumber::default(), &mut packets)?;
//! assert_eq!(summary.packets, 1);
//! assert_eq!(packets[0].to_bytes(), [0x09, 0x90, 60, 127]);
//!
//! // Back to raw MIDI bytes
//! assert_eq!(decode(packets[0].as_bytes())?, &[0x90, 60, 127]);
//! # Ok::<(), usbmidi::Error>(())
//! ```
//!
//! # Transport
//!
//! ```rust
//! use usbmidi::transport::{LoopbackPort, MidiTransport, TransportConfig};
//!
//! let mut transport = MidiTransport::new(TransportConfig::default(), LoopbackPort::new())?;
//! transport.start_rx(|bytes: &[u8]| println!("received {bytes:02X?}"));
//! transport.tx(&[0xB0, 7, 100])?;
//! transport.poll_rx();
//! # Ok::<(), usbmidi::transport::TransportError>(())
//! ```
//!
//! # Features
//!
//! - **Bit-exact event packets** - code index tables from the USB-MIDI 1.0 device class definition
//! - **Permissive on malformed input** - bad messages are dropped and counted, never panic
//! - **Bounded buffers** - fixed-capacity receive queue with fail-stop on overflow
//! - **Retry on busy** - configurable retry budget with fixed backoff

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod protocol;
pub mod transport;

pub use protocol::{
    CableNumber, CodeIndex, EncodeSummary, Error, MessageClass, PACKET_SIZE, PacketSink, Result,
    UsbMidiPacket, decode, encode, encode_message,
};
pub use transport::{MidiTransport, SharedTransport, TransportConfig, TransportError};

/// USB-MIDI class specification version implemented by the codec
pub const USB_MIDI_VERSION: &str = "1.0";
