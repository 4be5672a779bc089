//! USB-MIDI transport: receive queue, transmit scratch and the controller
//! driving them over a raw USB-MIDI port.

mod buffer;
#[cfg(feature = "debug-tools")]
mod debug;
mod error;
mod port;
#[allow(clippy::module_inception)]
mod transport;

pub use buffer::{ByteQueue, PacketBuffer, QueueOverflow};
#[cfg(feature = "debug-tools")]
pub use debug::{Direction, PacketCapture};
pub use error::{ConfigError, TransportError};
pub use port::{Delay, LoopbackPort, RawMidiPort, ThreadSleep};
pub use transport::{
    MidiRxHandler, MidiTransport, Periph, SharedTransport, TransportConfig, TxReport,
};
