//! USB-MIDI transport controller: receive arming, drain-and-deliver and
//! transmit with bounded retry.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

#[cfg(feature = "debug-tools")]
use std::path::PathBuf;

use tracing::{debug, instrument, trace, warn};

use crate::protocol::{
    self, CableNumber, EncodeSummary, MetricsSnapshot, PACKET_SIZE, PacketDrop, TransportMetrics,
};

#[cfg(feature = "debug-tools")]
use super::debug::{Direction, PacketCapture};
use super::buffer::{ByteQueue, PacketBuffer};
use super::error::{ConfigError, TransportError};
use super::port::{Delay, RawMidiPort, ThreadSleep};

/// USB peripheral the transport is attached to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Periph {
    /// On-chip full-speed peripheral
    #[default]
    Internal,
    /// High-speed peripheral with an external PHY
    External,
    /// Host mode
    Host,
}

impl Periph {
    /// USB port index handed to the device stack.
    #[must_use]
    pub const fn port_id(self) -> u8 {
        match self {
            Self::Internal => 0,
            Self::External | Self::Host => 1,
        }
    }
}

/// Transport configuration options.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct TransportConfig {
    /// Peripheral selection.
    pub periph: Periph,
    /// Additional write attempts after a short write. Zero disables retry.
    pub tx_retry_count: u8,
    /// Wait before each retry.
    pub retry_delay: Duration,
    /// Receive queue capacity in bytes.
    pub rx_buffer_size: usize,
    /// Transmit scratch capacity in bytes, a multiple of 4.
    pub tx_buffer_size: usize,
    /// Virtual cable written into outbound packet headers.
    pub cable_number: u8,
    /// Optional pcap capture of inbound and outbound packets.
    #[cfg(feature = "debug-tools")]
    pub capture_path: Option<PathBuf>,
}

impl TransportConfig {
    /// Default number of retries after a short write.
    pub const DEFAULT_TX_RETRY_COUNT: u8 = 3;
    /// Default wait between retries.
    pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_micros(100);
    /// Default buffer size, room for 256 packets.
    pub const DEFAULT_BUFFER_SIZE: usize = 1024;

    /// Check sizes and the cable number.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.rx_buffer_size == 0 {
            return Err(ConfigError::EmptyRxBuffer);
        }
        if self.tx_buffer_size == 0 || self.tx_buffer_size % PACKET_SIZE != 0 {
            return Err(ConfigError::TxBufferSize {
                size: self.tx_buffer_size,
            });
        }
        self.cable()?;
        Ok(())
    }

    fn cable(&self) -> Result<CableNumber, ConfigError> {
        CableNumber::new(self.cable_number).ok_or(ConfigError::CableNumber {
            cable: self.cable_number,
        })
    }
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            periph: Periph::Internal,
            tx_retry_count: Self::DEFAULT_TX_RETRY_COUNT,
            retry_delay: Self::DEFAULT_RETRY_DELAY,
            rx_buffer_size: Self::DEFAULT_BUFFER_SIZE,
            tx_buffer_size: Self::DEFAULT_BUFFER_SIZE,
            cable_number: 0,
            #[cfg(feature = "debug-tools")]
            capture_path: None,
        }
    }
}

/// Consumer of raw MIDI bytes drained from the receive queue.
///
/// Each call carries whatever arrived since the previous drain, not one
/// message. Message framing, running status and partial messages are up to
/// the handler.
pub trait MidiRxHandler: Send {
    /// Invoked with the drained bytes.
    fn handle_midi_rx(&mut self, bytes: &[u8]);
}

impl<F> MidiRxHandler for F
where
    F: FnMut(&[u8]) + Send,
{
    fn handle_midi_rx(&mut self, bytes: &[u8]) {
        self(bytes);
    }
}

/// Result of a completed transmission.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TxReport {
    /// Encoder outcome, including dropped malformed messages.
    pub summary: EncodeSummary,
    /// Write calls issued, zero if nothing was encoded.
    pub attempts: u32,
    /// Bytes written to the port.
    pub bytes_written: usize,
}

/// USB-MIDI transport controller.
///
/// Owns the receive queue, the transmit scratch buffer and the receive armed
/// flag. Every operation takes `&mut self`, so a single owner serializes the
/// decode path against [`start_rx`](Self::start_rx), [`flush_rx`](Self::flush_rx)
/// and [`tx`](Self::tx). Use [`SharedTransport`] to share one instance across
/// threads.
pub struct MidiTransport<P, D = ThreadSleep> {
    config: TransportConfig,
    cable: CableNumber,
    port: P,
    delay: D,
    rx_active: bool,
    rx_queue: ByteQueue,
    rx_scratch: Vec<u8>,
    handler: Option<Box<dyn MidiRxHandler>>,
    tx_buffer: PacketBuffer,
    metrics: TransportMetrics,
    #[cfg(feature = "debug-tools")]
    capture: Option<PacketCapture>,
}

impl<P> MidiTransport<P>
where
    P: RawMidiPort,
{
    /// Create a transport that sleeps the current thread between retries.
    pub fn new(config: TransportConfig, port: P) -> Result<Self, TransportError> {
        Self::with_delay(config, port, ThreadSleep)
    }
}

impl<P, D> MidiTransport<P, D>
where
    P: RawMidiPort,
    D: Delay,
{
    /// Create a transport with a custom retry delay.
    ///
    /// Receive starts disarmed until [`start_rx`](Self::start_rx).
    #[instrument(level = "info", skip(port, delay))]
    pub fn with_delay(config: TransportConfig, port: P, delay: D) -> Result<Self, TransportError> {
        config.validate()?;
        let cable = config.cable()?;
        #[cfg(feature = "debug-tools")]
        let capture = match &config.capture_path {
            Some(path) => Some(PacketCapture::create(path)?),
            None => None,
        };
        debug!(
            port_id = config.periph.port_id(),
            cable = cable.as_u8(),
            "transport initialized"
        );
        Ok(Self {
            cable,
            port,
            delay,
            rx_active: false,
            rx_queue: ByteQueue::new(config.rx_buffer_size),
            rx_scratch: Vec::with_capacity(config.rx_buffer_size),
            handler: None,
            tx_buffer: PacketBuffer::new(config.tx_buffer_size),
            metrics: TransportMetrics::new(),
            #[cfg(feature = "debug-tools")]
            capture,
            config,
        })
    }

    /// Discard stale input, arm receive and install `handler`.
    #[instrument(level = "debug", skip(self, handler))]
    pub fn start_rx(&mut self, handler: impl MidiRxHandler + 'static) {
        self.flush_rx();
        self.rx_active = true;
        self.handler = Some(Box::new(handler));
    }

    /// Clear the receive queue and discard packets pending in the port.
    ///
    /// The armed state is left unchanged.
    #[instrument(level = "debug", skip(self))]
    pub fn flush_rx(&mut self) {
        self.rx_queue.flush();
        let mut discarded = 0usize;
        while self.port.packet_available() {
            if self.port.read_packet().is_none() {
                break;
            }
            discarded += 1;
        }
        if discarded > 0 {
            debug!(discarded, "flushed pending packets");
        }
    }

    /// Whether received packets are currently decoded.
    ///
    /// Turns `false` on its own when the receive queue overflows.
    #[must_use]
    pub const fn rx_active(&self) -> bool {
        self.rx_active
    }

    /// Decode one received packet and deliver the queued bytes.
    ///
    /// Packets are discarded while receive is disarmed. Short packets and
    /// reserved code indices are dropped. If the queue overflows, receive is
    /// disarmed and the rest of the packet is discarded; the bytes already
    /// queued are still delivered.
    pub fn receive_packet(&mut self, packet: &[u8]) {
        self.metrics.record_packet_received();
        if !self.rx_active {
            self.metrics.record_packet_dropped(PacketDrop::Inactive);
            trace!("receive disarmed; discarding packet");
            return;
        }
        #[cfg(feature = "debug-tools")]
        self.capture_packets(Direction::Inbound, packet);

        match protocol::decode(packet) {
            Ok(midi) => {
                let mut enqueued = 0;
                for &byte in midi {
                    if let Err(overflow) = self.rx_queue.write(byte) {
                        self.rx_active = false;
                        self.metrics.record_overflow();
                        warn!(
                            capacity = overflow.capacity,
                            "receive queue overflow; receive disarmed"
                        );
                        break;
                    }
                    enqueued += 1;
                }
                self.metrics.record_enqueued(enqueued);
            }
            Err(err) => {
                self.metrics.record_packet_dropped(PacketDrop::Rejected);
                trace!(error = %err, "discarding packet");
            }
        }
        self.deliver();
    }

    /// Feed a raw received buffer to the decoder in 4-byte steps.
    ///
    /// A trailing remainder shorter than a packet is dropped as garbled.
    pub fn receive(&mut self, bytes: &[u8]) {
        for packet in bytes.chunks(PACKET_SIZE) {
            self.receive_packet(packet);
        }
    }

    /// Read and decode every packet pending in the port.
    ///
    /// Returns the number of packets taken from the port. Packets are read
    /// even while receive is disarmed so the sender never stalls.
    pub fn poll_rx(&mut self) -> usize {
        let mut count = 0;
        while self.port.packet_available() {
            let Some(packet) = self.port.read_packet() else {
                break;
            };
            self.receive_packet(packet.as_bytes());
            count += 1;
        }
        count
    }

    fn deliver(&mut self) {
        if self.rx_queue.is_empty() {
            return;
        }
        let Some(handler) = self.handler.as_mut() else {
            return;
        };
        self.rx_scratch.clear();
        let len = self.rx_queue.drain_into(&mut self.rx_scratch);
        trace!(len, "delivering received bytes");
        handler.handle_midi_rx(&self.rx_scratch);
        self.metrics.record_delivery();
    }

    /// Encode `midi` and write the packets to the port.
    ///
    /// A short write is retried up to `tx_retry_count` more times, each after
    /// `retry_delay`, resuming at the first byte the port did not accept.
    /// Malformed messages are dropped and reported in [`TxReport::summary`].
    ///
    /// # Errors
    ///
    /// - [`TransportError::Codec`] if the encoded packets exceed the scratch
    ///   buffer; nothing is written.
    /// - [`TransportError::TxIncomplete`] once the retries are exhausted.
    #[instrument(level = "debug", skip(self, midi), fields(len = midi.len()))]
    pub fn tx(&mut self, midi: &[u8]) -> Result<TxReport, TransportError> {
        self.tx_buffer.reset();
        let summary = match protocol::encode(midi, self.cable, &mut self.tx_buffer) {
            Ok(summary) => summary,
            Err(err) => {
                self.tx_buffer.reset();
                self.metrics.record_tx(0, 0, false);
                warn!(error = %err, "encoded packets exceed transmit buffer");
                return Err(err.into());
            }
        };
        self.metrics.record_encoded(summary.messages, summary.dropped);
        if self.tx_buffer.is_empty() {
            return Ok(TxReport {
                summary,
                ..TxReport::default()
            });
        }
        #[cfg(feature = "debug-tools")]
        self.capture_packets(Direction::Outbound, self.tx_buffer.as_slice());

        let requested = self.tx_buffer.len();
        let max_attempts = 1 + u32::from(self.config.tx_retry_count);
        let mut attempts = 0;
        let mut written = 0;
        while attempts < max_attempts {
            if attempts > 0 {
                self.delay.delay(self.config.retry_delay);
            }
            attempts += 1;
            let remaining = &self.tx_buffer.as_slice()[written..];
            written += self.port.write(remaining).min(remaining.len());
            if written == requested {
                break;
            }
            debug!(attempts, written, requested, "short write");
        }
        self.tx_buffer.reset();

        let succeeded = written == requested;
        self.metrics.record_tx(summary.packets, attempts, succeeded);
        if !succeeded {
            warn!(attempts, written, requested, "transmit retries exhausted");
            return Err(TransportError::TxIncomplete {
                attempts,
                written,
                requested,
            });
        }
        Ok(TxReport {
            summary,
            attempts,
            bytes_written: written,
        })
    }

    #[cfg(feature = "debug-tools")]
    fn capture_packets(&self, direction: Direction, packets: &[u8]) {
        if let Some(capture) = &self.capture {
            if let Err(err) = capture.record(direction, packets) {
                debug!(error = ?err, "failed to record packets");
            }
        }
    }
}

impl<P, D> MidiTransport<P, D> {
    /// Active configuration.
    #[must_use]
    pub const fn config(&self) -> &TransportConfig {
        &self.config
    }

    /// Counters for this transport.
    #[must_use]
    pub const fn metrics(&self) -> &TransportMetrics {
        &self.metrics
    }

    /// Bytes waiting in the receive queue.
    #[must_use]
    pub const fn rx_pending(&self) -> usize {
        self.rx_queue.readable()
    }

    /// Borrow the underlying port.
    #[must_use]
    pub const fn port(&self) -> &P {
        &self.port
    }

    /// Mutably borrow the underlying port.
    pub fn port_mut(&mut self) -> &mut P {
        &mut self.port
    }

    /// Borrow the retry delay.
    #[must_use]
    pub const fn delay(&self) -> &D {
        &self.delay
    }
}

impl<P, D> fmt::Debug for MidiTransport<P, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MidiTransport")
            .field("config", &self.config)
            .field("rx_active", &self.rx_active)
            .field("rx_pending", &self.rx_queue.readable())
            .field("has_handler", &self.handler.is_some())
            .finish_non_exhaustive()
    }
}

/// Cloneable handle serializing every operation of one transport under a
/// single lock.
///
/// Use it when the port's receive notification and application calls run on
/// different threads. The receive handler runs with the lock held and must
/// not call back into the same handle.
pub struct SharedTransport<P, D = ThreadSleep> {
    inner: Arc<Mutex<MidiTransport<P, D>>>,
}

impl<P, D> Clone for SharedTransport<P, D> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<P, D> fmt::Debug for SharedTransport<P, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedTransport").finish_non_exhaustive()
    }
}

impl<P, D> SharedTransport<P, D>
where
    P: RawMidiPort,
    D: Delay,
{
    /// Wrap an owned transport.
    #[must_use]
    pub fn new(transport: MidiTransport<P, D>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(transport)),
        }
    }

    /// See [`MidiTransport::start_rx`].
    pub fn start_rx(&self, handler: impl MidiRxHandler + 'static) {
        self.lock().start_rx(handler);
    }

    /// See [`MidiTransport::flush_rx`].
    pub fn flush_rx(&self) {
        self.lock().flush_rx();
    }

    /// See [`MidiTransport::rx_active`].
    #[must_use]
    pub fn rx_active(&self) -> bool {
        self.lock().rx_active()
    }

    /// See [`MidiTransport::receive_packet`].
    pub fn receive_packet(&self, packet: &[u8]) {
        self.lock().receive_packet(packet);
    }

    /// See [`MidiTransport::poll_rx`].
    pub fn poll_rx(&self) -> usize {
        self.lock().poll_rx()
    }

    /// See [`MidiTransport::tx`].
    pub fn tx(&self, midi: &[u8]) -> Result<TxReport, TransportError> {
        self.lock().tx(midi)
    }

    /// Snapshot of the transport counters.
    #[must_use]
    pub fn metrics(&self) -> MetricsSnapshot {
        self.lock().metrics().snapshot()
    }

    /// Run `f` with exclusive access to the transport.
    pub fn with<R>(&self, f: impl FnOnce(&mut MidiTransport<P, D>) -> R) -> R {
        f(&mut self.lock())
    }

    fn lock(&self) -> MutexGuard<'_, MidiTransport<P, D>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
