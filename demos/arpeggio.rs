//! Plays a looping arpeggio through a loopback USB-MIDI transport.
//!
//! Run with `cargo run --example arpeggio` (optionally set `ARPEGGIO_STEPS`
//! and `ARPEGGIO_STEP_MS` to change the length and tempo).

use std::env;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use usbmidi::transport::{LoopbackPort, MidiTransport, TransportConfig};

const MELODY: [u8; 64] = [
    74, 78, 81, 86, 90, 93, 98, 102, 57, 61, 66, 69, 73, 78, 81, 85, //
    88, 92, 97, 100, 97, 92, 88, 85, 81, 78, 74, 69, 66, 62, 57, 62, //
    66, 69, 74, 78, 81, 86, 90, 93, 97, 102, 97, 93, 90, 85, 81, 78, //
    73, 68, 64, 61, 56, 61, 64, 68, 74, 78, 81, 86, 90, 93, 98, 102,
];

const CHANNEL: u8 = 0;
const DEFAULT_STEP_MS: u64 = 286;

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|raw| raw.parse().ok())
        .unwrap_or(default)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let steps: usize = env_or("ARPEGGIO_STEPS", MELODY.len());
    let step = Duration::from_millis(env_or("ARPEGGIO_STEP_MS", DEFAULT_STEP_MS));

    println!("USB-MIDI arpeggio: {steps} steps, {step:?} per step");
    println!("-----------------------------------------------------------------");

    let mut transport = MidiTransport::new(TransportConfig::default(), LoopbackPort::new())?;
    let received = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&received);
    transport.start_rx(move |bytes: &[u8]| {
        if let Ok(mut received) = sink.lock() {
            received.extend_from_slice(bytes);
        }
        println!("  rx {bytes:02X?}");
    });

    for position in 0..steps {
        let current = MELODY[position % MELODY.len()];
        let previous = MELODY[(position + MELODY.len() - 1) % MELODY.len()];

        let report = transport.tx(&[
            0x90 | CHANNEL,
            current,
            127,
            0x80 | CHANNEL,
            previous,
            0,
        ])?;
        println!(
            "step {position:>3}: note {current:>3} on, note {previous:>3} off ({} packets)",
            report.summary.packets
        );
        transport.poll_rx();

        if !step.is_zero() {
            thread::sleep(step);
        }
    }

    let snapshot = transport.metrics().snapshot();
    println!("-----------------------------------------------------------------");
    println!(
        "sent {} packets, delivered {} bytes in {} callbacks",
        snapshot.packets_sent,
        received.lock().map(|bytes| bytes.len()).unwrap_or_default(),
        snapshot.deliveries
    );

    Ok(())
}
