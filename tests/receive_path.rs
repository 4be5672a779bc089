use std::sync::{Arc, Mutex};
use std::thread;

use usbmidi::transport::{LoopbackPort, MidiTransport, SharedTransport, TransportConfig};

type Deliveries = Arc<Mutex<Vec<Vec<u8>>>>;

fn collector() -> (Deliveries, impl FnMut(&[u8]) + Send + 'static) {
    let deliveries: Deliveries = Arc::default();
    let sink = Arc::clone(&deliveries);
    let handler = move |bytes: &[u8]| sink.lock().unwrap().push(bytes.to_vec());
    (deliveries, handler)
}

fn armed(config: TransportConfig) -> (MidiTransport<LoopbackPort>, Deliveries) {
    let mut transport = MidiTransport::new(config, LoopbackPort::new()).expect("valid config");
    let (deliveries, handler) = collector();
    transport.start_rx(handler);
    (transport, deliveries)
}

#[test]
fn note_on_packet_is_delivered() {
    let (mut transport, deliveries) = armed(TransportConfig::default());
    transport.receive_packet(&[0x09, 0x90, 60, 127]);

    assert_eq!(*deliveries.lock().unwrap(), vec![vec![0x90, 60, 127]]);
    assert_eq!(transport.rx_pending(), 0);
}

#[test]
fn each_packet_is_delivered_separately() {
    let (mut transport, deliveries) = armed(TransportConfig::default());
    transport.receive(&[
        0x04, 0xF0, 0x7E, 0x7F, // SysEx start
        0x06, 0x06, 0x01, 0x00, // two-byte tail
        0x05, 0xF7, 0x00, 0x00, // delimiter
    ]);

    assert_eq!(
        *deliveries.lock().unwrap(),
        vec![vec![0xF0, 0x7E, 0x7F], vec![0x06, 0x01], vec![0xF7]]
    );
}

#[test]
fn trailing_fragment_is_rejected() {
    let (mut transport, deliveries) = armed(TransportConfig::default());
    transport.receive(&[0x09, 0x90, 60, 127, 0x08, 0x80]);

    assert_eq!(*deliveries.lock().unwrap(), vec![vec![0x90, 60, 127]]);
    let snapshot = transport.metrics().snapshot();
    assert_eq!(snapshot.packets_received, 2);
    assert_eq!(snapshot.packets_rejected, 1);
}

#[test]
fn reserved_code_index_never_reaches_handler() {
    let (mut transport, deliveries) = armed(TransportConfig::default());
    transport.receive_packet(&[0x00, 0x90, 60, 127]);
    transport.receive_packet(&[0x01, 0x90, 60, 127]);

    assert!(deliveries.lock().unwrap().is_empty());
    assert!(transport.rx_active());
    assert_eq!(transport.metrics().snapshot().packets_rejected, 2);
}

#[test]
fn overflow_disarms_receive() {
    let config = TransportConfig {
        rx_buffer_size: 2,
        ..TransportConfig::default()
    };
    let (mut transport, deliveries) = armed(config);
    transport.receive_packet(&[0x09, 0x90, 60, 127]);

    // Bytes queued before the overflow are still delivered
    assert!(!transport.rx_active());
    assert_eq!(*deliveries.lock().unwrap(), vec![vec![0x90, 60]]);

    transport.receive_packet(&[0x0F, 0xF8, 0, 0]);
    assert_eq!(deliveries.lock().unwrap().len(), 1);

    let snapshot = transport.metrics().snapshot();
    assert_eq!(snapshot.overflows, 1);
    assert_eq!(snapshot.packets_inactive, 1);
    assert_eq!(snapshot.bytes_enqueued, 2);
}

#[test]
fn start_rx_rearms_after_overflow() {
    let config = TransportConfig {
        rx_buffer_size: 2,
        ..TransportConfig::default()
    };
    let (mut transport, _) = armed(config);
    transport.receive_packet(&[0x09, 0x90, 60, 127]);
    assert!(!transport.rx_active());

    let (deliveries, handler) = collector();
    transport.start_rx(handler);
    assert!(transport.rx_active());
    transport.receive_packet(&[0x0C, 0xC0, 5, 0]);
    assert_eq!(*deliveries.lock().unwrap(), vec![vec![0xC0, 5]]);
}

#[test]
fn flush_rx_keeps_armed_state() {
    let (mut transport, deliveries) = armed(TransportConfig::default());
    transport.port_mut().push_inbound([0x09u8, 0x90, 60, 127]);
    transport.port_mut().push_inbound([0x08u8, 0x80, 60, 0]);

    transport.flush_rx();
    assert_eq!(transport.port().inbound_len(), 0);
    assert!(transport.rx_active());
    assert_eq!(transport.poll_rx(), 0);
    assert!(deliveries.lock().unwrap().is_empty());

    let mut idle = MidiTransport::new(TransportConfig::default(), LoopbackPort::new()).unwrap();
    idle.port_mut().push_inbound([0x0Fu8, 0xFE, 0, 0]);
    idle.flush_rx();
    assert!(!idle.rx_active());
    assert_eq!(idle.port().inbound_len(), 0);
}

#[test]
fn start_rx_discards_stale_packets() {
    let mut transport = MidiTransport::new(TransportConfig::default(), LoopbackPort::new()).unwrap();
    transport.port_mut().push_inbound([0x09u8, 0x90, 60, 127]);

    let (deliveries, handler) = collector();
    transport.start_rx(handler);
    assert_eq!(transport.poll_rx(), 0);
    assert!(deliveries.lock().unwrap().is_empty());
}

#[test]
fn disarmed_poll_still_drains_port() {
    let mut transport = MidiTransport::new(TransportConfig::default(), LoopbackPort::new()).unwrap();
    transport.tx(&[0x90, 60, 127, 0x80, 60, 0]).unwrap();

    assert_eq!(transport.poll_rx(), 2);
    assert_eq!(transport.port().inbound_len(), 0);
    assert_eq!(transport.rx_pending(), 0);
    assert_eq!(transport.metrics().snapshot().packets_inactive, 2);
}

#[test]
fn loopback_round_trip() {
    let (mut transport, deliveries) = armed(TransportConfig::default());
    let midi = [
        0x90, 60, 127, // note on
        0xB0, 7, 100, // control change
        0xF8, // clock
        0xF0, 0x7E, 0x7F, 0x06, 0x01, 0xF7, // identity request
        0xE0, 0x00, 0x40, // pitch bend
    ];
    let report = transport.tx(&midi).unwrap();
    assert_eq!(report.summary.dropped, 0);

    assert_eq!(transport.poll_rx(), report.summary.packets);
    let received: Vec<u8> = deliveries.lock().unwrap().concat();
    assert_eq!(received, midi);
}

#[test]
fn shared_transport_across_threads() {
    let transport = MidiTransport::new(TransportConfig::default(), LoopbackPort::new()).unwrap();
    let shared = SharedTransport::new(transport);
    let (deliveries, handler) = collector();
    shared.start_rx(handler);

    let sender = {
        let shared = shared.clone();
        thread::spawn(move || {
            for note in 0..64u8 {
                shared.tx(&[0x90, note, 100]).expect("loopback accepts every write");
            }
        })
    };
    let receiver = {
        let shared = shared.clone();
        thread::spawn(move || {
            let mut polled = 0;
            for _ in 0..1_000 {
                polled += shared.poll_rx();
                thread::yield_now();
            }
            polled
        })
    };

    sender.join().unwrap();
    let polled = receiver.join().unwrap() + shared.poll_rx();
    assert_eq!(polled, 64);

    let expected: Vec<u8> = (0..64u8).flat_map(|note| [0x90, note, 100]).collect();
    assert_eq!(deliveries.lock().unwrap().concat(), expected);

    let snapshot = shared.metrics();
    assert_eq!(snapshot.packets_sent, 64);
    assert_eq!(snapshot.deliveries, 64);
    assert!(shared.rx_active());
}
