//! Transport layer performance benchmarks
//!
//! Measures the receive queue and the controller over an in-memory port.

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};

/// Benchmark byte queue operations
fn bench_byte_queue(c: &mut Criterion) {
    use usbmidi::transport::ByteQueue;

    let mut group = c.benchmark_group("byte_queue");

    for size in [64usize, 1024] {
        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::new("write_drain", size), &size, |b, &size| {
            let mut queue = ByteQueue::new(size);
            let mut out = Vec::with_capacity(size);
            b.iter(|| {
                for i in 0..size {
                    queue.write(i as u8).unwrap();
                }
                out.clear();
                black_box(queue.drain_into(&mut out));
            });
        });
    }

    group.finish();
}

/// Benchmark transmit and receive through a loopback port
fn bench_transport(c: &mut Criterion) {
    use usbmidi::transport::{LoopbackPort, MidiTransport, TransportConfig};

    let mut group = c.benchmark_group("transport");

    let chord: [u8; 9] = [0x90, 60, 100, 0x90, 64, 100, 0x90, 67, 100];
    group.throughput(Throughput::Bytes(chord.len() as u64));

    group.bench_function("tx_chord", |b| {
        let mut transport =
            MidiTransport::new(TransportConfig::default(), LoopbackPort::new()).unwrap();
        b.iter(|| {
            black_box(transport.tx(black_box(&chord)).unwrap());
            transport.flush_rx();
            transport.port_mut().clear_written();
        });
    });

    group.bench_function("tx_poll_chord", |b| {
        let mut transport =
            MidiTransport::new(TransportConfig::default(), LoopbackPort::new()).unwrap();
        transport.start_rx(|bytes: &[u8]| {
            black_box(bytes);
        });
        b.iter(|| {
            transport.tx(&chord).unwrap();
            black_box(transport.poll_rx());
            transport.port_mut().clear_written();
        });
    });

    group.bench_function("receive_packet", |b| {
        let mut transport =
            MidiTransport::new(TransportConfig::default(), LoopbackPort::new()).unwrap();
        transport.start_rx(|bytes: &[u8]| {
            black_box(bytes);
        });
        b.iter(|| transport.receive_packet(black_box(&[0x09u8, 0x90, 60, 127])));
    });

    group.finish();
}

criterion_group!(benches, bench_byte_queue, bench_transport);
criterion_main!(benches);
