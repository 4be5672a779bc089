use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use usbmidi::{CableNumber, UsbMidiPacket, decode, encode};

fn note_stream(notes: usize) -> Vec<u8> {
    (0..notes)
        .flat_map(|i| {
            let note = (i % 128) as u8;
            [0x90, note, 100, 0x80, note, 0]
        })
        .collect()
}

fn sysex_dump(body: usize) -> Vec<u8> {
    let mut dump = Vec::with_capacity(body + 2);
    dump.push(0xF0);
    dump.extend((0..body).map(|i| (i % 128) as u8));
    dump.push(0xF7);
    dump
}

fn bench_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("codec");
    let cable = CableNumber::default();

    // 256 note on/off pairs
    let notes = note_stream(256);
    group.throughput(Throughput::Bytes(notes.len() as u64));
    group.bench_function("encode_notes", |b| {
        let mut packets = Vec::with_capacity(512);
        b.iter(|| {
            packets.clear();
            black_box(encode(black_box(&notes), cable, &mut packets).unwrap());
        });
    });

    // 4 KB SysEx dump
    let dump = sysex_dump(4096);
    group.throughput(Throughput::Bytes(dump.len() as u64));
    group.bench_function("encode_sysex_4kb", |b| {
        let mut packets = Vec::with_capacity(dump.len() / 3 + 2);
        b.iter(|| {
            packets.clear();
            black_box(encode(black_box(&dump), cable, &mut packets).unwrap());
        });
    });

    group.finish();
}

fn bench_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("codec");

    let mut packets: Vec<UsbMidiPacket> = Vec::new();
    encode(&sysex_dump(4096), CableNumber::default(), &mut packets).unwrap();
    let raw: Vec<u8> = packets.iter().flat_map(|p| p.to_bytes()).collect();

    group.throughput(Throughput::Bytes(raw.len() as u64));
    group.bench_function("decode_sysex_4kb", |b| {
        b.iter(|| {
            let mut total = 0;
            for packet in raw.chunks_exact(4) {
                total += decode(black_box(packet)).unwrap().len();
            }
            black_box(total);
        });
    });

    group.finish();
}

fn bench_roundtrip(c: &mut Criterion) {
    let mut group = c.benchmark_group("codec");

    let notes = note_stream(64);
    group.throughput(Throughput::Bytes(notes.len() as u64));
    group.bench_function("roundtrip_notes", |b| {
        let mut packets = Vec::with_capacity(128);
        let mut midi = Vec::with_capacity(notes.len());
        b.iter(|| {
            packets.clear();
            midi.clear();
            encode(&notes, CableNumber::default(), &mut packets).unwrap();
            for packet in &packets {
                midi.extend_from_slice(packet.payload().unwrap());
            }
            black_box(&midi);
        });
    });

    group.finish();
}

criterion_group!(benches, bench_encode, bench_decode, bench_roundtrip);
criterion_main!(benches);
