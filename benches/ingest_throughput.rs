//! Benchmarks for packet ingestion and wire decoding
//!
//! Ingest runs on the receive thread for every packet, so it bounds the
//! sustainable packet rate together with decoding.

use criterion::{BatchSize, Criterion, Throughput, criterion_group, criterion_main};
use emoclient::{ChannelId, ClientConfig, ClientModel, EmostatePacket, codec};
use std::hint::black_box;

fn full_packet(tick: i64) -> EmostatePacket {
    EmostatePacket::from_values(
        tick,
        ChannelId::ALL.iter().enumerate().map(|(i, channel)| (*channel, i as f64 / 18.0)),
    )
}

fn bench_decode(c: &mut Criterion) {
    let line = codec::encode_packet(&full_packet(42));

    let mut group = c.benchmark_group("decode");
    group.throughput(Throughput::Bytes(line.len() as u64));
    group.bench_function("full_packet_line", |b| {
        b.iter(|| black_box(codec::decode_line(black_box(&line)).unwrap()))
    });
    group.finish();
}

fn bench_ingest(c: &mut Criterion) {
    let mut group = c.benchmark_group("ingest");
    group.throughput(Throughput::Elements(1_000));

    group.bench_function("1000_packets_no_listeners", |b| {
        b.iter_batched(
            || ClientModel::new(ClientConfig::default()).unwrap(),
            |client| {
                for tick in 0..1_000 {
                    client.ingest(full_packet(tick));
                }
                black_box(client.packets_count())
            },
            BatchSize::SmallInput,
        )
    });

    group.bench_function("1000_packets_one_listener", |b| {
        b.iter_batched(
            || {
                let client = ClientModel::new(ClientConfig::default()).unwrap();
                client.subscribe(|event| {
                    black_box(event);
                });
                client
            },
            |client| {
                for tick in 0..1_000 {
                    client.ingest(full_packet(tick));
                }
                black_box(client.packets_count())
            },
            BatchSize::SmallInput,
        )
    });

    group.finish();
}

criterion_group!(benches, bench_decode, bench_ingest);
criterion_main!(benches);
