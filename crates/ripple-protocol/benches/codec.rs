//! Codec benchmarks for ripple-protocol.

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use ripple_protocol::{codec, Event, EventKind, Frame, Role};
use serde_json::json;

fn sample_frame() -> Frame {
    Frame::event(
        Event::new("evt-0001", EventKind::Message, Role::RegularUser, "42", 1_700_000_000_000)
            .with_payload(json!({"content": "x".repeat(128)})),
    )
}

fn bench_decode_binary(c: &mut Criterion) {
    let encoded = codec::encode(&sample_frame()).unwrap();

    let mut group = c.benchmark_group("decode");
    group.throughput(Throughput::Bytes(encoded.len() as u64));
    group.bench_function("binary_event", |b| {
        b.iter(|| codec::decode(black_box(&encoded)))
    });
    group.finish();
}

fn bench_decode_text(c: &mut Criterion) {
    let text = codec::encode_text(&sample_frame()).unwrap();

    let mut group = c.benchmark_group("decode");
    group.throughput(Throughput::Bytes(text.len() as u64));
    group.bench_function("text_event", |b| {
        b.iter(|| codec::decode_text(black_box(&text)))
    });
    group.finish();
}

criterion_group!(benches, bench_decode_binary, bench_decode_text);
criterion_main!(benches);
