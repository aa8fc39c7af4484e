//! Framing and correlation benchmark suite.
//!
//! Benchmarks the hot path of every message:
//! - Payload sizes: small command, READY dispatch, large guild list
//! - Reply routing with many commands in flight
//!
//! Run with: cargo bench --bench framing
//! Results saved to: target/criterion/

use std::hint::black_box;
use std::io::Cursor;

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use discord_ipc::Opcode;
use discord_ipc::identifiers::Nonce;
use discord_ipc::protocol::{FrameReader, Message, frame};
use discord_ipc::transport::{Correlator, Dispatcher};
use serde_json::{Value, json};
use tokio::runtime::Runtime;

// ============================================================================
// Payloads
// ============================================================================

fn payloads() -> Vec<(&'static str, Value)> {
    let guilds: Vec<Value> = (0..500)
        .map(|i| json!({"id": format!("{i:018}"), "name": format!("guild {i}"), "icon_url": null}))
        .collect();

    vec![
        (
            "command",
            json!({"cmd": "GET_SELECTED_VOICE_CHANNEL", "args": {}, "nonce": "1:42"}),
        ),
        (
            "ready",
            json!({
                "cmd": "DISPATCH",
                "evt": "READY",
                "data": {
                    "v": 1,
                    "config": {"cdn_host": "cdn.discordapp.com", "api_endpoint": "//discord.com/api"},
                    "user": {"id": "80351110224678912", "username": "Nelly", "avatar": "8342729096ea3675442027381ff50dfe"}
                }
            }),
        ),
        (
            "guilds",
            json!({"cmd": "GET_GUILDS", "nonce": "2:7", "data": {"guilds": guilds}}),
        ),
    ]
}

// ============================================================================
// Benchmark: Encode / Decode
// ============================================================================

fn bench_codec(c: &mut Criterion) {
    let mut group = c.benchmark_group("codec");

    for (name, payload) in payloads() {
        let bytes = frame::encode(Opcode::Frame, &payload).expect("encode");
        group.throughput(Throughput::Bytes(bytes.len() as u64));

        group.bench_with_input(BenchmarkId::new("encode", name), &payload, |b, payload| {
            b.iter(|| frame::encode(Opcode::Frame, black_box(payload)));
        });

        group.bench_with_input(BenchmarkId::new("decode", name), &bytes, |b, bytes| {
            b.iter(|| frame::decode(black_box(bytes)).map(|(frame, _)| Message::from(frame)));
        });
    }

    group.finish();
}

// ============================================================================
// Benchmark: Stream Reads
// ============================================================================

fn bench_stream(c: &mut Criterion) {
    let rt = Runtime::new().expect("runtime");

    let mut stream = Vec::new();
    for i in 0..100 {
        let payload = json!({"cmd": "DISPATCH", "evt": "SPEAKING_START", "data": {"user_id": i.to_string()}});
        stream.extend(frame::encode(Opcode::Frame, &payload).expect("encode"));
    }

    let stream = stream.as_slice();

    let mut group = c.benchmark_group("stream");
    group.throughput(Throughput::Elements(100));
    group.bench_function("read_100_events", |b| {
        b.to_async(&rt).iter(|| async move {
            let mut reader = FrameReader::new(Cursor::new(stream));
            for _ in 0..100 {
                black_box(reader.read_frame().await.expect("frame"));
            }
        });
    });
    group.finish();
}

// ============================================================================
// Benchmark: Reply Routing
// ============================================================================

fn bench_routing(c: &mut Criterion) {
    let rt = Runtime::new().expect("runtime");
    let _guard = rt.enter();

    let mut group = c.benchmark_group("routing");

    for &in_flight in &[1usize, 100, 1000] {
        group.bench_with_input(
            BenchmarkId::new("register_route", in_flight),
            &in_flight,
            |b, &in_flight| {
                let correlator = Correlator::new(Dispatcher::new(), in_flight + 1);
                let background: Vec<_> = (0..in_flight.saturating_sub(1))
                    .map(|_| correlator.register(Nonce::generate()).expect("register"))
                    .collect();

                b.iter(|| {
                    let nonce = Nonce::generate();
                    let pending = correlator.register(nonce.clone()).expect("register");
                    let Value::Object(map) = json!({"cmd": "GET_GUILD", "nonce": nonce.as_str(), "data": {}})
                    else {
                        unreachable!()
                    };
                    black_box(correlator.route(Message::from_json(map, 1)));
                    drop(pending);
                });

                drop(background);
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_codec, bench_stream, bench_routing);
criterion_main!(benches);
