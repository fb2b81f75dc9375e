//! Benchmarks for the wsframe dispatch path
//!
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use serde_json::json;
use std::sync::Arc;

use wsframe::transport::{Connection, TransportError};
use wsframe::{
    event_handler_fn, handler_fn, AppEvent, CloseStatus, CompiledSelector, Identity, JsonCodec,
    OutboundFrame, PathRouter, SessionDispatcher,
};

/// Connection that discards everything
struct SinkConnection;

#[async_trait::async_trait]
impl Connection for SinkConnection {
    async fn send(&self, _payload: Vec<u8>) -> Result<(), TransportError> {
        Ok(())
    }

    async fn close(&self, _status: CloseStatus) -> Result<(), TransportError> {
        Ok(())
    }
}

fn bench_routing(c: &mut Criterion) {
    let mut group = c.benchmark_group("routing");

    let mut router: PathRouter<usize> = PathRouter::new();
    for i in 0..50 {
        router.register(&format!("/rooms/room{}/{{id}}", i), i).unwrap();
    }
    router.register("/rooms/{room}/members/{member?}", 100).unwrap();

    group.bench_function("resolve_literal", |b| {
        b.iter(|| router.resolve(black_box("/rooms/room25/42")).unwrap())
    });

    group.bench_function("resolve_variables", |b| {
        b.iter(|| router.resolve(black_box("/rooms/lobby/members/alice")).unwrap())
    });

    group.bench_function("resolve_miss", |b| {
        b.iter(|| router.resolve(black_box("/no/such/path")).unwrap())
    });

    group.finish();
}

fn bench_selector(c: &mut Criterion) {
    let mut group = c.benchmark_group("selector");

    let simple = CompiledSelector::compile("payload.room eq 'lobby'").unwrap();
    let compound = CompiledSelector::compile(
        "payload.priority gte 5 and (payload.room eq 'lobby' or payload.urgent) \
         and not (payload.muted)",
    )
    .unwrap();

    let context = json!({
        "type": "chat",
        "payload": {
            "room": "lobby",
            "priority": 7,
            "urgent": false,
            "muted": false,
        },
        "session": {"id": "abc", "created_at": "2024-01-01T00:00:00Z"},
    });

    group.bench_function("compile_simple", |b| {
        b.iter(|| CompiledSelector::compile(black_box("payload.room eq 'lobby'")).unwrap())
    });

    group.bench_function("match_simple", |b| {
        b.iter(|| simple.matches(black_box(&context)))
    });

    group.bench_function("match_compound", |b| {
        b.iter(|| compound.matches(black_box(&context)))
    });

    group.finish();
}

fn bench_codec(c: &mut Criterion) {
    let mut group = c.benchmark_group("codec");

    use wsframe::FrameCodec;
    let codec = JsonCodec;
    let frame = OutboundFrame::new("/rooms/42", json!({"text": "hello", "seq": 17}));
    let bytes = codec.encode(&frame).unwrap();

    group.bench_function("encode", |b| b.iter(|| codec.encode(black_box(&frame)).unwrap()));
    group.bench_function("decode", |b| b.iter(|| codec.decode(black_box(&bytes)).unwrap()));

    group.finish();
}

fn bench_event_fanout(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();

    let mut group = c.benchmark_group("event_fanout");

    for sessions in [10, 100] {
        group.throughput(Throughput::Elements(sessions as u64));

        group.bench_function(format!("fanout_{}", sessions), |b| {
            b.iter_custom(|iters| {
                rt.block_on(async {
                    let dispatcher = SessionDispatcher::builder()
                        .route(
                            "/echo",
                            handler_fn(|_ctx, payload| async move { Ok(Some(payload)) }),
                        )
                        .event_selector(
                            "tick",
                            "payload.n gte 0",
                            event_handler_fn(|_session, event| {
                                Some(OutboundFrame::new("/events", event.payload.clone()))
                            }),
                        )
                        .build()
                        .unwrap();

                    for _ in 0..sessions {
                        dispatcher
                            .on_connect(Arc::new(SinkConnection), Identity::anonymous())
                            .await
                            .unwrap();
                    }

                    let event = AppEvent::new("tick", json!({"n": 1}));
                    let start = std::time::Instant::now();

                    for _ in 0..iters {
                        dispatcher.on_application_event(black_box(&event)).await;
                    }

                    start.elapsed()
                })
            });
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_routing,
    bench_selector,
    bench_codec,
    bench_event_fanout
);
criterion_main!(benches);
