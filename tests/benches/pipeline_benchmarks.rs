//! # Pulsar Pipeline Benchmarks
//!
//! | Area | Claim | Target |
//! |------|-------|--------|
//! | Trace flattening | Linear in node count, no recursion | < 1ms per 10k nodes |
//! | Ingress | Dedup plus push, independent of delivery | < 10µs per call |
//! | Queue | Non-blocking push | < 1µs per item |

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use pulsar_subscriber::{
    flatten_trace, Dispatcher, LoggingNotifier, MessageAppliedHandler, SubscriberConfig, WatchList,
};
use shared_bus::ingestion_queue;
use shared_types::{ApplyRet, Cid, ExecutionTrace, Message, TipSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

fn msg(n: u64) -> Message {
    Message::new("f01", "f02", n)
}

fn deep_trace(depth: u64) -> ExecutionTrace {
    let mut trace = ExecutionTrace::new(msg(depth));
    for n in (0..depth).rev() {
        trace = ExecutionTrace::new(msg(n)).with_subcall(trace);
    }
    trace
}

fn wide_trace(width: u64) -> ExecutionTrace {
    ExecutionTrace::new(msg(0)).with_subcalls((1..=width).map(|n| ExecutionTrace::new(msg(n))))
}

// ============================================================================
// Trace Flattening
// ============================================================================

fn bench_flatten(c: &mut Criterion) {
    let mut group = c.benchmark_group("flatten");
    group.measurement_time(Duration::from_secs(5));

    for size in [100u64, 1_000, 10_000] {
        let deep = deep_trace(size);
        let wide = wide_trace(size);

        group.throughput(Throughput::Elements(size));
        group.bench_with_input(BenchmarkId::new("deep", size), &deep, |b, trace| {
            b.iter(|| black_box(flatten_trace(trace).messages.len()))
        });
        group.bench_with_input(BenchmarkId::new("wide", size), &wide, |b, trace| {
            b.iter(|| black_box(flatten_trace(trace).messages.len()))
        });
    }

    group.finish();
}

// ============================================================================
// Ingestion Queue
// ============================================================================

fn bench_queue_push(c: &mut Criterion) {
    let (publisher, mut subscriber) = ingestion_queue::<u64>(500);
    let mut n = 0u64;

    c.bench_function("queue_push_then_drain", |b| {
        b.iter(|| {
            n += 1;
            let _ = publisher.push(black_box(n));
            if publisher.len() >= 10_000 {
                black_box(subscriber.drain_ready());
            }
        })
    });
}

// ============================================================================
// Ingress
// ============================================================================

fn bench_ingress(c: &mut Criterion) {
    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(_) => return,
    };
    let dispatcher = match runtime.block_on(async {
        Dispatcher::new(
            SubscriberConfig::default(),
            Arc::new(WatchList::new()),
            Arc::new(LoggingNotifier),
        )
    }) {
        Ok(dispatcher) => dispatcher,
        Err(_) => return,
    };

    let counter = AtomicU64::new(0);
    let tip_set = Arc::new(TipSet::new(1, vec![]));
    let cancel = CancellationToken::new();

    c.bench_function("ingress_message_applied", |b| {
        b.to_async(&runtime).iter(|| {
            let n = counter.fetch_add(1, Ordering::Relaxed);
            let mut bytes = [0u8; 32];
            bytes[..8].copy_from_slice(&n.to_be_bytes());
            let message = msg(n);
            let ret = ApplyRet::from_trace(ExecutionTrace::new(message.clone()));
            let dispatcher = dispatcher.clone();
            let tip_set = Arc::clone(&tip_set);
            let cancel = cancel.clone();
            async move {
                black_box(
                    dispatcher
                        .message_applied(&cancel, tip_set, Cid::from_bytes(bytes), message, ret, false)
                        .await,
                )
            }
        })
    });

    runtime.block_on(dispatcher.stop());
}

criterion_group!(benches, bench_flatten, bench_queue_push, bench_ingress);
criterion_main!(benches);
