//! Benchmark suite for the subscribe-on operator.
//!
//! - Cancellation slot store/cancel/finish transitions
//! - Deferred subscription demand accumulation and link installation
//! - Task registry insert/remove and disposal
//! - End-to-end subscribe per strategy on an inline scheduler

#![allow(missing_docs)]
#![allow(clippy::semicolon_if_nothing_returned)]

use criterion::{
    black_box, criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion, Throughput,
};

use std::sync::Arc;
use subscribe_on::cancel::{CancelSlot, DeferredSubscription, TaskRegistry};
use subscribe_on::flow::{Demand, EmptySubscription, IterPublisher, Publisher, Recorder, Source};
use subscribe_on::scheduler::{Immediate, TaskHandle};
use subscribe_on::subscribe_on::{Strategy, SubscribeOn};
use subscribe_on::Subscription;

// =============================================================================
// CANCELLATION SLOT
// =============================================================================

fn bench_slot(c: &mut Criterion) {
    let mut group = c.benchmark_group("cancel_slot");

    group.bench_function("store_then_cancel", |b| {
        b.iter(|| {
            let slot: CancelSlot = CancelSlot::new();
            slot.store(TaskHandle::new(|| {}));
            black_box(slot.cancel())
        })
    });

    group.bench_function("cancel_then_store", |b| {
        b.iter(|| {
            let slot: CancelSlot = CancelSlot::new();
            slot.cancel();
            black_box(slot.store(TaskHandle::noop()))
        })
    });

    group.bench_function("store_then_finish", |b| {
        b.iter(|| {
            let slot: CancelSlot = CancelSlot::new();
            slot.store(TaskHandle::noop());
            black_box(slot.finish())
        })
    });

    group.finish();
}

// =============================================================================
// DEFERRED SUBSCRIPTION
// =============================================================================

fn bench_deferred(c: &mut Criterion) {
    let mut group = c.benchmark_group("deferred_subscription");

    for &count in &[1u64, 16, 256] {
        group.throughput(Throughput::Elements(count));
        group.bench_with_input(
            BenchmarkId::new("accumulate_then_link", count),
            &count,
            |b, &n| {
                b.iter(|| {
                    let deferred = DeferredSubscription::new();
                    for _ in 0..n {
                        deferred.request(Demand::ONE);
                    }
                    deferred
                        .set_link(Arc::new(EmptySubscription))
                        .expect("first link");
                    black_box(deferred.pending_demand())
                })
            },
        );
    }

    group.finish();
}

// =============================================================================
// TASK REGISTRY
// =============================================================================

fn bench_registry(c: &mut Criterion) {
    let mut group = c.benchmark_group("task_registry");

    for &count in &[10usize, 100, 1000] {
        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::new("insert_dispose", count), &count, |b, &n| {
            b.iter_batched(
                || {
                    let registry: TaskRegistry<CancelSlot> = TaskRegistry::new();
                    for _ in 0..n {
                        let slot = Arc::new(CancelSlot::new());
                        slot.store(TaskHandle::noop());
                        registry.insert(slot);
                    }
                    registry
                },
                |registry| black_box(registry.dispose()),
                BatchSize::SmallInput,
            )
        });
    }

    group.finish();
}

// =============================================================================
// END TO END
// =============================================================================

fn bench_subscribe(c: &mut Criterion) {
    let mut group = c.benchmark_group("subscribe_on");
    let items: Vec<u64> = (0..64).collect();
    group.throughput(Throughput::Elements(items.len() as u64));

    for strategy in [
        Strategy::Classic,
        Strategy::EagerDirect,
        Strategy::NonEager,
        Strategy::Direct,
    ] {
        let op = SubscribeOn::new(
            Source::publisher(IterPublisher::new(items.clone())),
            Immediate,
            strategy.into(),
        );
        group.bench_function(BenchmarkId::new("iter_64", strategy), |b| {
            b.iter(|| {
                let recorder = Recorder::<u64>::unbounded();
                op.subscribe(recorder.clone());
                black_box(recorder.values().len())
            })
        });
    }

    let scalar = SubscribeOn::just(7u64, Immediate, true);
    group.bench_function("scalar_eager", |b| {
        b.iter(|| {
            let recorder = Recorder::<u64>::unbounded();
            scalar.subscribe(recorder.clone());
            black_box(recorder.is_complete())
        })
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_slot,
    bench_deferred,
    bench_registry,
    bench_subscribe
);
criterion_main!(benches);
