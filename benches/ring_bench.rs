use criterion::{Criterion, Throughput, criterion_group, criterion_main};
use lob_reflex::WorkerEngine;
use lob_reflex::measure::LatencyMeasurer;
use lob_reflex::record::{Inbound, Outbound};
use lob_reflex::ring::RingOptions;
use std::hint::black_box;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

fn bench_push_pop(c: &mut Criterion) {
    let engine = WorkerEngine::new();
    let mut group = c.benchmark_group("ring");
    group.throughput(Throughput::Elements(1));

    let (mut producer, mut consumer, _) = engine
        .new_ring::<u64>(RingOptions {
            name: "bench_u64",
            capacity: 1024,
        })
        .unwrap();
    let mut measurer = LatencyMeasurer::new(1000);
    group.bench_function("push_pop_u64", |b| {
        let mut val = 0u64;
        b.iter(|| {
            let _latency_guard = measurer.measure_with_guard();
            producer.try_push(black_box(&val));
            black_box(consumer.try_pop_with(|v| *v));
            val += 1;
        });
    });
    println!("push_pop_u64 latency:{}", measurer.format_stats());

    // Inbound records are ~4KB: this is the receiver-to-processor hop.
    let (mut producer, mut consumer, _) = engine
        .new_ring::<Inbound>(RingOptions {
            name: "bench_inbound",
            capacity: 1024,
        })
        .unwrap();
    let inbound = Inbound::new(1, "127.0.0.1:9000".parse().unwrap(), &[7u8; 96]);
    let mut measurer = LatencyMeasurer::new(1000);
    group.bench_function("push_pop_inbound", |b| {
        b.iter(|| {
            let _latency_guard = measurer.measure_with_guard();
            producer.try_push(black_box(&inbound));
            black_box(consumer.try_pop_with(|item| item.len));
        });
    });
    println!("push_pop_inbound latency:{}", measurer.format_stats());

    group.finish();
}

fn bench_cross_thread(c: &mut Criterion) {
    let engine = WorkerEngine::new();
    let mut group = c.benchmark_group("ring_cross_thread");
    group.throughput(Throughput::Elements(1));

    let (mut producer, mut consumer, _) = engine
        .new_ring::<Outbound>(RingOptions {
            name: "bench_outbound",
            capacity: 4096,
        })
        .unwrap();
    let done = Arc::new(AtomicBool::new(false));
    let drain = {
        let done = done.clone();
        thread::spawn(move || {
            while !done.load(Ordering::Relaxed) {
                if consumer.try_pop_with(|out| black_box(out.len)).is_none() {
                    std::hint::spin_loop();
                }
            }
        })
    };

    let record = <Outbound as bytemuck::Zeroable>::zeroed();
    group.bench_function("push_outbound", |b| {
        b.iter(|| producer.push(black_box(&record)));
    });

    done.store(true, Ordering::Relaxed);
    drain.join().unwrap();
    group.finish();
}

criterion_group!(benches, bench_push_pop, bench_cross_thread);
criterion_main!(benches);
