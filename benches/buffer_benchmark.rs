/*!
 * Circular Buffer Benchmarks
 *
 * Compare single-threaded and locked buffers, and measure hand-off throughput
 */

use canvas_primitives::{CircularBuffer, ConcurrentCircularBuffer};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::collections::VecDeque;
use std::sync::Arc;
use std::thread;

fn bench_steady_state(c: &mut Criterion) {
    let mut group = c.benchmark_group("steady_state");
    group.throughput(Throughput::Elements(1));

    group.bench_function("circular_buffer", |b| {
        let mut buffer = CircularBuffer::<u64>::with_capacity(64);
        buffer.extend(0..32);
        b.iter(|| {
            buffer.enqueue(black_box(1));
            black_box(buffer.try_dequeue());
        });
    });

    group.bench_function("concurrent_circular_buffer", |b| {
        let buffer = ConcurrentCircularBuffer::<u64>::with_capacity(64);
        for i in 0..32 {
            buffer.enqueue(i);
        }
        b.iter(|| {
            buffer.enqueue(black_box(1));
            black_box(buffer.dequeue());
        });
    });

    group.bench_function("vec_deque", |b| {
        let mut deque: VecDeque<u64> = (0..32).collect();
        b.iter(|| {
            deque.push_back(black_box(1));
            black_box(deque.pop_front());
        });
    });

    group.finish();
}

fn bench_growth(c: &mut Criterion) {
    let mut group = c.benchmark_group("growth");

    for items in [1_000usize, 10_000, 100_000] {
        group.throughput(Throughput::Elements(items as u64));
        group.bench_with_input(BenchmarkId::from_parameter(items), &items, |b, &items| {
            b.iter(|| {
                let mut buffer = CircularBuffer::with_capacity(1);
                for i in 0..items {
                    buffer.enqueue(i);
                }
                black_box(buffer.capacity())
            });
        });
    }

    group.finish();
}

fn bench_handoff(c: &mut Criterion) {
    let mut group = c.benchmark_group("producer_consumer");
    const ITEMS: u64 = 10_000;
    group.throughput(Throughput::Elements(ITEMS));

    group.bench_function("spsc_10k", |b| {
        b.iter(|| {
            let buffer = Arc::new(ConcurrentCircularBuffer::<u64>::with_capacity(256));
            let producer = {
                let buffer = buffer.clone();
                thread::spawn(move || {
                    for i in 0..ITEMS {
                        buffer.enqueue(i);
                    }
                })
            };

            let mut sum = 0;
            for _ in 0..ITEMS {
                sum += buffer.dequeue();
            }
            producer.join().unwrap();
            black_box(sum)
        });
    });

    group.finish();
}

criterion_group!(benches, bench_steady_state, bench_growth, bench_handoff);
criterion_main!(benches);
