use criterion::{criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion};
use spanout::test_utils::seq_num;

mod harness;

criterion_main!(channels);
criterion_group! {
    name = channels;
    config = Criterion::default().sample_size(10);
    targets =
        bench_final_batch,
        bench_all_batches,
        bench_raw_span_batch,
}

const BATCH_COUNTS: [usize; 3] = [10, 50, 100];
const TX_COUNT: usize = 4;

/// Benchmark adding one batch to a channel that already holds the rest.
pub fn bench_final_batch(c: &mut Criterion) {
    let mut group = c.benchmark_group("final_batch");
    for count in BATCH_COUNTS {
        let batches = harness::batches(count, TX_COUNT);
        let (last, rest) = batches.split_last().unwrap();
        for (batch_type, kind) in harness::SETUPS {
            let config = harness::config(batch_type, kind);
            let id = BenchmarkId::new(format!("{batch_type}/{kind}"), count);
            group.bench_with_input(id, &count, |b, _| {
                b.iter_batched(
                    || harness::channel_with(&config, rest),
                    |mut co| co.add_singular_batch(last.clone(), seq_num(last)).unwrap(),
                    BatchSize::SmallInput,
                )
            });
        }
    }
    group.finish();
}

/// Benchmark filling a fresh channel and closing it.
pub fn bench_all_batches(c: &mut Criterion) {
    let mut group = c.benchmark_group("all_batches");
    for count in BATCH_COUNTS {
        let batches = harness::batches(count, TX_COUNT);
        for (batch_type, kind) in harness::SETUPS {
            let config = harness::config(batch_type, kind);
            let id = BenchmarkId::new(format!("{batch_type}/{kind}"), count);
            group.bench_with_input(id, &batches, |b, batches| {
                b.iter(|| {
                    let mut co = harness::channel_with(&config, batches);
                    co.close().unwrap();
                    co
                })
            });
        }
    }
    group.finish();
}

/// Benchmark deriving the wire form of a span batch.
pub fn bench_raw_span_batch(c: &mut Criterion) {
    let mut group = c.benchmark_group("raw_span_batch");
    for count in BATCH_COUNTS {
        let span = harness::span_with(&harness::batches(count, TX_COUNT));
        group.bench_with_input(BenchmarkId::from_parameter(count), &span, |b, span| {
            b.iter(|| span.to_raw_span_batch().unwrap())
        });
    }
    group.finish();
}
