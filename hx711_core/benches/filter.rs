use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use hx711_core::filter::{FilterCfg, reduce_reads};

// Deterministic synthetic reads: a stable baseline with small xorshift
// jitter and the occasional sentinel dropout.
fn synth_reads(len: usize) -> Vec<Option<i32>> {
    let mut state = 0x2545_F491u32;
    let mut reads = Vec::with_capacity(len);
    for i in 0..len {
        state ^= state << 13;
        state ^= state >> 17;
        state ^= state << 5;
        if i % 37 == 0 {
            reads.push(None);
        } else {
            let jitter = (state % 41) as i32 - 20;
            reads.push(Some(120_000 + jitter));
        }
    }
    reads
}

fn bench_reduce(c: &mut Criterion) {
    let cfg = FilterCfg::default();
    let mut group = c.benchmark_group("reduce_reads");
    for len in [10usize, 100, 1_000, 10_000] {
        let reads = synth_reads(len);
        group.bench_with_input(BenchmarkId::from_parameter(len), &reads, |b, reads| {
            b.iter(|| reduce_reads(black_box(reads), black_box(&cfg)));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_reduce);
criterion_main!(benches);
