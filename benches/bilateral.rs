//! Criterion benchmarks for the bilateral filter.
//!
//! Run with: cargo bench --bench bilateral

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use strata::filters::{DomainKernel, RangeTable};
use strata::prelude::*;

fn noisy_step(size: usize) -> ImageBuffer<u8, 2> {
    ImageBuffer::from_fn(ImageInformation::new(Region::from_size([size, size])), |index| {
        let base = if index[0] < size as i64 / 2 { 60 } else { 190 };
        let noise = (index[0] * 7 + index[1] * 13) % 17 - 8;
        (base + noise) as u8
    })
}

fn bench_update(c: &mut Criterion) {
    let mut group = c.benchmark_group("bilateral_update");
    group.sample_size(20);

    for size in [64, 128, 256] {
        let mut graph = ProcessingGraph::new();
        let source = graph.add_filter(ImageSourceNode::new(noisy_step(size)));
        let filter = graph.add_filter(BilateralImageFilter::<2>::new());
        graph.set_input(filter, 0, source).unwrap();
        graph
            .filter_mut::<BilateralImageFilter<2>>(filter)
            .unwrap()
            .set_domain_sigma_all(2.0)
            .unwrap();

        let engine = ExecutionEngine::new();
        engine.update(&mut graph, filter).unwrap();

        group.throughput(Throughput::Elements((size * size) as u64));
        group.bench_with_input(BenchmarkId::new("sigma_2", size), &size, |b, _| {
            b.iter(|| {
                graph.release_output(filter).unwrap();
                engine.update(black_box(&mut graph), filter).unwrap()
            })
        });
    }

    group.finish();
}

fn bench_tables(c: &mut Criterion) {
    let mut group = c.benchmark_group("weight_tables");

    for sigma in [1.0, 4.0, 8.0] {
        group.bench_with_input(BenchmarkId::new("domain_kernel", sigma), &sigma, |b, &sigma| {
            b.iter(|| DomainKernel::<2>::build(black_box(&[sigma; 2]), 2.5, 2, &[1.0; 2]).unwrap())
        });
    }
    group.bench_function("range_table", |b| {
        b.iter(|| RangeTable::build(black_box(50.0), 100, 255.0))
    });

    group.finish();
}

criterion_group!(benches, bench_update, bench_tables);
criterion_main!(benches);
