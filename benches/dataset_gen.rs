use criterion::{black_box, criterion_group, criterion_main, Criterion};
use as3ap::dataset::{write_streams, DatasetGenerator, Relation};

fn bench_generation(c: &mut Criterion) {
    let mut group = c.benchmark_group("Dataset Generation");
    group.sample_size(20);

    for tuples in [1_000u64, 10_000] {
        group.bench_function(format!("Generate {} tuples", tuples), |b| {
            b.iter(|| black_box(DatasetGenerator::new(tuples).with_seed(7).generate()))
        });
    }

    let data = DatasetGenerator::new(10_000).with_seed(7).generate();
    group.bench_function("Stream all relations (10000 tuples)", |b| {
        b.iter(|| {
            Relation::ALL
                .iter()
                .map(|r| data.stream(*r).count())
                .sum::<usize>()
        })
    });

    let dir = tempfile::tempdir().unwrap();
    group.bench_function("Write record files (10000 tuples)", |b| {
        b.iter(|| write_streams(&data, dir.path()).unwrap())
    });

    group.finish();
}

criterion_group!(benches, bench_generation);
criterion_main!(benches);
