use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use prophet_match_core::{max_weight_assignment, WeightMatrix};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn build_matrix(offline: usize, online: usize) -> WeightMatrix {
    let mut rng = StdRng::seed_from_u64(42);
    let rows = (0..offline)
        .map(|_| (0..online).map(|_| rng.gen_range(0.0..1.0)).collect())
        .collect();
    WeightMatrix::from_rows(rows).expect("valid matrix")
}

fn bench_assignment(c: &mut Criterion) {
    let mut group = c.benchmark_group("max_weight_assignment");
    for &(offline, online) in &[(10, 10), (30, 30), (20, 60)] {
        let weights = build_matrix(offline, online);
        group.throughput(Throughput::Elements((offline * online) as u64));
        group.bench_with_input(
            BenchmarkId::new("dense", format!("{offline}x{online}")),
            &weights,
            |b, weights| {
                b.iter(|| {
                    let _ = max_weight_assignment(weights);
                })
            },
        );
    }
    group.finish();
}

criterion_group!(benches, bench_assignment);
criterion_main!(benches);
