//! Benchmarks for the factorization differentiators.
//!
//! Measures each differentiator across problem sizes, and the batched
//! Stiefel-exponential derivative against a sequential loop.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use stiefeldiff_autodiff::{
    ExpmDifferentiator, QrDifferentiator, StiefelExpDifferentiator, SvdDifferentiator,
};
use stiefeldiff_core::{
    compute::{FactorizationBackend, NalgebraBackend},
    numerical::skew,
    types::DMatrix,
    utils::test_helpers::{random_matrix, random_orthonormal, random_tangent, seeded_rng},
};

fn bench_qr(c: &mut Criterion) {
    let mut group = c.benchmark_group("qr_derivative");
    let diff = QrDifferentiator::<f64>::new();

    for (n, p) in [(50, 10), (200, 50), (500, 50)] {
        let mut rng = seeded_rng(1);
        let a0 = random_matrix::<f64, _>(&mut rng, n, p);
        let v = random_matrix::<f64, _>(&mut rng, n, p);

        group.bench_with_input(BenchmarkId::new("thin_qr", format!("{}x{}", n, p)), &n, |b, _| {
            b.iter(|| black_box(diff.differentiate(black_box(&a0), black_box(&v)).unwrap()));
        });
    }

    group.finish();
}

fn bench_expm(c: &mut Criterion) {
    let mut group = c.benchmark_group("expm_derivative");
    let diff = ExpmDifferentiator::new();

    for p in [4, 16, 64] {
        let mut rng = seeded_rng(2);
        let m = skew(&random_matrix::<f64, _>(&mut rng, p, p));
        let dm = skew(&random_matrix::<f64, _>(&mut rng, p, p));

        group.bench_with_input(BenchmarkId::new("block", p), &p, |b, _| {
            b.iter(|| black_box(diff.differentiate(black_box(&m), black_box(&dm)).unwrap()));
        });
    }

    group.finish();
}

fn bench_stiefel_exp(c: &mut Criterion) {
    let mut group = c.benchmark_group("stiefel_exp_derivative");

    for (n, p) in [(20, 3), (100, 10), (300, 20)] {
        let mut rng = seeded_rng(3);
        let u = random_orthonormal::<f64, _>(&mut rng, n, p);
        let delta = random_tangent(&mut rng, &u);
        let v = random_tangent(&mut rng, &u);
        let label = format!("{}x{}", n, p);

        let canonical = StiefelExpDifferentiator::new();
        group.bench_with_input(BenchmarkId::new("canonical", &label), &n, |b, _| {
            b.iter(|| black_box(canonical.differentiate(&u, &delta, black_box(&v)).unwrap()));
        });

        let alpha = StiefelExpDifferentiator::new().with_alpha(1.0).unwrap();
        group.bench_with_input(BenchmarkId::new("alpha_1", &label), &n, |b, _| {
            b.iter(|| black_box(alpha.differentiate(&u, &delta, black_box(&v)).unwrap()));
        });
    }

    group.finish();
}

fn bench_stiefel_exp_batch(c: &mut Criterion) {
    let mut group = c.benchmark_group("stiefel_exp_batch");
    let (n, p) = (100, 10);
    let mut rng = seeded_rng(4);
    let u = random_orthonormal::<f64, _>(&mut rng, n, p);
    let delta = random_tangent(&mut rng, &u);
    let directions: Vec<DMatrix<f64>> = (0..32).map(|_| random_tangent(&mut rng, &u)).collect();
    let diff = StiefelExpDifferentiator::new();

    group.bench_function("differentiate_many", |b| {
        b.iter(|| black_box(diff.differentiate_many(&u, &delta, &directions).unwrap()));
    });
    group.bench_function("sequential_loop", |b| {
        b.iter(|| {
            let out: Vec<_> = directions
                .iter()
                .map(|v| diff.differentiate(&u, &delta, v).unwrap())
                .collect();
            black_box(out)
        });
    });

    group.finish();
}

fn bench_svd(c: &mut Criterion) {
    let mut group = c.benchmark_group("svd_derivative");
    let diff = SvdDifferentiator::<f64>::new();
    let backend = NalgebraBackend::new();

    for (n, m) in [(50, 20), (200, 50)] {
        let mut rng = seeded_rng(5);
        let y = random_matrix::<f64, _>(&mut rng, n, m);
        let dy = random_matrix::<f64, _>(&mut rng, n, m);
        let f = backend.svd(&y, false).unwrap();

        group.bench_with_input(BenchmarkId::new("thin", format!("{}x{}", n, m)), &n, |b, _| {
            b.iter(|| {
                black_box(
                    diff.differentiate(black_box(&dy), &f.u, &f.singular_values, &f.v)
                        .unwrap(),
                )
            });
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_qr,
    bench_expm,
    bench_stiefel_exp,
    bench_stiefel_exp_batch,
    bench_svd
);
criterion_main!(benches);
