use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::hint::black_box;
use jacobi_pca::{JacobiEigensolver, PcaConfig, PcaEngine};
use ndarray::Array2;
use ndarray_rand::rand_distr::Uniform;
use ndarray_rand::RandomExt;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// Random symmetric matrix with entries in [-1, 1), seeded for reproducibility.
fn random_symmetric(n: usize, seed: u64) -> Array2<f64> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let a = Array2::random_using((n, n), Uniform::new(-1.0, 1.0), &mut rng);
    (&a + &a.t()) / 2.0
}

/// Variables x samples data with values in [0, 2), seeded for reproducibility.
fn random_data(n_variables: usize, n_samples: usize, seed: u64) -> Array2<f64> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    Array2::random_using((n_variables, n_samples), Uniform::new(0.0, 2.0), &mut rng)
}

fn bench_jacobi(c: &mut Criterion) {
    let mut group = c.benchmark_group("jacobi_eigensolver");
    group.sample_size(20);

    for &n in &[8usize, 32, 64, 128] {
        let matrix = random_symmetric(n, 42);
        group.throughput(Throughput::Elements((n * n) as u64));
        group.bench_with_input(BenchmarkId::new("eig_sort", n), &matrix, |b, m| {
            b.iter(|| {
                let solver = JacobiEigensolver::new(black_box(m.clone())).unwrap();
                black_box(solver.eig_sort())
            })
        });
    }
    group.finish();
}

fn bench_pca(c: &mut Criterion) {
    let mut group = c.benchmark_group("pca_engine");
    group.sample_size(10);

    for &(m, n) in &[(16usize, 1000usize), (64, 500), (128, 200)] {
        let data = random_data(m, n, 7);
        let label = format!("{}x{}", m, n);
        group.throughput(Throughput::Elements((m * n) as u64));

        group.bench_with_input(BenchmarkId::new("fit_and_reduce", &label), &data, |b, d| {
            b.iter(|| {
                let mut pca = PcaEngine::new(black_box(d.clone())).unwrap();
                pca.change_dimension(m / 4).unwrap();
                black_box(pca.similarity().unwrap())
            })
        });

        let sequential = PcaConfig {
            parallel_covariance_threshold: usize::MAX,
            ..PcaConfig::default()
        };
        group.bench_with_input(BenchmarkId::new("fit_sequential_covariance", &label), &data, |b, d| {
            b.iter(|| black_box(PcaEngine::with_config(black_box(d.clone()), &sequential).unwrap()))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_jacobi, bench_pca);
criterion_main!(benches);
