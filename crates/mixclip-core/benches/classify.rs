//! Benchmarks for embedding blending and classifier fitting.
//!
//! Run with: cargo bench -p mixclip-core

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use mixclip_core::config::{LogisticConfig, SvmConfig};
use mixclip_core::evaluate::{cross_val_score, ClassifierSpec, Dataset, StratifiedKFold};
use ndarray::Array2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Two Gaussian-ish blobs in `dim` dimensions, `per_class` samples each.
fn blobs(per_class: usize, dim: usize) -> Dataset {
    let mut rng = StdRng::seed_from_u64(7);
    let n = per_class * 2;
    let mut labels = Vec::with_capacity(n);
    let features = Array2::from_shape_fn((n, dim), |(i, _)| {
        let shift = if i < per_class { -0.5 } else { 0.5 };
        shift + rng.gen_range(-1.0..1.0)
    });
    for i in 0..n {
        labels.push(usize::from(i >= per_class));
    }
    Dataset::from_parts(features, labels, vec!["cat".to_string(), "dog".to_string()])
}

fn benchmark_blend(c: &mut Criterion) {
    let image: Vec<f32> = (0..512).map(|i| i as f32 / 512.0).collect();
    let text: Vec<f32> = (0..512).map(|i| 1.0 - i as f32 / 512.0).collect();

    c.bench_function("blend_512", |b| {
        b.iter(|| mixclip_core::math::blend(black_box(&image), black_box(&text), 0.6))
    });
}

fn benchmark_logistic_cv(c: &mut Criterion) {
    let dataset = blobs(100, 512);
    let spec = ClassifierSpec::Logistic(LogisticConfig::default());
    let splitter = StratifiedKFold::new(5, 42);

    c.bench_function("logistic_cv_200x512", |b| {
        b.iter(|| cross_val_score(&spec, black_box(&dataset), &splitter))
    });
}

fn benchmark_svm_cv(c: &mut Criterion) {
    let dataset = blobs(100, 512);
    let spec = ClassifierSpec::Svm(SvmConfig::default());
    let splitter = StratifiedKFold::new(5, 42);

    c.bench_function("svm_rbf_cv_200x512", |b| {
        b.iter(|| cross_val_score(&spec, black_box(&dataset), &splitter))
    });
}

criterion_group!(
    benches,
    benchmark_blend,
    benchmark_logistic_cv,
    benchmark_svm_cv
);
criterion_main!(benches);
