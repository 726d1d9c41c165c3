use criterion::{black_box, criterion_group, criterion_main, Criterion};
use usercf::algorithms::SimilarityLookup;
use usercf::utils::synthetic_ratings;
use usercf::*;

fn benchmark_similarity_build(c: &mut Criterion) {
    let ratings = synthetic_ratings(200, 100, 0.2, (1, 10), 42);

    c.bench_function("build_sequential", |b| {
        b.iter(|| {
            black_box(build(&ratings));
        });
    });

    c.bench_function("build_parallel", |b| {
        let builder = SimilarityMatrixBuilder::new(Pearson).parallel(true);
        b.iter(|| {
            black_box(builder.build(&ratings));
        });
    });

    c.bench_function("pearson_single_pair", |b| {
        b.iter(|| {
            black_box(Pearson.similarity(&ratings, "u0001", "u0002"));
        });
    });
}

fn benchmark_prediction(c: &mut Criterion) {
    let ratings = synthetic_ratings(200, 100, 0.2, (1, 10), 42);
    let sims = build(&ratings);
    let averages = UserAverages::from_ratings(&ratings);

    c.bench_function("predict_eager", |b| {
        b.iter(|| {
            black_box(predict(&ratings, &averages, &sims, "u0000", "i0050").ok());
        });
    });

    c.bench_function("predict_lazy_cold", |b| {
        b.iter(|| {
            let lazy = LazySimilarityMatrix::pearson(&ratings);
            black_box(lazy.similarity("u0000", "u0001"));
            black_box(predict(&ratings, &averages, &lazy, "u0000", "i0050").ok());
        });
    });

    c.bench_function("recommend_top_10", |b| {
        let predictor = UserBasedPredictor::new(&ratings, &sims);
        b.iter(|| {
            black_box(predictor.recommend("u0000", 10).ok());
        });
    });
}

criterion_group!(benches, benchmark_similarity_build, benchmark_prediction);
criterion_main!(benches);
