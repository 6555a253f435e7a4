//! # Training Benchmarks
//!
//! Throughput of training, counting and sampling.
//!
//! Run with: `cargo bench -p gramstore-core`

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use gramstore_core::{MemoryStore, Model, ModelConfig, RedbStore};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::hint::black_box;

/// Deterministic pseudo-corpus: `count` sentences of 12 tokens drawn from a
/// 500-word vocabulary.
fn corpus(count: usize) -> Vec<Vec<String>> {
    (0..count)
        .map(|i| {
            (0..12)
                .map(|j| format!("w{}", (i * 31 + j * 17) % 500))
                .collect()
        })
        .collect()
}

fn memory_model() -> Model<MemoryStore> {
    Model::with_store(MemoryStore::new(), ModelConfig::default()).expect("model")
}

// =============================================================================
// BENCHMARKS
// =============================================================================

fn bench_train_memory(c: &mut Criterion) {
    let mut group = c.benchmark_group("train_memory");

    for size in [100, 1000, 5000].iter() {
        let sentences = corpus(*size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &sentences, |b, s| {
            b.iter(|| {
                let mut model = memory_model();
                model.train_many(s.iter()).expect("train");
                black_box(model.vocabulary_size())
            });
        });
    }

    group.finish();
}

fn bench_train_redb(c: &mut Criterion) {
    let mut group = c.benchmark_group("train_redb");
    group.sample_size(10);

    for size in [100, 1000].iter() {
        let sentences = corpus(*size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &sentences, |b, s| {
            b.iter(|| {
                let temp = tempfile::tempdir().expect("temp dir");
                let store = RedbStore::open(temp.path().join("bench.redb")).expect("open");
                let mut model = Model::with_store(store, ModelConfig::default()).expect("model");
                model.train_many(s.iter()).expect("train");
                black_box(model.pending_counts())
            });
        });
    }

    group.finish();
}

fn bench_queries(c: &mut Criterion) {
    let mut model = memory_model();
    let sentences = corpus(2000);
    model.train_many(sentences.iter()).expect("train");
    let context = sentences[0][..2].to_vec();
    let next = sentences[0][2].clone();

    c.bench_function("ngram_count", |b| {
        b.iter(|| black_box(model.ngram_count(&sentences[0][..3]).expect("count")))
    });

    c.bench_function("prob", |b| {
        b.iter(|| black_box(model.prob(&next, &context).expect("prob")))
    });

    c.bench_function("choose_random_word", |b| {
        let mut rng = StdRng::seed_from_u64(7);
        b.iter(|| {
            black_box(
                model
                    .choose_random_word_with(&context, &mut rng)
                    .expect("choice")
                    .len(),
            )
        })
    });
}

criterion_group!(benches, bench_train_memory, bench_train_redb, bench_queries);
criterion_main!(benches);
