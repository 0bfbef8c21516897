use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use doc_rag::embeddings::{Chunk, Embedder, HashingEmbedder};
use doc_rag::index::{VectorIndex, VectorRecord};
use std::hint::black_box;

fn populated_index(embedder: &HashingEmbedder, records: usize) -> VectorIndex {
    let index = VectorIndex::new();
    let batch = (0..records)
        .map(|i| {
            let text = format!("note {} about topic {} and subject {}", i, i % 17, i % 31);
            VectorRecord {
                vector: embedder.embed(&text).expect("hashing never fails"),
                chunk: Chunk {
                    text,
                    source_document: "bench".to_string(),
                    chunk_index: i,
                    total_chunks: records,
                },
            }
        })
        .collect();
    index.insert_batch(batch).expect("uniform dimensions");
    index
}

pub fn criterion_benchmark(c: &mut Criterion) {
    let embedder = HashingEmbedder::default();
    let query = embedder
        .embed("which note covers topic 3")
        .expect("hashing never fails");

    let mut group = c.benchmark_group("search");
    for size in [1_000, 10_000] {
        let index = populated_index(&embedder, size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &index, |b, index| {
            b.iter(|| index.search_scored(black_box(&query), black_box(5), 0.0))
        });
    }
    group.finish();
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
