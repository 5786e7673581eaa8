//! Criterion benchmarks for Quarry.
//!
//! Covers text analysis, document ingestion and query execution over
//! term, prefix, numeric and boolean trees.

use criterion::{BatchSize, Criterion, Throughput, criterion_group, criterion_main};
use quarry::analysis::analyzer::{Analyzer, PipelineAnalyzer};
use quarry::document::Document;
use quarry::index::Index;
use quarry::query::QueryNode;
use quarry::schema::{FieldOptions, TypeFlags};
use std::hint::black_box;

const WORDS: [&str; 16] = [
    "search", "engine", "full", "text", "index", "query", "document", "field", "term", "phrase",
    "tag", "numeric", "range", "prefix", "fuzzy", "trie",
];

/// Generate test documents for benchmarking.
fn generate_test_documents(count: usize) -> Vec<Document> {
    (0..count)
        .map(|i| {
            let length = 20 + (i % 30);
            let text: Vec<&str> = (0..length)
                .map(|j| WORDS[(i * 7 + j * 13) % WORDS.len()]) // Pseudo-random distribution
                .collect();
            Document::builder(format!("doc{i}"))
                .add_text("body", text.join(" "))
                .add_text("tags", format!("tag-{},group-{}", i % 100, i % 7))
                .add_number("price", (i % 1000) as f64)
                .build()
        })
        .collect()
}

fn create_index() -> Index {
    let index = Index::create("bench", None);
    index
        .create_field("body", TypeFlags::FULLTEXT, FieldOptions::NONE)
        .unwrap();
    index
        .create_field("tags", TypeFlags::TAG, FieldOptions::NONE)
        .unwrap();
    index
        .create_field("price", TypeFlags::NUMERIC, FieldOptions::NONE)
        .unwrap();
    index
}

fn drain(index: &Index, node: &QueryNode) -> usize {
    index
        .get_results_iterator(node)
        .unwrap()
        .map_or(0, |it| it.count())
}

/// Benchmark text analysis.
fn bench_text_analysis(c: &mut Criterion) {
    let mut group = c.benchmark_group("text_analysis");
    let analyzer = PipelineAnalyzer::standard();
    let text = WORDS.join(" ").repeat(8);

    group.bench_function("analyze_document", |b| {
        b.iter(|| {
            let tokens = analyzer.analyze(black_box(&text)).unwrap();
            black_box(tokens.count())
        })
    });
    group.finish();
}

/// Benchmark document ingestion.
fn bench_ingestion(c: &mut Criterion) {
    let mut group = c.benchmark_group("ingestion");
    group.sample_size(20);
    group.throughput(Throughput::Elements(1000));

    group.bench_function("add_document_1000", |b| {
        b.iter_batched(
            || (create_index(), generate_test_documents(1000)),
            |(index, docs)| {
                for doc in docs {
                    index.add_document(doc).unwrap();
                }
                black_box(index)
            },
            BatchSize::SmallInput,
        )
    });

    group.bench_function("add_documents_batch_1000", |b| {
        b.iter_batched(
            || (create_index(), generate_test_documents(1000)),
            |(index, docs)| {
                index.add_documents(docs).unwrap();
                black_box(index)
            },
            BatchSize::SmallInput,
        )
    });
    group.finish();
}

/// Benchmark query execution.
fn bench_queries(c: &mut Criterion) {
    let mut group = c.benchmark_group("queries");
    let index = create_index();
    index.add_documents(generate_test_documents(10_000)).unwrap();

    let term = QueryNode::token(Some("body"), "engine");
    group.bench_function("term", |b| b.iter(|| black_box(drain(&index, &term))));

    let mut tag = QueryNode::tag("tags");
    tag.add_child(QueryNode::prefix(None, "tag-")).unwrap();
    group.bench_function("tag_prefix", |b| b.iter(|| black_box(drain(&index, &tag))));

    let numeric = QueryNode::numeric_range("price", 100.0, 200.0, false, true);
    group.bench_function("numeric_range", |b| {
        b.iter(|| black_box(drain(&index, &numeric)))
    });

    let boolean = QueryNode::intersect_of(
        vec![
            QueryNode::union_of(vec![
                QueryNode::token(Some("body"), "fuzzy"),
                QueryNode::token(Some("body"), "trie"),
            ]),
            QueryNode::negate(QueryNode::token(Some("body"), "phrase")),
        ],
        false,
    );
    group.bench_function("boolean", |b| b.iter(|| black_box(drain(&index, &boolean))));

    group.bench_function("query_string", |b| {
        b.iter(|| {
            let count = index
                .iterate_query(black_box("@body:search @price:[0 500] -@tags:{group-3}"), None)
                .unwrap()
                .map_or(0, |it| it.count());
            black_box(count)
        })
    });
    group.finish();
}

criterion_group!(benches, bench_text_analysis, bench_ingestion, bench_queries);
criterion_main!(benches);
