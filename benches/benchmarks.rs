//! Query and load benchmarks for MXI
//!
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use mxi::index::{Index, IndexInput, MatchCase};
use std::path::PathBuf;
use tempfile::TempDir;

const DOCUMENTS: usize = 2_000;

/// Build and save an index of generated model files
fn create_benchmark_index() -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let path = temp_dir.path().join("bench.mxi");

    let mut index = Index::default();
    for i in 0..DOCUMENTS {
        let words = [
            format!("Class{i}"),
            format!("Column{}", i % 100),
            format!("attribute_{}", i % 37),
            "Package".to_string(),
            "EObject".to_string(),
        ];
        index
            .add_document(&format!("/models/pkg{}/Model{i}.xmi", i % 20), &words)
            .expect("Failed to add document");
    }
    index.save(&path).expect("Failed to save index");

    (temp_dir, path)
}

fn bench_prefix_queries(c: &mut Criterion) {
    let (_temp_dir, path) = create_benchmark_index();
    let index = Index::open(&path).expect("Failed to open index");
    let mut input = IndexInput::new(&index);
    input.open().expect("Failed to open input");

    let mut group = c.benchmark_group("prefix_queries");
    for prefix in ["C", "Col", "Column4", "attr", "Missing"] {
        group.bench_with_input(BenchmarkId::new("sensitive", prefix), &prefix, |b, p| {
            b.iter(|| {
                input
                    .query_files_referring_to_prefix(black_box(p.as_bytes()), MatchCase::Sensitive)
                    .unwrap()
            })
        });
        group.bench_with_input(BenchmarkId::new("insensitive", prefix), &prefix, |b, p| {
            b.iter(|| {
                input
                    .query_entries_prefixed_by(black_box(p.as_bytes()), MatchCase::Insensitive)
                    .unwrap()
            })
        });
    }
    group.finish();
}

fn bench_document_names(c: &mut Criterion) {
    let (_temp_dir, path) = create_benchmark_index();
    let index = Index::open(&path).expect("Failed to open index");
    let mut input = IndexInput::new(&index);
    input.open().expect("Failed to open input");

    c.bench_function("query_in_document_names", |b| {
        b.iter(|| input.query_in_document_names(black_box("pkg7/Model1")).unwrap())
    });
}

fn bench_index_loading(c: &mut Criterion) {
    let (_temp_dir, path) = create_benchmark_index();

    let mut group = c.benchmark_group("index_loading");
    group.bench_function("open_mapped", |b| {
        b.iter(|| {
            let index = Index::open(black_box(&path)).unwrap();
            let mut input = IndexInput::new(&index);
            input.open().unwrap();
            input.num_words()
        })
    });
    group.bench_function("read_resident", |b| {
        b.iter(|| {
            let index = Index::read(black_box(&path)).unwrap();
            let mut input = IndexInput::new(&index);
            input.open().unwrap();
            input.num_words()
        })
    });
    group.finish();
}

criterion_group!(
    benches,
    bench_prefix_queries,
    bench_document_names,
    bench_index_loading,
);
criterion_main!(benches);
