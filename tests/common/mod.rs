//! Shared helpers for integration tests

#![allow(dead_code)]

use mxi::index::Index;
use std::fs;
use std::path::Path;
use std::sync::Once;

static TRACING: Once = Once::new();

/// Route `tracing` output through the test harness
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_test_writer()
            .with_max_level(tracing::Level::DEBUG)
            .try_init();
    });
}

/// The two-document model index used throughout the tests
pub fn model_index() -> Index {
    let mut index = Index::default();
    index.add_document("/m/Foo.xmi", ["Foo", "Column1"]).unwrap();
    index.add_document("/m/Bar.xmi", ["Bar", "Column1"]).unwrap();
    index
}

/// An index of `count` documents, each with one unique and one shared word
pub fn numbered_index(block_size: usize, prefix: &str, count: usize) -> Index {
    let mut index = Index::with_block_size(block_size).unwrap();
    for i in 0..count {
        index
            .add_document(
                &format!("/{prefix}/Model{i}.xmi"),
                [format!("{prefix}Class{i}"), format!("{prefix}Shared")],
            )
            .unwrap();
    }
    index
}

/// Overwrite the first occurrence of `needle` in a file with `replacement`
pub fn patch_bytes(path: &Path, needle: &[u8], replacement: &[u8]) {
    assert_eq!(needle.len(), replacement.len());
    let mut data = fs::read(path).unwrap();
    let at = data
        .windows(needle.len())
        .position(|w| w == needle)
        .expect("needle not found");
    data[at..at + needle.len()].copy_from_slice(replacement);
    fs::write(path, data).unwrap();
}
