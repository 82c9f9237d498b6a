//! Queries across the indexes of a selector, including unusable ones.

mod common;

use common::{init_tracing, model_index, numbered_index, patch_bytes};
use mxi::index::{DirectorySelector, Index, IndexSelector, MatchCase, StaticSelector};
use mxi::query::QueryExecutor;
use mxi::Error;
use std::fs;
use std::sync::Arc;
use tempfile::TempDir;

/// An index whose header is valid but whose word entries are out of order
fn save_scrambled_index(path: &std::path::Path) {
    let mut index = Index::default();
    index.add_document("/s/Scrambled.xmi", ["aaaa", "bbbb"]).unwrap();
    index.save(path).unwrap();
    patch_bytes(path, b"aaaa", b"zzzz");
}

#[test]
fn test_directory_selector_queries_every_index() {
    init_tracing();
    let temp_dir = TempDir::new().unwrap();
    model_index().save(&temp_dir.path().join("1-model.mxi")).unwrap();
    numbered_index(64, "Col", 3).save(&temp_dir.path().join("2-numbered.mxi")).unwrap();
    fs::write(temp_dir.path().join("notes.txt"), "Column").unwrap();

    let selector = DirectorySelector::new(temp_dir.path()).unwrap();
    let results = QueryExecutor::new(&selector)
        .query_files_referring_to_prefix(b"Col", MatchCase::Sensitive)
        .unwrap();

    assert!(results.is_complete());
    assert_eq!(results.hits.len(), 2);
    assert_eq!(results.hits[0].results.len(), 2);
    assert_eq!(results.hits[1].results.len(), 3);
    // ColClass{i} and ColShared both match in every numbered document
    assert!(results.hits[1].results.iter().all(|r| r.match_count == 2));
}

#[test]
fn test_corrupt_blocks_reported_without_aborting_siblings() {
    init_tracing();
    let temp_dir = TempDir::new().unwrap();
    let good = temp_dir.path().join("a-good.mxi");
    let bad = temp_dir.path().join("b-bad.mxi");
    let other = temp_dir.path().join("c-other.mxi");
    model_index().save(&good).unwrap();
    save_scrambled_index(&bad);
    numbered_index(64, "Col", 2).save(&other).unwrap();

    let selector = DirectorySelector::new(temp_dir.path()).unwrap();
    let results = QueryExecutor::new(&selector)
        .query_entries_prefixed_by(b"Col", MatchCase::Sensitive)
        .unwrap();

    assert!(!results.is_complete());
    assert_eq!(results.failures.len(), 1);
    assert_eq!(results.failures[0].position, 1);
    assert!(matches!(results.failures[0].error, Error::Corrupt(_)));

    let positions: Vec<_> = results.hits.iter().map(|h| h.position).collect();
    assert_eq!(positions, vec![0, 2]);
    assert_eq!(results.hits[0].results.len(), 1);
    assert_eq!(results.hits[1].results.len(), 3);
}

#[test]
fn test_unreadable_index_files_are_reported() {
    init_tracing();
    let temp_dir = TempDir::new().unwrap();
    fs::write(temp_dir.path().join("a-garbage.mxi"), b"not an index").unwrap();
    model_index().save(&temp_dir.path().join("b-good.mxi")).unwrap();
    let truncated = temp_dir.path().join("c-truncated.mxi");
    model_index().save(&truncated).unwrap();
    let data = fs::read(&truncated).unwrap();
    fs::write(&truncated, &data[..data.len() / 2]).unwrap();

    let selector = DirectorySelector::new(temp_dir.path()).unwrap();
    assert_eq!(selector.index_paths().unwrap().len(), 3);
    assert_eq!(selector.indexes().unwrap().len(), 1);

    let results = QueryExecutor::new(&selector)
        .query_in_document_names("Bar")
        .unwrap();
    let failed: Vec<_> = results.failures.iter().map(|f| f.position).collect();
    assert_eq!(failed, vec![0, 2]);
    assert!(results.failures.iter().all(|f| f.error.is_fatal_for_index()));
    assert_eq!(results.hits.len(), 1);
    assert_eq!(results.hits[0].position, 1);
    assert_eq!(results.total(), 1);
}

#[test]
fn test_missing_directory_fails_the_query() {
    let temp_dir = TempDir::new().unwrap();
    let selector = DirectorySelector::new(temp_dir.path().join("absent")).unwrap();
    let err = QueryExecutor::new(&selector)
        .query_in_document_names("x")
        .unwrap_err();
    assert!(matches!(err, Error::Io(_)));
}

#[test]
fn test_custom_patterns() {
    let temp_dir = TempDir::new().unwrap();
    model_index().save(&temp_dir.path().join("model.idx")).unwrap();
    model_index().save(&temp_dir.path().join("model.mxi")).unwrap();

    let selector = DirectorySelector::with_patterns(temp_dir.path(), &["*.idx"]).unwrap();
    assert_eq!(selector.indexes().unwrap().len(), 1);

    assert!(matches!(
        DirectorySelector::with_patterns(temp_dir.path(), &["[unclosed"]),
        Err(Error::InvalidConfig(_))
    ));
}

#[test]
fn test_stale_selector_still_answers() {
    init_tracing();
    let selector = StaticSelector::new(vec![Arc::new(model_index())]);
    selector.invalidate();
    assert!(!selector.is_valid());

    let results = QueryExecutor::new(&selector)
        .query_entries_prefixed_by(b"column", MatchCase::Insensitive)
        .unwrap();
    assert_eq!(results.total(), 1);
}

#[test]
fn test_file_content_through_selector() {
    let temp_dir = TempDir::new().unwrap();
    fs::create_dir_all(temp_dir.path().join("m")).unwrap();
    fs::write(temp_dir.path().join("m").join("Foo.xmi"), "<Foo/>").unwrap();

    let mut index = model_index();
    index.finalize().unwrap();
    let selector =
        StaticSelector::new(vec![Arc::new(index)]).with_content_root(temp_dir.path());

    let results = QueryExecutor::new(&selector)
        .query_in_document_names(".xmi")
        .unwrap();
    let files: Vec<_> = results.into_results().collect();
    assert_eq!(files.len(), 2);

    assert_eq!(selector.file_content(&files[0]), b"<Foo/>");
    assert_eq!(selector.file_size(&files[0]), 6);
    // Bar.xmi was never written
    assert!(selector.file_content(&files[1]).is_empty());
    assert_eq!(selector.file_size(&files[1]), 0);
}
