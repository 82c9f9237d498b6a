use crate::error::{Error, Result};
use crate::index::selector::IndexSelector;
use crate::index::types::{FileReference, IndexedFile, MatchCase, WordEntry};
use crate::index::{Index, IndexInput};
use rayon::prelude::*;
use std::sync::Arc;

/// Results one index contributed to a selector-wide query
#[derive(Debug)]
pub struct IndexHits<T> {
    /// Position of the index in the selector's `indexes()` list
    pub position: usize,
    pub results: Vec<T>,
}

/// An index that could not answer a selector-wide query
#[derive(Debug)]
pub struct IndexFailure {
    /// Position of the index in the selector's `indexes()` list
    pub position: usize,
    pub error: Error,
}

/// Partial results of a query across all indexes of a selector
#[derive(Debug)]
pub struct SelectorResults<T> {
    /// One entry per index that answered, in selector order
    pub hits: Vec<IndexHits<T>>,
    /// One entry per index that failed
    pub failures: Vec<IndexFailure>,
}

impl<T> SelectorResults<T> {
    /// Whether every index answered
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    /// Number of results across all answering indexes
    pub fn total(&self) -> usize {
        self.hits.iter().map(|h| h.results.len()).sum()
    }

    /// All results, flattened in selector order
    pub fn into_results(self) -> impl Iterator<Item = T> {
        self.hits.into_iter().flat_map(|h| h.results)
    }
}

/// Runs queries against every index a selector provides
pub struct QueryExecutor<'a> {
    selector: &'a dyn IndexSelector,
}

impl<'a> QueryExecutor<'a> {
    pub fn new(selector: &'a dyn IndexSelector) -> Self {
        Self { selector }
    }

    /// Files whose path contains `substring`, per index
    pub fn query_in_document_names(&self, substring: &str) -> Result<SelectorResults<IndexedFile>> {
        self.execute(|input| input.query_in_document_names(substring))
    }

    /// Word entries starting with `prefix`, per index
    pub fn query_entries_prefixed_by(
        &self,
        prefix: &[u8],
        case: MatchCase,
    ) -> Result<SelectorResults<WordEntry>> {
        self.execute(|input| input.query_entries_prefixed_by(prefix, case))
    }

    /// Files referring to words starting with `prefix`, per index
    pub fn query_files_referring_to_prefix(
        &self,
        prefix: &[u8],
        case: MatchCase,
    ) -> Result<SelectorResults<FileReference>> {
        self.execute(|input| input.query_files_referring_to_prefix(prefix, case))
    }

    /// Run `query` on a fresh input per index, in parallel.
    ///
    /// Only a failure to list the indexes fails the whole call. An index
    /// that cannot be loaded, opened or queried is reported in `failures`
    /// and its siblings still answer.
    pub fn execute<T, F>(&self, query: F) -> Result<SelectorResults<T>>
    where
        T: Send,
        F: Fn(&IndexInput<'_>) -> Result<Vec<T>> + Sync,
    {
        if !self.selector.is_valid() {
            tracing::warn!("querying a stale index selector");
        }

        let slots = self.selector.load_indexes()?;
        let outcomes: Vec<(usize, Result<Vec<T>>)> = slots
            .into_par_iter()
            .enumerate()
            .map(|(position, slot)| (position, slot.and_then(|index| run_query(&index, &query))))
            .collect();

        let mut hits = Vec::new();
        let mut failures = Vec::new();
        for (position, outcome) in outcomes {
            match outcome {
                Ok(results) => hits.push(IndexHits { position, results }),
                Err(error) => {
                    tracing::warn!(position, error = %error, "index query failed");
                    failures.push(IndexFailure { position, error });
                }
            }
        }

        Ok(SelectorResults { hits, failures })
    }
}

fn run_query<T, F>(index: &Arc<Index>, query: &F) -> Result<Vec<T>>
where
    F: Fn(&IndexInput<'_>) -> Result<Vec<T>>,
{
    let mut input = IndexInput::new(index);
    input.open()?;
    let results = query(&input);
    input.close();
    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::selector::StaticSelector;

    fn index_of(docs: &[(&str, &[&str])]) -> Arc<Index> {
        let mut index = Index::default();
        for (path, words) in docs {
            index.add_document(path, words.iter()).unwrap();
        }
        index.finalize().unwrap();
        Arc::new(index)
    }

    #[test]
    fn test_fan_out_keeps_selector_order() {
        let selector = StaticSelector::new(vec![
            index_of(&[("/a/Foo.xmi", &["Foo", "Column1"])]),
            index_of(&[("/b/Bar.xmi", &["Bar"])]),
            index_of(&[("/c/Baz.xmi", &["Column2"])]),
        ]);
        let executor = QueryExecutor::new(&selector);

        let results = executor
            .query_files_referring_to_prefix(b"Col", MatchCase::Sensitive)
            .unwrap();
        assert!(results.is_complete());
        assert_eq!(results.hits.len(), 3);
        assert_eq!(results.hits[1].position, 1);
        assert!(results.hits[1].results.is_empty());
        assert_eq!(results.total(), 2);

        let paths: Vec<_> = results.into_results().map(|r| r.file.path).collect();
        assert_eq!(paths, vec!["/a/Foo.xmi", "/c/Baz.xmi"]);
    }

    #[test]
    fn test_document_names_and_entries() {
        let selector = StaticSelector::new(vec![
            index_of(&[("/a/Foo.xmi", &["Foo"])]),
            index_of(&[("/b/Foo2.xmi", &["foo"])]),
        ]);
        let executor = QueryExecutor::new(&selector);

        assert_eq!(executor.query_in_document_names("Foo").unwrap().total(), 2);
        assert_eq!(
            executor
                .query_entries_prefixed_by(b"foo", MatchCase::Insensitive)
                .unwrap()
                .total(),
            2
        );
        assert_eq!(
            executor
                .query_entries_prefixed_by(b"foo", MatchCase::Sensitive)
                .unwrap()
                .total(),
            1
        );
    }

    #[test]
    fn test_empty_selector() {
        let selector = StaticSelector::new(Vec::new());
        let results = QueryExecutor::new(&selector)
            .query_in_document_names("x")
            .unwrap();
        assert!(results.is_complete());
        assert_eq!(results.total(), 0);
    }
}
