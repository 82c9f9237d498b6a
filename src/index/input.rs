//! Query cursor over one index
//!
//! An [`IndexInput`] borrows an [`Index`], so the index cannot change or go
//! away while the input is alive. Each caller opens its own input; many
//! inputs can be open over the same frozen index at once.

use crate::error::{Error, Result};
use crate::index::types::{FileNumber, FileReference, IndexedFile, MatchCase, WordEntry};
use crate::index::writer::Index;
use memchr::memmem;
use std::collections::BTreeMap;

/// Lifecycle of an [`IndexInput`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputState {
    Created,
    Opened,
    Closed,
}

/// Sorted snapshot of an index, held while the input is open
struct Snapshot {
    words: Vec<WordEntry>,
    files: Vec<IndexedFile>,
}

/// Read cursor and query entry point for one index
pub struct IndexInput<'a> {
    index: &'a Index,
    state: InputState,
    snapshot: Option<Snapshot>,
    /// 1-based; past the end once it exceeds the entry count
    word_position: usize,
    file_position: usize,
}

impl<'a> IndexInput<'a> {
    pub fn new(index: &'a Index) -> Self {
        Self {
            index,
            state: InputState::Created,
            snapshot: None,
            word_position: 1,
            file_position: 1,
        }
    }

    pub fn state(&self) -> InputState {
        self.state
    }

    /// Load the sorted word and file views and reset both cursors to 1.
    ///
    /// Frozen indexes are decoded here; malformed blocks, out-of-order
    /// entries and words referring to unknown files are reported as
    /// [`Error::Corrupt`]. Any previous snapshot is released first, so an
    /// input whose re-open failed is not open.
    pub fn open(&mut self) -> Result<()> {
        self.close();
        let files = self.index.sorted_files()?;
        let words = self.index.sorted_word_entries()?;

        if let Some(last) = files.last() {
            for entry in &words {
                if entry.file_numbers.max().is_some_and(|max| max > last.file_number) {
                    return Err(Error::corrupt(format!(
                        "word {:?} refers to a file beyond {}",
                        entry.word_lossy(),
                        last.file_number
                    )));
                }
            }
        } else if !words.is_empty() {
            return Err(Error::corrupt("word entries without any files"));
        }

        self.snapshot = Some(Snapshot { words, files });
        self.state = InputState::Opened;
        self.word_position = 1;
        self.file_position = 1;
        Ok(())
    }

    /// Release the snapshot. Closing twice is harmless.
    pub fn close(&mut self) {
        self.snapshot = None;
        if self.state == InputState::Opened {
            self.state = InputState::Closed;
        }
    }

    fn snapshot(&self) -> Result<&Snapshot> {
        self.snapshot.as_ref().ok_or(Error::NotOpen)
    }

    pub fn num_files(&self) -> u32 {
        self.index.num_files()
    }

    pub fn num_words(&self) -> u32 {
        self.index.num_words()
    }

    pub fn word_position(&self) -> usize {
        self.word_position
    }

    pub fn file_position(&self) -> usize {
        self.file_position
    }

    pub fn has_more_words(&self) -> Result<bool> {
        Ok(self.word_position <= self.snapshot()?.words.len())
    }

    pub fn has_more_files(&self) -> Result<bool> {
        Ok(self.file_position <= self.snapshot()?.files.len())
    }

    /// Entry under the word cursor, `None` past the end
    pub fn current_word_entry(&self) -> Result<Option<&WordEntry>> {
        Ok(self.snapshot()?.words.get(self.word_position - 1))
    }

    /// File under the file cursor, `None` past the end
    pub fn current_file(&self) -> Result<Option<&IndexedFile>> {
        Ok(self.snapshot()?.files.get(self.file_position - 1))
    }

    pub fn move_to_next_word_entry(&mut self) -> Result<()> {
        if self.word_position <= self.snapshot()?.words.len() {
            self.word_position += 1;
        }
        Ok(())
    }

    pub fn move_to_next_file_entry(&mut self) -> Result<()> {
        if self.file_position <= self.snapshot()?.files.len() {
            self.file_position += 1;
        }
        Ok(())
    }

    /// Look up a file by number
    pub fn indexed_file(&self, file_number: FileNumber) -> Result<Option<IndexedFile>> {
        let files = &self.snapshot()?.files;
        Ok(files
            .binary_search_by_key(&file_number, |f| f.file_number)
            .ok()
            .map(|i| files[i].clone()))
    }

    /// Look up a file by path. With duplicate paths the last one added wins.
    pub fn indexed_file_by_path(&self, path: &str) -> Result<Option<IndexedFile>> {
        Ok(self
            .snapshot()?
            .files
            .iter()
            .rev()
            .find(|f| f.path == path)
            .cloned())
    }

    /// Files whose path contains `substring` (case-sensitive), in file order
    pub fn query_in_document_names(&self, substring: &str) -> Result<Vec<IndexedFile>> {
        let finder = memmem::Finder::new(substring.as_bytes());
        Ok(self
            .snapshot()?
            .files
            .iter()
            .filter(|f| finder.find(f.path.as_bytes()).is_some())
            .cloned()
            .collect())
    }

    /// Word entries whose word starts with `prefix`, in word order
    pub fn query_entries_prefixed_by(
        &self,
        prefix: &[u8],
        case: MatchCase,
    ) -> Result<Vec<WordEntry>> {
        Ok(self
            .matching_entries(prefix, case)?
            .into_iter()
            .cloned()
            .collect())
    }

    /// Files referenced by any word starting with `prefix`, each with the
    /// number of distinct matching words that reference it, in file order
    pub fn query_files_referring_to_prefix(
        &self,
        prefix: &[u8],
        case: MatchCase,
    ) -> Result<Vec<FileReference>> {
        let mut counts: BTreeMap<FileNumber, u32> = BTreeMap::new();
        for entry in self.matching_entries(prefix, case)? {
            for file_number in entry.file_numbers.iter() {
                *counts.entry(file_number).or_insert(0) += 1;
            }
        }

        let mut references = Vec::with_capacity(counts.len());
        for (file_number, match_count) in counts {
            let file = self
                .indexed_file(file_number)?
                .ok_or_else(|| Error::corrupt(format!("unknown file {}", file_number)))?;
            references.push(FileReference { file, match_count });
        }
        Ok(references)
    }

    fn matching_entries(&self, prefix: &[u8], case: MatchCase) -> Result<Vec<&WordEntry>> {
        let words = &self.snapshot()?.words;
        match case {
            MatchCase::Sensitive => {
                // All words sharing a prefix sort next to each other
                let start = words.partition_point(|e| e.word.as_slice() < prefix);
                Ok(words[start..]
                    .iter()
                    .take_while(|e| e.word.starts_with(prefix))
                    .collect())
            }
            MatchCase::Insensitive => Ok(words
                .iter()
                .filter(|e| case.is_prefix(prefix, &e.word))
                .collect()),
        }
    }
}
