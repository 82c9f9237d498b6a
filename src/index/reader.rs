use crate::error::Result;
use crate::index::storage::{MemoryBlocks, MmapBlocks};
use crate::index::writer::Index;
use std::fs;
use std::path::Path;

impl Index {
    /// Open a saved index, memory-mapping its blocks.
    ///
    /// Only the header is checked here; blocks are decoded when a query
    /// needs them, so block-level corruption surfaces from
    /// [`IndexInput::open`](crate::index::IndexInput::open).
    pub fn open(path: &Path) -> Result<Index> {
        let store = MmapBlocks::open(path)?;
        tracing::debug!(
            path = %path.display(),
            num_files = store.header().num_files,
            num_words = store.header().num_words,
            "opened mapped index"
        );
        Ok(Index::from_store(Box::new(store)))
    }

    /// Load a saved index fully into memory
    pub fn read(path: &Path) -> Result<Index> {
        let data = fs::read(path)?;
        let index = Index::from_bytes(&data)?;
        tracing::debug!(path = %path.display(), bytes = data.len(), "read index into memory");
        Ok(index)
    }

    /// Load an index from the bytes of a saved file
    pub fn from_bytes(data: &[u8]) -> Result<Index> {
        let store = MemoryBlocks::from_bytes(data)?;
        Ok(Index::from_store(Box::new(store)))
    }

    /// Open memory-mapped, falling back to a resident copy if mapping fails
    pub fn open_or_read(path: &Path) -> Result<Index> {
        match Index::open(path) {
            Ok(index) => Ok(index),
            Err(err) if err.is_retriable() => {
                tracing::warn!(path = %path.display(), error = %err, "mapping failed, reading into memory");
                Index::read(path)
            }
            Err(err) => Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::index::storage::StorageKind;
    use tempfile::tempdir;

    fn setup_saved_index() -> (tempfile::TempDir, std::path::PathBuf, Index) {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("model.mxi");

        let mut index = Index::with_block_size(64).unwrap();
        for i in 0..20 {
            index
                .add_document(&format!("/m/File{i}.xmi"), [format!("Class{i}"), "Shared".to_string()])
                .unwrap();
        }
        index.save(&path).unwrap();

        (temp_dir, path, index)
    }

    #[test]
    fn test_open_roundtrip() {
        let (_temp_dir, path, built) = setup_saved_index();
        let opened = Index::open(&path).unwrap();

        assert!(opened.is_frozen());
        assert_eq!(opened.storage_kind(), Some(StorageKind::Mapped));
        assert_eq!(opened.block_size(), 64);
        assert_eq!(opened.num_files(), 20);
        assert_eq!(opened.num_words(), 21);
        assert_eq!(opened.sorted_files().unwrap(), built.sorted_files().unwrap());
        assert_eq!(
            opened.sorted_word_entries().unwrap(),
            built.sorted_word_entries().unwrap()
        );
    }

    #[test]
    fn test_read_roundtrip() {
        let (_temp_dir, path, built) = setup_saved_index();
        let read = Index::read(&path).unwrap();

        assert_eq!(read.storage_kind(), Some(StorageKind::Memory));
        assert_eq!(read.sorted_files().unwrap(), built.sorted_files().unwrap());
        assert_eq!(read.sorted_word_entries().unwrap(), built.sorted_word_entries().unwrap());
        assert!(read.stats().file_blocks.unwrap() > 1);
    }

    #[test]
    fn test_open_missing_file_is_io_error() {
        let temp_dir = tempdir().unwrap();
        let err = Index::open(&temp_dir.path().join("missing.mxi")).unwrap_err();
        assert!(matches!(err, Error::Io(_)));
        let err = Index::open_or_read(&temp_dir.path().join("missing.mxi")).unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_open_garbage_is_corrupt() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("garbage.mxi");
        fs::write(&path, b"definitely not an index file").unwrap();
        assert!(matches!(Index::open(&path), Err(Error::Corrupt(_))));
        assert!(matches!(Index::read(&path), Err(Error::Corrupt(_))));
    }

    #[test]
    fn test_from_bytes_matches_read() {
        let (_temp_dir, path, built) = setup_saved_index();
        let index = Index::from_bytes(&fs::read(&path).unwrap()).unwrap();
        assert_eq!(index.num_words(), built.num_words());
        assert_eq!(index.sorted_files().unwrap(), built.sorted_files().unwrap());
        assert!(matches!(Index::from_bytes(&[]), Err(Error::Corrupt(_))));
    }
}
