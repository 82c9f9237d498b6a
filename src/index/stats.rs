use crate::index::storage::StorageKind;
use std::fmt;

/// Summary of an index's contents and block layout
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexStats {
    pub num_files: u32,
    pub num_words: u32,
    pub block_size: usize,
    /// `None` while the index is still building
    pub file_blocks: Option<usize>,
    pub word_blocks: Option<usize>,
    pub storage: Option<StorageKind>,
}

impl IndexStats {
    /// Bytes the block regions take on disk, header excluded
    pub fn block_bytes(&self) -> Option<u64> {
        let blocks = self.file_blocks? + self.word_blocks?;
        Some(blocks as u64 * self.block_size as u64)
    }
}

impl fmt::Display for IndexStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let storage = match self.storage {
            None => "building",
            Some(StorageKind::Memory) => "in memory",
            Some(StorageKind::Mapped) => "memory-mapped",
        };

        writeln!(f, "Index Statistics")?;
        writeln!(f, "================")?;
        writeln!(f, "Storage:          {}", storage)?;
        writeln!(f, "File count:       {}", self.num_files)?;
        writeln!(f, "Word count:       {}", self.num_words)?;
        writeln!(f, "Block size:       {}", format_size(self.block_size as u64))?;
        if let (Some(file_blocks), Some(word_blocks)) = (self.file_blocks, self.word_blocks) {
            writeln!(f, "File blocks:      {}", file_blocks)?;
            writeln!(f, "Word blocks:      {}", word_blocks)?;
        }
        if let Some(bytes) = self.block_bytes() {
            writeln!(f, "Block data:       {}", format_size(bytes))?;
        }
        Ok(())
    }
}

/// Format byte size to human readable
pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} bytes", bytes)
    }
}
