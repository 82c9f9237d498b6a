use crate::error::{Error, Result};
use roaring::RoaringBitmap;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;

/// Dense, 1-based handle of a document inside one index
pub type FileNumber = u32;

/// File number 0 never refers to a document
pub const NO_FILE: FileNumber = 0;

/// Magic number for index files
pub const INDEX_MAGIC: u32 = 0x5849_584D; // "MXIX" in little-endian

/// Current version of the index file format
pub const INDEX_VERSION: u32 = 1;

/// Default block size in bytes
pub const DEFAULT_BLOCK_SIZE: usize = 8192;

/// Smallest block size accepted by [`IndexConfig::validate`]
pub const MIN_BLOCK_SIZE: usize = 64;

/// Largest block size accepted by [`IndexConfig::validate`]
pub const MAX_BLOCK_SIZE: usize = 16 * 1024 * 1024;

/// A word together with the files that contain it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WordEntry {
    pub word: Vec<u8>,
    pub file_numbers: RoaringBitmap,
}

impl WordEntry {
    pub fn new(word: impl Into<Vec<u8>>) -> Self {
        Self {
            word: word.into(),
            file_numbers: RoaringBitmap::new(),
        }
    }

    pub fn with_files<I>(word: impl Into<Vec<u8>>, files: I) -> Self
    where
        I: IntoIterator<Item = FileNumber>,
    {
        Self {
            word: word.into(),
            file_numbers: files.into_iter().collect(),
        }
    }

    /// The word as text, replacing invalid UTF-8
    pub fn word_lossy(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.word)
    }

    /// Number of files containing the word
    pub fn num_files(&self) -> u32 {
        self.file_numbers.len() as u32
    }

    pub fn is_empty(&self) -> bool {
        self.file_numbers.is_empty()
    }
}

/// A document known to an index
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IndexedFile {
    pub file_number: FileNumber,
    pub path: String,
}

impl IndexedFile {
    pub fn new(file_number: FileNumber, path: impl Into<String>) -> Self {
        Self {
            file_number,
            path: path.into(),
        }
    }
}

/// A file matched by a prefix query, with the number of distinct
/// matching words that reference it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileReference {
    pub file: IndexedFile,
    pub match_count: u32,
}

/// Case handling for prefix queries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MatchCase {
    #[default]
    Sensitive,
    /// ASCII case folding
    Insensitive,
}

impl MatchCase {
    /// Whether `word` starts with `prefix` under this case rule
    pub fn is_prefix(self, prefix: &[u8], word: &[u8]) -> bool {
        match self {
            MatchCase::Sensitive => word.starts_with(prefix),
            MatchCase::Insensitive => {
                word.len() >= prefix.len() && word[..prefix.len()].eq_ignore_ascii_case(prefix)
            }
        }
    }
}

/// Header of a persisted index file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexHeader {
    pub magic: u32,
    pub version: u32,
    pub block_size: u32,
    pub num_word_blocks: u32,
    pub num_file_blocks: u32,
    pub num_words: u32,
    pub num_files: u32,
}

impl IndexHeader {
    /// Size of header in bytes
    pub const SIZE: usize = 7 * 4; // 28 bytes

    pub fn new(
        block_size: usize,
        num_word_blocks: usize,
        num_file_blocks: usize,
        num_words: usize,
        num_files: usize,
    ) -> Self {
        Self {
            magic: INDEX_MAGIC,
            version: INDEX_VERSION,
            block_size: block_size as u32,
            num_word_blocks: num_word_blocks as u32,
            num_file_blocks: num_file_blocks as u32,
            num_words: num_words as u32,
            num_files: num_files as u32,
        }
    }

    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut buf = [0u8; Self::SIZE];
        let fields = [
            self.magic,
            self.version,
            self.block_size,
            self.num_word_blocks,
            self.num_file_blocks,
            self.num_words,
            self.num_files,
        ];
        for (i, field) in fields.iter().enumerate() {
            buf[i * 4..i * 4 + 4].copy_from_slice(&field.to_le_bytes());
        }
        buf
    }

    /// Parse and validate a header from the start of `data`
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        if data.len() < Self::SIZE {
            return Err(Error::corrupt("file too small for header"));
        }
        let field = |i: usize| {
            u32::from_le_bytes([data[i * 4], data[i * 4 + 1], data[i * 4 + 2], data[i * 4 + 3]])
        };

        let header = Self {
            magic: field(0),
            version: field(1),
            block_size: field(2),
            num_word_blocks: field(3),
            num_file_blocks: field(4),
            num_words: field(5),
            num_files: field(6),
        };

        if header.magic != INDEX_MAGIC {
            return Err(Error::corrupt("bad magic number"));
        }
        if header.version != INDEX_VERSION {
            return Err(Error::corrupt(format!(
                "unsupported format version {}",
                header.version
            )));
        }
        let block_size = header.block_size as usize;
        if !(MIN_BLOCK_SIZE..=MAX_BLOCK_SIZE).contains(&block_size) {
            return Err(Error::corrupt(format!("invalid block size {}", block_size)));
        }
        Ok(header)
    }

    pub fn num_blocks(&self) -> u64 {
        self.num_word_blocks as u64 + self.num_file_blocks as u64
    }

    /// Exact length of a file carrying this header
    pub fn expected_file_len(&self) -> u64 {
        Self::SIZE as u64 + self.num_blocks() * self.block_size as u64
    }
}

/// Configuration for building indexes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexConfig {
    /// Size of each block in bytes (affects packing density only)
    #[serde(default = "default_block_size")]
    pub block_size: usize,
}

fn default_block_size() -> usize {
    DEFAULT_BLOCK_SIZE
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            block_size: default_block_size(),
        }
    }
}

impl IndexConfig {
    pub fn with_block_size(block_size: usize) -> Self {
        Self { block_size }
    }

    pub fn validate(&self) -> Result<()> {
        if !(MIN_BLOCK_SIZE..=MAX_BLOCK_SIZE).contains(&self.block_size) {
            return Err(Error::InvalidConfig(format!(
                "block size {} outside {}..={}",
                self.block_size, MIN_BLOCK_SIZE, MAX_BLOCK_SIZE
            )));
        }
        Ok(())
    }
}
