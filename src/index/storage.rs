//! Block storage backends for frozen indexes
//!
//! A frozen [`Index`](crate::index::Index) reads its blocks through the
//! [`BlockStore`] trait. [`MemoryBlocks`] keeps every block resident;
//! [`MmapBlocks`] maps a saved index file and hands out block regions
//! straight from the mapping.

use crate::error::{Error, Result};
use crate::index::block::{BlockCodec, FileBlock, FileCodec, WordBlock, WordCodec, decode_region};
use crate::index::types::{IndexHeader, IndexedFile, WordEntry};
use memmap2::Mmap;
use std::fs::File;
use std::path::{Path, PathBuf};

/// Which backend holds the blocks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageKind {
    Memory,
    Mapped,
}

/// Read access to the blocks of a frozen index
pub trait BlockStore: Send + Sync {
    fn kind(&self) -> StorageKind;

    fn block_size(&self) -> usize;

    fn num_files(&self) -> u32;

    fn num_words(&self) -> u32;

    fn num_file_blocks(&self) -> usize;

    fn num_word_blocks(&self) -> usize;

    /// Region of file block `i`
    fn file_block(&self, i: usize) -> &[u8];

    /// Region of word block `i`
    fn word_block(&self, i: usize) -> &[u8];

    /// Decode all file blocks in storage order
    fn decode_files(&self) -> Result<Vec<IndexedFile>> {
        let mut files = Vec::with_capacity(self.num_files() as usize);
        for i in 0..self.num_file_blocks() {
            decode_region::<FileCodec>(self.file_block(i), &mut files)?;
        }
        check_count::<FileCodec>(files.len(), self.num_files())?;
        Ok(files)
    }

    /// Decode all word blocks in storage order
    fn decode_words(&self) -> Result<Vec<WordEntry>> {
        let mut words = Vec::with_capacity(self.num_words() as usize);
        for i in 0..self.num_word_blocks() {
            decode_region::<WordCodec>(self.word_block(i), &mut words)?;
        }
        check_count::<WordCodec>(words.len(), self.num_words())?;
        Ok(words)
    }
}

fn check_count<C: BlockCodec>(decoded: usize, expected: u32) -> Result<()> {
    if decoded != expected as usize {
        return Err(Error::corrupt(format!(
            "header announces {} {} entries, blocks hold {}",
            expected,
            C::KIND,
            decoded
        )));
    }
    Ok(())
}

/// Fully resident blocks
#[derive(Debug, Clone)]
pub struct MemoryBlocks {
    block_size: usize,
    num_files: u32,
    num_words: u32,
    file_blocks: Vec<Vec<u8>>,
    word_blocks: Vec<Vec<u8>>,
}

impl MemoryBlocks {
    /// Freeze freshly packed blocks
    pub fn from_blocks(
        block_size: usize,
        file_blocks: &[FileBlock],
        word_blocks: &[WordBlock],
    ) -> Self {
        Self {
            block_size,
            num_files: file_blocks.iter().map(|b| b.entry_count()).sum(),
            num_words: word_blocks.iter().map(|b| b.entry_count()).sum(),
            file_blocks: file_blocks.iter().map(|b| b.to_bytes()).collect(),
            word_blocks: word_blocks.iter().map(|b| b.to_bytes()).collect(),
        }
    }

    /// Load the contents of a saved index file
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let layout = Layout::parse(data)?;
        let header = layout.header;
        Ok(Self {
            block_size: header.block_size as usize,
            num_files: header.num_files,
            num_words: header.num_words,
            file_blocks: (0..layout.num_file_blocks())
                .map(|i| layout.file_block(data, i).to_vec())
                .collect(),
            word_blocks: (0..layout.num_word_blocks())
                .map(|i| layout.word_block(data, i).to_vec())
                .collect(),
        })
    }
}

impl BlockStore for MemoryBlocks {
    fn kind(&self) -> StorageKind {
        StorageKind::Memory
    }

    fn block_size(&self) -> usize {
        self.block_size
    }

    fn num_files(&self) -> u32 {
        self.num_files
    }

    fn num_words(&self) -> u32 {
        self.num_words
    }

    fn num_file_blocks(&self) -> usize {
        self.file_blocks.len()
    }

    fn num_word_blocks(&self) -> usize {
        self.word_blocks.len()
    }

    fn file_block(&self, i: usize) -> &[u8] {
        &self.file_blocks[i]
    }

    fn word_block(&self, i: usize) -> &[u8] {
        &self.word_blocks[i]
    }
}

/// Blocks read from a memory-mapped index file
pub struct MmapBlocks {
    path: PathBuf,
    mmap: Mmap,
    layout: Layout,
}

impl MmapBlocks {
    /// Map a saved index file and validate its header
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        // SAFETY: saves replace the file by rename and never write in place
        let mmap = unsafe { Mmap::map(&file)? };
        let layout = Layout::parse(&mmap)?;
        Ok(Self {
            path: path.to_path_buf(),
            mmap,
            layout,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn header(&self) -> &IndexHeader {
        &self.layout.header
    }
}

impl std::fmt::Debug for MmapBlocks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MmapBlocks")
            .field("path", &self.path)
            .field("header", &self.layout.header)
            .finish()
    }
}

impl BlockStore for MmapBlocks {
    fn kind(&self) -> StorageKind {
        StorageKind::Mapped
    }

    fn block_size(&self) -> usize {
        self.layout.header.block_size as usize
    }

    fn num_files(&self) -> u32 {
        self.layout.header.num_files
    }

    fn num_words(&self) -> u32 {
        self.layout.header.num_words
    }

    fn num_file_blocks(&self) -> usize {
        self.layout.num_file_blocks()
    }

    fn num_word_blocks(&self) -> usize {
        self.layout.num_word_blocks()
    }

    fn file_block(&self, i: usize) -> &[u8] {
        self.layout.file_block(&self.mmap, i)
    }

    fn word_block(&self, i: usize) -> &[u8] {
        self.layout.word_block(&self.mmap, i)
    }
}

/// Validated block offsets of a saved index file
#[derive(Debug, Clone, Copy)]
struct Layout {
    header: IndexHeader,
}

impl Layout {
    fn parse(data: &[u8]) -> Result<Self> {
        let header = IndexHeader::from_bytes(data)?;
        if data.len() as u64 != header.expected_file_len() {
            return Err(Error::corrupt(format!(
                "file is {} bytes, header expects {}",
                data.len(),
                header.expected_file_len()
            )));
        }
        // Every entry takes at least two bytes, so larger counts cannot be real
        let capacity = header.num_blocks() * header.block_size as u64;
        if header.num_files as u64 > capacity || header.num_words as u64 > capacity {
            return Err(Error::corrupt("entry counts exceed block capacity"));
        }
        Ok(Self { header })
    }

    fn num_file_blocks(&self) -> usize {
        self.header.num_file_blocks as usize
    }

    fn num_word_blocks(&self) -> usize {
        self.header.num_word_blocks as usize
    }

    fn region<'a>(&self, data: &'a [u8], block: usize) -> &'a [u8] {
        let block_size = self.header.block_size as usize;
        let start = IndexHeader::SIZE + block * block_size;
        &data[start..start + block_size]
    }

    fn file_block<'a>(&self, data: &'a [u8], i: usize) -> &'a [u8] {
        self.region(data, i)
    }

    fn word_block<'a>(&self, data: &'a [u8], i: usize) -> &'a [u8] {
        self.region(data, self.num_file_blocks() + i)
    }
}
