//! Fixed-capacity serialization blocks
//!
//! A block packs a homogeneous run of records into a region of exactly
//! `block_size` bytes:
//!
//! ```text
//! [entry_count: u32 LE][payload_len: u32 LE][payload ...][zero padding]
//! ```
//!
//! Entries never span two blocks. The record format is supplied by a
//! [`BlockCodec`]; [`WordBlock`] and [`FileBlock`] are the two codecs the
//! index uses.

use crate::error::{EntryKind, Error, Result};
use crate::index::types::{FileNumber, IndexedFile, NO_FILE, WordEntry};
use crate::utils::{ByteReader, delta_encode, delta_encoded_len, encode_varint, varint_len};
use std::borrow::Borrow;
use std::io::Write;
use std::marker::PhantomData;

/// Bytes taken by the block header
pub const BLOCK_HEADER_SIZE: usize = 8;

/// Record format stored in a [`Block`]
pub trait BlockCodec {
    type Entry;

    const KIND: EntryKind;

    /// Exact number of bytes `encode` appends for `entry`
    fn encoded_len(entry: &Self::Entry) -> usize;

    fn encode(entry: &Self::Entry, buf: &mut Vec<u8>);

    /// Decode one record; any malformed field is reported as corruption
    fn decode(reader: &mut ByteReader<'_>) -> Result<Self::Entry>;
}

/// `varint(word_len) word varint(count) varint(delta)*`
#[derive(Debug, Clone, Copy)]
pub struct WordCodec;

impl BlockCodec for WordCodec {
    type Entry = WordEntry;

    const KIND: EntryKind = EntryKind::Word;

    fn encoded_len(entry: &WordEntry) -> usize {
        varint_len(entry.word.len() as u32)
            + entry.word.len()
            + varint_len(entry.file_numbers.len() as u32)
            + delta_encoded_len(entry.file_numbers.iter())
    }

    fn encode(entry: &WordEntry, buf: &mut Vec<u8>) {
        encode_varint(entry.word.len() as u32, buf);
        buf.extend_from_slice(&entry.word);
        encode_varint(entry.file_numbers.len() as u32, buf);
        delta_encode(entry.file_numbers.iter(), buf);
    }

    fn decode(reader: &mut ByteReader<'_>) -> Result<WordEntry> {
        let word_len = reader
            .read_varint()
            .ok_or_else(|| Error::corrupt("truncated word length"))?;
        let word = reader
            .read_bytes(word_len as usize)
            .ok_or_else(|| Error::corrupt("word length exceeds block"))?;
        let count = reader
            .read_varint()
            .ok_or_else(|| Error::corrupt("truncated file count"))?;
        if count == 0 {
            return Err(Error::corrupt("word entry without files"));
        }
        // Each file number takes at least one byte
        if count as usize > reader.remaining() {
            return Err(Error::corrupt("file count exceeds block"));
        }

        let mut entry = WordEntry::new(word);
        let mut prev: FileNumber = NO_FILE;
        for _ in 0..count {
            let delta = reader
                .read_varint()
                .ok_or_else(|| Error::corrupt("truncated file number"))?;
            if delta == 0 {
                return Err(Error::corrupt("file numbers not strictly increasing"));
            }
            prev = prev
                .checked_add(delta)
                .ok_or_else(|| Error::corrupt("file number overflow"))?;
            entry.file_numbers.insert(prev);
        }
        Ok(entry)
    }
}

/// `varint(file_number) varint(path_len) path`
#[derive(Debug, Clone, Copy)]
pub struct FileCodec;

impl BlockCodec for FileCodec {
    type Entry = IndexedFile;

    const KIND: EntryKind = EntryKind::File;

    fn encoded_len(entry: &IndexedFile) -> usize {
        varint_len(entry.file_number) + varint_len(entry.path.len() as u32) + entry.path.len()
    }

    fn encode(entry: &IndexedFile, buf: &mut Vec<u8>) {
        encode_varint(entry.file_number, buf);
        encode_varint(entry.path.len() as u32, buf);
        buf.extend_from_slice(entry.path.as_bytes());
    }

    fn decode(reader: &mut ByteReader<'_>) -> Result<IndexedFile> {
        let file_number = reader
            .read_varint()
            .ok_or_else(|| Error::corrupt("truncated file number"))?;
        if file_number == NO_FILE {
            return Err(Error::corrupt("file number 0 in file block"));
        }
        let path_len = reader
            .read_varint()
            .ok_or_else(|| Error::corrupt("truncated path length"))?;
        let path = reader
            .read_bytes(path_len as usize)
            .ok_or_else(|| Error::corrupt("path length exceeds block"))?;
        let path = std::str::from_utf8(path)
            .map_err(|_| Error::corrupt("path is not valid UTF-8"))?;
        Ok(IndexedFile::new(file_number, path))
    }
}

/// Block of word entries
pub type WordBlock = Block<WordCodec>;

/// Block of indexed files
pub type FileBlock = Block<FileCodec>;

/// A fixed-capacity buffer of packed entries
#[derive(Debug, Clone)]
pub struct Block<C: BlockCodec> {
    /// Total region size including the header
    capacity: usize,
    /// Payload bytes written so far
    buffer: Vec<u8>,
    entry_count: u32,
    read_pos: usize,
    read_count: u32,
    _codec: PhantomData<C>,
}

impl<C: BlockCodec> Block<C> {
    /// Create an empty, writable block of `capacity` bytes
    pub fn new(capacity: usize) -> Self {
        debug_assert!(capacity >= BLOCK_HEADER_SIZE);
        Self {
            capacity,
            buffer: Vec::new(),
            entry_count: 0,
            read_pos: 0,
            read_count: 0,
            _codec: PhantomData,
        }
    }

    /// Parse a block region read back from storage
    pub fn from_bytes(region: &[u8]) -> Result<Self> {
        let payload = payload_of(region)?;
        let mut block = Self::new(region.len());
        block.buffer.extend_from_slice(payload.bytes);
        block.entry_count = payload.entry_count;
        Ok(block)
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Bytes available for entries in an empty block
    pub fn payload_capacity(&self) -> usize {
        self.capacity - BLOCK_HEADER_SIZE
    }

    /// Bytes used, header included
    pub fn used(&self) -> usize {
        BLOCK_HEADER_SIZE + self.buffer.len()
    }

    pub fn entry_count(&self) -> u32 {
        self.entry_count
    }

    pub fn is_empty(&self) -> bool {
        self.entry_count == 0
    }

    /// Append `entry` if it fits.
    ///
    /// Returns `Ok(false)` without touching the block when the entry needs
    /// more room than is left; the caller starts a new block. An entry too
    /// large for an empty block is an [`Error::Encoding`].
    pub fn add_entry(&mut self, entry: &C::Entry) -> Result<bool> {
        let len = C::encoded_len(entry);
        if len > self.payload_capacity() {
            return Err(Error::Encoding {
                kind: C::KIND,
                len,
                capacity: self.payload_capacity(),
            });
        }
        if self.buffer.len() + len > self.payload_capacity() {
            return Ok(false);
        }

        C::encode(entry, &mut self.buffer);
        self.entry_count += 1;
        Ok(true)
    }

    /// Decode the entry under the read cursor and advance it
    pub fn next_entry(&mut self) -> Result<Option<C::Entry>> {
        if self.read_count == self.entry_count {
            if self.read_pos != self.buffer.len() {
                return Err(Error::corrupt("trailing bytes after last entry"));
            }
            return Ok(None);
        }

        let mut reader = ByteReader::new(&self.buffer[self.read_pos..]);
        let entry = C::decode(&mut reader)?;
        self.read_pos += reader.position();
        self.read_count += 1;
        Ok(Some(entry))
    }

    /// Move the read cursor back to the first entry
    pub fn rewind(&mut self) {
        self.read_pos = 0;
        self.read_count = 0;
    }

    /// Reset to an empty, writable block
    pub fn clear(&mut self) {
        self.buffer.clear();
        self.entry_count = 0;
        self.rewind();
    }

    /// Write the full `capacity`-byte region
    pub fn write_to<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        writer.write_all(&self.entry_count.to_le_bytes())?;
        writer.write_all(&(self.buffer.len() as u32).to_le_bytes())?;
        writer.write_all(&self.buffer)?;
        let padding = self.capacity - self.used();
        if padding > 0 {
            writer.write_all(&vec![0u8; padding])?;
        }
        Ok(())
    }

    /// Region bytes up to the end of the payload (padding omitted)
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.used());
        bytes.extend_from_slice(&self.entry_count.to_le_bytes());
        bytes.extend_from_slice(&(self.buffer.len() as u32).to_le_bytes());
        bytes.extend_from_slice(&self.buffer);
        bytes
    }
}

struct Payload<'a> {
    entry_count: u32,
    bytes: &'a [u8],
}

fn payload_of(region: &[u8]) -> Result<Payload<'_>> {
    let mut reader = ByteReader::new(region);
    let (entry_count, payload_len) = match (reader.read_u32_le(), reader.read_u32_le()) {
        (Some(count), Some(len)) => (count, len as usize),
        _ => return Err(Error::corrupt("block shorter than its header")),
    };
    let bytes = reader
        .read_bytes(payload_len)
        .ok_or_else(|| Error::corrupt("block payload length exceeds block size"))?;
    if entry_count as usize > payload_len {
        return Err(Error::corrupt("block entry count exceeds payload"));
    }
    Ok(Payload { entry_count, bytes })
}

/// Decode every entry of a block region without copying it first
pub fn decode_region<C: BlockCodec>(region: &[u8], out: &mut Vec<C::Entry>) -> Result<()> {
    let payload = payload_of(region)?;
    let mut reader = ByteReader::new(payload.bytes);
    for _ in 0..payload.entry_count {
        out.push(C::decode(&mut reader)?);
    }
    if !reader.is_at_end() {
        return Err(Error::corrupt("trailing bytes after last entry"));
    }
    Ok(())
}

/// Greedily pack `entries` into as few blocks as their order allows
pub fn pack<C, I>(entries: I, block_size: usize) -> Result<Vec<Block<C>>>
where
    C: BlockCodec,
    I: IntoIterator,
    I::Item: Borrow<C::Entry>,
{
    let mut blocks = Vec::new();
    let mut current = Block::<C>::new(block_size);

    for entry in entries {
        let entry = entry.borrow();
        if current.add_entry(entry)? {
            continue;
        }
        blocks.push(std::mem::replace(&mut current, Block::new(block_size)));
        // A fresh block holds anything add_entry did not reject outright
        current.add_entry(entry)?;
    }

    if !current.is_empty() {
        blocks.push(current);
    }

    tracing::debug!(kind = %C::KIND, blocks = blocks.len(), block_size, "packed blocks");
    Ok(blocks)
}
