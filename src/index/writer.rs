use crate::error::{Error, Result};
use crate::index::block::{FileBlock, FileCodec, WordBlock, WordCodec, pack};
use crate::index::stats::IndexStats;
use crate::index::storage::{BlockStore, MemoryBlocks, StorageKind};
use crate::index::types::*;
use crate::utils::write_u32_le;
use roaring::RoaringBitmap;
use rustc_hash::FxHashMap;
use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// Inverted index from words to the files that contain them.
///
/// An index starts out *building*: documents and words can be added and
/// other indexes merged in. [`finalize`](Index::finalize) packs it into
/// resident blocks and makes it read-only; [`Index::open`] and
/// [`Index::read`] load a saved generation, which is read-only as well.
/// Queries go through [`IndexInput`](crate::index::IndexInput) in either
/// state.
pub struct Index {
    config: IndexConfig,
    state: State,
}

enum State {
    Building(Postings),
    Frozen(Box<dyn BlockStore>),
}

/// Build-time contents
#[derive(Default)]
struct Postings {
    /// File number n lives at n - 1
    files: Vec<IndexedFile>,
    words: FxHashMap<Vec<u8>, RoaringBitmap>,
}

impl Postings {
    fn insert(&mut self, word: &[u8], file_number: FileNumber) {
        if word.is_empty() {
            return;
        }
        match self.words.get_mut(word) {
            Some(files) => {
                files.insert(file_number);
            }
            None => {
                let mut files = RoaringBitmap::new();
                files.insert(file_number);
                self.words.insert(word.to_vec(), files);
            }
        }
    }
}

impl Default for Index {
    fn default() -> Self {
        Self {
            config: IndexConfig::default(),
            state: State::Building(Postings::default()),
        }
    }
}

impl std::fmt::Debug for Index {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Index")
            .field("block_size", &self.config.block_size)
            .field("frozen", &self.is_frozen())
            .field("num_files", &self.num_files())
            .field("num_words", &self.num_words())
            .finish()
    }
}

impl Index {
    /// Create an empty index for building
    pub fn new(config: IndexConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            state: State::Building(Postings::default()),
        })
    }

    /// Create an empty index with a specific block size
    pub fn with_block_size(block_size: usize) -> Result<Self> {
        Self::new(IndexConfig::with_block_size(block_size))
    }

    /// Wrap an already frozen block set
    pub(crate) fn from_store(store: Box<dyn BlockStore>) -> Self {
        Self {
            config: IndexConfig::with_block_size(store.block_size()),
            state: State::Frozen(store),
        }
    }

    pub fn config(&self) -> &IndexConfig {
        &self.config
    }

    pub fn block_size(&self) -> usize {
        self.config.block_size
    }

    pub fn is_frozen(&self) -> bool {
        matches!(self.state, State::Frozen(_))
    }

    /// Backend of a frozen index, `None` while building
    pub fn storage_kind(&self) -> Option<StorageKind> {
        match &self.state {
            State::Building(_) => None,
            State::Frozen(store) => Some(store.kind()),
        }
    }

    fn postings_mut(&mut self) -> Result<&mut Postings> {
        match &mut self.state {
            State::Building(postings) => Ok(postings),
            State::Frozen(_) => Err(Error::ReadOnly),
        }
    }

    /// Add a document and the words extracted from it.
    ///
    /// Assigns the next dense file number, starting at 1. Adding the same
    /// path twice creates two distinct files. Empty words are skipped.
    pub fn add_document<I>(&mut self, path: &str, words: I) -> Result<FileNumber>
    where
        I: IntoIterator,
        I::Item: AsRef<[u8]>,
    {
        let postings = self.postings_mut()?;
        let file_number = postings.files.len() as FileNumber + 1;
        postings.files.push(IndexedFile::new(file_number, path));

        for word in words {
            postings.insert(word.as_ref(), file_number);
        }

        Ok(file_number)
    }

    /// Add one more word to a document that is already in the index
    pub fn add_word(&mut self, file_number: FileNumber, word: impl AsRef<[u8]>) -> Result<()> {
        let postings = self.postings_mut()?;
        if file_number == NO_FILE || file_number as usize > postings.files.len() {
            return Err(Error::UnknownFile(file_number));
        }
        postings.insert(word.as_ref(), file_number);
        Ok(())
    }

    /// Number of files, O(1)
    pub fn num_files(&self) -> u32 {
        match &self.state {
            State::Building(postings) => postings.files.len() as u32,
            State::Frozen(store) => store.num_files(),
        }
    }

    /// Number of distinct words, O(1)
    pub fn num_words(&self) -> u32 {
        match &self.state {
            State::Building(postings) => postings.words.len() as u32,
            State::Frozen(store) => store.num_words(),
        }
    }

    /// All word entries in byte-lexicographic order of their words
    pub fn sorted_word_entries(&self) -> Result<Vec<WordEntry>> {
        match &self.state {
            State::Building(postings) => {
                let mut entries: Vec<WordEntry> = postings
                    .words
                    .iter()
                    .filter(|(_, files)| !files.is_empty())
                    .map(|(word, files)| WordEntry {
                        word: word.clone(),
                        file_numbers: files.clone(),
                    })
                    .collect();
                entries.sort_unstable_by(|a, b| a.word.cmp(&b.word));
                Ok(entries)
            }
            State::Frozen(store) => {
                let entries = store.decode_words()?;
                if entries.windows(2).any(|w| w[0].word >= w[1].word) {
                    return Err(Error::corrupt("word entries out of order"));
                }
                Ok(entries)
            }
        }
    }

    /// All files in ascending file-number order
    pub fn sorted_files(&self) -> Result<Vec<IndexedFile>> {
        match &self.state {
            State::Building(postings) => Ok(postings.files.clone()),
            State::Frozen(store) => {
                let files = store.decode_files()?;
                if files.windows(2).any(|w| w[0].file_number >= w[1].file_number) {
                    return Err(Error::corrupt("files out of order"));
                }
                Ok(files)
            }
        }
    }

    /// Pack the sorted views into file blocks and word blocks
    fn pack(&self) -> Result<(Vec<FileBlock>, Vec<WordBlock>)> {
        let files = self.sorted_files()?;
        let words = self.sorted_word_entries()?;
        let file_blocks = pack::<FileCodec, _>(&files, self.config.block_size)?;
        let word_blocks = pack::<WordCodec, _>(&words, self.config.block_size)?;
        Ok((file_blocks, word_blocks))
    }

    /// Pack into resident blocks and make the index read-only
    pub fn finalize(&mut self) -> Result<()> {
        if self.is_frozen() {
            return Ok(());
        }
        let (file_blocks, word_blocks) = self.pack()?;
        let store = MemoryBlocks::from_blocks(self.config.block_size, &file_blocks, &word_blocks);
        self.state = State::Frozen(Box::new(store));
        Ok(())
    }

    /// Fold the documents of `other` into this index.
    ///
    /// The files of `other` are appended in file-number order and
    /// renumbered after this index's files; word sets of identical words
    /// are unioned. Nothing changes unless every word of `other` refers to
    /// one of its files.
    pub fn merge(&mut self, other: &Index) -> Result<()> {
        if self.is_frozen() {
            return Err(Error::ReadOnly);
        }
        let other_files = other.sorted_files()?;
        let other_words = other.sorted_word_entries()?;

        let offset = self.num_files();
        let mut remap: FxHashMap<FileNumber, FileNumber> = FxHashMap::default();
        let mut staged_files = Vec::with_capacity(other_files.len());
        for (i, file) in other_files.into_iter().enumerate() {
            let new_number = offset + i as FileNumber + 1;
            remap.insert(file.file_number, new_number);
            staged_files.push(IndexedFile::new(new_number, file.path));
        }

        let mut staged_words = Vec::with_capacity(other_words.len());
        for entry in other_words {
            let mut files = RoaringBitmap::new();
            for file_number in entry.file_numbers.iter() {
                let mapped = remap.get(&file_number).ok_or_else(|| {
                    Error::corrupt(format!("word refers to unknown file {}", file_number))
                })?;
                files.insert(*mapped);
            }
            staged_words.push((entry.word, files));
        }

        let merged_files = staged_files.len();
        let merged_words = staged_words.len();
        let postings = self.postings_mut()?;
        postings.files.extend(staged_files);
        for (word, files) in staged_words {
            *postings.words.entry(word).or_default() |= files;
        }

        tracing::info!(
            merged_files,
            merged_words,
            num_files = postings.files.len(),
            num_words = postings.words.len(),
            "merged index"
        );
        Ok(())
    }

    /// A building copy of this index, e.g. to extend a loaded generation
    pub fn to_builder(&self) -> Result<Index> {
        let mut postings = Postings {
            files: Vec::with_capacity(self.num_files() as usize),
            words: FxHashMap::default(),
        };
        for (i, file) in self.sorted_files()?.into_iter().enumerate() {
            if file.file_number as usize != i + 1 {
                return Err(Error::corrupt(format!(
                    "file numbers are not dense at {}",
                    file.file_number
                )));
            }
            postings.files.push(file);
        }
        for entry in self.sorted_word_entries()? {
            postings.words.insert(entry.word, entry.file_numbers);
        }
        Ok(Index {
            config: self.config.clone(),
            state: State::Building(postings),
        })
    }

    /// Summary of the index contents and layout
    pub fn stats(&self) -> IndexStats {
        let (file_blocks, word_blocks) = match &self.state {
            State::Building(_) => (None, None),
            State::Frozen(store) => (Some(store.num_file_blocks()), Some(store.num_word_blocks())),
        };
        IndexStats {
            num_files: self.num_files(),
            num_words: self.num_words(),
            block_size: self.config.block_size,
            file_blocks,
            word_blocks,
            storage: self.storage_kind(),
        }
    }

    /// Save the index to `destination`, atomically replacing any previous
    /// generation.
    ///
    /// Blocks are packed before anything touches the disk, so an entry that
    /// fails to encode leaves no file behind.
    pub fn save(&self, destination: &Path) -> Result<()> {
        self.save_interruptible(destination, &AtomicBool::new(false))
    }

    /// Like [`save`](Index::save), giving up with [`Error::Interrupted`]
    /// once `cancel` is raised. The previous generation stays intact.
    pub fn save_interruptible(&self, destination: &Path, cancel: &AtomicBool) -> Result<()> {
        let (file_blocks, word_blocks) = self.pack()?;
        let header = IndexHeader::new(
            self.config.block_size,
            word_blocks.len(),
            file_blocks.len(),
            word_blocks.iter().map(|b| b.entry_count() as usize).sum(),
            file_blocks.iter().map(|b| b.entry_count() as usize).sum(),
        );

        if let Some(parent) = destination.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let tmp_path = temp_path(destination);
        let written = write_generation(&tmp_path, &header, &file_blocks, &word_blocks, cancel)
            .and_then(|()| fs::rename(&tmp_path, destination).map_err(Error::from));
        if let Err(err) = written {
            let _ = fs::remove_file(&tmp_path);
            return Err(err);
        }

        tracing::info!(
            path = %destination.display(),
            num_files = header.num_files,
            num_words = header.num_words,
            blocks = header.num_blocks(),
            "saved index"
        );
        Ok(())
    }
}

static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Sibling path the next generation is written to before the rename.
/// Unique per process and call, so concurrent saves never share one.
fn temp_path(destination: &Path) -> PathBuf {
    let mut name = OsString::from(destination.as_os_str());
    name.push(format!(
        ".{}.{}.tmp",
        std::process::id(),
        TEMP_COUNTER.fetch_add(1, Ordering::Relaxed)
    ));
    PathBuf::from(name)
}

fn write_generation(
    path: &Path,
    header: &IndexHeader,
    file_blocks: &[FileBlock],
    word_blocks: &[WordBlock],
    cancel: &AtomicBool,
) -> Result<()> {
    let mut file = BufWriter::new(File::create(path)?);

    for field in [
        header.magic,
        header.version,
        header.block_size,
        header.num_word_blocks,
        header.num_file_blocks,
        header.num_words,
        header.num_files,
    ] {
        write_u32_le(&mut file, field)?;
    }

    for block in file_blocks {
        if cancel.load(Ordering::Relaxed) {
            return Err(Error::Interrupted);
        }
        block.write_to(&mut file)?;
    }
    for block in word_blocks {
        if cancel.load(Ordering::Relaxed) {
            return Err(Error::Interrupted);
        }
        block.write_to(&mut file)?;
    }

    file.flush()?;
    let file = file.into_inner().map_err(|e| e.into_error())?;
    file.sync_all()?;
    Ok(())
}
