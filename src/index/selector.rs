//! Index selection for a search scope
//!
//! A selector hands out the indexes relevant to one scope. Selectors are
//! built from explicit inputs (a list of indexes, a directory); nothing is
//! looked up from global state.

use crate::error::{Error, Result};
use crate::index::types::IndexedFile;
use crate::index::writer::Index;
use crate::utils::AppConfig;
use globset::{Glob, GlobSet, GlobSetBuilder};
use lru::LruCache;
use std::fs;
use std::num::NonZeroUsize;
use std::path::{Component, Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::SystemTime;

/// Default file pattern for saved indexes
pub const DEFAULT_INDEX_PATTERN: &str = "*.mxi";

/// Default number of opened indexes a [`DirectorySelector`] keeps
pub const DEFAULT_CACHE_CAPACITY: usize = 64;

/// Source of the indexes relevant to a search scope
pub trait IndexSelector: Send + Sync {
    /// Indexes to query. May be expensive; call once per query batch.
    fn indexes(&self) -> Result<Vec<Arc<Index>>>;

    /// Like [`indexes`](IndexSelector::indexes), keeping one slot per index
    /// with the error for each one that could not be loaded
    fn load_indexes(&self) -> Result<Vec<Result<Arc<Index>>>> {
        Ok(self.indexes()?.into_iter().map(Ok).collect())
    }

    /// Best-effort content of an indexed document, empty when unavailable
    fn file_content(&self, _file: &IndexedFile) -> Vec<u8> {
        Vec::new()
    }

    /// Best-effort size of an indexed document, zero when unavailable
    fn file_size(&self, _file: &IndexedFile) -> u64 {
        0
    }

    /// False once the underlying scope changed since the indexes were built
    fn is_valid(&self) -> bool;

    /// Mark the selector stale. Rebuilding is up to the caller.
    fn invalidate(&self);
}

/// Resolves document paths against a directory for content access
#[derive(Debug, Clone)]
struct ContentRoot(Option<PathBuf>);

impl ContentRoot {
    /// Path below the root, `None` for paths that could leave it
    fn resolve(&self, file: &IndexedFile) -> Option<PathBuf> {
        let root = self.0.as_ref()?;
        let relative = Path::new(file.path.trim_start_matches('/'));
        if relative.as_os_str().is_empty() {
            return None;
        }
        let contained = relative
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
        if !contained {
            tracing::debug!(path = %file.path, "document path leaves the content root");
            return None;
        }
        Some(root.join(relative))
    }

    fn content(&self, file: &IndexedFile) -> Vec<u8> {
        self.resolve(file)
            .and_then(|path| fs::read(path).ok())
            .unwrap_or_default()
    }

    fn size(&self, file: &IndexedFile) -> u64 {
        self.resolve(file)
            .and_then(|path| fs::metadata(path).ok())
            .map(|m| m.len())
            .unwrap_or(0)
    }
}

/// Selector over an explicit list of indexes
#[derive(Debug)]
pub struct StaticSelector {
    indexes: Vec<Arc<Index>>,
    content_root: ContentRoot,
    valid: AtomicBool,
}

impl StaticSelector {
    pub fn new(indexes: Vec<Arc<Index>>) -> Self {
        Self {
            indexes,
            content_root: ContentRoot(None),
            valid: AtomicBool::new(true),
        }
    }

    /// Serve document content from files below `root`
    pub fn with_content_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.content_root = ContentRoot(Some(root.into()));
        self
    }
}

impl IndexSelector for StaticSelector {
    fn indexes(&self) -> Result<Vec<Arc<Index>>> {
        Ok(self.indexes.clone())
    }

    fn file_content(&self, file: &IndexedFile) -> Vec<u8> {
        self.content_root.content(file)
    }

    fn file_size(&self, file: &IndexedFile) -> u64 {
        self.content_root.size(file)
    }

    fn is_valid(&self) -> bool {
        self.valid.load(Ordering::Acquire)
    }

    fn invalidate(&self) {
        self.valid.store(false, Ordering::Release);
    }
}

/// An opened index and the file state it was opened from
struct CachedIndex {
    modified: Option<SystemTime>,
    len: u64,
    index: Arc<Index>,
}

/// Selector over the saved index files in a directory.
///
/// Index files are found by glob pattern on every call to
/// [`indexes`](IndexSelector::indexes) and opened memory-mapped. Opened
/// indexes are cached until their file changes. Files that cannot be
/// opened are logged and skipped.
pub struct DirectorySelector {
    dir: PathBuf,
    patterns: GlobSet,
    cache: Mutex<LruCache<PathBuf, CachedIndex>>,
    content_root: ContentRoot,
    valid: AtomicBool,
}

impl DirectorySelector {
    /// Select `*.mxi` files in `dir`
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        Self::with_patterns(dir, &[DEFAULT_INDEX_PATTERN])
    }

    /// Select files in `dir` whose name matches any of `patterns`
    pub fn with_patterns(dir: impl Into<PathBuf>, patterns: &[&str]) -> Result<Self> {
        let mut builder = GlobSetBuilder::new();
        for pattern in patterns {
            let glob = Glob::new(pattern).map_err(|e| {
                Error::InvalidConfig(format!("bad pattern {:?}: {}", pattern, e))
            })?;
            builder.add(glob);
        }
        let patterns = builder
            .build()
            .map_err(|e| Error::InvalidConfig(e.to_string()))?;

        Ok(Self {
            dir: dir.into(),
            patterns,
            cache: Mutex::new(LruCache::new(
                NonZeroUsize::new(DEFAULT_CACHE_CAPACITY).unwrap_or(NonZeroUsize::MIN),
            )),
            content_root: ContentRoot(None),
            valid: AtomicBool::new(true),
        })
    }

    /// Select files in `dir` with the patterns and cache size of `config`
    pub fn from_config(dir: impl Into<PathBuf>, config: &AppConfig) -> Result<Self> {
        if config.index_patterns.is_empty() {
            return Err(Error::InvalidConfig("no index patterns configured".into()));
        }
        if config.selector_cache_capacity == 0 {
            return Err(Error::InvalidConfig("selector cache capacity is zero".into()));
        }
        let patterns: Vec<&str> = config.index_patterns.iter().map(String::as_str).collect();
        Ok(Self::with_patterns(dir, &patterns)?.with_cache_capacity(config.selector_cache_capacity))
    }

    /// Limit how many opened indexes are kept
    pub fn with_cache_capacity(self, capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            cache: Mutex::new(LruCache::new(capacity)),
            ..self
        }
    }

    /// Serve document content from files below `root`
    pub fn with_content_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.content_root = ContentRoot(Some(root.into()));
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Index files in the directory, sorted by path
    pub fn index_paths(&self) -> Result<Vec<PathBuf>> {
        let mut paths = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            if self.patterns.is_match(entry.file_name()) {
                paths.push(entry.path());
            }
        }
        paths.sort();
        Ok(paths)
    }

    fn load(&self, path: &Path) -> Result<Arc<Index>> {
        let metadata = fs::metadata(path)?;
        let modified = metadata.modified().ok();
        let len = metadata.len();

        let mut cache = self.cache.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(cached) = cache.get(path) {
            if cached.modified == modified && cached.len == len {
                return Ok(Arc::clone(&cached.index));
            }
        }

        let index = Arc::new(Index::open_or_read(path)?);
        cache.put(
            path.to_path_buf(),
            CachedIndex {
                modified,
                len,
                index: Arc::clone(&index),
            },
        );
        Ok(index)
    }
}

impl std::fmt::Debug for DirectorySelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DirectorySelector")
            .field("dir", &self.dir)
            .field("valid", &self.is_valid())
            .finish()
    }
}

impl IndexSelector for DirectorySelector {
    fn load_indexes(&self) -> Result<Vec<Result<Arc<Index>>>> {
        Ok(self
            .index_paths()?
            .iter()
            .map(|path| self.load(path))
            .collect())
    }

    fn indexes(&self) -> Result<Vec<Arc<Index>>> {
        let mut indexes = Vec::new();
        for path in self.index_paths()? {
            match self.load(&path) {
                Ok(index) => indexes.push(index),
                Err(err) => {
                    tracing::warn!(path = %path.display(), error = %err, "skipping unusable index file");
                }
            }
        }
        Ok(indexes)
    }

    fn file_content(&self, file: &IndexedFile) -> Vec<u8> {
        self.content_root.content(file)
    }

    fn file_size(&self, file: &IndexedFile) -> u64 {
        self.content_root.size(file)
    }

    fn is_valid(&self) -> bool {
        self.valid.load(Ordering::Acquire)
    }

    fn invalidate(&self) {
        self.valid.store(false, Ordering::Release);
    }
}
