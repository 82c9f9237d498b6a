//! Inverted index: building, persistence and lookup
//!
//! - [`writer`] - the [`Index`] type, document ingestion, merge and save
//! - [`reader`] - loading saved generations
//! - [`input`] - read cursor and prefix queries
//! - [`selector`] - index sets for a search scope
//! - [`block`] / [`storage`] - on-disk block format and its backends

pub mod block;
pub mod input;
pub mod reader;
pub mod selector;
pub mod stats;
pub mod storage;
pub mod types;
pub mod writer;

pub use input::{IndexInput, InputState};
pub use selector::{DirectorySelector, IndexSelector, StaticSelector};
pub use stats::IndexStats;
pub use storage::StorageKind;
pub use types::*;
pub use writer::Index;
