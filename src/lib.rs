//! # MXI - Model Metadata Index
//!
//! MXI maps the words found in model files (class names, attribute names,
//! identifiers) to the files that contain them, so that tools can answer
//! "which files mention a name starting with `Col`?" without opening every
//! model.
//!
//! ## Architecture
//!
//! - [`index`] - Index building, block storage, persistence and lookup
//! - [`query`] - Queries fanned out across every index of a selector
//! - [`utils`] - Encoding helpers and user configuration
//!
//! ## Quick Start
//!
//! ```no_run
//! use mxi::index::{Index, IndexInput, MatchCase};
//! use std::path::Path;
//!
//! # fn main() -> mxi::Result<()> {
//! let mut index = Index::default();
//! index.add_document("/models/Foo.xmi", ["Foo", "Column1"])?;
//! index.add_document("/models/Bar.xmi", ["Bar", "Column2"])?;
//! index.save(Path::new("models.mxi"))?;
//!
//! let index = Index::open(Path::new("models.mxi"))?;
//! let mut input = IndexInput::new(&index);
//! input.open()?;
//! for hit in input.query_files_referring_to_prefix(b"Col", MatchCase::Sensitive)? {
//!     println!("{} ({} words)", hit.file.path, hit.match_count);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Storage
//!
//! A saved index is a 28-byte header followed by fixed-size blocks: file
//! blocks first, then word blocks. Words are stored in byte order, so a
//! case-sensitive prefix lookup is a binary search followed by a short scan.
//! Saved indexes are memory-mapped; saving writes a temporary file and
//! renames it over the previous generation.

pub mod error;
pub mod index;
pub mod query;
pub mod utils;

pub use error::{Error, Result};
