//! Utility functions shared across the crate.
//!
//! ## Modules
//!
//! - [`app_data`] - User configuration (JSON in the platform config directory)
//! - [`encoding`] - Varint, delta and little-endian encoding
//!
//! ```
//! use mxi::utils::{decode_varint, encode_varint};
//!
//! let mut buf = Vec::new();
//! encode_varint(300, &mut buf);
//! assert_eq!(decode_varint(&buf), Some((300, 2)));
//! ```

pub mod app_data;
pub mod encoding;

pub use app_data::*;
pub use encoding::*;
