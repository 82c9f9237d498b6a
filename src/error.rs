use thiserror::Error;

/// Which kind of record failed to encode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Word,
    File,
}

impl std::fmt::Display for EntryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EntryKind::Word => f.write_str("word"),
            EntryKind::File => f.write_str("file"),
        }
    }
}

/// Main error type for index operations
#[derive(Error, Debug)]
pub enum Error {
    /// A single entry is larger than an empty block can hold
    #[error("{kind} entry of {len} bytes does not fit a block with {capacity} bytes of payload")]
    Encoding {
        kind: EntryKind,
        len: usize,
        capacity: usize,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Corrupt index: {0}")]
    Corrupt(String),

    #[error("Index is frozen and cannot be modified")]
    ReadOnly,

    #[error("Unknown file number: {0}")]
    UnknownFile(u32),

    #[error("Index input is not open")]
    NotOpen,

    #[error("Save interrupted")]
    Interrupted,

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result type alias for index operations
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub(crate) fn corrupt(msg: impl Into<String>) -> Self {
        Error::Corrupt(msg.into())
    }

    /// Check if this error indicates a transient failure that could be retried
    pub fn is_retriable(&self) -> bool {
        matches!(self, Error::Io(_))
    }

    /// Check if the index that produced this error must be discarded and rebuilt
    pub fn is_fatal_for_index(&self) -> bool {
        matches!(self, Error::Corrupt(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::Encoding {
            kind: EntryKind::Word,
            len: 300,
            capacity: 56,
        };
        assert_eq!(
            err.to_string(),
            "word entry of 300 bytes does not fit a block with 56 bytes of payload"
        );
        assert_eq!(Error::UnknownFile(7).to_string(), "Unknown file number: 7");
    }

    #[test]
    fn test_retriable_errors() {
        let io = Error::from(std::io::Error::new(std::io::ErrorKind::Other, "disk"));
        assert!(io.is_retriable());
        assert!(!io.is_fatal_for_index());

        let corrupt = Error::corrupt("bad magic");
        assert!(!corrupt.is_retriable());
        assert!(corrupt.is_fatal_for_index());
    }
}
