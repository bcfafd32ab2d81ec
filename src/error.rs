//! Error types for biodex

use thiserror::Error;

/// Result type alias for biodex operations
pub type Result<T> = std::result::Result<T, BiodexError>;

/// Error types that can occur in biodex
#[derive(Debug, Error)]
pub enum BiodexError {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// SQLite error from the persistent store
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Unrecognized format name or container that does not match what was declared
    #[error("Format error: {0}")]
    Format(String),

    /// Known format whose record boundaries cannot be found with bounded lookahead
    #[error("Format '{0}' cannot be indexed for random access")]
    UnsupportedFormat(String),

    /// Structurally malformed record boundary found while scanning
    #[error("Malformed {format} record at offset {offset}: {msg}")]
    MalformedRecord {
        /// Canonical format name
        format: &'static str,
        /// Offset of the offending line (virtual offset for BGZF sources)
        offset: u64,
        /// Error message
        msg: String,
    },

    /// Record whose key came out empty
    #[error("Empty record key at offset {offset}")]
    EmptyKey {
        /// Offset of the record start
        offset: u64,
    },

    /// Same key seen twice while building an index
    #[error("Duplicate key \"{0}\"")]
    DuplicateKey(String),

    /// Lookup miss
    #[error("Key not found: {0}")]
    KeyNotFound(String),

    /// BGZF block failed its header, length or checksum checks
    #[error("Corrupt BGZF block at offset {offset}: {msg}")]
    CorruptContainer {
        /// Compressed file offset of the block
        offset: u64,
        /// Error message
        msg: String,
    },

    /// Ran out of data before a record's recorded length was read
    #[error("Unexpected end of data at offset {offset}: wanted {wanted} bytes, got {got}")]
    EndOfData {
        /// Offset the read started from
        offset: u64,
        /// Bytes requested
        wanted: u64,
        /// Bytes available
        got: u64,
    },

    /// Virtual offset out of range or not addressable in the current block
    #[error("Invalid offset: {0}")]
    InvalidOffset(String),

    /// Index used after `close()`
    #[error("Index has been closed")]
    ClosedIndex,

    /// Store schema is missing, unknown, or inconsistent
    #[error("Incompatible index store: {0}")]
    IncompatibleStore(String),

    /// Record parser rejected raw bytes
    #[error("Parse error: {0}")]
    Parse(String),
}
