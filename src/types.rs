//! Common types used throughout biodex

use crate::formats::Format;
use crate::io::source::Compression;
use std::fmt;
use std::path::PathBuf;

/// Position of a source file in a store's registry (0, 1, 2, ... in build order)
pub type FileId = u32;

/// One record boundary as produced by a format scanner
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannedRecord {
    /// Lookup key (default identifier, or the key function's output)
    pub key: String,
    /// Offset of the record's first byte (virtual offset for BGZF sources)
    pub offset: u64,
    /// Raw record length in decompressed bytes
    pub length: u64,
}

/// Where a record lives
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordLocator {
    /// Lookup key
    pub key: String,
    /// Registry entry holding the record; `None` for single-file indices
    pub file_id: Option<FileId>,
    /// Offset of the record's first byte (virtual offset for BGZF sources)
    pub offset: u64,
    /// Raw record length in decompressed bytes
    pub length: u64,
}

impl RecordLocator {
    pub(crate) fn from_scanned(record: ScannedRecord, file_id: Option<FileId>) -> Self {
        Self {
            key: record.key,
            file_id,
            offset: record.offset,
            length: record.length,
        }
    }
}

/// A source file registered in a persistent index
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    /// Position in the registry
    pub file_id: FileId,
    /// Path as recorded: relative to the store's directory, or absolute
    pub path: PathBuf,
    /// Format the file was scanned as
    pub format: Format,
    /// Container detected at build time
    pub compression: Compression,
    /// File size in bytes at build time
    pub size: u64,
}

/// A registered source file that no longer matches what was indexed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceDrift {
    /// The file cannot be found
    Missing {
        /// Registry entry
        file_id: FileId,
        /// Resolved path that was checked
        path: PathBuf,
    },
    /// The file exists but its size changed since the build
    Resized {
        /// Registry entry
        file_id: FileId,
        /// Resolved path that was checked
        path: PathBuf,
        /// Size recorded at build time
        recorded: u64,
        /// Size on disk now
        current: u64,
    },
}

impl fmt::Display for SourceDrift {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceDrift::Missing { file_id, path } => {
                write!(f, "file {} ({}) is missing", file_id, path.display())
            }
            SourceDrift::Resized {
                file_id,
                path,
                recorded,
                current,
            } => write!(
                f,
                "file {} ({}) changed size: {} bytes indexed, {} bytes now",
                file_id,
                path.display(),
                recorded,
                current
            ),
        }
    }
}

/// A sequence record as materialized by [`SequenceParser`](crate::formats::SequenceParser)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeqRecord {
    /// Sequence identifier (first token of the title line, or first column)
    pub id: String,
    /// Rest of the title line, trimmed
    pub description: String,
    /// Residues with line breaks removed (empty for QUAL)
    pub sequence: Vec<u8>,
    /// FASTQ quality string as stored, or QUAL scores re-encoded as Phred+33
    pub quality: Option<Vec<u8>>,
}

impl SeqRecord {
    /// Create a record without qualities
    pub fn new(id: String, description: String, sequence: Vec<u8>) -> Self {
        Self {
            id,
            description,
            sequence,
            quality: None,
        }
    }

    /// Attach a quality string
    pub fn with_quality(mut self, quality: Vec<u8>) -> Self {
        self.quality = Some(quality);
        self
    }

    /// Check if the record has an empty sequence
    ///
    /// # Examples
    ///
    /// ```
    /// use biodex::SeqRecord;
    ///
    /// let empty = SeqRecord::new("read1".to_string(), String::new(), Vec::new());
    /// assert!(empty.is_empty());
    /// ```
    pub fn is_empty(&self) -> bool {
        self.sequence.is_empty()
    }
}
