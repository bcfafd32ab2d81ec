//! biodex: lazy, key-addressed random access into sequence record files
//!
//! # Overview
//!
//! biodex finds record boundaries in flat sequence files once, remembers
//! `key → (offset, length)`, and reads single records back on demand. Files
//! may be plain text or BGZF block-compressed; BGZF offsets are virtual
//! offsets that land on any record without decompressing from the start.
//!
//! ## Key Features
//!
//! - **Lazy**: only offsets are kept; records are read when asked for
//! - **Persistent**: [`IndexStore`] keeps offsets for many files in one SQLite file
//! - **BGZF-aware**: records spanning block boundaries extract byte-exactly
//! - **Format-agnostic lookups**: raw bytes out, any [`RecordParser`] on top
//!
//! ## Quick Start
//!
//! ```no_run
//! use biodex::{Format, LazyIndex, SequenceParser};
//!
//! # fn main() -> biodex::Result<()> {
//! let mut index = LazyIndex::build("reads.fq.gz", Format::from_name("fastq")?, None)?;
//!
//! let record = index.get("read_0042", &SequenceParser)?;
//! println!("{}: {} bp", record.id, record.sequence.len());
//! # Ok(())
//! # }
//! ```
//!
//! ## Module Organization
//!
//! - [`io`]: BGZF container and seekable byte sources
//! - [`formats`]: format registry, boundary scanners and record parsers
//! - [`index`]: in-memory and SQLite-backed indexes
//! - [`config`]: options for building persistent indexes

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod config;
pub mod error;
pub mod formats;
pub mod index;
pub mod io;
pub mod types;

// Re-export commonly used types
pub use config::{SourceSpec, StoreOptions};
pub use error::{BiodexError, Result};
pub use formats::{FastqVariant, Format, KeyFn, RecordParser, SequenceParser};
pub use index::{IndexStore, LazyIndex};
pub use io::{ByteSource, Compression, VirtualOffset};
pub use types::{FileId, RecordLocator, ScannedRecord, SeqRecord, SourceDrift, SourceFile};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
