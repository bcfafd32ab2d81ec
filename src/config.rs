//! Build-time options for persistent indexes
//!
//! ```
//! use biodex::config::{SourceSpec, StoreOptions};
//! use biodex::formats::Format;
//! use std::sync::Arc;
//!
//! let options = StoreOptions::new()
//!     .with_batch_size(5_000)
//!     .with_relative_paths(false)
//!     .with_key_fn(Arc::new(|id: &str| id.to_uppercase()));
//! let sources = [SourceSpec::new("a.fa", Format::Fasta)];
//! # let _ = (options, sources);
//! ```

use crate::formats::{Format, KeyFn};
use std::fmt;
use std::path::{Path, PathBuf};

/// Default number of locators inserted per prepared-statement batch
pub const DEFAULT_BATCH_SIZE: usize = 1000;

/// One file to index, with the format to scan it as
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceSpec {
    /// File to scan
    pub path: PathBuf,
    /// Format to scan it as
    pub format: Format,
}

impl SourceSpec {
    /// Pair a path with its format
    pub fn new<P: AsRef<Path>>(path: P, format: Format) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            format,
        }
    }
}

/// Options for [`IndexStore::build`](crate::index::IndexStore::build)
#[derive(Clone)]
pub struct StoreOptions {
    /// Record source paths relative to the store's directory when they lie under it
    pub relative_paths: bool,
    /// Locators per insert batch
    pub batch_size: usize,
    /// Key override applied to every record's default identifier
    pub key_fn: Option<KeyFn>,
}

impl StoreOptions {
    /// Default options
    pub fn new() -> Self {
        Self::default()
    }

    /// Record paths relative to the store's directory when possible
    pub fn with_relative_paths(mut self, relative_paths: bool) -> Self {
        self.relative_paths = relative_paths;
        self
    }

    /// Set the insert batch size (zero is treated as one)
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Override the default key of every record
    pub fn with_key_fn(mut self, key_fn: KeyFn) -> Self {
        self.key_fn = Some(key_fn);
        self
    }
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            relative_paths: true,
            batch_size: DEFAULT_BATCH_SIZE,
            key_fn: None,
        }
    }
}

impl fmt::Debug for StoreOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreOptions")
            .field("relative_paths", &self.relative_paths)
            .field("batch_size", &self.batch_size)
            .field("key_fn", &self.key_fn.as_ref().map(|_| "<fn>"))
            .finish()
    }
}
