//! In-memory lazy index over a single file
//!
//! Building scans the file once and keeps only `key → (offset, length)`.
//! Records are read back on demand through the one open [`ByteSource`].
//!
//! ```no_run
//! use biodex::formats::{Format, SequenceParser};
//! use biodex::index::LazyIndex;
//!
//! # fn main() -> biodex::Result<()> {
//! let mut index = LazyIndex::build("proteins.fa", Format::Fasta, None)?;
//! println!("{} records", index.len());
//!
//! let raw = index.get_raw("P12345")?;
//! let record = index.get("P12345", &SequenceParser)?;
//! # let _ = (raw, record);
//! index.close();
//! # Ok(())
//! # }
//! ```

use crate::error::{BiodexError, Result};
use crate::formats::{Format, KeyFn, RecordParser};
use crate::io::source::ByteSource;
use crate::types::RecordLocator;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Key-addressed view of one record file
///
/// Lookups take `&mut self` since they move the shared file cursor. After
/// [`close`](Self::close), everything except `len`/`is_empty`/`format`/`path`
/// fails with [`BiodexError::ClosedIndex`].
#[derive(Debug)]
pub struct LazyIndex {
    path: PathBuf,
    format: Format,
    /// Locators in file order
    locators: Vec<RecordLocator>,
    positions: HashMap<String, usize>,
    /// `None` once closed
    source: Option<ByteSource>,
}

impl LazyIndex {
    /// Open `path` (plain or BGZF) and index every record in it
    pub fn build<P: AsRef<Path>>(path: P, format: Format, key_fn: Option<KeyFn>) -> Result<Self> {
        let source = ByteSource::open(path)?;
        Self::from_source(source, format, key_fn)
    }

    /// Index an already opened source
    ///
    /// The source must be positioned at its start.
    pub fn from_source(source: ByteSource, format: Format, key_fn: Option<KeyFn>) -> Result<Self> {
        let path = source.path().to_path_buf();
        debug!(path = %path.display(), format = %format, compression = %source.compression(), "scanning source");

        let mut locators = Vec::new();
        let mut positions = HashMap::new();
        let mut scanner = format.scan(source, key_fn);

        for record in scanner.by_ref() {
            let record = record?;
            if positions.contains_key(&record.key) {
                return Err(BiodexError::DuplicateKey(record.key));
            }
            positions.insert(record.key.clone(), locators.len());
            locators.push(RecordLocator::from_scanned(record, None));
        }

        info!(
            path = %path.display(),
            format = %format,
            records = locators.len(),
            "built in-memory index"
        );

        Ok(Self {
            path,
            format,
            locators,
            positions,
            source: Some(scanner.into_source()),
        })
    }

    /// Number of indexed records (valid after close)
    pub fn len(&self) -> usize {
        self.locators.len()
    }

    /// True if the source held no records
    pub fn is_empty(&self) -> bool {
        self.locators.is_empty()
    }

    /// Format the source was scanned as
    pub fn format(&self) -> Format {
        self.format
    }

    /// Indexed file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether [`Self::close`] has been called
    pub fn is_closed(&self) -> bool {
        self.source.is_none()
    }

    fn ensure_open(&self) -> Result<()> {
        if self.source.is_none() {
            return Err(BiodexError::ClosedIndex);
        }
        Ok(())
    }

    fn entry(&self, key: &str) -> Result<&RecordLocator> {
        self.ensure_open()?;
        self.positions
            .get(key)
            .map(|&i| &self.locators[i])
            .ok_or_else(|| BiodexError::KeyNotFound(key.to_string()))
    }

    /// Where the record for `key` lives
    pub fn locate(&self, key: &str) -> Result<RecordLocator> {
        self.entry(key).cloned()
    }

    /// Whether `key` is indexed
    pub fn contains(&self, key: &str) -> Result<bool> {
        self.ensure_open()?;
        Ok(self.positions.contains_key(key))
    }

    /// Keys in file order
    pub fn keys(&self) -> Result<impl Iterator<Item = &str> + '_> {
        self.ensure_open()?;
        Ok(self.locators.iter().map(|locator| locator.key.as_str()))
    }

    /// Raw bytes of the record for `key`, exactly as stored
    pub fn get_raw(&mut self, key: &str) -> Result<Vec<u8>> {
        let (offset, length) = {
            let locator = self.entry(key)?;
            (locator.offset, locator.length)
        };
        let format = self.format;
        let source = self.source.as_mut().ok_or(BiodexError::ClosedIndex)?;
        format.extract_raw(source, offset, length)
    }

    /// Parse the record for `key` with `parser`
    pub fn get<P: RecordParser>(&mut self, key: &str, parser: &P) -> Result<P::Record> {
        let raw = self.get_raw(key)?;
        parser.parse(&raw, self.format)
    }

    /// Release the file handle; the index is unusable afterwards
    pub fn close(&mut self) {
        if self.source.take().is_some() {
            debug!(path = %self.path.display(), "closed in-memory index");
        }
    }
}
