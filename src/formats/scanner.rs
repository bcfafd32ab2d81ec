//! Record boundary scanning
//!
//! A [`RecordScanner`] walks a [`ByteSource`] line by line and yields one
//! [`ScannedRecord`] per record: its key, the offset of its first byte and
//! its raw length. At most one line is held in memory at a time.

use crate::error::{BiodexError, Result};
use crate::formats::{embl, fasta, fastq, genbank, tab, Format};
use crate::io::source::ByteSource;
use crate::types::ScannedRecord;
use std::sync::Arc;

/// Caller-supplied key derivation, applied to the format's default identifier
pub type KeyFn = Arc<dyn Fn(&str) -> String + Send + Sync>;

/// Record boundary found by a format scanner, before key derivation
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Boundary {
    pub id: String,
    pub offset: u64,
    pub length: u64,
}

/// Line cursor with one line of lookahead
///
/// `line()` is the current, not yet consumed line; `bump()` replaces it with
/// the next one. `consumed()` counts decompressed bytes before the current
/// line, which is what record lengths are measured in.
pub(crate) struct LineReader {
    source: ByteSource,
    line: Vec<u8>,
    offset: u64,
    consumed: u64,
    at_eof: bool,
    primed: bool,
}

impl LineReader {
    pub fn new(source: ByteSource) -> Self {
        Self {
            source,
            line: Vec::with_capacity(256),
            offset: 0,
            consumed: 0,
            at_eof: false,
            primed: false,
        }
    }

    /// Read the first line if that has not happened yet
    pub fn prime(&mut self) -> Result<()> {
        if !self.primed {
            self.primed = true;
            self.consumed = 0;
            self.line.clear();
            self.offset = self.source.tell();
            self.at_eof = self.source.read_line(&mut self.line)? == 0;
        }
        Ok(())
    }

    /// Current line including its terminator, `None` at end of stream
    pub fn line(&self) -> Option<&[u8]> {
        if self.at_eof {
            None
        } else {
            Some(&self.line)
        }
    }

    /// Source offset of the current line
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Bytes consumed before the current line
    pub fn consumed(&self) -> u64 {
        self.consumed
    }

    /// Advance to the next line
    pub fn bump(&mut self) -> Result<()> {
        if self.at_eof {
            return Ok(());
        }
        self.consumed += self.line.len() as u64;
        self.line.clear();
        self.offset = self.source.tell();
        self.at_eof = self.source.read_line(&mut self.line)? == 0;
        Ok(())
    }

    /// True when the current line starts with `prefix`
    pub fn starts_with(&self, prefix: &[u8]) -> bool {
        self.line().map_or(false, |line| line.starts_with(prefix))
    }

    /// True when the current line is whitespace only
    pub fn is_blank(&self) -> bool {
        self.line()
            .map_or(false, |line| line.iter().all(|b| b.is_ascii_whitespace()))
    }

    /// Skip blank lines
    pub fn skip_blank(&mut self) -> Result<()> {
        while self.is_blank() {
            self.bump()?;
        }
        Ok(())
    }

    /// Skip every line until one starts with `marker`
    pub fn skip_until(&mut self, marker: &[u8]) -> Result<()> {
        while self.line().is_some() && !self.starts_with(marker) {
            self.bump()?;
        }
        Ok(())
    }

    pub fn malformed(&self, format: Format, msg: impl Into<String>) -> BiodexError {
        BiodexError::MalformedRecord {
            format: format.name(),
            offset: self.offset,
            msg: msg.into(),
        }
    }

    pub fn into_source(self) -> ByteSource {
        self.source
    }
}

/// First whitespace-delimited token of `bytes`, lossily decoded
pub(crate) fn first_token(bytes: &[u8]) -> String {
    let text = String::from_utf8_lossy(bytes);
    text.split_whitespace().next().unwrap_or("").to_string()
}

/// `bytes` without trailing whitespace (including the line terminator)
pub(crate) fn trim_end(bytes: &[u8]) -> &[u8] {
    let end = bytes
        .iter()
        .rposition(|b| !b.is_ascii_whitespace())
        .map_or(0, |i| i + 1);
    &bytes[..end]
}

/// Single-pass iterator over the records of one source
///
/// Created by [`Format::scan`]. It owns the source, so scanning again means
/// opening the source again (or recovering it with [`Self::into_source`] and
/// seeking back). After the first error the iterator is exhausted.
pub struct RecordScanner {
    format: Format,
    lines: LineReader,
    key_fn: Option<KeyFn>,
    finished: bool,
}

impl RecordScanner {
    pub(crate) fn new(format: Format, source: ByteSource, key_fn: Option<KeyFn>) -> Self {
        Self {
            format,
            lines: LineReader::new(source),
            key_fn,
            finished: false,
        }
    }

    /// Format being scanned
    pub fn format(&self) -> Format {
        self.format
    }

    /// Give back the underlying source
    pub fn into_source(self) -> ByteSource {
        self.lines.into_source()
    }

    fn next_boundary(&mut self) -> Result<Option<Boundary>> {
        self.lines.prime()?;
        let lines = &mut self.lines;
        match self.format {
            Format::Fasta | Format::Qual => fasta::next_record(lines, self.format),
            Format::Fastq(_) => fastq::next_record(lines, self.format),
            Format::GenBank => genbank::next_record(lines),
            Format::Embl | Format::Imgt => embl::next_embl_record(lines, self.format),
            Format::SwissProt => embl::next_swiss_record(lines),
            Format::Tab => tab::next_record(lines),
        }
    }

    fn next_record(&mut self) -> Result<Option<ScannedRecord>> {
        let boundary = match self.next_boundary()? {
            Some(boundary) => boundary,
            None => return Ok(None),
        };

        let key = match &self.key_fn {
            Some(key_fn) => key_fn(&boundary.id),
            None => boundary.id,
        };
        if key.is_empty() {
            return Err(BiodexError::EmptyKey {
                offset: boundary.offset,
            });
        }

        Ok(Some(ScannedRecord {
            key,
            offset: boundary.offset,
            length: boundary.length,
        }))
    }
}

impl Iterator for RecordScanner {
    type Item = Result<ScannedRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        match self.next_record() {
            Ok(Some(record)) => Some(Ok(record)),
            Ok(None) => {
                self.finished = true;
                None
            }
            Err(e) => {
                self.finished = true;
                Some(Err(e))
            }
        }
    }
}
