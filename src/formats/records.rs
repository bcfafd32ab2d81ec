//! Record parsers: turning raw record bytes into values
//!
//! The index only ever hands out raw bytes. Anything implementing
//! [`RecordParser`] can sit on the other side of that boundary, including a
//! plain closure:
//!
//! ```
//! use biodex::formats::{Format, RecordParser};
//!
//! let title = |raw: &[u8], _format: Format| -> biodex::Result<String> {
//!     Ok(String::from_utf8_lossy(raw).lines().next().unwrap_or("").to_string())
//! };
//! assert_eq!(title.parse(b">A1 x\nACGT\n", Format::Fasta).unwrap(), ">A1 x");
//! ```
//!
//! [`SequenceParser`] is the bundled parser for the line-oriented sequence
//! formats (FASTA, QUAL, FASTQ, tab). [`SeqRecords`] is its streaming
//! counterpart over a whole file.

use crate::error::{BiodexError, Result};
use crate::formats::Format;
use crate::types::SeqRecord;
use std::io::BufRead;

/// Materializes one record from its raw bytes
pub trait RecordParser {
    /// Parsed record type
    type Record;

    /// Parse `raw`, the exact bytes of one record in `format`
    fn parse(&self, raw: &[u8], format: Format) -> Result<Self::Record>;
}

impl<F, T> RecordParser for F
where
    F: Fn(&[u8], Format) -> Result<T>,
{
    type Record = T;

    fn parse(&self, raw: &[u8], format: Format) -> Result<T> {
        self(raw, format)
    }
}

/// Parser for FASTA, QUAL, FASTQ and tab records
///
/// # Example
///
/// ```
/// use biodex::formats::{Format, RecordParser, SequenceParser};
///
/// let record = SequenceParser.parse(b">seq1 desc\nGATT\nACA\n", Format::Fasta)?;
/// assert_eq!(record.id, "seq1");
/// assert_eq!(record.sequence, b"GATTACA");
/// # Ok::<(), biodex::BiodexError>(())
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct SequenceParser;

impl RecordParser for SequenceParser {
    type Record = SeqRecord;

    /// Parse exactly one record; leftover records are an error
    fn parse(&self, raw: &[u8], format: Format) -> Result<SeqRecord> {
        let mut records = SeqRecords::new(raw, format)?;
        let record = match records.next() {
            Some(record) => record?,
            None => return Err(BiodexError::Parse("no record in input".to_string())),
        };
        if records.next().is_some() {
            return Err(BiodexError::Parse(format!(
                "more than one record in input for {}",
                record.id
            )));
        }
        Ok(record)
    }
}

/// Streaming sequence record reader
///
/// Reads one record at a time with one line of look-ahead, so memory stays
/// bounded by the largest record.
pub struct SeqRecords<R: BufRead> {
    reader: R,
    format: Format,
    line_buffer: Vec<u8>,
    /// Peek buffer for look-ahead (to detect next record start)
    next_line: Option<Vec<u8>>,
    line_number: usize,
    finished: bool,
}

impl<R: BufRead> SeqRecords<R> {
    /// Create a reader; formats other than FASTA, QUAL, FASTQ and tab are rejected
    pub fn new(reader: R, format: Format) -> Result<Self> {
        match format {
            Format::Fasta | Format::Qual | Format::Fastq(_) | Format::Tab => Ok(Self {
                reader,
                format,
                line_buffer: Vec::with_capacity(256),
                next_line: None,
                line_number: 0,
                finished: false,
            }),
            other => Err(BiodexError::Parse(format!("no sequence parser for {}", other))),
        }
    }

    /// Next line with its terminator stripped, `None` at end of input
    fn next_line(&mut self) -> Result<Option<Vec<u8>>> {
        if let Some(line) = self.next_line.take() {
            return Ok(Some(line));
        }
        if self.finished {
            return Ok(None);
        }
        self.line_buffer.clear();
        if self.reader.read_until(b'\n', &mut self.line_buffer)? == 0 {
            self.finished = true;
            return Ok(None);
        }
        self.line_number += 1;
        let mut end = self.line_buffer.len();
        while end > 0 && matches!(self.line_buffer[end - 1], b'\n' | b'\r') {
            end -= 1;
        }
        Ok(Some(self.line_buffer[..end].to_vec()))
    }

    /// Next non-blank line
    fn next_content_line(&mut self) -> Result<Option<Vec<u8>>> {
        while let Some(line) = self.next_line()? {
            if !is_blank(&line) {
                return Ok(Some(line));
            }
        }
        Ok(None)
    }

    fn error(&self, msg: impl Into<String>) -> BiodexError {
        BiodexError::Parse(format!(
            "{} line {}: {}",
            self.format,
            self.line_number,
            msg.into()
        ))
    }

    fn read_record(&mut self) -> Result<Option<SeqRecord>> {
        match self.format {
            Format::Fastq(_) => self.read_fastq(),
            Format::Tab => self.read_tab(),
            Format::Qual => self.read_titled(true),
            _ => self.read_titled(false),
        }
    }

    /// FASTA and QUAL: `>` title, body up to the next `>`
    fn read_titled(&mut self, qual: bool) -> Result<Option<SeqRecord>> {
        let header = match self.next_content_line()? {
            Some(line) => line,
            None => return Ok(None),
        };
        if !header.starts_with(b">") {
            return Err(self.error("expected '>' at start of header"));
        }
        let (id, description) = split_title(&header[1..]);

        let mut sequence: Vec<u8> = Vec::new();
        let mut scores: Vec<u8> = Vec::new();
        while let Some(line) = self.next_line()? {
            if line.starts_with(b">") {
                self.next_line = Some(line);
                break;
            }
            if qual {
                for token in String::from_utf8_lossy(&line).split_whitespace() {
                    scores.push(phred33(token).ok_or_else(|| {
                        self.error(format!("invalid quality score '{}'", token))
                    })?);
                }
            } else {
                sequence.extend(line.iter().filter(|b| !b.is_ascii_whitespace()));
            }
        }

        let record = SeqRecord::new(id, description, sequence);
        Ok(Some(if qual {
            record.with_quality(scores)
        } else {
            record
        }))
    }

    fn read_fastq(&mut self) -> Result<Option<SeqRecord>> {
        let header = match self.next_content_line()? {
            Some(line) => line,
            None => return Ok(None),
        };
        if !header.starts_with(b"@") {
            return Err(self.error("expected '@' at start of header"));
        }
        let (id, description) = split_title(&header[1..]);

        let mut sequence: Vec<u8> = Vec::new();
        loop {
            match self.next_line()? {
                None => return Err(self.error("unexpected end of file before '+'")),
                Some(line) if line.starts_with(b"+") => break,
                Some(line) => sequence.extend(line.iter().filter(|b| !b.is_ascii_whitespace())),
            }
        }

        let mut quality: Vec<u8> = Vec::with_capacity(sequence.len());
        while quality.len() < sequence.len() {
            match self.next_line()? {
                None => return Err(self.error("unexpected end of file in quality")),
                Some(line) => quality.extend(line.iter().filter(|b| !b.is_ascii_whitespace())),
            }
        }
        if quality.len() != sequence.len() {
            return Err(self.error(format!(
                "sequence length ({}) != quality length ({})",
                sequence.len(),
                quality.len()
            )));
        }

        Ok(Some(
            SeqRecord::new(id, description, sequence).with_quality(quality),
        ))
    }

    fn read_tab(&mut self) -> Result<Option<SeqRecord>> {
        let line = match self.next_content_line()? {
            Some(line) => line,
            None => return Ok(None),
        };
        let tab = match line.iter().position(|&b| b == b'\t') {
            Some(tab) => tab,
            None => return Err(self.error("line has no tab separator")),
        };
        let id = String::from_utf8_lossy(&line[..tab]).trim().to_string();
        let sequence = line[tab + 1..]
            .iter()
            .copied()
            .filter(|b| !b.is_ascii_whitespace())
            .collect();
        Ok(Some(SeqRecord::new(id, String::new(), sequence)))
    }
}

impl<R: BufRead> Iterator for SeqRecords<R> {
    type Item = Result<SeqRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.read_record() {
            Ok(Some(record)) => Some(Ok(record)),
            Ok(None) => None,
            Err(e) => {
                self.finished = true;
                self.next_line = None;
                Some(Err(e))
            }
        }
    }
}

fn is_blank(line: &[u8]) -> bool {
    line.iter().all(|b| b.is_ascii_whitespace())
}

/// `id description...` → (id, description)
fn split_title(title: &[u8]) -> (String, String) {
    let text = String::from_utf8_lossy(title);
    let text = text.trim();
    match text.split_once(char::is_whitespace) {
        Some((id, rest)) => (id.to_string(), rest.trim().to_string()),
        None => (text.to_string(), String::new()),
    }
}

/// QUAL score → Phred+33 character
fn phred33(token: &str) -> Option<u8> {
    let score: u8 = token.parse().ok()?;
    if score > 93 {
        return None;
    }
    Some(score + 33)
}
