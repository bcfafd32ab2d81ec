//! Record formats and their boundary scanners
//!
//! Every supported format is one variant of [`Format`]. A format knows how
//! to find record boundaries ([`Format::scan`]) and how to pull one record's
//! raw bytes back out ([`Format::extract_raw`]); nothing here interprets
//! record content.
//!
//! | Name(s) | Record start | Default key |
//! |---|---|---|
//! | `fasta` | `>` | first title token |
//! | `qual` | `>` | first title token |
//! | `fastq`, `fastq-sanger`, `fastq-solexa`, `fastq-illumina` | `@` | first title token |
//! | `genbank`, `gb` | `LOCUS` | VERSION, else ACCESSION, else LOCUS name |
//! | `embl`, `imgt` | `ID   ` | ID accession + SV, else SV line, else first AC |
//! | `swiss` | `ID   ` | first AC accession |
//! | `tab` | any line | first column |
//!
//! Alignment formats whose records cannot be delimited with bounded
//! lookahead (Stockholm, Clustal, PHYLIP, NEXUS, ...) are known to the
//! registry but rejected with [`BiodexError::UnsupportedFormat`].
//!
//! # Example
//!
//! ```no_run
//! use biodex::formats::Format;
//! use biodex::io::ByteSource;
//!
//! # fn main() -> biodex::Result<()> {
//! let format: Format = "fastq".parse()?;
//! for record in format.scan(ByteSource::open("reads.fq")?, None) {
//!     let record = record?;
//!     println!("{} @ {} (+{})", record.key, record.offset, record.length);
//! }
//! # Ok(())
//! # }
//! ```

mod embl;
mod fasta;
mod fastq;
mod genbank;
pub mod records;
mod scanner;
mod tab;

pub use records::{RecordParser, SeqRecords, SequenceParser};
pub use scanner::{KeyFn, RecordScanner};

use crate::error::{BiodexError, Result};
use crate::io::source::ByteSource;
use std::fmt;
use std::str::FromStr;

/// FASTQ quality encoding flavour
///
/// Boundaries are found the same way for all three; the variant only
/// matters to record parsers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FastqVariant {
    /// Phred+33
    Sanger,
    /// Solexa+64
    Solexa,
    /// Phred+64
    Illumina,
}

/// A record format that can be boundary-scanned
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Format {
    /// FASTA sequences
    Fasta,
    /// FASTQ reads
    Fastq(FastqVariant),
    /// QUAL quality scores (FASTA-like layout)
    Qual,
    /// GenBank flat file
    GenBank,
    /// EMBL flat file
    Embl,
    /// IMGT (EMBL-like)
    Imgt,
    /// Swiss-Prot / UniProtKB text
    SwissProt,
    /// Two-column tab-separated id/sequence
    Tab,
}

/// Registry of format names, built at compile time and never mutated
static FORMAT_TABLE: &[(&str, Format)] = &[
    ("fasta", Format::Fasta),
    ("fastq", Format::Fastq(FastqVariant::Sanger)),
    ("fastq-sanger", Format::Fastq(FastqVariant::Sanger)),
    ("fastq-solexa", Format::Fastq(FastqVariant::Solexa)),
    ("fastq-illumina", Format::Fastq(FastqVariant::Illumina)),
    ("qual", Format::Qual),
    ("genbank", Format::GenBank),
    ("gb", Format::GenBank),
    ("embl", Format::Embl),
    ("imgt", Format::Imgt),
    ("swiss", Format::SwissProt),
    ("tab", Format::Tab),
];

/// Known formats that need global context to split into records
static UNSUPPORTED_FORMATS: &[&str] = &[
    "clustal",
    "emboss",
    "fasta-m10",
    "maf",
    "mauve",
    "msf",
    "nexus",
    "phylip",
    "phylip-relaxed",
    "phylip-sequential",
    "stockholm",
];

impl Format {
    /// Look up a format by name (case-insensitive)
    ///
    /// Alignment formats are rejected with `UnsupportedFormat`; unknown
    /// names with a `Format` error.
    pub fn from_name(name: &str) -> Result<Self> {
        let lower = name.trim().to_ascii_lowercase();
        if let Some((_, format)) = FORMAT_TABLE.iter().find(|(n, _)| *n == lower) {
            return Ok(*format);
        }
        if UNSUPPORTED_FORMATS.contains(&lower.as_str()) {
            return Err(BiodexError::UnsupportedFormat(lower));
        }
        Err(BiodexError::Format(format!("unknown format '{}'", name)))
    }

    /// Canonical name, as stored in the persistent index
    pub fn name(&self) -> &'static str {
        match self {
            Format::Fasta => "fasta",
            Format::Fastq(FastqVariant::Sanger) => "fastq",
            Format::Fastq(FastqVariant::Solexa) => "fastq-solexa",
            Format::Fastq(FastqVariant::Illumina) => "fastq-illumina",
            Format::Qual => "qual",
            Format::GenBank => "genbank",
            Format::Embl => "embl",
            Format::Imgt => "imgt",
            Format::SwissProt => "swiss",
            Format::Tab => "tab",
        }
    }

    /// All registered names, aliases included
    pub fn names() -> impl Iterator<Item = &'static str> {
        FORMAT_TABLE.iter().map(|(name, _)| *name)
    }

    /// Start a single-pass scan over `source`
    ///
    /// With `key_fn`, each record's default identifier is computed first and
    /// then passed through it.
    pub fn scan(self, source: ByteSource, key_fn: Option<KeyFn>) -> RecordScanner {
        RecordScanner::new(self, source, key_fn)
    }

    /// Raw bytes of the record at `offset`, exactly as stored
    pub fn extract_raw(&self, source: &mut ByteSource, offset: u64, length: u64) -> Result<Vec<u8>> {
        source.read_exact_at(offset, length)
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Format {
    type Err = BiodexError;

    fn from_str(s: &str) -> Result<Self> {
        Format::from_name(s)
    }
}
