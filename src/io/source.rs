//! Seekable byte sources: plain files and BGZF containers behind one interface
//!
//! Everything that scans or extracts records goes through [`ByteSource`].
//! Offsets are plain byte offsets for [`Compression::Plain`] sources and
//! raw [`VirtualOffset`] values for [`Compression::Bgzf`] sources; callers
//! treat them as opaque `u64` positions.

use crate::error::{BiodexError, Result};
use crate::io::bgzf::{is_bgzf_header, is_gzip_header, BgzfReader, VirtualOffset};
use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Number of bytes inspected to detect the container kind
const MAGIC_PROBE_LEN: usize = 18;

/// Container kind of a source file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Compression {
    /// Uncompressed text
    Plain,
    /// BGZF block-compressed
    Bgzf,
}

impl Compression {
    /// Tag stored in the persistent index
    pub fn as_str(&self) -> &'static str {
        match self {
            Compression::Plain => "plain",
            Compression::Bgzf => "bgzf",
        }
    }

    /// Detect the container kind from the first bytes of a file
    ///
    /// Ordinary gzip and bzip2 streams are rejected: they cannot be entered
    /// at an arbitrary offset.
    pub fn detect(prefix: &[u8]) -> Result<Self> {
        if is_bgzf_header(prefix) {
            Ok(Compression::Bgzf)
        } else if is_gzip_header(prefix) {
            Err(BiodexError::Format(
                "gzip file is not BGZF; recompress with bgzip for random access".to_string(),
            ))
        } else if prefix.starts_with(b"BZh") {
            Err(BiodexError::Format(
                "bzip2 files do not support random access".to_string(),
            ))
        } else {
            Ok(Compression::Plain)
        }
    }
}

impl fmt::Display for Compression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Compression {
    type Err = BiodexError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "plain" => Ok(Compression::Plain),
            "bgzf" => Ok(Compression::Bgzf),
            other => Err(BiodexError::Format(format!(
                "unknown compression tag '{}'",
                other
            ))),
        }
    }
}

enum Inner {
    Plain {
        reader: BufReader<File>,
        position: u64,
    },
    Bgzf(BgzfReader<File>),
}

/// An open, seekable source file
pub struct ByteSource {
    path: PathBuf,
    inner: Inner,
}

impl fmt::Debug for ByteSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ByteSource")
            .field("path", &self.path)
            .field("compression", &self.compression())
            .finish()
    }
}

impl ByteSource {
    /// Open a file, detecting plain vs BGZF from its magic bytes
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let mut file = open_file(path)?;
        let prefix = read_prefix(&mut file)?;
        let compression = Compression::detect(&prefix)?;
        Self::from_file(path, file, compression)
    }

    /// Open a file whose container kind is already known
    ///
    /// Fails with a format error when BGZF is declared but the file does not
    /// start with a BGZF block.
    pub fn open_as<P: AsRef<Path>>(path: P, compression: Compression) -> Result<Self> {
        let path = path.as_ref();
        let mut file = open_file(path)?;
        if compression == Compression::Bgzf {
            let prefix = read_prefix(&mut file)?;
            if !is_bgzf_header(&prefix) {
                return Err(BiodexError::Format(format!(
                    "{:?} is declared BGZF but has no BGZF block header",
                    path
                )));
            }
        }
        Self::from_file(path, file, compression)
    }

    fn from_file(path: &Path, mut file: File, compression: Compression) -> Result<Self> {
        file.seek(SeekFrom::Start(0))?;
        let inner = match compression {
            Compression::Plain => Inner::Plain {
                reader: BufReader::new(file),
                position: 0,
            },
            Compression::Bgzf => Inner::Bgzf(BgzfReader::new(file)),
        };
        Ok(Self {
            path: path.to_path_buf(),
            inner,
        })
    }

    /// Path this source was opened from
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Container kind
    pub fn compression(&self) -> Compression {
        match self.inner {
            Inner::Plain { .. } => Compression::Plain,
            Inner::Bgzf(_) => Compression::Bgzf,
        }
    }

    /// Current position (virtual offset for BGZF)
    pub fn tell(&self) -> u64 {
        match &self.inner {
            Inner::Plain { position, .. } => *position,
            Inner::Bgzf(reader) => reader.virtual_position().as_raw(),
        }
    }

    /// Move to a position previously reported by [`Self::tell`]
    pub fn seek(&mut self, offset: u64) -> Result<()> {
        match &mut self.inner {
            Inner::Plain { reader, position } => {
                reader.seek(SeekFrom::Start(offset))?;
                *position = offset;
            }
            Inner::Bgzf(reader) => reader.seek_virtual(VirtualOffset::from_raw(offset))?,
        }
        Ok(())
    }

    /// Read forward until `predicate` matches a byte (inclusive) or the stream ends
    ///
    /// Bytes are appended to `buf`; returns how many were appended. Block
    /// boundaries in BGZF sources are crossed transparently.
    pub fn read_until<F>(&mut self, mut predicate: F, buf: &mut Vec<u8>) -> Result<usize>
    where
        F: FnMut(u8) -> bool,
    {
        let mut total = 0;
        loop {
            let available = match &mut self.inner {
                Inner::Plain { reader, .. } => reader.fill_buf()?,
                Inner::Bgzf(reader) => reader.fill()?,
            };
            if available.is_empty() {
                return Ok(total);
            }

            let (used, done) = match available.iter().position(|&b| predicate(b)) {
                Some(i) => (i + 1, true),
                None => (available.len(), false),
            };
            buf.extend_from_slice(&available[..used]);
            self.consume(used);
            total += used;

            if done {
                return Ok(total);
            }
        }
    }

    /// Read one line including its terminator; 0 at end of stream
    pub fn read_line(&mut self, buf: &mut Vec<u8>) -> Result<usize> {
        self.read_until(|b| b == b'\n', buf)
    }

    /// Read exactly `length` bytes from `offset`, without any normalization
    pub fn read_exact_at(&mut self, offset: u64, length: u64) -> Result<Vec<u8>> {
        self.seek(offset)?;

        let wanted = usize::try_from(length).map_err(|_| {
            BiodexError::InvalidOffset(format!("record length {} does not fit in memory", length))
        })?;
        let mut out = Vec::with_capacity(wanted);
        while out.len() < wanted {
            let available = match &mut self.inner {
                Inner::Plain { reader, .. } => reader.fill_buf()?,
                Inner::Bgzf(reader) => reader.fill()?,
            };
            if available.is_empty() {
                return Err(BiodexError::EndOfData {
                    offset,
                    wanted: length,
                    got: out.len() as u64,
                });
            }
            let n = available.len().min(wanted - out.len());
            out.extend_from_slice(&available[..n]);
            self.consume(n);
        }
        Ok(out)
    }

    fn consume(&mut self, amt: usize) {
        match &mut self.inner {
            Inner::Plain { reader, position } => {
                reader.consume(amt);
                *position += amt as u64;
            }
            Inner::Bgzf(reader) => reader.advance(amt),
        }
    }
}

fn open_file(path: &Path) -> Result<File> {
    File::open(path).map_err(|e| {
        BiodexError::Io(std::io::Error::new(
            e.kind(),
            format!("Failed to open {:?}: {}", path, e),
        ))
    })
}

fn read_prefix(file: &mut File) -> Result<Vec<u8>> {
    let mut prefix = Vec::with_capacity(MAGIC_PROBE_LEN);
    file.by_ref()
        .take(MAGIC_PROBE_LEN as u64)
        .read_to_end(&mut prefix)?;
    Ok(prefix)
}
