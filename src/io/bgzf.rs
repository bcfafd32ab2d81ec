//! BGZF (Blocked GNU Zip Format) random access
//!
//! BGZF files are a series of independent gzip members ("blocks"), each
//! decompressing to at most 64 KiB. Because every block can be inflated on
//! its own, a position in the decompressed stream can be addressed by a
//! *virtual offset*: the compressed offset of the block that contains it,
//! plus the byte offset inside that block's decompressed data.
//!
//! # Block Structure
//!
//! Each block:
//! - Bytes 0-1: Gzip magic (31, 139)
//! - Byte 2: CM=8 (deflate)
//! - Byte 3: FLG with FEXTRA (0x04) set
//! - Bytes 10-11: XLEN (extra field length)
//! - Extra subfields, including SI1='B' (66), SI2='C' (67), SLEN=2,
//!   BSIZE (little-endian u16): total block size - 1
//! - Raw deflate payload
//! - CRC32 and ISIZE of the decompressed data
//!
//! A stream ends with a 28-byte empty block ([`BGZF_EOF`]).
//!
//! # Virtual Offsets
//!
//! - High 48 bits: Compressed file offset of the block
//! - Low 16 bits: Uncompressed offset within the block
//!
//! # Example
//!
//! ```no_run
//! use biodex::io::bgzf::{BgzfReader, VirtualOffset};
//! use std::fs::File;
//!
//! # fn main() -> biodex::Result<()> {
//! let mut reader = BgzfReader::new(File::open("reads.fq.bgz")?);
//! reader.seek_virtual(VirtualOffset::encode(278, 40)?)?;
//!
//! let mut line = Vec::new();
//! reader.read_until_byte(b'\n', &mut line)?;
//! # Ok(())
//! # }
//! ```

use crate::error::{BiodexError, Result};
use flate2::read::DeflateDecoder;
use flate2::write::DeflateEncoder;
use flate2::Compression;
use std::fmt;
use std::io::{self, BufRead, Read, Seek, SeekFrom, Write};
use tracing::debug;

/// Maximum decompressed size of a single BGZF block
pub const MAX_BLOCK_SIZE: usize = 64 * 1024;

/// Uncompressed payload written per block by [`BgzfWriter`]
///
/// Same limit htslib uses, leaving room for deflate overhead so the
/// compressed block still fits BSIZE.
pub const BLOCK_DATA_LIMIT: usize = 0xff00;

/// The standard empty block that terminates a BGZF stream
pub const BGZF_EOF: [u8; 28] = [
    31, 139, 8, 4, 0, 0, 0, 0, 0, 255, // Header (10 bytes)
    6, 0, 66, 67, 2, 0, 27, 0, // Extra field with BSIZE=27 (8 bytes)
    3, 0, // Empty deflate block (2 bytes)
    0, 0, 0, 0, // CRC32 (4 bytes)
    0, 0, 0, 0, // ISIZE=0 (4 bytes)
];

const GZIP_MAGIC: [u8; 2] = [31, 139];
const FIXED_HEADER_LEN: usize = 12;
const TRAILER_LEN: usize = 8;
const MAX_BLOCK_START: u64 = 1 << 48;

/// Check whether `prefix` starts like a BGZF block (gzip member with a `BC` subfield)
pub fn is_bgzf_header(prefix: &[u8]) -> bool {
    if prefix.len() < 18 || prefix[..2] != GZIP_MAGIC || prefix[3] & 0x04 == 0 {
        return false;
    }
    let xlen = u16::from_le_bytes([prefix[10], prefix[11]]) as usize;
    let extra_end = (FIXED_HEADER_LEN + xlen).min(prefix.len());
    find_bsize(&prefix[FIXED_HEADER_LEN..extra_end]).is_some()
}

/// Check whether `prefix` is a gzip member (BGZF or not)
pub fn is_gzip_header(prefix: &[u8]) -> bool {
    prefix.len() >= 2 && prefix[..2] == GZIP_MAGIC
}

/// Position in a BGZF stream: compressed block start + offset within block
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct VirtualOffset(u64);

impl VirtualOffset {
    /// Encode a block start and within-block offset
    ///
    /// `within_block` must be below [`MAX_BLOCK_SIZE`] and `block_start`
    /// must fit in 48 bits.
    pub fn encode(block_start: u64, within_block: u32) -> Result<Self> {
        if within_block as usize >= MAX_BLOCK_SIZE {
            return Err(BiodexError::InvalidOffset(format!(
                "within-block offset {} must be below {}",
                within_block, MAX_BLOCK_SIZE
            )));
        }
        Self::new(block_start, within_block as u16)
    }

    /// Encode from a within-block offset that is already a `u16`
    pub fn new(block_start: u64, within_block: u16) -> Result<Self> {
        if block_start >= MAX_BLOCK_START {
            return Err(BiodexError::InvalidOffset(format!(
                "block start {} does not fit in 48 bits",
                block_start
            )));
        }
        Ok(Self((block_start << 16) | within_block as u64))
    }

    /// Reinterpret a raw 64-bit value
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Raw 64-bit value
    pub const fn as_raw(self) -> u64 {
        self.0
    }

    /// Split into (block start, within-block offset)
    pub const fn decode(self) -> (u64, u16) {
        (self.block_start(), self.within_block())
    }

    /// Compressed offset of the containing block
    pub const fn block_start(self) -> u64 {
        self.0 >> 16
    }

    /// Offset within the decompressed block
    pub const fn within_block(self) -> u16 {
        (self.0 & 0xFFFF) as u16
    }
}

impl fmt::Display for VirtualOffset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.block_start(), self.within_block())
    }
}

impl From<VirtualOffset> for u64 {
    fn from(offset: VirtualOffset) -> Self {
        offset.as_raw()
    }
}

/// Locate BSIZE in the gzip extra field
fn find_bsize(extra: &[u8]) -> Option<u16> {
    let mut pos = 0;
    while pos + 4 <= extra.len() {
        let si1 = extra[pos];
        let si2 = extra[pos + 1];
        let slen = u16::from_le_bytes([extra[pos + 2], extra[pos + 3]]) as usize;

        if si1 == 66 && si2 == 67 && slen == 2 {
            if pos + 6 > extra.len() {
                return None;
            }
            return Some(u16::from_le_bytes([extra[pos + 4], extra[pos + 5]]));
        }

        pos += 4 + slen;
    }
    None
}

/// Read until `buf` is full or EOF, returning the number of bytes read
fn read_full<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

/// Read and inflate one block whose header starts at the reader's position
///
/// Returns the total compressed size of the block, or `None` at a clean EOF.
/// `out` is cleared and filled with the decompressed data.
fn read_block<R: Read>(
    reader: &mut R,
    block_offset: u64,
    scratch: &mut Vec<u8>,
    out: &mut Vec<u8>,
) -> Result<Option<usize>> {
    let corrupt = |msg: String| BiodexError::CorruptContainer {
        offset: block_offset,
        msg,
    };

    let mut header = [0u8; FIXED_HEADER_LEN];
    match read_full(reader, &mut header)? {
        0 => return Ok(None),
        n if n < FIXED_HEADER_LEN => {
            return Err(corrupt(format!("truncated block header ({} bytes)", n)))
        }
        _ => {}
    }

    if header[..2] != GZIP_MAGIC {
        return Err(corrupt(format!(
            "invalid gzip magic bytes: expected [31, 139], got [{}, {}]",
            header[0], header[1]
        )));
    }
    if header[2] != 8 {
        return Err(corrupt(format!("unsupported compression method {}", header[2])));
    }
    if header[3] & 0x04 == 0 {
        return Err(corrupt("missing FEXTRA flag".to_string()));
    }

    let xlen = u16::from_le_bytes([header[10], header[11]]) as usize;
    let mut extra = vec![0u8; xlen];
    if read_full(reader, &mut extra)? < xlen {
        return Err(corrupt("truncated extra field".to_string()));
    }

    let bsize = find_bsize(&extra).ok_or_else(|| corrupt("no BC subfield".to_string()))?;
    let block_size = bsize as usize + 1;
    let already_read = FIXED_HEADER_LEN + xlen;
    if block_size < already_read + TRAILER_LEN {
        return Err(corrupt(format!(
            "block size {} smaller than header and trailer ({})",
            block_size,
            already_read + TRAILER_LEN
        )));
    }

    let remaining = block_size - already_read;
    scratch.clear();
    scratch.resize(remaining, 0);
    let got = read_full(reader, scratch)?;
    if got < remaining {
        return Err(corrupt(format!(
            "block truncated: expected {} more bytes, got {}",
            remaining, got
        )));
    }

    let (cdata, trailer) = scratch.split_at(remaining - TRAILER_LEN);
    let expected_crc = u32::from_le_bytes([trailer[0], trailer[1], trailer[2], trailer[3]]);
    let expected_len = u32::from_le_bytes([trailer[4], trailer[5], trailer[6], trailer[7]]) as usize;
    if expected_len > MAX_BLOCK_SIZE {
        return Err(corrupt(format!(
            "declared size {} exceeds {}",
            expected_len, MAX_BLOCK_SIZE
        )));
    }

    out.clear();
    DeflateDecoder::new(cdata)
        .read_to_end(out)
        .map_err(|e| corrupt(format!("inflate failed: {}", e)))?;

    if out.len() != expected_len {
        return Err(corrupt(format!(
            "decompressed {} bytes, trailer declares {}",
            out.len(),
            expected_len
        )));
    }
    let crc = crc32fast::hash(out);
    if crc != expected_crc {
        return Err(corrupt(format!(
            "CRC32 mismatch: computed {:08x}, trailer has {:08x}",
            crc, expected_crc
        )));
    }

    Ok(Some(block_size))
}

/// Seekable BGZF reader holding a single decompressed block
///
/// Reads cross block boundaries transparently; seeking inflates exactly the
/// one block the virtual offset points into. Nothing beyond the current
/// block is cached.
pub struct BgzfReader<R> {
    inner: R,
    /// Compressed offset of the block in `buffer`
    block_start: u64,
    /// Compressed offset of the block after it (where `inner` is positioned)
    next_block_start: u64,
    buffer: Vec<u8>,
    pos: usize,
    scratch: Vec<u8>,
    /// Set after a failed block read; `inner` must be re-seeked before reading
    stale: bool,
}

impl<R: Read + Seek> BgzfReader<R> {
    /// Wrap a reader positioned at the first block
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            block_start: 0,
            next_block_start: 0,
            buffer: Vec::with_capacity(MAX_BLOCK_SIZE),
            pos: 0,
            scratch: Vec::with_capacity(MAX_BLOCK_SIZE),
            stale: false,
        }
    }

    /// Current position as a virtual offset
    ///
    /// At the end of a block this reports the start of the next block, so
    /// every returned offset can be passed back to [`Self::seek_virtual`].
    pub fn virtual_position(&self) -> VirtualOffset {
        if self.pos < self.buffer.len() {
            VirtualOffset((self.block_start << 16) | self.pos as u64)
        } else {
            VirtualOffset(self.next_block_start << 16)
        }
    }

    /// Position the cursor at `offset`, inflating only the containing block
    pub fn seek_virtual(&mut self, offset: VirtualOffset) -> Result<()> {
        let (block_start, within_block) = offset.decode();

        if !(block_start == self.block_start && self.next_block_start > block_start) {
            self.inner.seek(SeekFrom::Start(block_start))?;
            self.stale = false;
            self.next_block_start = block_start;
            self.buffer.clear();
            self.pos = 0;
            self.load_block()?;
        }

        if within_block as usize > self.buffer.len() {
            return Err(BiodexError::InvalidOffset(format!(
                "virtual offset {} points past the end of a {}-byte block",
                offset,
                self.buffer.len()
            )));
        }
        self.pos = within_block as usize;
        Ok(())
    }

    /// Inflate the block at `next_block_start`; false at EOF
    ///
    /// On error the current block is dropped, so a later seek back into it
    /// inflates it again instead of serving a partially overwritten buffer.
    fn load_block(&mut self) -> Result<bool> {
        let offset = self.next_block_start;
        if self.stale {
            self.inner.seek(SeekFrom::Start(offset))?;
            self.stale = false;
        }
        match read_block(&mut self.inner, offset, &mut self.scratch, &mut self.buffer) {
            Ok(Some(size)) => {
                debug!(offset, size, data = self.buffer.len(), "loaded BGZF block");
                self.block_start = offset;
                self.next_block_start = offset + size as u64;
                self.pos = 0;
                Ok(true)
            }
            Ok(None) => {
                self.block_start = offset;
                self.buffer.clear();
                self.pos = 0;
                Ok(false)
            }
            Err(e) => {
                self.block_start = offset;
                self.next_block_start = offset;
                self.buffer.clear();
                self.pos = 0;
                self.stale = true;
                Err(e)
            }
        }
    }

    /// Bytes left in the current block, loading the next non-empty block if needed
    ///
    /// An empty slice means end of stream.
    pub fn fill(&mut self) -> Result<&[u8]> {
        while self.pos >= self.buffer.len() {
            if !self.load_block()? {
                break;
            }
        }
        Ok(&self.buffer[self.pos..])
    }

    /// Mark `amt` bytes of the slice returned by [`Self::fill`] as read
    pub fn advance(&mut self, amt: usize) {
        self.pos = (self.pos + amt).min(self.buffer.len());
    }

    /// Read up to and including `delim`, or to end of stream
    pub fn read_until_byte(&mut self, delim: u8, buf: &mut Vec<u8>) -> Result<usize> {
        let mut total = 0;
        loop {
            let available = self.fill()?;
            if available.is_empty() {
                return Ok(total);
            }
            match available.iter().position(|&b| b == delim) {
                Some(i) => {
                    buf.extend_from_slice(&available[..=i]);
                    self.advance(i + 1);
                    return Ok(total + i + 1);
                }
                None => {
                    let n = available.len();
                    buf.extend_from_slice(available);
                    self.advance(n);
                    total += n;
                }
            }
        }
    }

    /// Give back the wrapped reader
    pub fn into_inner(self) -> R {
        self.inner
    }
}

fn into_io(err: BiodexError) -> io::Error {
    match err {
        BiodexError::Io(e) => e,
        other => io::Error::new(io::ErrorKind::InvalidData, other),
    }
}

impl<R: Read + Seek> Read for BgzfReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let available = self.fill().map_err(into_io)?;
        let n = available.len().min(buf.len());
        buf[..n].copy_from_slice(&available[..n]);
        self.advance(n);
        Ok(n)
    }
}

impl<R: Read + Seek> BufRead for BgzfReader<R> {
    fn fill_buf(&mut self) -> io::Result<&[u8]> {
        self.fill().map_err(into_io)
    }

    fn consume(&mut self, amt: usize) {
        self.advance(amt)
    }
}

/// Single-threaded BGZF writer
///
/// Buffers up to [`BLOCK_DATA_LIMIT`] bytes per block. [`Self::flush_block`]
/// forces a block boundary at the current position, which is how callers
/// control where blocks split. Call [`Self::finish`] to write the EOF marker.
///
/// # Example
///
/// ```no_run
/// use biodex::io::bgzf::BgzfWriter;
/// use std::fs::File;
/// use std::io::Write;
///
/// # fn main() -> biodex::Result<()> {
/// let mut writer = BgzfWriter::new(File::create("reads.fa.bgz")?);
/// writer.write_all(b">r1\nACGT\n")?;
/// writer.finish()?;
/// # Ok(())
/// # }
/// ```
pub struct BgzfWriter<W: Write> {
    inner: W,
    buffer: Vec<u8>,
    compressed_offset: u64,
    level: Compression,
}

impl<W: Write> BgzfWriter<W> {
    /// Create a writer with the default compression level
    pub fn new(inner: W) -> Self {
        Self::with_level(inner, Compression::default())
    }

    /// Create a writer with an explicit compression level
    pub fn with_level(inner: W, level: Compression) -> Self {
        Self {
            inner,
            buffer: Vec::with_capacity(BLOCK_DATA_LIMIT),
            compressed_offset: 0,
            level,
        }
    }

    /// Virtual offset the next written byte will have
    pub fn virtual_position(&self) -> Result<VirtualOffset> {
        VirtualOffset::new(self.compressed_offset, self.buffer.len() as u16)
    }

    /// Compress a single block to BGZF format
    fn compress_block(data: &[u8], level: Compression) -> io::Result<Vec<u8>> {
        let mut deflate = DeflateEncoder::new(Vec::with_capacity(data.len() / 2), level);
        deflate.write_all(data)?;
        let deflated = deflate.finish()?;

        let mut block = Vec::with_capacity(deflated.len() + 26);
        block.extend_from_slice(&[31, 139, 8, 4, 0, 0, 0, 0, 0, 255]);
        block.extend_from_slice(&6u16.to_le_bytes()); // XLEN
        block.extend_from_slice(&[66, 67]); // SI1='B', SI2='C'
        block.extend_from_slice(&2u16.to_le_bytes()); // SLEN
        let bsize_pos = block.len();
        block.extend_from_slice(&0u16.to_le_bytes()); // BSIZE placeholder
        block.extend_from_slice(&deflated);
        block.extend_from_slice(&crc32fast::hash(data).to_le_bytes());
        block.extend_from_slice(&(data.len() as u32).to_le_bytes());

        let total_size = block.len();
        if total_size > MAX_BLOCK_SIZE {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("compressed block of {} bytes exceeds BSIZE range", total_size),
            ));
        }
        let bsize = (total_size - 1) as u16;
        block[bsize_pos..bsize_pos + 2].copy_from_slice(&bsize.to_le_bytes());

        Ok(block)
    }

    fn write_block(&mut self, data: &[u8]) -> io::Result<()> {
        let block = match Self::compress_block(data, self.level) {
            Ok(block) => block,
            // Incompressible data can overflow BSIZE; fall back to stored deflate
            Err(_) => Self::compress_block(data, Compression::none())?,
        };
        self.inner.write_all(&block)?;
        self.compressed_offset += block.len() as u64;
        Ok(())
    }

    /// Close the current block (no-op when it is empty)
    pub fn flush_block(&mut self) -> io::Result<()> {
        if self.buffer.is_empty() {
            return Ok(());
        }
        let data = std::mem::take(&mut self.buffer);
        self.write_block(&data)?;
        self.buffer = data;
        self.buffer.clear();
        Ok(())
    }

    /// Flush remaining data, write the EOF marker, and return the inner writer
    pub fn finish(mut self) -> Result<W> {
        self.flush_block()?;
        self.inner.write_all(&BGZF_EOF)?;
        self.inner.flush()?;
        Ok(self.inner)
    }
}

impl<W: Write> Write for BgzfWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut remaining = buf;

        while !remaining.is_empty() {
            let space_in_block = BLOCK_DATA_LIMIT - self.buffer.len();
            let to_copy = remaining.len().min(space_in_block);

            self.buffer.extend_from_slice(&remaining[..to_copy]);
            remaining = &remaining[to_copy..];

            if self.buffer.len() >= BLOCK_DATA_LIMIT {
                self.flush_block()?;
            }
        }

        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.flush_block()?;
        self.inner.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn bgzf_bytes(chunks: &[&[u8]]) -> Vec<u8> {
        let mut writer = BgzfWriter::new(Vec::new());
        for chunk in chunks {
            writer.write_all(chunk).unwrap();
            writer.flush_block().unwrap();
        }
        writer.finish().unwrap()
    }

    #[test]
    fn test_virtual_offset_parts() {
        let offset = VirtualOffset::encode(0x116, 0x20).unwrap();
        assert_eq!(offset.as_raw(), 0x1160020);
        assert_eq!(offset.decode(), (0x116, 0x20));
        assert_eq!(offset.to_string(), "278:32");
    }

    #[test]
    fn test_virtual_offset_rejects_out_of_range() {
        assert!(matches!(
            VirtualOffset::encode(0, 65536),
            Err(BiodexError::InvalidOffset(_))
        ));
        assert!(matches!(
            VirtualOffset::encode(1 << 48, 0),
            Err(BiodexError::InvalidOffset(_))
        ));
        assert!(VirtualOffset::encode((1 << 48) - 1, 65535).is_ok());
    }

    #[test]
    fn test_virtual_offset_ordering() {
        let a = VirtualOffset::encode(10, 65535).unwrap();
        let b = VirtualOffset::encode(11, 0).unwrap();
        assert!(a < b);
    }

    #[test]
    fn test_block_format() {
        let data = bgzf_bytes(&[b"BGZF format validation test\n"]);

        assert_eq!(&data[..2], &GZIP_MAGIC);
        assert_eq!(data[3] & 0x04, 0x04);
        assert_eq!(u16::from_le_bytes([data[10], data[11]]), 6);
        assert_eq!(data[12], 66);
        assert_eq!(data[13], 67);
        assert!(is_bgzf_header(&data));
        assert_eq!(&data[data.len() - 28..], &BGZF_EOF);
    }

    #[test]
    fn test_sequential_read_crosses_blocks() {
        let data = bgzf_bytes(&[b"first block\nsecond ", b"half\nthird\n"]);
        let mut reader = BgzfReader::new(Cursor::new(data));

        let mut all = Vec::new();
        reader.read_to_end(&mut all).unwrap();
        assert_eq!(all, b"first block\nsecond half\nthird\n");
    }

    #[test]
    fn test_seek_and_tell() {
        let data = bgzf_bytes(&[b"AAAA\nBBBB\n", b"CCCC\n"]);
        let mut reader = BgzfReader::new(Cursor::new(data));

        let mut line = Vec::new();
        reader.read_until_byte(b'\n', &mut line).unwrap();
        let second = reader.virtual_position();
        assert_eq!(second.decode(), (0, 5));

        line.clear();
        reader.read_until_byte(b'\n', &mut line).unwrap();
        // End of block 0 reports the start of block 1
        let third = reader.virtual_position();
        assert_eq!(third.within_block(), 0);
        assert!(third.block_start() > 0);

        reader.seek_virtual(third).unwrap();
        line.clear();
        reader.read_until_byte(b'\n', &mut line).unwrap();
        assert_eq!(line, b"CCCC\n");

        reader.seek_virtual(second).unwrap();
        line.clear();
        reader.read_until_byte(b'\n', &mut line).unwrap();
        assert_eq!(line, b"BBBB\n");
    }

    #[test]
    fn test_seek_past_block_end_fails() {
        let data = bgzf_bytes(&[b"tiny\n"]);
        let mut reader = BgzfReader::new(Cursor::new(data));
        let result = reader.seek_virtual(VirtualOffset::encode(0, 100).unwrap());
        assert!(matches!(result, Err(BiodexError::InvalidOffset(_))));
    }

    #[test]
    fn test_crc_mismatch_is_corrupt() {
        let mut data = bgzf_bytes(&[b"checksummed payload\n"]);
        // CRC32 sits 8 bytes before the end of the first block
        let first_block_len = u16::from_le_bytes([data[16], data[17]]) as usize + 1;
        data[first_block_len - 8] ^= 0xFF;

        let mut reader = BgzfReader::new(Cursor::new(data));
        let result = reader.fill().map(|b| b.to_vec());
        assert!(matches!(result, Err(BiodexError::CorruptContainer { offset: 0, .. })));
    }

    #[test]
    fn test_failed_block_is_not_reused() {
        let mut data = bgzf_bytes(&[&b">A1\nACGT\n>A2\nGG"[..], &b"TTTTTTTT\n"[..]]);
        let first_block_len = u16::from_le_bytes([data[16], data[17]]) as usize + 1;
        let second_block_len =
            u16::from_le_bytes([data[first_block_len + 16], data[first_block_len + 17]]) as usize + 1;
        data[first_block_len + second_block_len - 8] ^= 0xFF;

        let mut reader = BgzfReader::new(Cursor::new(data));
        reader.seek_virtual(VirtualOffset::new(0, 13).unwrap()).unwrap();
        let mut crossing = Vec::new();
        let result = reader.read_until_byte(b'\n', &mut crossing);
        assert!(matches!(
            result,
            Err(BiodexError::CorruptContainer { offset, .. }) if offset == first_block_len as u64
        ));

        // The healthy first block still reads back intact
        reader.seek_virtual(VirtualOffset::new(0, 0).unwrap()).unwrap();
        let mut line = Vec::new();
        reader.read_until_byte(b'\n', &mut line).unwrap();
        assert_eq!(line, b">A1\n");

        // A failed read without a seek retries the same block
        reader.seek_virtual(VirtualOffset::new(0, 13).unwrap()).unwrap();
        let mut again = Vec::new();
        assert!(reader.read_until_byte(b'\n', &mut again).is_err());
        assert!(reader.fill().is_err());
    }

    #[test]
    fn test_truncated_block_is_corrupt() {
        let data = bgzf_bytes(&[b"some data that will be cut\n"]);
        let cut = data[..30].to_vec();
        let mut reader = BgzfReader::new(Cursor::new(cut));
        assert!(matches!(
            reader.fill().map(|b| b.len()),
            Err(BiodexError::CorruptContainer { .. })
        ));
    }

    #[test]
    fn test_writer_splits_large_input() {
        let payload = vec![b'X'; BLOCK_DATA_LIMIT * 2 + 10];
        let mut writer = BgzfWriter::new(Vec::new());
        writer.write_all(&payload).unwrap();
        let data = writer.finish().unwrap();

        let mut reader = BgzfReader::new(Cursor::new(data));
        let mut out = Vec::new();
        reader.read_to_end(&mut out).unwrap();
        assert_eq!(out, payload);
    }

    #[test]
    fn test_plain_gzip_is_not_bgzf() {
        use flate2::write::GzEncoder;
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(b"plain gzip\n").unwrap();
        let data = encoder.finish().unwrap();

        assert!(is_gzip_header(&data));
        assert!(!is_bgzf_header(&data));
    }
}
