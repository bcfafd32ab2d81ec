//! FASTQ boundary scanning
//!
//! Handles wrapped (multi-line) records. Since quality lines may start with
//! `@` or `+`, the end of a record is found by counting: quality lines are
//! consumed until their length reaches the sequence length.
//!
//! ```text
//! @read1 optional description
//! ACGTAC
//! GT
//! +
//! @@@@@@
//! II
//! ```

use crate::error::Result;
use crate::formats::scanner::{first_token, Boundary, LineReader};
use crate::formats::Format;

/// Residue count of a sequence or quality line (terminator and whitespace excluded)
fn residues(line: &[u8]) -> u64 {
    line.iter().filter(|b| !b.is_ascii_whitespace()).count() as u64
}

pub(crate) fn next_record(lines: &mut LineReader, format: Format) -> Result<Option<Boundary>> {
    lines.skip_blank()?;

    let id = match lines.line() {
        None => return Ok(None),
        Some(line) if line.starts_with(b"@") => first_token(&line[1..]),
        Some(_) => {
            return Err(lines.malformed(format, "expected '@' at start of record"));
        }
    };

    let offset = lines.offset();
    let start = lines.consumed();
    lines.bump()?;

    let mut seq_len = 0u64;
    loop {
        match lines.line() {
            None => {
                return Err(lines.malformed(format, "end of file before '+' separator"));
            }
            Some(line) if line.starts_with(b"+") => break,
            Some(line) => seq_len += residues(line),
        }
        lines.bump()?;
    }
    lines.bump()?;

    let mut qual_len = 0u64;
    while qual_len < seq_len {
        match lines.line() {
            None => {
                return Err(lines.malformed(
                    format,
                    format!(
                        "end of file with {} of {} quality scores",
                        qual_len, seq_len
                    ),
                ));
            }
            Some(line) => qual_len += residues(line),
        }
        lines.bump()?;
    }

    if qual_len > seq_len {
        return Err(lines.malformed(
            format,
            format!(
                "quality length ({}) exceeds sequence length ({})",
                qual_len, seq_len
            ),
        ));
    }

    // Empty reads still carry an (empty) quality line
    if seq_len == 0 && lines.is_blank() {
        lines.bump()?;
    }

    lines.skip_blank()?;
    if lines.line().is_some() && !lines.starts_with(b"@") {
        return Err(lines.malformed(format, "unexpected line after quality scores"));
    }

    Ok(Some(Boundary {
        id,
        offset,
        length: lines.consumed() - start,
    }))
}
