//! EMBL, IMGT and Swiss-Prot boundary scanning
//!
//! All three use two-letter line codes, start records at an `ID   ` line and
//! end them with `//`. They differ in how the key is chosen:
//!
//! - EMBL / IMGT: a new-style ID line (`ID   X56734; SV 1; linear; ...`)
//!   gives `X56734.1`; otherwise the first `AC` accession, replaced by the
//!   `SV` line's versioned accession when present; otherwise the ID name.
//! - Swiss-Prot: the first `AC` accession (primary accession).

use crate::error::{BiodexError, Result};
use crate::formats::genbank::is_terminator;
use crate::formats::scanner::{first_token, Boundary, LineReader};
use crate::formats::Format;

const MARKER: &[u8] = b"ID   ";

/// Accession-like token with trailing `;` removed
fn accession_token(rest: &[u8]) -> String {
    first_token(rest).trim_end_matches(';').to_string()
}

/// `ID   X56734; SV 1; ...` → `X56734.1`
fn versioned_id(rest: &[u8]) -> Option<String> {
    let text = String::from_utf8_lossy(rest);
    let mut fields = text.split(';').map(str::trim);
    let accession = fields.next()?;
    let version = fields.next()?.strip_prefix("SV ")?.trim();
    if accession.is_empty() || accession.contains(char::is_whitespace) || version.is_empty() {
        return None;
    }
    Some(format!("{}.{}", accession, version))
}

struct Entry {
    id_name: String,
    offset: u64,
    start: u64,
}

/// Walk one `ID` … `//` record, handing every body line to `on_line`
fn walk_record<F>(lines: &mut LineReader, format: Format, mut on_line: F) -> Result<Option<Entry>>
where
    F: FnMut(&[u8]),
{
    lines.skip_until(MARKER)?;

    let id_line = match lines.line() {
        None => return Ok(None),
        Some(line) => line.to_vec(),
    };
    on_line(&id_line);

    let entry = Entry {
        id_name: accession_token(&id_line[MARKER.len()..]),
        offset: lines.offset(),
        start: lines.consumed(),
    };
    lines.bump()?;

    let mut terminated = false;
    while let Some(line) = lines.line() {
        if line.starts_with(MARKER) {
            break;
        }
        if terminated {
            if !lines.is_blank() {
                return Err(lines.malformed(format, "text after '//' terminator"));
            }
        } else if is_terminator(line) {
            terminated = true;
        } else {
            on_line(line);
        }
        lines.bump()?;
    }

    if !terminated {
        return Err(lines.malformed(
            format,
            format!("record {} has no '//' terminator", entry.id_name),
        ));
    }
    Ok(Some(entry))
}

pub(crate) fn next_embl_record(lines: &mut LineReader, format: Format) -> Result<Option<Boundary>> {
    let mut from_id: Option<String> = None;
    let mut accession: Option<String> = None;
    let mut sequence_version: Option<String> = None;

    let entry = walk_record(lines, format, |line| {
        if let Some(rest) = line.strip_prefix(MARKER) {
            from_id = versioned_id(rest);
        } else if let Some(rest) = line.strip_prefix(b"AC   ") {
            if accession.is_none() {
                accession = Some(accession_token(rest)).filter(|acc| !acc.is_empty());
            }
        } else if let Some(rest) = line.strip_prefix(b"SV   ") {
            sequence_version = Some(first_token(rest)).filter(|sv| !sv.is_empty());
        }
    })?;

    let entry = match entry {
        Some(entry) => entry,
        None => return Ok(None),
    };

    let id = from_id
        .or(sequence_version)
        .or(accession)
        .unwrap_or(entry.id_name);

    Ok(Some(Boundary {
        id,
        offset: entry.offset,
        length: lines.consumed() - entry.start,
    }))
}

pub(crate) fn next_swiss_record(lines: &mut LineReader) -> Result<Option<Boundary>> {
    let format = Format::SwissProt;
    let mut accession: Option<String> = None;

    let entry = walk_record(lines, format, |line| {
        if let Some(rest) = line.strip_prefix(b"AC   ") {
            if accession.is_none() {
                accession = Some(accession_token(rest));
            }
        }
    })?;

    let entry = match entry {
        Some(entry) => entry,
        None => return Ok(None),
    };

    let id = match accession {
        Some(id) => id,
        None => {
            return Err(BiodexError::MalformedRecord {
                format: format.name(),
                offset: entry.offset,
                msg: format!("record {} has no AC line", entry.id_name),
            });
        }
    };

    Ok(Some(Boundary {
        id,
        offset: entry.offset,
        length: lines.consumed() - entry.start,
    }))
}
