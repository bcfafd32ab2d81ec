//! GenBank boundary scanning
//!
//! Records start at a `LOCUS` line and must contain a `//` terminator line.
//! Release header text before the first `LOCUS` is skipped.
//!
//! Key rule, in order of preference:
//! 1. the `VERSION` accession when it has the form `ACCESSION.N`
//! 2. the first `ACCESSION` token
//! 3. the `LOCUS` name

use crate::error::Result;
use crate::formats::scanner::{first_token, trim_end, Boundary, LineReader};
use crate::formats::Format;

const MARKER: &[u8] = b"LOCUS";

/// True for `ACC.N` where N is all digits
fn is_versioned(id: &str) -> bool {
    match id.split_once('.') {
        Some((acc, version)) => {
            !acc.is_empty()
                && !version.is_empty()
                && !version.contains('.')
                && version.bytes().all(|b| b.is_ascii_digit())
        }
        None => false,
    }
}

pub(crate) fn is_terminator(line: &[u8]) -> bool {
    trim_end(line) == b"//"
}

pub(crate) fn next_record(lines: &mut LineReader) -> Result<Option<Boundary>> {
    let format = Format::GenBank;
    lines.skip_until(MARKER)?;

    let locus = match lines.line() {
        None => return Ok(None),
        Some(line) => first_token(&line[MARKER.len()..]),
    };

    let offset = lines.offset();
    let start = lines.consumed();
    lines.bump()?;

    let mut accession: Option<String> = None;
    let mut version: Option<String> = None;
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
        } else if line.starts_with(b"ACCESSION ") && accession.is_none() {
            accession = Some(first_token(&line[b"ACCESSION".len()..]));
        } else if line.starts_with(b"VERSION ") {
            let token = first_token(&line[b"VERSION".len()..]);
            if is_versioned(&token) {
                version = Some(token);
            }
        }
        lines.bump()?;
    }

    if !terminated {
        return Err(lines.malformed(
            format,
            format!("record {} has no '//' terminator", locus),
        ));
    }

    let id = version
        .or(accession.filter(|acc| !acc.is_empty()))
        .unwrap_or(locus);

    Ok(Some(Boundary {
        id,
        offset,
        length: lines.consumed() - start,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BiodexError;
    use crate::io::source::ByteSource;
    use crate::types::ScannedRecord;
    use tempfile::TempDir;

    fn scan(data: &[u8]) -> crate::Result<Vec<ScannedRecord>> {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("in.gb");
        std::fs::write(&path, data).unwrap();
        Format::GenBank
            .scan(ByteSource::open(&path).unwrap(), None)
            .collect()
    }

    const TWO_RECORDS: &[u8] = b"GBBCT1.SEQ          Genetic Sequence Data Bank\n\
\n\
LOCUS       SCU49845     5028 bp    DNA             PLN       21-JUN-1999\n\
DEFINITION  Saccharomyces cerevisiae TCP1-beta gene.\n\
ACCESSION   U49845\n\
VERSION     U49845.1  GI:1293613\n\
ORIGIN\n\
        1 gatcctccat atacaacggt\n\
//\n\
LOCUS       AB000001     10 bp    DNA             PLN       01-JAN-2000\n\
ACCESSION   AB000001 AB000002\n\
VERSION     AB000001\n\
//\n";

    #[test]
    fn test_keys_and_boundaries() {
        let records = scan(TWO_RECORDS).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].key, "U49845.1");
        assert_eq!(records[1].key, "AB000001");

        let header_len = b"GBBCT1.SEQ          Genetic Sequence Data Bank\n\n".len() as u64;
        assert_eq!(records[0].offset, header_len);
        assert_eq!(records[0].offset + records[0].length, records[1].offset);
        assert_eq!(
            records[1].offset + records[1].length,
            TWO_RECORDS.len() as u64
        );
    }

    #[test]
    fn test_locus_name_fallback() {
        let records = scan(b"LOCUS       MYSEQ  4 bp\nORIGIN\n//\n").unwrap();
        assert_eq!(records[0].key, "MYSEQ");
    }

    #[test]
    fn test_missing_terminator() {
        let result = scan(b"LOCUS       A 4 bp\nACCESSION   A\nLOCUS       B 4 bp\n//\n");
        assert!(matches!(
            result,
            Err(BiodexError::MalformedRecord { format: "genbank", .. })
        ));
    }

    #[test]
    fn test_text_after_terminator() {
        let result = scan(b"LOCUS       A 4 bp\n//\nstray text\n");
        assert!(matches!(result, Err(BiodexError::MalformedRecord { .. })));
    }

    #[test]
    fn test_versioned_accession() {
        assert!(is_versioned("U49845.1"));
        assert!(!is_versioned("U49845"));
        assert!(!is_versioned("U49845.x"));
        assert!(!is_versioned("A.1.2"));
    }
}
