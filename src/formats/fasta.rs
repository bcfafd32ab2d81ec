//! FASTA and QUAL boundary scanning
//!
//! A record runs from a `>` title line up to the next `>` title line or end
//! of file. Blank lines between records belong to the preceding record, so
//! raw extraction is byte-exact with the file. The key is the first
//! whitespace token of the title.
//!
//! ```text
//! >chr1 description        <- offset of chr1
//! ACGTACGT
//! >chr2                    <- offset of chr2 = offset of chr1 + length of chr1
//! GGGG
//! ```

use crate::error::Result;
use crate::formats::scanner::{first_token, Boundary, LineReader};
use crate::formats::Format;

const MARKER: &[u8] = b">";

pub(crate) fn next_record(lines: &mut LineReader, format: Format) -> Result<Option<Boundary>> {
    lines.skip_blank()?;

    let title = match lines.line() {
        None => return Ok(None),
        Some(line) if line.starts_with(MARKER) => first_token(&line[1..]),
        Some(_) => {
            return Err(lines.malformed(format, "expected '>' at start of record"));
        }
    };

    let offset = lines.offset();
    let start = lines.consumed();
    lines.bump()?;

    while lines.line().is_some() && !lines.starts_with(MARKER) {
        lines.bump()?;
    }

    Ok(Some(Boundary {
        id: title,
        offset,
        length: lines.consumed() - start,
    }))
}

#[cfg(test)]
mod tests {
    use crate::error::BiodexError;
    use crate::formats::Format;
    use crate::io::source::ByteSource;
    use crate::types::ScannedRecord;
    use tempfile::TempDir;

    fn scan(format: Format, data: &[u8]) -> crate::Result<Vec<ScannedRecord>> {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("in.fa");
        std::fs::write(&path, data).unwrap();
        format.scan(ByteSource::open(&path).unwrap(), None).collect()
    }

    #[test]
    fn test_three_records() {
        let data = b">A1 first\nACGT\n>A2\nGG\nTT\n>A3\nC\n";
        let records = scan(Format::Fasta, data).unwrap();

        assert_eq!(records.len(), 3);
        assert_eq!(records[0].key, "A1");
        assert_eq!((records[0].offset, records[0].length), (0, 15));
        assert_eq!(records[1].key, "A2");
        assert_eq!((records[1].offset, records[1].length), (15, 10));
        assert_eq!((records[2].offset, records[2].length), (25, 6));
    }

    #[test]
    fn test_leading_blank_lines_and_crlf() {
        let data = b"\n\r\n>x desc\r\nAC\r\n\r\n>y\r\nGT";
        let records = scan(Format::Fasta, data).unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].key, "x");
        assert_eq!(records[0].offset, 3);
        assert_eq!(records[0].length, 15);
        assert_eq!(records[1].key, "y");
        assert_eq!(records[1].length, 6);
    }

    #[test]
    fn test_text_before_first_record() {
        let result = scan(Format::Fasta, b"junk\n>x\nAC\n");
        assert!(matches!(
            result,
            Err(BiodexError::MalformedRecord { format: "fasta", offset: 0, .. })
        ));
    }

    #[test]
    fn test_empty_title_is_empty_key() {
        let result = scan(Format::Fasta, b">\nACGT\n");
        assert!(matches!(result, Err(BiodexError::EmptyKey { offset: 0 })));
    }

    #[test]
    fn test_qual_uses_title_token() {
        let records = scan(Format::Qual, b">q1\n40 40 30\n>q2\n20\n").unwrap();
        assert_eq!(records[0].key, "q1");
        assert_eq!(records[1].key, "q2");
    }

    #[test]
    fn test_empty_file() {
        assert!(scan(Format::Fasta, b"").unwrap().is_empty());
    }
}
