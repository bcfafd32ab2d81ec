//! Tab-separated `id<TAB>sequence` boundary scanning
//!
//! Every non-blank line is one record; the key is the first column.

use crate::error::Result;
use crate::formats::scanner::{Boundary, LineReader};
use crate::formats::Format;

pub(crate) fn next_record(lines: &mut LineReader) -> Result<Option<Boundary>> {
    lines.skip_blank()?;

    let id = match lines.line() {
        None => return Ok(None),
        Some(line) => match line.iter().position(|&b| b == b'\t') {
            Some(tab) => String::from_utf8_lossy(&line[..tab]).trim().to_string(),
            None => {
                return Err(lines.malformed(Format::Tab, "line has no tab separator"));
            }
        },
    };

    let offset = lines.offset();
    let start = lines.consumed();
    lines.bump()?;

    Ok(Some(Boundary {
        id,
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

    fn scan(data: &[u8]) -> crate::Result<Vec<ScannedRecord>> {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("in.tsv");
        std::fs::write(&path, data).unwrap();
        Format::Tab.scan(ByteSource::open(&path).unwrap(), None).collect()
    }

    #[test]
    fn test_one_record_per_line() {
        let records = scan(b"alpha\tACGT\n\nbeta\tGG\ngamma\tT").unwrap();
        let keys: Vec<_> = records.iter().map(|r| r.key.as_str()).collect();
        assert_eq!(keys, ["alpha", "beta", "gamma"]);
        assert_eq!((records[1].offset, records[1].length), (12, 8));
        assert_eq!(records[2].length, 7);
    }

    #[test]
    fn test_missing_tab() {
        let result = scan(b"alpha ACGT\n");
        assert!(matches!(
            result,
            Err(BiodexError::MalformedRecord { format: "tab", .. })
        ));
    }

    #[test]
    fn test_empty_first_column() {
        let result = scan(b"\tACGT\n");
        assert!(matches!(result, Err(BiodexError::EmptyKey { offset: 0 })));
    }
}
