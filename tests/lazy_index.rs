//! Integration tests for the in-memory lazy index

use biodex::formats::SeqRecords;
use biodex::io::BgzfWriter;
use biodex::{BiodexError, FastqVariant, Format, KeyFn, LazyIndex, SequenceParser};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

fn write_plain(dir: &Path, name: &str, data: &[u8]) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, data).unwrap();
    path
}

/// Write `chunks` as BGZF, one block per chunk
fn write_bgzf(dir: &Path, name: &str, chunks: &[&[u8]]) -> PathBuf {
    let path = dir.join(name);
    let mut writer = BgzfWriter::new(fs::File::create(&path).unwrap());
    for chunk in chunks {
        writer.write_all(chunk).unwrap();
        writer.flush_block().unwrap();
    }
    writer.finish().unwrap();
    path
}

#[test]
fn test_three_record_fasta_scenario() {
    let dir = TempDir::new().unwrap();
    let path = write_plain(dir.path(), "three.fa", b">A1\nAC\n>A2\nGGT\n>A3\nT\n");
    let mut index = LazyIndex::build(&path, Format::Fasta, None).unwrap();

    assert_eq!(index.len(), 3);
    assert_eq!(index.keys().unwrap().collect::<Vec<_>>(), ["A1", "A2", "A3"]);
    assert_eq!(index.get_raw("A2").unwrap(), b">A2\nGGT\n");

    let a3 = index.get("A3", &SequenceParser).unwrap();
    assert_eq!(a3.id, "A3");
    assert_eq!(a3.sequence, b"T");

    assert!(matches!(index.get_raw("A9"), Err(BiodexError::KeyNotFound(_))));
}

#[test]
fn test_bgzf_record_spanning_two_blocks() {
    let dir = TempDir::new().unwrap();
    let whole: &[u8] = b">A1\nACGT\n>A2 spans\nGGGGCCCC\nTTTTAAAA\n>A3\nC\n";
    let split = 18; // inside A2
    let path = write_bgzf(dir.path(), "split.fa.gz", &[&whole[..split], &whole[split..]]);

    let mut index = LazyIndex::build(&path, Format::Fasta, None).unwrap();
    assert_eq!(index.get_raw("A2").unwrap(), b">A2 spans\nGGGGCCCC\nTTTTAAAA\n");
    assert_eq!(index.get_raw("A3").unwrap(), b">A3\nC\n");
    assert_eq!(index.get_raw("A1").unwrap(), b">A1\nACGT\n");
}

#[test]
fn test_bgzf_offsets_are_virtual() {
    let dir = TempDir::new().unwrap();
    let path = write_bgzf(dir.path(), "two.fa.gz", &[&b">A1\nAC\n"[..], &b">A2\nGT\n"[..]]);
    let index = LazyIndex::build(&path, Format::Fasta, None).unwrap();

    let a1 = index.locate("A1").unwrap();
    let a2 = index.locate("A2").unwrap();
    assert_eq!(a1.offset, 0);
    // A2 starts a new block: non-zero block start, zero within-block offset
    assert!(a2.offset >> 16 > 0);
    assert_eq!(a2.offset & 0xffff, 0);
    assert_eq!(a2.length, 7);
}

#[test]
fn test_raw_then_parse_matches_sequential_parse() {
    let dir = TempDir::new().unwrap();
    let data = b"@r1 lane=1\nACGTACGT\n+\nIIIIIIII\n@r2\nGGG\nCC\n+\n@@@\n@@\n@r3\nT\n+r3\n#\n";
    let fastq = Format::Fastq(FastqVariant::Illumina);
    let path = write_plain(dir.path(), "reads.fq", data);

    let sequential: Vec<_> = SeqRecords::new(&data[..], fastq)
        .unwrap()
        .collect::<biodex::Result<_>>()
        .unwrap();

    let mut index = LazyIndex::build(&path, fastq, None).unwrap();
    let keys: Vec<String> = index.keys().unwrap().map(str::to_string).collect();
    let ids: Vec<&str> = sequential.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(keys, ids);

    for expected in &sequential {
        assert_eq!(&index.get(&expected.id, &SequenceParser).unwrap(), expected);
    }
}

#[test]
fn test_corrupt_block_does_not_poison_later_lookups() {
    let dir = TempDir::new().unwrap();
    let path = write_bgzf(dir.path(), "two.fa.gz", &[&b">A1\nACGT\n>A2\nGG"[..], &b"TTTTTTTT\n"[..]]);
    let mut index = LazyIndex::build(&path, Format::Fasta, None).unwrap();

    // Flip a byte of the second block's CRC32
    let mut data = fs::read(&path).unwrap();
    let first_len = u16::from_le_bytes([data[16], data[17]]) as usize + 1;
    let second_len = u16::from_le_bytes([data[first_len + 16], data[first_len + 17]]) as usize + 1;
    data[first_len + second_len - 8] ^= 0xFF;
    fs::write(&path, &data).unwrap();

    assert!(matches!(
        index.get_raw("A2"),
        Err(BiodexError::CorruptContainer { .. })
    ));
    assert_eq!(index.get_raw("A1").unwrap(), b">A1\nACGT\n");
    assert!(matches!(
        index.get_raw("A2"),
        Err(BiodexError::CorruptContainer { .. })
    ));
}

#[test]
fn test_key_function() {
    let dir = TempDir::new().unwrap();
    let path = write_plain(
        dir.path(),
        "ncbi.fa",
        b">gi|1|ref|NM_000001.1| one\nAC\n>gi|2|ref|NM_000002.3| two\nGT\n",
    );
    let key_fn: KeyFn = Arc::new(|id: &str| id.split('|').nth(3).unwrap_or(id).to_string());
    let mut index = LazyIndex::build(&path, Format::Fasta, Some(key_fn)).unwrap();

    assert!(index.contains("NM_000002.3").unwrap());
    assert_eq!(
        index.get_raw("NM_000001.1").unwrap(),
        b">gi|1|ref|NM_000001.1| one\nAC\n"
    );
}

#[test]
fn test_genbank_in_bgzf() {
    let dir = TempDir::new().unwrap();
    let first: &[u8] = b"LOCUS       X1   4 bp\nACCESSION   X1\nVERSION     X1.2\nORIGIN\n        1 acgt\n//\n";
    let second: &[u8] = b"LOCUS       Y1   2 bp\nACCESSION   Y1\n//\n";
    let path = write_bgzf(dir.path(), "two.gb.gz", &[first, second]);

    let mut index = LazyIndex::build(&path, Format::GenBank, None).unwrap();
    assert_eq!(index.keys().unwrap().collect::<Vec<_>>(), ["X1.2", "Y1"]);
    assert_eq!(index.get_raw("X1.2").unwrap(), first);
    assert_eq!(index.get_raw("Y1").unwrap(), second);
}

#[test]
fn test_plain_gzip_rejected() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("reads.fa.gz");
    let mut encoder = flate2::write::GzEncoder::new(
        fs::File::create(&path).unwrap(),
        flate2::Compression::default(),
    );
    encoder.write_all(b">A1\nAC\n").unwrap();
    encoder.finish().unwrap();

    assert!(matches!(
        LazyIndex::build(&path, Format::Fasta, None),
        Err(BiodexError::Format(_))
    ));
}

#[test]
fn test_malformed_input_fails_build() {
    let dir = TempDir::new().unwrap();
    let path = write_plain(dir.path(), "bad.fq", b"@r1\nACGT\n+\nII\n");
    let result = LazyIndex::build(&path, Format::Fastq(FastqVariant::Sanger), None);
    assert!(matches!(result, Err(BiodexError::MalformedRecord { .. })));
}
