//! Integration tests for the persistent multi-file index

use biodex::io::BgzfWriter;
use biodex::{
    BiodexError, Compression, Format, IndexStore, LazyIndex, RecordLocator, SequenceParser,
    SourceSpec, StoreOptions,
};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn write_plain(dir: &Path, name: &str, data: &[u8]) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, data).unwrap();
    path
}

fn locators(store: &IndexStore) -> Vec<RecordLocator> {
    let mut all = Vec::new();
    store.for_each_locator(|locator| all.push(locator)).unwrap();
    all
}

#[test]
fn test_two_file_store_scenario() {
    let dir = TempDir::new().unwrap();
    let sources = [
        SourceSpec::new(write_plain(dir.path(), "a.fa", b">A1\nAC\n>A2\nGT\n"), Format::Fasta),
        SourceSpec::new(write_plain(dir.path(), "b.fa", b">B1\nTT\n>B2\nGG\n"), Format::Fasta),
    ];
    let store_path = dir.path().join("ab.idx");
    let store = IndexStore::build(&store_path, &sources, &StoreOptions::default()).unwrap();

    assert_eq!(store.len(), 4);
    assert_eq!(store.get_raw("B1").unwrap(), b">B1\nTT\n");
    assert_eq!(store.locate("B1").unwrap().file_id, Some(1));
    assert_eq!(store.locate("A2").unwrap().file_id, Some(0));
    store.close().unwrap();

    // Reopening serves the same lookups without rescanning
    let reopened = IndexStore::open(&store_path).unwrap();
    assert_eq!(reopened.keys().unwrap(), ["A1", "A2", "B1", "B2"]);
    assert_eq!(reopened.get("B2", &SequenceParser).unwrap().sequence, b"GG");
}

#[test]
fn test_shared_key_fails_without_usable_store() {
    let dir = TempDir::new().unwrap();
    let sources = [
        SourceSpec::new(write_plain(dir.path(), "a.fa", b">A1\nAC\n>A2\nGT\n"), Format::Fasta),
        SourceSpec::new(write_plain(dir.path(), "b.fa", b">B1\nTT\n>A1\nGG\n"), Format::Fasta),
    ];
    let store_path = dir.path().join("ab.idx");

    let result = IndexStore::build(&store_path, &sources, &StoreOptions::default());
    assert!(matches!(result, Err(BiodexError::DuplicateKey(ref key)) if key == "A1"));
    assert!(IndexStore::open(&store_path).is_err());
}

#[test]
fn test_rebuild_is_deterministic() {
    let dir = TempDir::new().unwrap();
    let sources = [
        SourceSpec::new(
            write_plain(dir.path(), "a.fq", b"@r1\nACGT\n+\nIIII\n@r2\nGG\n+\nII\n"),
            Format::from_name("fastq").unwrap(),
        ),
        SourceSpec::new(write_plain(dir.path(), "b.tsv", b"t1\tAAA\nt2\tCCC\n"), Format::Tab),
    ];

    let first = IndexStore::build(dir.path().join("one.idx"), &sources, &StoreOptions::default()).unwrap();
    let second = IndexStore::build(dir.path().join("two.idx"), &sources, &StoreOptions::default()).unwrap();

    assert_eq!(locators(&first), locators(&second));
    assert_eq!(first.files(), second.files());

    // Rebuilding over an existing store replaces it with the same content
    let again = IndexStore::build(dir.path().join("one.idx"), &sources, &StoreOptions::default()).unwrap();
    assert_eq!(locators(&again), locators(&second));
}

#[test]
fn test_store_matches_per_file_indexes() {
    let dir = TempDir::new().unwrap();
    let a = write_plain(dir.path(), "a.fa", b">x1\nA\n>x2\nC\n>x3\nG\n");
    let b = write_plain(dir.path(), "b.fa", b">y1\nT\n");
    let sources = [SourceSpec::new(&a, Format::Fasta), SourceSpec::new(&b, Format::Fasta)];
    let store = IndexStore::build(dir.path().join("xy.idx"), &sources, &StoreOptions::default()).unwrap();

    let mut expected = 0;
    for (file_id, path) in [&a, &b].into_iter().enumerate() {
        let mut single = LazyIndex::build(path, Format::Fasta, None).unwrap();
        expected += single.len();
        let keys: Vec<String> = single.keys().unwrap().map(str::to_string).collect();
        for key in keys {
            let locator = store.locate(&key).unwrap();
            assert_eq!(locator.file_id, Some(file_id as u32));
            assert_eq!(store.get_raw(&key).unwrap(), single.get_raw(&key).unwrap());
        }
    }
    assert_eq!(store.len(), expected);
    assert_eq!(store.counts_by_file().unwrap(), [(0, 3), (1, 1)]);
}

#[test]
fn test_bgzf_and_plain_sources() {
    let dir = TempDir::new().unwrap();
    let bgzf_path = dir.path().join("a.fa.gz");
    let mut writer = BgzfWriter::new(fs::File::create(&bgzf_path).unwrap());
    writer.write_all(b">Z1\nACGTACGT\n>Z2\nGG").unwrap();
    writer.flush_block().unwrap();
    writer.write_all(b"CC\n").unwrap();
    writer.finish().unwrap();

    let sources = [
        SourceSpec::new(&bgzf_path, Format::Fasta),
        SourceSpec::new(write_plain(dir.path(), "b.fa", b">P1\nTT\n"), Format::Fasta),
    ];
    let store = IndexStore::build(dir.path().join("zp.idx"), &sources, &StoreOptions::default()).unwrap();

    assert_eq!(store.files()[0].compression, Compression::Bgzf);
    assert_eq!(store.files()[1].compression, Compression::Plain);
    assert_eq!(store.get_raw("Z2").unwrap(), b">Z2\nGGCC\n");
    assert_eq!(store.get_raw("P1").unwrap(), b">P1\nTT\n");
}

#[test]
fn test_store_moves_with_its_sources() {
    let dir = TempDir::new().unwrap();
    let original = dir.path().join("original");
    fs::create_dir(&original).unwrap();
    let sources = [SourceSpec::new(
        write_plain(&original, "a.fa", b">A1\nAC\n"),
        Format::Fasta,
    )];
    IndexStore::build(original.join("a.idx"), &sources, &StoreOptions::default())
        .unwrap()
        .close()
        .unwrap();

    let moved = dir.path().join("moved");
    fs::rename(&original, &moved).unwrap();

    let store = IndexStore::open(moved.join("a.idx")).unwrap();
    assert_eq!(store.get_raw("A1").unwrap(), b">A1\nAC\n");
}

#[test]
fn test_missing_source_surfaces_on_lookup() {
    let dir = TempDir::new().unwrap();
    let path = write_plain(dir.path(), "a.fa", b">A1\nAC\n");
    let store = IndexStore::build(
        dir.path().join("a.idx"),
        &[SourceSpec::new(&path, Format::Fasta)],
        &StoreOptions::default(),
    )
    .unwrap();

    fs::remove_file(&path).unwrap();
    assert!(matches!(store.get_raw("A1"), Err(BiodexError::Io(_))));
    assert_eq!(store.check_sources().unwrap().len(), 1);
}

#[test]
fn test_open_missing_store() {
    let dir = TempDir::new().unwrap();
    assert!(matches!(
        IndexStore::open(dir.path().join("nope.idx")),
        Err(BiodexError::Io(_))
    ));
}
