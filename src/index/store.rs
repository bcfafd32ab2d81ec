//! Persistent, multi-file index backed by SQLite
//!
//! A store is built once by scanning every source file, and is read-only
//! afterwards. It holds the file registry and one locator row per record:
//!
//! ```text
//! meta_data(key TEXT PRIMARY KEY, value TEXT)     schema_version, count, format
//! file_data(file_number INTEGER PRIMARY KEY, name TEXT, format TEXT,
//!           compression TEXT, size INTEGER)
//! offset_data(key TEXT, file_number INTEGER, offset INTEGER, length INTEGER)
//! UNIQUE INDEX key_index ON offset_data(key)
//! ```
//!
//! Builds write to a temporary file in the store's directory and rename it
//! into place only after every source scanned cleanly and the key index was
//! created. A failed build leaves any existing store untouched.
//!
//! # Example
//!
//! ```no_run
//! use biodex::config::{SourceSpec, StoreOptions};
//! use biodex::formats::Format;
//! use biodex::index::IndexStore;
//!
//! # fn main() -> biodex::Result<()> {
//! let sources = [
//!     SourceSpec::new("uniprot_a.dat", Format::SwissProt),
//!     SourceSpec::new("uniprot_b.dat", Format::SwissProt),
//! ];
//! let store = IndexStore::open_or_build("uniprot.idx", &sources, &StoreOptions::default())?;
//! let raw = store.get_raw("P68250")?;
//! # let _ = raw;
//! # Ok(())
//! # }
//! ```

use crate::config::{SourceSpec, StoreOptions};
use crate::error::{BiodexError, Result};
use crate::formats::{Format, RecordParser};
use crate::io::source::{ByteSource, Compression};
use crate::types::{FileId, RecordLocator, ScannedRecord, SourceDrift, SourceFile};
use rusqlite::{params, Connection, ErrorCode, OpenFlags, OptionalExtension, Transaction};
use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Layout version written to `meta_data.schema_version`
pub const SCHEMA_VERSION: &str = "1";

/// `meta_data.format` value when sources have different formats
const MIXED_FORMAT: &str = "mixed";

const REQUIRED_TABLES: [&str; 3] = ["meta_data", "file_data", "offset_data"];

const CREATE_TABLES: &str = "
    CREATE TABLE meta_data (key TEXT PRIMARY KEY, value TEXT);
    CREATE TABLE file_data (
        file_number INTEGER PRIMARY KEY,
        name TEXT,
        format TEXT,
        compression TEXT,
        size INTEGER
    );
    CREATE TABLE offset_data (key TEXT, file_number INTEGER, offset INTEGER, length INTEGER);
";

/// Read-only handle on a built store
#[derive(Debug)]
pub struct IndexStore {
    path: PathBuf,
    /// Directory relative source paths are resolved against
    base_dir: PathBuf,
    conn: Connection,
    files: Vec<SourceFile>,
    format: Option<Format>,
    count: u64,
}

impl IndexStore {
    /// Scan `sources` and write a new store to `store_path`
    ///
    /// Sources are registered in order, so the first one is file 0. An
    /// existing store at `store_path` is replaced only if the build succeeds.
    pub fn build<P: AsRef<Path>>(
        store_path: P,
        sources: &[SourceSpec],
        options: &StoreOptions,
    ) -> Result<Self> {
        let store_path = store_path.as_ref();
        if sources.is_empty() {
            return Err(BiodexError::Format("no source files to index".to_string()));
        }
        let base_dir = store_dir(store_path)?;

        let tmp = tempfile::Builder::new()
            .prefix(".biodex-")
            .suffix(".tmp")
            .tempfile_in(&base_dir)?;
        let mut conn = Connection::open(tmp.path())?;
        conn.execute_batch(CREATE_TABLES)?;

        let tx = conn.transaction()?;
        let mut count = 0u64;
        for (i, spec) in sources.iter().enumerate() {
            let file_id = FileId::try_from(i)
                .map_err(|_| BiodexError::Format("too many source files".to_string()))?;
            count += load_source(&tx, file_id, spec, &base_dir, options)?;
        }

        let format = shared_format(sources);
        {
            let mut stmt = tx.prepare("INSERT INTO meta_data (key, value) VALUES (?1, ?2)")?;
            stmt.execute(params!["schema_version", SCHEMA_VERSION])?;
            stmt.execute(params!["count", count.to_string()])?;
            stmt.execute(params![
                "format",
                format.map_or(MIXED_FORMAT, |format| format.name())
            ])?;
        }
        tx.commit()?;

        create_key_index(&conn)?;
        conn.close().map_err(|(_, e)| e)?;

        tmp.persist(store_path).map_err(|e| BiodexError::Io(e.error))?;
        info!(
            store = %store_path.display(),
            files = sources.len(),
            records = count,
            "built index store"
        );

        Self::open(store_path)
    }

    /// Open an existing store without touching its source files
    pub fn open<P: AsRef<Path>>(store_path: P) -> Result<Self> {
        let store_path = store_path.as_ref();
        if !store_path.is_file() {
            return Err(BiodexError::Io(io::Error::new(
                io::ErrorKind::NotFound,
                format!("index store {:?} does not exist", store_path),
            )));
        }
        let base_dir = store_dir(store_path)?;
        let conn = Connection::open_with_flags(
            store_path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;

        check_tables(&conn)?;

        let version = meta_value(&conn, "schema_version")?;
        if version.as_deref() != Some(SCHEMA_VERSION) {
            return Err(BiodexError::IncompatibleStore(format!(
                "schema version {} (expected {})",
                version.as_deref().unwrap_or("missing"),
                SCHEMA_VERSION
            )));
        }

        let count = match meta_value(&conn, "count")? {
            Some(value) => value.parse::<u64>().map_err(|_| {
                BiodexError::IncompatibleStore(format!("invalid record count '{}'", value))
            })?,
            None => {
                return Err(BiodexError::IncompatibleStore(
                    "record count missing".to_string(),
                ))
            }
        };
        let rows: i64 = conn.query_row("SELECT COUNT(*) FROM offset_data", [], |row| row.get(0))?;
        if u64::try_from(rows).ok() != Some(count) {
            return Err(BiodexError::IncompatibleStore(format!(
                "record count {} does not match {} stored locators",
                count, rows
            )));
        }

        let format = match meta_value(&conn, "format")?.as_deref() {
            None | Some(MIXED_FORMAT) => None,
            Some(name) => Some(Format::from_name(name).map_err(|_| {
                BiodexError::IncompatibleStore(format!("unknown format '{}'", name))
            })?),
        };

        let files = load_registry(&conn)?;
        info!(
            store = %store_path.display(),
            files = files.len(),
            records = count,
            "opened index store"
        );

        Ok(Self {
            path: store_path.to_path_buf(),
            base_dir,
            conn,
            files,
            format,
            count,
        })
    }

    /// Open `store_path` if it exists, otherwise build it from `sources`
    pub fn open_or_build<P: AsRef<Path>>(
        store_path: P,
        sources: &[SourceSpec],
        options: &StoreOptions,
    ) -> Result<Self> {
        let store_path = store_path.as_ref();
        if store_path.exists() {
            debug!(store = %store_path.display(), "store exists, skipping scan");
            Self::open(store_path)
        } else {
            Self::build(store_path, sources, options)
        }
    }

    /// Location of the store file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Format shared by all sources, `None` when they differ
    pub fn format(&self) -> Option<Format> {
        self.format
    }

    /// Registered source files, indexed by file id
    pub fn files(&self) -> &[SourceFile] {
        &self.files
    }

    /// Number of indexed records across all files
    pub fn len(&self) -> usize {
        usize::try_from(self.count).unwrap_or(usize::MAX)
    }

    /// True if no source held any records
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Where the record for `key` lives
    pub fn locate(&self, key: &str) -> Result<RecordLocator> {
        let mut stmt = self
            .conn
            .prepare_cached("SELECT file_number, offset, length FROM offset_data WHERE key = ?1")?;
        let row = stmt
            .query_row(params![key], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, i64>(2)?,
                ))
            })
            .optional()?;

        match row {
            Some((file_number, offset, length)) => {
                locator_from_row(key.to_string(), file_number, offset, length)
            }
            None => Err(BiodexError::KeyNotFound(key.to_string())),
        }
    }

    /// Whether `key` is indexed
    pub fn contains(&self, key: &str) -> Result<bool> {
        match self.locate(key) {
            Ok(_) => Ok(true),
            Err(BiodexError::KeyNotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Raw bytes of the record for `key`, exactly as stored
    ///
    /// The source file is opened for this lookup only.
    pub fn get_raw(&self, key: &str) -> Result<Vec<u8>> {
        let locator = self.locate(key)?;
        let file = self.file_for(&locator)?;
        let mut source = ByteSource::open_as(self.resolve(file), file.compression)?;
        file.format
            .extract_raw(&mut source, locator.offset, locator.length)
    }

    /// Parse the record for `key` with `parser`, using its file's format
    pub fn get<P: RecordParser>(&self, key: &str, parser: &P) -> Result<P::Record> {
        let locator = self.locate(key)?;
        let file = self.file_for(&locator)?;
        let mut source = ByteSource::open_as(self.resolve(file), file.compression)?;
        let raw = file
            .format
            .extract_raw(&mut source, locator.offset, locator.length)?;
        parser.parse(&raw, file.format)
    }

    /// Stream every locator, ordered by file then offset
    pub fn for_each_locator<F>(&self, mut f: F) -> Result<()>
    where
        F: FnMut(RecordLocator),
    {
        let mut stmt = self.conn.prepare(
            "SELECT key, file_number, offset, length FROM offset_data \
             ORDER BY file_number, offset",
        )?;
        let mut rows = stmt.query([])?;
        while let Some(row) = rows.next()? {
            f(locator_from_row(
                row.get(0)?,
                row.get(1)?,
                row.get(2)?,
                row.get(3)?,
            )?);
        }
        Ok(())
    }

    /// Stream every key without collecting them
    pub fn for_each_key<F>(&self, mut f: F) -> Result<()>
    where
        F: FnMut(&str),
    {
        self.for_each_locator(|locator| f(&locator.key))
    }

    /// All keys, ordered by file then offset
    pub fn keys(&self) -> Result<Vec<String>> {
        let mut keys = Vec::with_capacity(self.len());
        self.for_each_locator(|locator| keys.push(locator.key))?;
        Ok(keys)
    }

    /// Record count per registered file
    pub fn counts_by_file(&self) -> Result<Vec<(FileId, u64)>> {
        let mut counts: Vec<(FileId, u64)> = self.files.iter().map(|f| (f.file_id, 0)).collect();
        let mut stmt = self
            .conn
            .prepare("SELECT file_number, COUNT(*) FROM offset_data GROUP BY file_number")?;
        let mut rows = stmt.query([])?;
        while let Some(row) = rows.next()? {
            let file_number: i64 = row.get(0)?;
            let n: i64 = row.get(1)?;
            let slot = usize::try_from(file_number)
                .ok()
                .and_then(|i| counts.get_mut(i))
                .ok_or_else(|| {
                    BiodexError::IncompatibleStore(format!("unknown file number {}", file_number))
                })?;
            slot.1 = n as u64;
        }
        Ok(counts)
    }

    /// Compare every registered file with what is on disk now
    ///
    /// Reports files that are missing or whose size changed since the build.
    /// Nothing else checks this; lookups against a drifted file return
    /// whatever bytes sit at the recorded offsets.
    pub fn check_sources(&self) -> Result<Vec<SourceDrift>> {
        let mut drift = Vec::new();
        for file in &self.files {
            let path = self.resolve(file);
            match fs::metadata(&path) {
                Ok(meta) if meta.len() != file.size => drift.push(SourceDrift::Resized {
                    file_id: file.file_id,
                    path,
                    recorded: file.size,
                    current: meta.len(),
                }),
                Ok(_) => {}
                Err(e) if e.kind() == io::ErrorKind::NotFound => drift.push(SourceDrift::Missing {
                    file_id: file.file_id,
                    path,
                }),
                Err(e) => return Err(e.into()),
            }
        }
        for entry in &drift {
            warn!(store = %self.path.display(), "{}", entry);
        }
        Ok(drift)
    }

    /// Close the database connection
    pub fn close(self) -> Result<()> {
        self.conn.close().map_err(|(_, e)| BiodexError::Sqlite(e))
    }

    fn file_for(&self, locator: &RecordLocator) -> Result<&SourceFile> {
        locator
            .file_id
            .and_then(|id| self.files.get(id as usize))
            .ok_or_else(|| {
                BiodexError::IncompatibleStore(format!(
                    "record {} points at an unregistered file",
                    locator.key
                ))
            })
    }

    /// Absolute location of a registered file
    pub fn resolve(&self, file: &SourceFile) -> PathBuf {
        if file.path.is_absolute() {
            file.path.clone()
        } else {
            self.base_dir.join(&file.path)
        }
    }
}

/// Canonical directory containing `store_path`
fn store_dir(store_path: &Path) -> Result<PathBuf> {
    let dir = match store_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    Ok(fs::canonicalize(dir)?)
}

/// Path to record for `source`
fn stored_name(source: &Path, base_dir: &Path, relative: bool) -> Result<String> {
    let absolute = fs::canonicalize(source)?;
    let name = match absolute.strip_prefix(base_dir) {
        Ok(rel) if relative => rel.to_path_buf(),
        _ => absolute.clone(),
    };
    name.to_str().map(str::to_string).ok_or_else(|| {
        BiodexError::Format(format!("path {:?} is not valid UTF-8", absolute))
    })
}

fn shared_format(sources: &[SourceSpec]) -> Option<Format> {
    let first = sources.first()?.format;
    sources
        .iter()
        .all(|spec| spec.format == first)
        .then_some(first)
}

/// Register one source and insert its locators; returns the record count
fn load_source(
    tx: &Transaction<'_>,
    file_id: FileId,
    spec: &SourceSpec,
    base_dir: &Path,
    options: &StoreOptions,
) -> Result<u64> {
    let source = ByteSource::open(&spec.path)?;
    let compression = source.compression();
    let size = fs::metadata(&spec.path)?.len();
    let name = stored_name(&spec.path, base_dir, options.relative_paths)?;

    tx.execute(
        "INSERT INTO file_data (file_number, name, format, compression, size) \
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            file_id,
            name,
            spec.format.name(),
            compression.as_str(),
            to_sql_int(size)?
        ],
    )?;

    let mut stmt = tx.prepare_cached(
        "INSERT INTO offset_data (key, file_number, offset, length) VALUES (?1, ?2, ?3, ?4)",
    )?;
    let mut batch: Vec<ScannedRecord> = Vec::with_capacity(options.batch_size);
    let mut count = 0u64;
    let mut flush = |batch: &mut Vec<ScannedRecord>| -> Result<()> {
        for record in batch.drain(..) {
            stmt.execute(params![
                record.key,
                file_id,
                to_sql_int(record.offset)?,
                to_sql_int(record.length)?
            ])?;
        }
        Ok(())
    };

    for record in spec.format.scan(source, options.key_fn.clone()) {
        batch.push(record?);
        count += 1;
        if batch.len() >= options.batch_size {
            flush(&mut batch)?;
        }
    }
    flush(&mut batch)?;

    debug!(
        file = file_id,
        path = %spec.path.display(),
        format = %spec.format,
        compression = %compression,
        records = count,
        "indexed source"
    );
    Ok(count)
}

/// Create the unique key index, naming a duplicated key on failure
fn create_key_index(conn: &Connection) -> Result<()> {
    match conn.execute("CREATE UNIQUE INDEX key_index ON offset_data(key)", []) {
        Ok(_) => Ok(()),
        Err(rusqlite::Error::SqliteFailure(e, _)) if e.code == ErrorCode::ConstraintViolation => {
            let key: Option<String> = conn
                .query_row(
                    "SELECT key FROM offset_data GROUP BY key HAVING COUNT(*) > 1 \
                     ORDER BY MIN(rowid) LIMIT 1",
                    [],
                    |row| row.get(0),
                )
                .optional()?;
            Err(BiodexError::DuplicateKey(key.unwrap_or_default()))
        }
        Err(e) => Err(e.into()),
    }
}

fn check_tables(conn: &Connection) -> Result<()> {
    let mut stmt = conn
        .prepare("SELECT name FROM sqlite_master WHERE type = 'table'")
        .map_err(|e| BiodexError::IncompatibleStore(format!("not an index store: {}", e)))?;
    let tables = stmt
        .query_map([], |row| row.get::<_, String>(0))?
        .collect::<std::result::Result<HashSet<_>, _>>()?;

    for table in REQUIRED_TABLES {
        if !tables.contains(table) {
            return Err(BiodexError::IncompatibleStore(format!(
                "missing table {}",
                table
            )));
        }
    }
    Ok(())
}

fn meta_value(conn: &Connection, key: &str) -> Result<Option<String>> {
    Ok(conn
        .query_row(
            "SELECT value FROM meta_data WHERE key = ?1",
            params![key],
            |row| row.get(0),
        )
        .optional()?)
}

fn load_registry(conn: &Connection) -> Result<Vec<SourceFile>> {
    let mut stmt = conn.prepare(
        "SELECT file_number, name, format, compression, size FROM file_data \
         ORDER BY file_number",
    )?;
    let mut rows = stmt.query([])?;
    let mut files = Vec::new();

    while let Some(row) = rows.next()? {
        let file_number: i64 = row.get(0)?;
        let name: String = row.get(1)?;
        let format: String = row.get(2)?;
        let compression: String = row.get(3)?;
        let size: i64 = row.get(4)?;

        let bad = |what: &str| {
            BiodexError::IncompatibleStore(format!("file {}: {}", file_number, what))
        };
        if file_number != files.len() as i64 {
            return Err(bad("file numbers are not contiguous"));
        }
        files.push(SourceFile {
            file_id: files.len() as FileId,
            path: PathBuf::from(name),
            format: Format::from_name(&format).map_err(|_| bad("unknown format"))?,
            compression: compression
                .parse::<Compression>()
                .map_err(|_| bad("unknown compression"))?,
            size: u64::try_from(size).map_err(|_| bad("negative size"))?,
        });
    }
    Ok(files)
}

fn locator_from_row(key: String, file_number: i64, offset: i64, length: i64) -> Result<RecordLocator> {
    let (file_id, offset, length) = match (
        FileId::try_from(file_number),
        u64::try_from(offset),
        u64::try_from(length),
    ) {
        (Ok(file_id), Ok(offset), Ok(length)) => (file_id, offset, length),
        _ => {
            return Err(BiodexError::IncompatibleStore(format!(
                "invalid locator for {}",
                key
            )))
        }
    };
    Ok(RecordLocator {
        key,
        file_id: Some(file_id),
        offset,
        length,
    })
}

/// SQLite integers are signed 64-bit
fn to_sql_int(value: u64) -> Result<i64> {
    i64::try_from(value)
        .map_err(|_| BiodexError::InvalidOffset(format!("{} does not fit in an SQLite integer", value)))
}
