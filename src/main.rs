//! biodex command-line tool
//!
//! ```bash
//! # Index two FASTA files into one store
//! biodex build proteins.idx --format fasta a.fa b.fa.gz
//!
//! # Print raw records
//! biodex get proteins.idx P12345 P67890
//!
//! # Inspect the store
//! biodex keys proteins.idx
//! biodex stats proteins.idx
//! biodex check proteins.idx
//! ```
//!
//! Logging goes to stderr and is controlled by `BIODEX_LOG` (default `info`).

use biodex::config::{SourceSpec, StoreOptions, DEFAULT_BATCH_SIZE};
use biodex::{Format, IndexStore};
use clap::{Parser, Subcommand};
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "biodex")]
#[command(version, about = "Key-addressed random access into sequence record files", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan source files and write a new index store
    Build {
        /// Store file to create (replaced if it exists)
        store: PathBuf,

        /// Record format of every source (fasta, fastq, genbank, embl, swiss, tab, ...)
        #[arg(short, long)]
        format: Format,

        /// Record absolute source paths even when they lie under the store's directory
        #[arg(long)]
        absolute_paths: bool,

        /// Locators inserted per batch
        #[arg(long, default_value_t = DEFAULT_BATCH_SIZE)]
        batch_size: usize,

        /// Source files, plain or BGZF
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Write raw records to stdout
    Get {
        store: PathBuf,

        #[arg(required = true)]
        keys: Vec<String>,
    },

    /// List every key, by file then offset
    Keys { store: PathBuf },

    /// Show registered files and record counts
    Stats { store: PathBuf },

    /// Report source files that went missing or changed size since the build
    Check { store: PathBuf },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("BIODEX_LOG").unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    match run(cli.command) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(command: Commands) -> biodex::Result<ExitCode> {
    match command {
        Commands::Build {
            store,
            format,
            absolute_paths,
            batch_size,
            files,
        } => {
            let sources: Vec<SourceSpec> = files
                .iter()
                .map(|path| SourceSpec::new(path, format))
                .collect();
            let options = StoreOptions::new()
                .with_relative_paths(!absolute_paths)
                .with_batch_size(batch_size);

            let index = IndexStore::build(&store, &sources, &options)?;
            println!(
                "{}: {} records from {} files",
                store.display(),
                index.len(),
                index.files().len()
            );
            index.close()?;
        }

        Commands::Get { store, keys } => {
            let index = IndexStore::open(&store)?;
            let stdout = io::stdout();
            let mut out = stdout.lock();
            for key in &keys {
                out.write_all(&index.get_raw(key)?)?;
            }
            out.flush()?;
        }

        Commands::Keys { store } => {
            let index = IndexStore::open(&store)?;
            let stdout = io::stdout();
            let mut out = stdout.lock();
            let mut result = Ok(());
            index.for_each_key(|key| {
                if result.is_ok() {
                    result = writeln!(out, "{}", key);
                }
            })?;
            result?;
            out.flush()?;
        }

        Commands::Stats { store } => {
            let index = IndexStore::open(&store)?;
            let counts = index.counts_by_file()?;
            println!("store:   {}", index.path().display());
            println!(
                "format:  {}",
                index.format().map_or("mixed", |format| format.name())
            );
            println!("records: {}", index.len());
            for (file, (_, count)) in index.files().iter().zip(&counts) {
                println!(
                    "  [{}] {} ({}, {}, {} bytes): {} records",
                    file.file_id,
                    file.path.display(),
                    file.format,
                    file.compression,
                    file.size,
                    count
                );
            }
        }

        Commands::Check { store } => {
            let index = IndexStore::open(&store)?;
            let drift = index.check_sources()?;
            if drift.is_empty() {
                println!("{}: all {} source files unchanged", store.display(), index.files().len());
            } else {
                for entry in &drift {
                    println!("{}", entry);
                }
                return Ok(ExitCode::FAILURE);
            }
        }
    }
    Ok(ExitCode::SUCCESS)
}
