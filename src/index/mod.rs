//! Key-addressed indexes over record files
//!
//! - [`LazyIndex`]: one file, offsets held in memory, lives as long as the process
//! - [`IndexStore`]: any number of files, offsets kept in an SQLite file and
//!   reused across runs

pub mod memory;
pub mod store;

pub use memory::LazyIndex;
pub use store::{IndexStore, SCHEMA_VERSION};
