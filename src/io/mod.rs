//! I/O module: seekable sources and the BGZF container
//!
//! Plain files and BGZF files look the same to the rest of the crate once
//! opened as a [`ByteSource`]; only the meaning of offsets differs.

pub mod bgzf;
pub mod source;

pub use bgzf::{BgzfReader, BgzfWriter, VirtualOffset};
pub use source::{ByteSource, Compression};
