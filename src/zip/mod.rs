//! ZIP archive parsing and extraction.
//!
//! This module reads the ZIP archive embedded in a CRX container. The
//! archive is already in memory, so all reads are bounds-checked slices
//! rather than I/O.
//!
//! [`ArchiveReader`] is the entry point: it lists the central directory
//! into normalized [`ArchiveEntry`] values, drops entries whose paths could
//! escape an extraction root, and inflates single files on demand with a
//! CRC check. [`ZipParser`] and the record types in `structures` are the
//! bounds-checked layer underneath.
//!
//! Handled: STORED and DEFLATE entries, ZIP64 directories, archive comments.
//! Not handled: encryption, multi-disk archives, other compression methods
//! (reported as [`ExtractError::UnsupportedCompression`](crate::ExtractError)).

mod extractor;
mod parser;
mod structures;

pub use extractor::{check_path, decode_text, ArchiveEntry, ArchiveReader, Listing};
pub use parser::ZipParser;
pub use structures::*;
