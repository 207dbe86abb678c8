//! # crxscope
//!
//! Inspect browser extension packages (CRX containers) without unpacking them
//! to disk.
//!
//! The library is a set of pure functions over in-memory bytes:
//!
//! 1. [`crx::parse_header`] validates the `Cr24` header (versions 2 and 3) and
//!    finds where the embedded ZIP archive starts.
//! 2. [`zip::ArchiveReader`] lists the archive's entries and extracts files.
//! 3. [`tree::build_tree`] turns the entry list into an ordered file tree
//!    with a content [`tree::Category`] per file.
//! 4. [`search`] finds pattern matches with line, column and context.
//! 5. [`filter`] selects files by name, category and size while keeping the
//!    tree shape.
//!
//! Nothing here performs I/O or keeps global state, so every call can run in
//! parallel with any other. The [`io`] module and the `crxscope` binary load
//! containers from disk or over HTTP.
//!
//! ## Example
//!
//! ```no_run
//! use crxscope::{CrxPackage, FilterCriteria, SearchOptions, tree::Category};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let bytes = std::fs::read("extension.crx")?;
//! let package = CrxPackage::parse(&bytes)?;
//!
//! let scripts = FilterCriteria::new().with_categories([Category::Code]);
//! for path in crxscope::filter::matching_paths(package.tree(), &scripts)? {
//!     println!("{path}");
//! }
//!
//! let report = package.search(&SearchOptions::new("eval("), None)?;
//! for file in &report.results {
//!     println!("{}: {} matches", file.file_path, file.match_count);
//! }
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod crx;
pub mod error;
pub mod filter;
pub mod io;
pub mod manifest;
pub mod package;
pub mod search;
pub mod tree;
pub mod zip;

pub use cli::Cli;
pub use error::{Error, ExtractError, ManifestError, ParseError, PatternError};
pub use filter::{CompiledFilter, FilterCriteria};
pub use io::{HttpRangeReader, LocalFileReader, ReadAt};
pub use package::{CrxPackage, SearchReport};
pub use search::SearchOptions;
pub use tree::{build_tree, FileTreeNode};
pub use zip::{ArchiveEntry, ArchiveReader};
