//! Error types returned by the inspection engine.
//!
//! Every failure is a value. Callers map them to client-facing messages
//! through [`Error::error_code`].

use thiserror::Error;

/// Failures while validating the CRX container header.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("container too small: {len} bytes")]
    TooSmall { len: usize },

    #[error("bad magic: not a CRX container")]
    BadMagic,

    #[error("unsupported CRX version: {0}")]
    UnsupportedVersion(u32),

    #[error("invalid {field} length: {value}")]
    InvalidFieldLength { field: &'static str, value: u32 },

    #[error("archive offset {offset} is beyond container length {len}")]
    ArchiveNotFound { offset: u64, len: usize },
}

/// Failures while locating, listing or reading the embedded archive.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtractError {
    #[error("embedded archive has an invalid signature")]
    InvalidArchiveSignature,

    #[error("unsafe entry path: {0}")]
    UnsafePath(String),

    #[error("archive error: {0}")]
    Archive(String),

    #[error("unsupported compression method: {0}")]
    UnsupportedCompression(u16),

    #[error("no such entry: {0}")]
    EntryNotFound(String),

    #[error("archive has {count} entries, limit is {limit}")]
    TooManyEntries { count: usize, limit: usize },

    #[error("CRC mismatch for {path}: expected {expected:08x}, got {actual:08x}")]
    ChecksumMismatch {
        path: String,
        expected: u32,
        actual: u32,
    },
}

impl From<std::io::Error> for ExtractError {
    fn from(e: std::io::Error) -> Self {
        ExtractError::Archive(e.to_string())
    }
}

/// A search or filter pattern that failed to compile.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid pattern: {0}")]
pub struct PatternError(pub String);

impl From<regex::Error> for PatternError {
    fn from(e: regex::Error) -> Self {
        PatternError(e.to_string())
    }
}

/// Failures while reading `manifest.json`.
#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("manifest.json not found in archive")]
    Missing,

    #[error("manifest.json is not valid UTF-8")]
    NotUtf8,

    #[error("manifest JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Extract(#[from] ExtractError),
}

/// Crate-wide error.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Extract(#[from] ExtractError),

    #[error(transparent)]
    Pattern(#[from] PatternError),

    #[error(transparent)]
    Manifest(#[from] ManifestError),
}

impl Error {
    /// Stable code for the client-facing layer.
    pub fn error_code(&self) -> &'static str {
        match self {
            Error::Parse(_) => "malformed_container",
            Error::Extract(ExtractError::EntryNotFound(_)) => "not_found",
            Error::Extract(ExtractError::TooManyEntries { .. }) => "too_large",
            Error::Extract(_) => "corrupt_archive",
            Error::Pattern(_) => "invalid_query",
            Error::Manifest(ManifestError::Missing) => "not_found",
            Error::Manifest(_) => "invalid_manifest",
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
