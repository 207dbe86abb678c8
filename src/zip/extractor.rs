use chrono::NaiveDateTime;
use flate2::read::DeflateDecoder;
use serde::Serialize;
use std::io::Read;

use crate::error::ExtractError;

use super::parser::ZipParser;
use super::structures::{CompressionMethod, DOS_DIRECTORY_ATTR, ZipFileEntry};

/// One archive record, normalized for tree building.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArchiveEntry {
    /// Forward-slash separated, no leading or trailing slash.
    pub path: String,
    pub is_directory: bool,
    pub uncompressed_size: u64,
    pub compressed_size: u64,
    pub modified_at: Option<NaiveDateTime>,
}

impl ArchiveEntry {
    pub fn file(path: impl Into<String>, size: u64) -> Self {
        Self {
            path: path.into(),
            is_directory: false,
            uncompressed_size: size,
            compressed_size: size,
            modified_at: None,
        }
    }

    pub fn directory(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            is_directory: true,
            uncompressed_size: 0,
            compressed_size: 0,
            modified_at: None,
        }
    }
}

/// Entries produced by a listing, plus the ones dropped as unsafe.
#[derive(Debug, Clone, Default)]
pub struct Listing {
    pub entries: Vec<ArchiveEntry>,
    pub rejected: Vec<ExtractError>,
}

/// Reject paths that could escape a storage root when joined onto it.
pub fn check_path(path: &str) -> Result<(), ExtractError> {
    let unsafe_path = || ExtractError::UnsafePath(path.to_string());

    if path.is_empty() || path.starts_with('/') || path.starts_with('\\') || path.contains('\0') {
        return Err(unsafe_path());
    }
    if path
        .split(['/', '\\'])
        .any(|component| component == "." || component == ".." || is_drive_prefix(component))
    {
        return Err(unsafe_path());
    }
    Ok(())
}

/// `C:`, `C:x` or a trailing `:`; any of these re-roots a Windows join.
fn is_drive_prefix(component: &str) -> bool {
    let bytes = component.as_bytes();
    component.ends_with(':') || (bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':')
}

fn normalize(raw: &ZipFileEntry) -> Result<ArchiveEntry, ExtractError> {
    check_path(&raw.file_name)?;

    let is_directory = raw.is_directory || raw.external_attrs & DOS_DIRECTORY_ATTR != 0;
    let path = raw.file_name.trim_end_matches('/').to_string();
    if path.is_empty() {
        return Err(ExtractError::UnsafePath(raw.file_name.clone()));
    }

    let (uncompressed_size, compressed_size) = if is_directory {
        (0, 0)
    } else {
        (raw.uncompressed_size, raw.compressed_size)
    };

    Ok(ArchiveEntry {
        path,
        is_directory,
        uncompressed_size,
        compressed_size,
        modified_at: raw.modified_at(),
    })
}

/// Read access to an in-memory ZIP archive.
pub struct ArchiveReader<'a> {
    parser: ZipParser<'a>,
    records: Vec<ZipFileEntry>,
}

impl<'a> ArchiveReader<'a> {
    /// Parse the central directory of `archive`.
    pub fn new(archive: &'a [u8]) -> Result<Self, ExtractError> {
        let parser = ZipParser::new(archive);
        let records = parser.list_files()?;
        Ok(Self { parser, records })
    }

    /// Number of raw central directory records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Normalized entries in central directory order; unsafe paths are dropped.
    pub fn list_entries(&self) -> Vec<ArchiveEntry> {
        self.list_entries_with_rejects().entries
    }

    /// Like [`list_entries`](Self::list_entries) but also reports what was dropped.
    pub fn list_entries_with_rejects(&self) -> Listing {
        let mut listing = Listing::default();
        for record in &self.records {
            match normalize(record) {
                Ok(entry) => listing.entries.push(entry),
                Err(e) => listing.rejected.push(e),
            }
        }
        listing
    }

    /// Last record whose normalized path is `path`; later duplicates win.
    fn record(&self, path: &str) -> Result<&ZipFileEntry, ExtractError> {
        self.records
            .iter()
            .rev()
            .find(|r| {
                !r.is_directory
                    && r.external_attrs & DOS_DIRECTORY_ATTR == 0
                    && r.file_name == path
                    && check_path(&r.file_name).is_ok()
            })
            .ok_or_else(|| ExtractError::EntryNotFound(path.to_string()))
    }

    /// Decompress a file entry and verify its checksum.
    pub fn read_file(&self, path: &str) -> Result<Vec<u8>, ExtractError> {
        let record = self.record(path)?;
        let data = self.parser.entry_data(record)?;

        let out = match record.compression_method {
            CompressionMethod::Stored => data.to_vec(),
            CompressionMethod::Deflate => {
                // Never inflate past the declared size
                let mut decoder = DeflateDecoder::new(data).take(record.uncompressed_size);
                let mut out = Vec::new();
                decoder.read_to_end(&mut out)?;
                out
            }
            CompressionMethod::Unknown(method) => {
                return Err(ExtractError::UnsupportedCompression(method));
            }
        };

        let mut crc = flate2::Crc::new();
        crc.update(&out);
        if crc.sum() != record.crc32 {
            return Err(ExtractError::ChecksumMismatch {
                path: path.to_string(),
                expected: record.crc32,
                actual: crc.sum(),
            });
        }

        Ok(out)
    }

    /// Read a file as text; `Ok(None)` when it is not valid UTF-8.
    pub fn read_text(&self, path: &str) -> Result<Option<String>, ExtractError> {
        let bytes = self.read_file(path)?;
        Ok(decode_text(&bytes).map(str::to_owned))
    }
}

/// Decode UTF-8 text, dropping a leading byte order mark.
///
/// Returns `None` for binary content (invalid UTF-8 or embedded NUL bytes).
pub fn decode_text(bytes: &[u8]) -> Option<&str> {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    if bytes.contains(&0) {
        return None;
    }
    std::str::from_utf8(bytes).ok()
}
