//! One-call pipeline from container bytes to a browsable package.

use crate::crx::{extract_archive_bytes, parse_header, ContainerHeader};
use crate::error::{ExtractError, ManifestError, Result};
use crate::filter::CompiledFilter;
use crate::manifest::{read_manifest, ExtensionManifest};
use crate::search::{search_files, FileSearchResult, SearchOptions};
use crate::tree::{build_tree, FileTreeNode};
use crate::zip::{ArchiveEntry, ArchiveReader};

/// Search hits, plus the files that matched the filter but could not be read.
#[derive(Debug, Default)]
pub struct SearchReport {
    pub results: Vec<FileSearchResult>,
    /// Archive path and read error, in tree order.
    pub unreadable: Vec<(String, ExtractError)>,
}

/// A parsed CRX container borrowing the caller's bytes.
pub struct CrxPackage<'a> {
    header: ContainerHeader,
    reader: ArchiveReader<'a>,
    entries: Vec<ArchiveEntry>,
    rejected: Vec<ExtractError>,
    tree: FileTreeNode,
}

impl<'a> CrxPackage<'a> {
    /// Header, archive slice, entry listing and tree, in that order.
    pub fn parse(bytes: &'a [u8]) -> Result<Self> {
        Self::parse_with_limit(bytes, usize::MAX)
    }

    /// Like [`CrxPackage::parse`], but refuses archives with more than
    /// `max_entries` central directory records before listing them or
    /// building the tree.
    pub fn parse_with_limit(bytes: &'a [u8], max_entries: usize) -> Result<Self> {
        let header = parse_header(bytes)?;
        let archive = extract_archive_bytes(bytes, &header)?;
        let reader = ArchiveReader::new(archive)?;
        if reader.len() > max_entries {
            return Err(ExtractError::TooManyEntries {
                count: reader.len(),
                limit: max_entries,
            }
            .into());
        }
        let listing = reader.list_entries_with_rejects();
        let tree = build_tree(&listing.entries);

        Ok(Self {
            header,
            reader,
            entries: listing.entries,
            rejected: listing.rejected,
            tree,
        })
    }

    pub fn header(&self) -> &ContainerHeader {
        &self.header
    }

    pub fn reader(&self) -> &ArchiveReader<'a> {
        &self.reader
    }

    /// Entries in archive order, unsafe paths removed.
    pub fn entries(&self) -> &[ArchiveEntry] {
        &self.entries
    }

    /// Entries dropped as unsafe.
    pub fn rejected(&self) -> &[ExtractError] {
        &self.rejected
    }

    pub fn tree(&self) -> &FileTreeNode {
        &self.tree
    }

    pub fn read_file(&self, path: &str) -> Result<Vec<u8>> {
        Ok(self.reader.read_file(path)?)
    }

    /// Parsed manifest with locale placeholders resolved.
    pub fn manifest(&self) -> std::result::Result<ExtensionManifest, ManifestError> {
        let mut manifest = read_manifest(&self.reader)?;
        manifest.localize(&self.reader)?;
        Ok(manifest)
    }

    /// Search every text file in tree order, optionally limited to files the
    /// filter accepts. Binary files are skipped; files that fail to decompress
    /// or verify are reported in [`SearchReport::unreadable`]. An empty query
    /// returns an empty report.
    pub fn search(
        &self,
        options: &SearchOptions,
        filter: Option<&CompiledFilter>,
    ) -> Result<SearchReport> {
        let mut report = SearchReport::default();
        let Some(pattern) = options.compile()? else {
            return Ok(report);
        };

        let candidates = self
            .tree
            .leaves()
            .filter(|f| filter.is_none_or(|flt| flt.matches(f)));

        for file in candidates {
            match self.reader.read_text(&file.path) {
                Ok(Some(text)) => report.results.extend(search_files(
                    [(file.path.as_str(), text)],
                    &pattern,
                    options.context_lines,
                    options.max_matches_per_file,
                )),
                Ok(None) => {}
                Err(e) => report.unreadable.push((file.path.clone(), e)),
            }
        }

        Ok(report)
    }
}
