//! Low-level ZIP archive parser.
//!
//! This module handles the binary parsing of ZIP file structures from an
//! in-memory archive (the slice that follows a CRX header).
//!
//! ## Parsing Strategy
//!
//! ZIP files are designed to be read from the end:
//! 1. Find the End of Central Directory (EOCD) at the archive's end
//! 2. If ZIP64, read the ZIP64 EOCD for large file support
//! 3. Read the Central Directory to get metadata for all files
//! 4. For extraction, read each file's Local File Header and data
//!
//! Every offset read from the archive is checked against the slice before
//! use, so a hostile archive produces an error instead of a panic.

use byteorder::{LittleEndian, ReadBytesExt};
use std::io::{Cursor, Read};

use crate::error::ExtractError;

use super::structures::*;

/// Maximum ZIP comment size allowed by the format (65535 bytes).
///
/// This limits the search area when looking for EOCD with a comment.
const MAX_COMMENT_SIZE: usize = 65535;

fn archive_err(msg: impl Into<String>) -> ExtractError {
    ExtractError::Archive(msg.into())
}

/// Low-level ZIP parser over a borrowed archive.
///
/// Typically used through [`ArchiveReader`](super::ArchiveReader)
/// rather than directly.
pub struct ZipParser<'a> {
    data: &'a [u8],
}

impl<'a> ZipParser<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data }
    }

    /// Total size of the archive in bytes
    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }

    /// Borrow `len` bytes at `offset`, failing if the range leaves the archive.
    pub fn slice(&self, offset: u64, len: u64) -> Result<&'a [u8], ExtractError> {
        let end = offset
            .checked_add(len)
            .ok_or_else(|| archive_err("offset overflow"))?;
        if end > self.size() {
            return Err(archive_err(format!(
                "read of {len} bytes at {offset} past end of archive ({} bytes)",
                self.size()
            )));
        }
        Ok(&self.data[offset as usize..end as usize])
    }

    /// Find and parse the End of Central Directory record.
    ///
    /// Returns the EOCD and its offset in the archive.
    pub fn find_eocd(&self) -> Result<(EndOfCentralDirectory, u64), ExtractError> {
        let size = self.data.len();

        // Common case: no archive comment, EOCD is the last 22 bytes.
        if size >= EndOfCentralDirectory::SIZE {
            let offset = size - EndOfCentralDirectory::SIZE;
            let buf = &self.data[offset..];
            if &buf[0..4] == EndOfCentralDirectory::SIGNATURE && &buf[20..22] == b"\x00\x00" {
                let eocd = EndOfCentralDirectory::from_bytes(buf)?;
                return Ok((eocd, offset as u64));
            }
        }

        // EOCD not at expected location - search backwards through the
        // comment window for a record whose comment length reaches the end.
        let search_size = (MAX_COMMENT_SIZE + EndOfCentralDirectory::SIZE).min(size);
        let search_start = size - search_size;
        let buf = &self.data[search_start..];

        if buf.len() >= EndOfCentralDirectory::SIZE {
            for i in (0..=buf.len() - EndOfCentralDirectory::SIZE).rev() {
                if &buf[i..i + 4] == EndOfCentralDirectory::SIGNATURE {
                    let comment_len = u16::from_le_bytes([buf[i + 20], buf[i + 21]]) as usize;

                    if comment_len == buf.len() - i - EndOfCentralDirectory::SIZE {
                        let eocd = EndOfCentralDirectory::from_bytes(
                            &buf[i..i + EndOfCentralDirectory::SIZE],
                        )?;
                        return Ok((eocd, (search_start + i) as u64));
                    }
                }
            }
        }

        Err(archive_err("end of central directory not found"))
    }

    /// Locate the central directory through the ZIP64 locator that sits
    /// immediately before the regular EOCD.
    pub fn read_zip64_location(&self, eocd_offset: u64) -> Result<DirectoryLocation, ExtractError> {
        let locator_offset = eocd_offset
            .checked_sub(Zip64Locator::SIZE as u64)
            .ok_or_else(|| archive_err("missing ZIP64 locator"))?;
        let eocd64_offset =
            Zip64Locator::eocd64_offset(self.slice(locator_offset, Zip64Locator::SIZE as u64)?)?;

        Zip64EndOfCentralDirectory::location(
            self.slice(eocd64_offset, Zip64EndOfCentralDirectory::MIN_SIZE as u64)?,
        )
    }

    /// List all records of the central directory, in directory order.
    pub fn list_files(&self) -> Result<Vec<ZipFileEntry>, ExtractError> {
        let (eocd, eocd_offset) = self.find_eocd()?;

        let DirectoryLocation {
            offset: cd_offset,
            size: cd_size,
            entries: total_entries,
        } = if eocd.is_zip64() {
            self.read_zip64_location(eocd_offset)?
        } else {
            eocd.location()
        };

        let cd_data = self.slice(cd_offset, cd_size)?;

        // The entry count is untrusted; the directory size bounds it.
        let max_entries = cd_data.len() / CDFH_MIN_SIZE;
        if total_entries > max_entries as u64 {
            return Err(archive_err(format!(
                "central directory claims {total_entries} entries but holds at most {max_entries}"
            )));
        }

        let mut entries = Vec::with_capacity(total_entries as usize);
        let mut cursor = Cursor::new(cd_data);

        for _ in 0..total_entries {
            entries.push(Self::parse_cdfh(&mut cursor)?);
        }

        Ok(entries)
    }

    /// Parse a Central Directory File Header from a cursor.
    fn parse_cdfh(cursor: &mut Cursor<&[u8]>) -> Result<ZipFileEntry, ExtractError> {
        let mut sig = [0u8; 4];
        cursor.read_exact(&mut sig)?;
        if sig != CDFH_SIGNATURE {
            return Err(archive_err("invalid central directory file header"));
        }

        let _version_made_by = cursor.read_u16::<LittleEndian>()?;
        let _version_needed = cursor.read_u16::<LittleEndian>()?;
        let _flags = cursor.read_u16::<LittleEndian>()?;
        let compression_method = cursor.read_u16::<LittleEndian>()?;
        let modified = DosTimestamp {
            time: cursor.read_u16::<LittleEndian>()?,
            date: cursor.read_u16::<LittleEndian>()?,
        };
        let crc32 = cursor.read_u32::<LittleEndian>()?;
        let mut compressed_size = cursor.read_u32::<LittleEndian>()? as u64;
        let mut uncompressed_size = cursor.read_u32::<LittleEndian>()? as u64;
        let file_name_length = cursor.read_u16::<LittleEndian>()?;
        let extra_field_length = cursor.read_u16::<LittleEndian>()?;
        let file_comment_length = cursor.read_u16::<LittleEndian>()?;
        let _disk_number_start = cursor.read_u16::<LittleEndian>()?;
        let _internal_attrs = cursor.read_u16::<LittleEndian>()?;
        let external_attrs = cursor.read_u32::<LittleEndian>()?;
        let mut lfh_offset = cursor.read_u32::<LittleEndian>()? as u64;

        let mut file_name_bytes = vec![0u8; file_name_length as usize];
        cursor.read_exact(&mut file_name_bytes)?;
        // Lossy conversion keeps non-UTF8 names listable
        let file_name = String::from_utf8_lossy(&file_name_bytes).into_owned();

        let is_directory = file_name.ends_with('/');

        // ZIP64 extended information lives in extra field 0x0001; each value is
        // present only if the matching header field is saturated.
        let extra_field_end = cursor.position() + extra_field_length as u64;
        if extra_field_end > cursor.get_ref().len() as u64 {
            return Err(archive_err(format!("extra field of {file_name} is truncated")));
        }

        while cursor.position() + 4 <= extra_field_end {
            let header_id = cursor.read_u16::<LittleEndian>()?;
            let field_size = cursor.read_u16::<LittleEndian>()?;
            let field_end = (cursor.position() + field_size as u64).min(extra_field_end);

            if header_id == 0x0001 {
                if uncompressed_size == 0xFFFFFFFF && cursor.position() + 8 <= field_end {
                    uncompressed_size = cursor.read_u64::<LittleEndian>()?;
                }
                if compressed_size == 0xFFFFFFFF && cursor.position() + 8 <= field_end {
                    compressed_size = cursor.read_u64::<LittleEndian>()?;
                }
                if lfh_offset == 0xFFFFFFFF && cursor.position() + 8 <= field_end {
                    lfh_offset = cursor.read_u64::<LittleEndian>()?;
                }
            }
            cursor.set_position(field_end);
        }

        cursor.set_position(extra_field_end + file_comment_length as u64);

        Ok(ZipFileEntry {
            file_name,
            compression_method: CompressionMethod::from(compression_method),
            compressed_size,
            uncompressed_size,
            crc32,
            lfh_offset,
            modified,
            external_attrs,
            is_directory,
        })
    }

    /// Get the actual data offset for a file entry.
    ///
    /// The Local File Header has its own name and extra field lengths which
    /// may differ from the central directory, so they are read from the LFH.
    pub fn get_data_offset(&self, entry: &ZipFileEntry) -> Result<u64, ExtractError> {
        let lfh = self.slice(entry.lfh_offset, LFH_SIZE as u64)?;

        if &lfh[0..4] != LFH_SIGNATURE {
            return Err(archive_err(format!(
                "invalid local file header for {}",
                entry.file_name
            )));
        }

        let mut cursor = Cursor::new(lfh);
        cursor.set_position(26); // Offset to filename length field

        let file_name_length = cursor.read_u16::<LittleEndian>()? as u64;
        let extra_field_length = cursor.read_u16::<LittleEndian>()? as u64;

        Ok(entry.lfh_offset + LFH_SIZE as u64 + file_name_length + extra_field_length)
    }

    /// Borrow the compressed bytes of an entry.
    pub fn entry_data(&self, entry: &ZipFileEntry) -> Result<&'a [u8], ExtractError> {
        let offset = self.get_data_offset(entry)?;
        self.slice(offset, entry.compressed_size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// One STORED file "a.txt" containing "hi", no comment.
    fn tiny_zip(comment: &[u8]) -> Vec<u8> {
        let name = b"a.txt";
        let data = b"hi";
        let crc = {
            let mut c = flate2::Crc::new();
            c.update(data);
            c.sum()
        };
        let mut out = Vec::new();
        out.extend_from_slice(LFH_SIGNATURE);
        out.extend_from_slice(&20u16.to_le_bytes());
        out.extend_from_slice(&0u16.to_le_bytes());
        out.extend_from_slice(&0u16.to_le_bytes());
        out.extend_from_slice(&0u16.to_le_bytes());
        out.extend_from_slice(&0u16.to_le_bytes());
        out.extend_from_slice(&crc.to_le_bytes());
        out.extend_from_slice(&(data.len() as u32).to_le_bytes());
        out.extend_from_slice(&(data.len() as u32).to_le_bytes());
        out.extend_from_slice(&(name.len() as u16).to_le_bytes());
        out.extend_from_slice(&0u16.to_le_bytes());
        out.extend_from_slice(name);
        out.extend_from_slice(data);

        let cd_offset = out.len() as u32;
        out.extend_from_slice(CDFH_SIGNATURE);
        out.extend_from_slice(&20u16.to_le_bytes());
        out.extend_from_slice(&20u16.to_le_bytes());
        out.extend_from_slice(&0u16.to_le_bytes());
        out.extend_from_slice(&0u16.to_le_bytes());
        out.extend_from_slice(&0u16.to_le_bytes());
        out.extend_from_slice(&0u16.to_le_bytes());
        out.extend_from_slice(&crc.to_le_bytes());
        out.extend_from_slice(&(data.len() as u32).to_le_bytes());
        out.extend_from_slice(&(data.len() as u32).to_le_bytes());
        out.extend_from_slice(&(name.len() as u16).to_le_bytes());
        out.extend_from_slice(&0u16.to_le_bytes());
        out.extend_from_slice(&0u16.to_le_bytes());
        out.extend_from_slice(&0u16.to_le_bytes());
        out.extend_from_slice(&0u16.to_le_bytes());
        out.extend_from_slice(&0u32.to_le_bytes());
        out.extend_from_slice(&0u32.to_le_bytes());
        out.extend_from_slice(name);
        let cd_size = out.len() as u32 - cd_offset;

        out.extend_from_slice(EndOfCentralDirectory::SIGNATURE);
        out.extend_from_slice(&0u16.to_le_bytes());
        out.extend_from_slice(&0u16.to_le_bytes());
        out.extend_from_slice(&1u16.to_le_bytes());
        out.extend_from_slice(&1u16.to_le_bytes());
        out.extend_from_slice(&cd_size.to_le_bytes());
        out.extend_from_slice(&cd_offset.to_le_bytes());
        out.extend_from_slice(&(comment.len() as u16).to_le_bytes());
        out.extend_from_slice(comment);
        out
    }

    #[test]
    fn lists_single_entry() {
        let zip = tiny_zip(b"");
        let parser = ZipParser::new(&zip);
        let entries = parser.list_files().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].file_name, "a.txt");
        assert_eq!(entries[0].uncompressed_size, 2);
        assert_eq!(parser.entry_data(&entries[0]).unwrap(), b"hi");
    }

    #[test]
    fn finds_eocd_behind_comment() {
        let zip = tiny_zip(b"built by a packer");
        let parser = ZipParser::new(&zip);
        assert_eq!(parser.list_files().unwrap().len(), 1);
    }

    #[test]
    fn rejects_garbage() {
        let parser = ZipParser::new(b"PK\x03\x04 not really a zip file at all");
        assert!(matches!(parser.list_files(), Err(ExtractError::Archive(_))));
    }

    #[test]
    fn rejects_inflated_entry_count() {
        let mut zip = tiny_zip(b"");
        let n = zip.len();
        // total_entries field of the EOCD
        zip[n - 12..n - 10].copy_from_slice(&500u16.to_le_bytes());
        let parser = ZipParser::new(&zip);
        assert!(parser.list_files().is_err());
    }

    #[test]
    fn rejects_out_of_range_directory() {
        let mut zip = tiny_zip(b"");
        let n = zip.len();
        // cd_offset field of the EOCD
        zip[n - 6..n - 2].copy_from_slice(&0x00FF_FFFFu32.to_le_bytes());
        let parser = ZipParser::new(&zip);
        assert!(parser.list_files().is_err());
    }
}
