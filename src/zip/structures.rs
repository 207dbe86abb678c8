//! Fixed-layout ZIP records. All fields are little-endian.

use byteorder::{ByteOrder, LittleEndian};
use chrono::{NaiveDate, NaiveDateTime};

use crate::error::ExtractError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionMethod {
    Stored,
    Deflate,
    Unknown(u16),
}

impl From<u16> for CompressionMethod {
    fn from(value: u16) -> Self {
        match value {
            0 => Self::Stored,
            8 => Self::Deflate,
            other => Self::Unknown(other),
        }
    }
}

fn check_record(data: &[u8], signature: &[u8], size: usize, what: &str) -> Result<(), ExtractError> {
    if data.len() < size || &data[..4] != signature {
        return Err(ExtractError::Archive(format!("invalid {what}")));
    }
    Ok(())
}

/// Where the central directory lives and how many records it claims.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirectoryLocation {
    pub offset: u64,
    pub size: u64,
    pub entries: u64,
}

/// End of central directory record, 22 bytes plus comment.
#[derive(Debug, Clone, Copy)]
pub struct EndOfCentralDirectory {
    pub total_entries: u16,
    pub cd_size: u32,
    pub cd_offset: u32,
    pub comment_len: u16,
}

impl EndOfCentralDirectory {
    pub const SIGNATURE: &'static [u8] = b"PK\x05\x06";
    pub const SIZE: usize = 22;

    pub fn from_bytes(data: &[u8]) -> Result<Self, ExtractError> {
        check_record(data, Self::SIGNATURE, Self::SIZE, "end of central directory")?;
        Ok(Self {
            total_entries: LittleEndian::read_u16(&data[10..]),
            cd_size: LittleEndian::read_u32(&data[12..]),
            cd_offset: LittleEndian::read_u32(&data[16..]),
            comment_len: LittleEndian::read_u16(&data[20..]),
        })
    }

    /// Saturated fields mean the real values are in the ZIP64 record.
    pub fn is_zip64(&self) -> bool {
        self.total_entries == u16::MAX || self.cd_size == u32::MAX || self.cd_offset == u32::MAX
    }

    pub fn location(&self) -> DirectoryLocation {
        DirectoryLocation {
            offset: self.cd_offset.into(),
            size: self.cd_size.into(),
            entries: self.total_entries.into(),
        }
    }
}

/// ZIP64 locator, immediately before the regular EOCD.
pub struct Zip64Locator;

impl Zip64Locator {
    pub const SIGNATURE: &'static [u8] = b"PK\x06\x07";
    pub const SIZE: usize = 20;

    /// Offset of the ZIP64 end of central directory record.
    pub fn eocd64_offset(data: &[u8]) -> Result<u64, ExtractError> {
        check_record(data, Self::SIGNATURE, Self::SIZE, "ZIP64 locator")?;
        Ok(LittleEndian::read_u64(&data[8..]))
    }
}

/// ZIP64 end of central directory record, 56 bytes minimum.
pub struct Zip64EndOfCentralDirectory;

impl Zip64EndOfCentralDirectory {
    pub const SIGNATURE: &'static [u8] = b"PK\x06\x06";
    pub const MIN_SIZE: usize = 56;

    pub fn location(data: &[u8]) -> Result<DirectoryLocation, ExtractError> {
        check_record(data, Self::SIGNATURE, Self::MIN_SIZE, "ZIP64 end of central directory")?;
        Ok(DirectoryLocation {
            entries: LittleEndian::read_u64(&data[32..]),
            size: LittleEndian::read_u64(&data[40..]),
            offset: LittleEndian::read_u64(&data[48..]),
        })
    }
}

pub const CDFH_SIGNATURE: &[u8] = b"PK\x01\x02";
pub const CDFH_MIN_SIZE: usize = 46;

pub const LFH_SIGNATURE: &[u8] = b"PK\x03\x04";
pub const LFH_SIZE: usize = 30;

/// MS-DOS directory bit in the low byte of the external attributes.
pub const DOS_DIRECTORY_ATTR: u32 = 0x10;

/// MS-DOS date and time words as stored in ZIP headers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DosTimestamp {
    pub date: u16,
    pub time: u16,
}

impl DosTimestamp {
    /// `None` for out-of-range fields; zeroed stamps are common in
    /// generated archives.
    pub fn to_naive(self) -> Option<NaiveDateTime> {
        let year = i32::from(self.date >> 9) + 1980;
        let month = u32::from((self.date >> 5) & 0x0F);
        let day = u32::from(self.date & 0x1F);
        let hour = u32::from(self.time >> 11);
        let minute = u32::from((self.time >> 5) & 0x3F);
        let second = u32::from(self.time & 0x1F) * 2;
        NaiveDate::from_ymd_opt(year, month, day)?.and_hms_opt(hour, minute, second)
    }
}

/// Raw central directory record
#[derive(Debug, Clone)]
pub struct ZipFileEntry {
    pub file_name: String,
    pub compression_method: CompressionMethod,
    pub compressed_size: u64,
    pub uncompressed_size: u64,
    pub crc32: u32,
    pub lfh_offset: u64,
    pub modified: DosTimestamp,
    pub external_attrs: u32,
    pub is_directory: bool,
}

impl ZipFileEntry {
    pub fn modified_at(&self) -> Option<NaiveDateTime> {
        self.modified.to_naive()
    }
}
