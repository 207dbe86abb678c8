use byteorder::{ByteOrder, LittleEndian};
use serde::Serialize;

use crate::error::{ExtractError, ParseError};

/// Magic bytes at the start of every CRX container.
pub const MAGIC: &[u8; 4] = b"Cr24";

/// Upper bound for the CRX2 public key and signature lengths.
pub const MAX_KEY_OR_SIGNATURE_LEN: u32 = 16 * 1024;

/// Upper bound for the CRX3 protobuf header length.
pub const MAX_V3_HEADER_LEN: u32 = 1024 * 1024;

const PREFIX_SIZE: usize = 8;
const V2_HEADER_SIZE: usize = 16;
const V3_HEADER_SIZE: usize = 12;

/// Local file header or end-of-central-directory record: both start with "PK".
const ZIP_SIGNATURE_PREFIX: &[u8; 2] = b"PK";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CrxVersion {
    V2,
    V3,
}

impl CrxVersion {
    pub fn as_u32(&self) -> u32 {
        match self {
            CrxVersion::V2 => 2,
            CrxVersion::V3 => 3,
        }
    }
}

/// Parsed container header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerHeader {
    pub version: CrxVersion,
    /// Byte offset of the embedded ZIP archive within the container.
    pub archive_offset: usize,
}

fn read_u32_at(bytes: &[u8], offset: usize) -> Option<u32> {
    bytes.get(offset..offset + 4).map(LittleEndian::read_u32)
}

fn check_length(field: &'static str, value: u32, max: u32) -> Result<u32, ParseError> {
    if value == 0 || value > max {
        return Err(ParseError::InvalidFieldLength { field, value });
    }
    Ok(value)
}

/// Validate the container header and locate the embedded archive.
///
/// Checks run in a fixed order so every malformed input maps to exactly one
/// error: size, magic, version, then the version-specific length fields.
pub fn parse_header(bytes: &[u8]) -> Result<ContainerHeader, ParseError> {
    let len = bytes.len();
    if len < PREFIX_SIZE {
        return Err(ParseError::TooSmall { len });
    }

    if &bytes[0..4] != MAGIC {
        return Err(ParseError::BadMagic);
    }

    let version = read_u32_at(bytes, 4).ok_or(ParseError::TooSmall { len })?;

    let (version, offset) = match version {
        2 => {
            if len < V2_HEADER_SIZE {
                return Err(ParseError::TooSmall { len });
            }
            let key_len = read_u32_at(bytes, 8).ok_or(ParseError::TooSmall { len })?;
            let sig_len = read_u32_at(bytes, 12).ok_or(ParseError::TooSmall { len })?;
            let key_len = check_length("public key", key_len, MAX_KEY_OR_SIGNATURE_LEN)?;
            let sig_len = check_length("signature", sig_len, MAX_KEY_OR_SIGNATURE_LEN)?;
            (
                CrxVersion::V2,
                V2_HEADER_SIZE as u64 + key_len as u64 + sig_len as u64,
            )
        }
        3 => {
            if len < V3_HEADER_SIZE {
                return Err(ParseError::TooSmall { len });
            }
            let header_len = read_u32_at(bytes, 8).ok_or(ParseError::TooSmall { len })?;
            let header_len = check_length("header", header_len, MAX_V3_HEADER_LEN)?;
            (CrxVersion::V3, V3_HEADER_SIZE as u64 + header_len as u64)
        }
        v => return Err(ParseError::UnsupportedVersion(v)),
    };

    if offset >= len as u64 {
        return Err(ParseError::ArchiveNotFound { offset, len });
    }

    Ok(ContainerHeader {
        version,
        // offset < len, so it fits in usize
        archive_offset: offset as usize,
    })
}

/// Borrow the embedded archive out of the container.
///
/// Only the leading signature is checked here; entry parsing belongs to
/// [`crate::zip::ArchiveReader`].
pub fn extract_archive_bytes<'a>(
    container: &'a [u8],
    header: &ContainerHeader,
) -> Result<&'a [u8], ExtractError> {
    let archive = container
        .get(header.archive_offset..)
        .ok_or(ExtractError::InvalidArchiveSignature)?;

    if archive.len() < 4 || &archive[0..2] != ZIP_SIGNATURE_PREFIX {
        return Err(ExtractError::InvalidArchiveSignature);
    }

    Ok(archive)
}
