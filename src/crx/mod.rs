//! CRX container handling.
//!
//! A CRX file is a small versioned header followed by a ZIP archive:
//!
//! ```text
//! CRX2: "Cr24" | version=2 | key_len | sig_len | public key | signature | ZIP
//! CRX3: "Cr24" | version=3 | header_len | protobuf header            | ZIP
//! ```
//!
//! All integers are little-endian `u32`. This module only finds where the
//! archive starts; the archive itself is read by [`crate::zip`].

mod header;

pub use header::{
    extract_archive_bytes, parse_header, ContainerHeader, CrxVersion, MAGIC,
    MAX_KEY_OR_SIGNATURE_LEN, MAX_V3_HEADER_LEN,
};
