//! In-memory CRX fixtures.
#![allow(dead_code)]

use flate2::write::DeflateEncoder;
use flate2::Compression;
use std::io::Write;

/// 2024-03-01 12:30:00 in DOS format.
pub const DOS_DATE: u16 = ((2024 - 1980) << 9) | (3 << 5) | 1;
pub const DOS_TIME: u16 = (12 << 11) | (30 << 5);

struct Record {
    name: String,
    method: u16,
    crc: u32,
    data: Vec<u8>,
    uncompressed_size: u32,
    external_attrs: u32,
}

/// Minimal ZIP writer: STORED or DEFLATE entries, central directory, EOCD.
#[derive(Default)]
pub struct ZipBuilder {
    records: Vec<Record>,
    comment: Vec<u8>,
}

fn crc32(data: &[u8]) -> u32 {
    let mut crc = flate2::Crc::new();
    crc.update(data);
    crc.sum()
}

impl ZipBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stored(mut self, name: &str, data: &[u8]) -> Self {
        self.records.push(Record {
            name: name.to_string(),
            method: 0,
            crc: crc32(data),
            data: data.to_vec(),
            uncompressed_size: data.len() as u32,
            external_attrs: 0,
        });
        self
    }

    pub fn deflated(mut self, name: &str, data: &[u8]) -> Self {
        let mut encoder = DeflateEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(data).unwrap();
        self.records.push(Record {
            name: name.to_string(),
            method: 8,
            crc: crc32(data),
            data: encoder.finish().unwrap(),
            uncompressed_size: data.len() as u32,
            external_attrs: 0,
        });
        self
    }

    pub fn dir(mut self, name: &str) -> Self {
        self.records.push(Record {
            name: name.to_string(),
            method: 0,
            crc: 0,
            data: Vec::new(),
            uncompressed_size: 0,
            external_attrs: 0x10,
        });
        self
    }

    /// A stored entry whose recorded checksum is wrong.
    pub fn corrupt(mut self, name: &str, data: &[u8]) -> Self {
        self = self.stored(name, data);
        if let Some(last) = self.records.last_mut() {
            last.crc ^= 0xFFFF_FFFF;
        }
        self
    }

    pub fn comment(mut self, comment: &[u8]) -> Self {
        self.comment = comment.to_vec();
        self
    }

    pub fn build(self) -> Vec<u8> {
        let mut out = Vec::new();
        let mut offsets = Vec::new();

        for r in &self.records {
            offsets.push(out.len() as u32);
            out.extend_from_slice(b"PK\x03\x04");
            out.extend_from_slice(&20u16.to_le_bytes());
            out.extend_from_slice(&0u16.to_le_bytes());
            out.extend_from_slice(&r.method.to_le_bytes());
            out.extend_from_slice(&DOS_TIME.to_le_bytes());
            out.extend_from_slice(&DOS_DATE.to_le_bytes());
            out.extend_from_slice(&r.crc.to_le_bytes());
            out.extend_from_slice(&(r.data.len() as u32).to_le_bytes());
            out.extend_from_slice(&r.uncompressed_size.to_le_bytes());
            out.extend_from_slice(&(r.name.len() as u16).to_le_bytes());
            out.extend_from_slice(&0u16.to_le_bytes());
            out.extend_from_slice(r.name.as_bytes());
            out.extend_from_slice(&r.data);
        }

        let cd_offset = out.len() as u32;
        for (r, offset) in self.records.iter().zip(&offsets) {
            out.extend_from_slice(b"PK\x01\x02");
            out.extend_from_slice(&20u16.to_le_bytes());
            out.extend_from_slice(&20u16.to_le_bytes());
            out.extend_from_slice(&0u16.to_le_bytes());
            out.extend_from_slice(&r.method.to_le_bytes());
            out.extend_from_slice(&DOS_TIME.to_le_bytes());
            out.extend_from_slice(&DOS_DATE.to_le_bytes());
            out.extend_from_slice(&r.crc.to_le_bytes());
            out.extend_from_slice(&(r.data.len() as u32).to_le_bytes());
            out.extend_from_slice(&r.uncompressed_size.to_le_bytes());
            out.extend_from_slice(&(r.name.len() as u16).to_le_bytes());
            out.extend_from_slice(&0u16.to_le_bytes()); // extra
            out.extend_from_slice(&0u16.to_le_bytes()); // comment
            out.extend_from_slice(&0u16.to_le_bytes()); // disk
            out.extend_from_slice(&0u16.to_le_bytes()); // internal attrs
            out.extend_from_slice(&r.external_attrs.to_le_bytes());
            out.extend_from_slice(&offset.to_le_bytes());
            out.extend_from_slice(r.name.as_bytes());
        }
        let cd_size = out.len() as u32 - cd_offset;

        let count = self.records.len() as u16;
        out.extend_from_slice(b"PK\x05\x06");
        out.extend_from_slice(&0u16.to_le_bytes());
        out.extend_from_slice(&0u16.to_le_bytes());
        out.extend_from_slice(&count.to_le_bytes());
        out.extend_from_slice(&count.to_le_bytes());
        out.extend_from_slice(&cd_size.to_le_bytes());
        out.extend_from_slice(&cd_offset.to_le_bytes());
        out.extend_from_slice(&(self.comment.len() as u16).to_le_bytes());
        out.extend_from_slice(&self.comment);
        out
    }
}

pub fn crx2(zip: &[u8]) -> Vec<u8> {
    let key = [0x30u8; 162];
    let sig = [0x55u8; 128];
    let mut out = b"Cr24".to_vec();
    out.extend_from_slice(&2u32.to_le_bytes());
    out.extend_from_slice(&(key.len() as u32).to_le_bytes());
    out.extend_from_slice(&(sig.len() as u32).to_le_bytes());
    out.extend_from_slice(&key);
    out.extend_from_slice(&sig);
    out.extend_from_slice(zip);
    out
}

pub fn crx3(zip: &[u8]) -> Vec<u8> {
    let header = [0x12u8; 300];
    let mut out = b"Cr24".to_vec();
    out.extend_from_slice(&3u32.to_le_bytes());
    out.extend_from_slice(&(header.len() as u32).to_le_bytes());
    out.extend_from_slice(&header);
    out.extend_from_slice(zip);
    out
}

pub const MANIFEST: &str = r#"{
  "manifest_version": 3,
  "name": "__MSG_appName__",
  "description": "__MSG_appDesc__",
  "version": "1.4.0",
  "default_locale": "en",
  "permissions": ["storage", "tabs"],
  "host_permissions": ["https://example.com/*"],
  "background": {"service_worker": "background.js"},
  "content_scripts": [{"matches": ["<all_urls>"], "js": ["src/content.js"]}],
  "icons": {"128": "assets/icon128.png"}
}"#;

pub const MESSAGES: &str = r#"{
  "appName": {"message": "Tab Tidy"},
  "APPDESC": {"message": "Keeps tabs tidy"}
}"#;

/// A realistic extension archive.
pub fn sample_zip() -> Vec<u8> {
    ZipBuilder::new()
        .deflated("manifest.json", MANIFEST.as_bytes())
        .dir("_locales/")
        .dir("_locales/en/")
        .stored("_locales/en/messages.json", MESSAGES.as_bytes())
        .deflated(
            "background.js",
            b"// TODO: debounce\nchrome.tabs.onUpdated.addListener(() => {\n  tidy();\n});\n",
        )
        .deflated(
            "src/content.js",
            b"const x = 1;\n// todo remove eval\neval(code);\n",
        )
        .stored("src/styles.css", b".todo { color: red }\n")
        .stored("assets/icon128.png", b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR")
        .stored("README.md", b"# Tab Tidy\n\nNothing to do here.\n")
        .stored("../escape.js", b"alert(1)")
        .stored("/abs/path.js", b"alert(2)")
        .build()
}
