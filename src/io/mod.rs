//! Byte sources for containers: local files and HTTP servers with Range support.

mod http;
mod local;

pub use http::HttpRangeReader;
pub use local::LocalFileReader;

use anyhow::{bail, Result};
use async_trait::async_trait;
use tracing::debug;

/// Bytes fetched per `read_at` call by [`read_all`].
const CHUNK_SIZE: usize = 4 * 1024 * 1024;

/// Trait for random access reading from a data source
#[async_trait]
pub trait ReadAt: Send + Sync {
    /// Read data at the specified offset into the buffer
    async fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<usize>;

    /// Get the total size of the data source
    fn size(&self) -> u64;
}

/// Load a whole source into memory, refusing sources larger than `limit`.
pub async fn read_all<R: ReadAt + ?Sized>(reader: &R, limit: u64) -> Result<Vec<u8>> {
    let size = reader.size();
    if size > limit {
        bail!("Container is {} bytes, limit is {} bytes", size, limit);
    }

    let mut buf = vec![0u8; size as usize];
    let mut offset = 0usize;
    while offset < buf.len() {
        let end = (offset + CHUNK_SIZE).min(buf.len());
        let n = reader.read_at(offset as u64, &mut buf[offset..end]).await?;
        if n == 0 {
            bail!("Unexpected end of data at offset {}", offset);
        }
        offset += n;
    }

    debug!(bytes = size, "container loaded");
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct MemReader(Vec<u8>);

    #[async_trait]
    impl ReadAt for MemReader {
        async fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<usize> {
            let start = (offset as usize).min(self.0.len());
            // Short reads exercise the loop in read_all
            let n = buf.len().min(self.0.len() - start).min(3);
            buf[..n].copy_from_slice(&self.0[start..start + n]);
            Ok(n)
        }

        fn size(&self) -> u64 {
            self.0.len() as u64
        }
    }

    #[tokio::test]
    async fn reads_everything_across_short_reads() {
        let reader = MemReader(b"Cr24 and the rest".to_vec());
        let bytes = read_all(&reader, 1024).await.unwrap();
        assert_eq!(bytes, b"Cr24 and the rest");
    }

    #[tokio::test]
    async fn refuses_oversized_sources() {
        let reader = MemReader(vec![0; 10]);
        assert!(read_all(&reader, 9).await.is_err());
    }

    #[tokio::test]
    async fn local_file_round_trip() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        std::io::Write::write_all(&mut file, b"local bytes").unwrap();
        let reader = LocalFileReader::new(file.path()).unwrap();
        assert_eq!(reader.size(), 11);
        assert_eq!(read_all(&reader, 100).await.unwrap(), b"local bytes");
    }
}
