use async_trait::async_trait;
use reqwest::header::{HeaderMap, ACCEPT_RANGES, CONTENT_LENGTH, RANGE};
use reqwest::{Client, StatusCode};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use super::ReadAt;
use anyhow::{anyhow, bail, Context, Result};
use tracing::{debug, warn};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Linear backoff for transient connection failures.
#[derive(Debug, Clone, Copy)]
struct RetryPolicy {
    max_attempts: u32,
    base_delay: Duration,
}

impl RetryPolicy {
    const DEFAULT: Self = Self {
        max_attempts: 10,
        base_delay: Duration::from_millis(500),
    };

    /// Delay before `attempt` (1-based), or None once attempts are spent.
    fn delay(&self, attempt: u32) -> Option<Duration> {
        (attempt < self.max_attempts).then(|| self.base_delay * attempt)
    }
}

/// How the container body is obtained.
enum Source {
    /// Server honours `Range: bytes=`; fetch on demand.
    Ranged,
    /// Server ignores ranges; the whole body was fetched up front.
    Buffered(Vec<u8>),
}

/// Reads a remote CRX container over HTTP.
///
/// Range requests are used when the server advertises them. Otherwise the
/// body is downloaded once, which is fine for containers of extension size.
pub struct HttpRangeReader {
    client: Client,
    url: String,
    size: u64,
    source: Source,
    transferred_bytes: AtomicU64,
    retry: RetryPolicy,
}

fn supports_ranges(headers: &HeaderMap) -> bool {
    headers
        .get(ACCEPT_RANGES)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.split(',').any(|unit| unit.trim() == "bytes"))
}

fn content_length(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse().ok())
}

impl HttpRangeReader {
    /// Probe `url` with HEAD to learn its size and range support.
    pub async fn new(url: String) -> Result<Self> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;

        let head = client
            .head(&url)
            .send()
            .await
            .with_context(|| format!("HEAD {url}"))?;
        if !head.status().is_success() {
            bail!("HEAD {} failed with status {}", url, head.status());
        }

        let headers = head.headers();
        let (size, source) = match content_length(headers) {
            Some(size) if supports_ranges(headers) => (size, Source::Ranged),
            _ => {
                debug!(%url, "no range support, fetching whole body");
                let resp = client.get(&url).send().await?.error_for_status()?;
                let body = resp.bytes().await?.to_vec();
                (body.len() as u64, Source::Buffered(body))
            }
        };

        let transferred = match &source {
            Source::Buffered(body) => body.len() as u64,
            Source::Ranged => 0,
        };

        Ok(Self {
            client,
            url,
            size,
            source,
            transferred_bytes: AtomicU64::new(transferred),
            retry: RetryPolicy::DEFAULT,
        })
    }

    /// Total bytes received from the network so far.
    pub fn transferred_bytes(&self) -> u64 {
        self.transferred_bytes.load(Ordering::Relaxed)
    }

    /// One range request with retries on connect and timeout errors.
    async fn fetch_range(&self, start: u64, end: u64) -> Result<Vec<u8>> {
        let range = format!("bytes={start}-{end}");
        let mut attempt = 0;
        loop {
            debug!(url = %self.url, %range, "range request");
            match self.client.get(&self.url).header(RANGE, &range).send().await {
                Ok(resp) if resp.status() == StatusCode::PARTIAL_CONTENT => {
                    return Ok(resp.bytes().await?.to_vec());
                }
                Ok(resp) => bail!("range {} failed with status {}", range, resp.status()),
                Err(e) if e.is_timeout() || e.is_connect() => {
                    attempt += 1;
                    let delay = self
                        .retry
                        .delay(attempt)
                        .ok_or_else(|| anyhow!("giving up on {range} after {attempt} attempts"))?;
                    warn!(%range, attempt, error = %e, "transient HTTP error, retrying");
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }
}

#[async_trait]
impl ReadAt for HttpRangeReader {
    async fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<usize> {
        if buf.is_empty() || offset >= self.size {
            return Ok(0);
        }
        let want = buf.len().min((self.size - offset) as usize);

        if let Source::Buffered(body) = &self.source {
            let start = offset as usize;
            buf[..want].copy_from_slice(&body[start..start + want]);
            return Ok(want);
        }

        let mut received = 0;
        while received < want {
            let start = offset + received as u64;
            let end = offset + want as u64 - 1;
            let chunk = self.fetch_range(start, end).await?;
            if chunk.is_empty() {
                bail!("server returned an empty body for bytes={}-{}", start, end);
            }
            let n = chunk.len().min(want - received);
            buf[received..received + n].copy_from_slice(&chunk[..n]);
            received += n;
            self.transferred_bytes.fetch_add(n as u64, Ordering::Relaxed);
        }

        Ok(received)
    }

    fn size(&self) -> u64 {
        self.size
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    fn headers(pairs: &[(reqwest::header::HeaderName, &'static str)]) -> HeaderMap {
        pairs
            .iter()
            .map(|(k, v)| (k.clone(), HeaderValue::from_static(v)))
            .collect()
    }

    #[test]
    fn range_support_needs_the_bytes_unit() {
        assert!(supports_ranges(&headers(&[(ACCEPT_RANGES, "bytes")])));
        assert!(supports_ranges(&headers(&[(ACCEPT_RANGES, "none, bytes")])));
        assert!(!supports_ranges(&headers(&[(ACCEPT_RANGES, "none")])));
        assert!(!supports_ranges(&HeaderMap::new()));
    }

    #[test]
    fn content_length_parses() {
        assert_eq!(content_length(&headers(&[(CONTENT_LENGTH, "1234")])), Some(1234));
        assert_eq!(content_length(&headers(&[(CONTENT_LENGTH, "x")])), None);
        assert_eq!(content_length(&HeaderMap::new()), None);
    }

    #[test]
    fn retry_backoff_is_linear_and_bounded() {
        let policy = RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_millis(100),
        };
        assert_eq!(policy.delay(1), Some(Duration::from_millis(100)));
        assert_eq!(policy.delay(2), Some(Duration::from_millis(200)));
        assert_eq!(policy.delay(3), None);
    }
}
