use anyhow::{Context, Result, bail};
use reqwest::blocking::Client;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
pub struct FetchOptions {
    pub cache_dir: PathBuf,
    pub timeout_secs: u64,
    pub retry_attempts: u8,
    pub retry_backoff_ms: u64,
    pub user_agent: String,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            cache_dir: PathBuf::from(".cache"),
            timeout_secs: 20,
            retry_attempts: 2,
            retry_backoff_ms: 500,
            user_agent: concat!(
                env!("CARGO_PKG_NAME"),
                "/",
                env!("CARGO_PKG_VERSION")
            )
            .to_string(),
        }
    }
}

/// Returns page bodies from an on-disk cache, fetching over HTTP on a miss.
/// `file://` URLs bypass the cache and read the named file directly.
pub struct PageFetcher {
    client: Client,
    cache_dir: PathBuf,
    retry_attempts: u8,
    retry_backoff_ms: u64,
}

impl PageFetcher {
    pub fn new(options: &FetchOptions) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(options.timeout_secs))
            .user_agent(&options.user_agent)
            .build()
            .context("failed to build reqwest client")?;

        Ok(Self {
            client,
            cache_dir: options.cache_dir.clone(),
            retry_attempts: options.retry_attempts,
            retry_backoff_ms: options.retry_backoff_ms,
        })
    }

    pub fn fetch(&self, url: &str) -> Result<String> {
        if let Some(path) = url.strip_prefix("file://") {
            let body = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read file source {path}"))?;
            debug!(file = %path, bytes = body.len(), "loaded file source");
            return Ok(body);
        }

        let cache_path = self.cache_path(url);
        if cache_path.exists() {
            let body = std::fs::read_to_string(&cache_path)
                .with_context(|| format!("failed to read cache entry {}", cache_path.display()))?;
            debug!(%url, cache = %cache_path.display(), "cache hit");
            return Ok(body);
        }

        let body = fetch_with_retries(
            &self.client,
            url,
            self.retry_attempts,
            self.retry_backoff_ms,
        )?;

        std::fs::create_dir_all(&self.cache_dir).with_context(|| {
            format!("failed to create cache dir {}", self.cache_dir.display())
        })?;
        std::fs::write(&cache_path, &body)
            .with_context(|| format!("failed to write cache entry {}", cache_path.display()))?;

        info!(%url, bytes = body.len(), "fetched page");
        Ok(body)
    }

    fn cache_path(&self, url: &str) -> PathBuf {
        let digest = Sha256::digest(url.as_bytes());
        self.cache_dir.join(format!("{}.html", hex::encode(digest)))
    }
}

fn fetch_with_retries(
    client: &Client,
    url: &str,
    retry_attempts: u8,
    retry_backoff_ms: u64,
) -> Result<String> {
    let attempts = retry_attempts.max(1);

    for attempt in 1..=attempts {
        match client.get(url).send() {
            Ok(resp) => {
                if !resp.status().is_success() {
                    let status = resp.status();
                    if attempt == attempts {
                        bail!("request to {url} failed with status {status}");
                    }
                    warn!(%url, %status, attempt, "request failed; retrying");
                } else {
                    return Ok(resp.text()?);
                }
            }
            Err(err) => {
                if attempt == attempts {
                    return Err(err).with_context(|| format!("request to {url} failed"));
                }
                warn!(%url, attempt, error = %err, "request errored; retrying");
            }
        }

        std::thread::sleep(Duration::from_millis(retry_backoff_ms));
    }

    bail!("request to {url} failed after retries")
}

/// Resolve a local path into a URL `PageFetcher::fetch` accepts.
pub fn file_url(path: &Path) -> String {
    format!("file://{}", path.display())
}
