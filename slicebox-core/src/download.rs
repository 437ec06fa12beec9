use std::path::{Path, PathBuf};
use std::time::Duration;

use futures::StreamExt;
use reqwest::Client;
use thiserror::Error;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::info;
use url::Url;
use uuid::Uuid;

use crate::links::{force_download, is_dropbox_share};

const DEFAULT_SUFFIX: &str = "wav";

#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("invalid source url {0}")]
    InvalidUrl(String),
    #[error("network error: {0}")]
    Network(String),
    #[error("io error at {path}: {source}")]
    Io {
        source: std::io::Error,
        path: PathBuf,
    },
}

impl From<reqwest::Error> for DownloadError {
    fn from(error: reqwest::Error) -> Self {
        DownloadError::Network(error.to_string())
    }
}

pub type DownloadResult<T> = Result<T, DownloadError>;

/// Fetches a source recording into a request-owned directory.
#[derive(Debug, Clone)]
pub struct Downloader {
    http: Client,
    timeout: Duration,
}

impl Downloader {
    pub fn new(timeout: Duration) -> DownloadResult<Self> {
        let http = Client::builder()
            .user_agent("slicebox/0.1")
            .build()
            .map_err(|err| DownloadError::Network(err.to_string()))?;
        Ok(Self { http, timeout })
    }

    /// Streams `url` into a new file under `dir` and returns its path.
    /// `file://` URLs are copied.
    pub async fn fetch(&self, url: &str, dir: &Path) -> DownloadResult<PathBuf> {
        let url = if is_dropbox_share(url) {
            force_download(url)
        } else {
            url.to_string()
        };
        let parsed = Url::parse(&url).map_err(|_| DownloadError::InvalidUrl(url.clone()))?;
        fs::create_dir_all(dir)
            .await
            .map_err(|source| DownloadError::Io {
                path: dir.to_path_buf(),
                source,
            })?;
        let target = dir.join(format!("source_{}.{}", Uuid::new_v4(), source_suffix(&parsed)));

        match parsed.scheme() {
            "file" => {
                let source_path = parsed
                    .to_file_path()
                    .map_err(|_| DownloadError::InvalidUrl(url.clone()))?;
                fs::copy(&source_path, &target)
                    .await
                    .map_err(|source| DownloadError::Io {
                        path: source_path.clone(),
                        source,
                    })?;
            }
            "http" | "https" => self.stream_to_file(parsed, &target).await?,
            _ => return Err(DownloadError::InvalidUrl(url)),
        }
        info!(target = %target.display(), "source downloaded");
        Ok(target)
    }

    async fn stream_to_file(&self, url: Url, target: &Path) -> DownloadResult<()> {
        let response = self
            .http
            .get(url)
            .timeout(self.timeout)
            .send()
            .await?
            .error_for_status()?;
        let mut stream = response.bytes_stream();
        let mut file = fs::File::create(target)
            .await
            .map_err(|source| DownloadError::Io {
                path: target.to_path_buf(),
                source,
            })?;
        while let Some(chunk) = stream.next().await {
            let data = chunk?;
            file.write_all(&data)
                .await
                .map_err(|source| DownloadError::Io {
                    path: target.to_path_buf(),
                    source,
                })?;
        }
        file.flush().await.map_err(|source| DownloadError::Io {
            path: target.to_path_buf(),
            source,
        })
    }
}

/// Extension of the last path segment, or `wav`.
fn source_suffix(url: &Url) -> String {
    url.path_segments()
        .and_then(|mut segments| segments.next_back())
        .and_then(|name| name.rsplit_once('.'))
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .filter(|ext| !ext.is_empty() && ext.len() <= 8 && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .unwrap_or_else(|| DEFAULT_SUFFIX.to_string())
}
