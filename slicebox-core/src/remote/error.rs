use std::path::PathBuf;

use thiserror::Error;

use crate::error::ConfigError;

/// Statuses the upload path treats as transient.
pub const TRANSIENT_STATUSES: [u16; 5] = [429, 500, 502, 503, 504];

#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("{endpoint} returned {status}: {summary}")]
    Api {
        endpoint: String,
        status: u16,
        summary: String,
    },
    #[error("network error: {0}")]
    Network(String),
    #[error("unexpected response from {endpoint}: {message}")]
    Decode { endpoint: String, message: String },
    #[error("io error at {path}: {source}")]
    Io {
        source: std::io::Error,
        path: PathBuf,
    },
}

impl RemoteError {
    pub fn summary(&self) -> Option<&str> {
        match self {
            RemoteError::Api { summary, .. } => Some(summary),
            _ => None,
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            RemoteError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.summary()
            .is_some_and(|summary| summary.contains("not_found"))
    }

    /// A folder already sits at the path.
    pub fn is_folder_conflict(&self) -> bool {
        self.summary().is_some_and(|summary| {
            summary.contains("conflict/folder") || summary.contains("already_exists")
        })
    }

    /// A file (or other non-folder object) sits at the path.
    pub fn is_file_conflict(&self) -> bool {
        self.summary()
            .is_some_and(|summary| summary.contains("conflict/file"))
    }

    pub fn is_transient(&self) -> bool {
        self.status()
            .is_some_and(|status| TRANSIENT_STATUSES.contains(&status))
    }
}

impl From<reqwest::Error> for RemoteError {
    fn from(error: reqwest::Error) -> Self {
        RemoteError::Network(error.to_string())
    }
}

pub type RemoteResult<T> = Result<T, RemoteError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn api(status: u16, summary: &str) -> RemoteError {
        RemoteError::Api {
            endpoint: "files/create_folder_v2".into(),
            status,
            summary: summary.into(),
        }
    }

    #[test]
    fn classifies_provider_summaries() {
        assert!(api(409, "path/conflict/folder/..").is_folder_conflict());
        assert!(!api(409, "path/conflict/folder/..").is_file_conflict());
        assert!(api(409, "path/conflict/file/...").is_file_conflict());
        assert!(!api(409, "path/conflict/file/...").is_folder_conflict());
        assert!(api(409, "path/not_found/..").is_not_found());
        assert!(api(503, "service unavailable").is_transient());
        assert!(!api(400, "bad request").is_transient());
        assert!(!RemoteError::Network("reset".into()).is_not_found());
    }
}
