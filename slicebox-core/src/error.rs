use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io { source: io::Error, path: PathBuf },
    #[error("failed to parse config {path}: {source}")]
    Parse {
        source: toml::de::Error,
        path: PathBuf,
    },
    #[error("missing environment variable: {0}")]
    MissingEnv(&'static str),
    #[error("dropbox credentials are not configured (DBX_APP_KEY, DBX_APP_SECRET, DBX_REFRESH_TOKEN)")]
    MissingCredentials,
    #[error("invalid value for {name}: {value}")]
    InvalidEnv { name: &'static str, value: String },
}

pub type Result<T> = std::result::Result<T, ConfigError>;
