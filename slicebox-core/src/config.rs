use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::error::{ConfigError, Result};

pub const ENV_APP_KEY: &str = "DBX_APP_KEY";
pub const ENV_APP_SECRET: &str = "DBX_APP_SECRET";
pub const ENV_REFRESH_TOKEN: &str = "DBX_REFRESH_TOKEN";
pub const ENV_APP_FOLDER_NAME: &str = "DBX_APP_FOLDER_NAME";
pub const ENV_CURSOR_FILE: &str = "CURSOR_FILE";
pub const ENV_PORT: &str = "PORT";

/// Variables reported by the diagnostic endpoint.
pub const DIAGNOSTIC_ENV_KEYS: [&str; 4] = [
    ENV_REFRESH_TOKEN,
    ENV_APP_KEY,
    ENV_APP_SECRET,
    ENV_APP_FOLDER_NAME,
];

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct ServiceConfig {
    pub server: ServerSection,
    pub dropbox: DropboxSection,
    pub upload: UploadSection,
    pub media: MediaSection,
    pub cursor: CursorSection,
    pub defaults: SliceDefaults,
}

impl ServiceConfig {
    /// Applies the process environment on top of the file values.
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_overrides(|name| std::env::var(name).ok())
    }

    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&'static str) -> Option<String>,
    {
        if let Some(port) = non_blank(lookup(ENV_PORT)) {
            self.server.port = port.parse().map_err(|_| ConfigError::InvalidEnv {
                name: ENV_PORT,
                value: port.clone(),
            })?;
        }
        if let Some(path) = non_blank(lookup(ENV_CURSOR_FILE)) {
            self.cursor.path = PathBuf::from(path);
        }
        if let Some(name) = non_blank(lookup(ENV_APP_FOLDER_NAME)) {
            self.dropbox.app_folder_name = Some(name);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    pub host: String,
    pub port: u16,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 8080,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DropboxSection {
    pub api_base: String,
    pub content_base: String,
    pub oauth_url: String,
    pub api_timeout_seconds: u64,
    pub transfer_timeout_seconds: u64,
    pub app_folder_name: Option<String>,
}

impl DropboxSection {
    pub fn api_timeout(&self) -> Duration {
        Duration::from_secs(self.api_timeout_seconds)
    }

    pub fn transfer_timeout(&self) -> Duration {
        Duration::from_secs(self.transfer_timeout_seconds)
    }
}

impl Default for DropboxSection {
    fn default() -> Self {
        Self {
            api_base: "https://api.dropboxapi.com/2".into(),
            content_base: "https://content.dropboxapi.com/2".into(),
            oauth_url: "https://api.dropbox.com/oauth2/token".into(),
            api_timeout_seconds: 60,
            transfer_timeout_seconds: 600,
            app_folder_name: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UploadSection {
    pub max_attempts: u32,
    pub backoff_seconds: f64,
}

impl Default for UploadSection {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_seconds: 1.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MediaSection {
    pub ffmpeg: PathBuf,
    pub ffprobe: PathBuf,
    pub sample_rate: u32,
    pub channels: u32,
}

impl Default for MediaSection {
    fn default() -> Self {
        Self {
            ffmpeg: PathBuf::from("ffmpeg"),
            ffprobe: PathBuf::from("ffprobe"),
            sample_rate: 16_000,
            channels: 1,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CursorSection {
    pub path: PathBuf,
}

impl Default for CursorSection {
    fn default() -> Self {
        Self {
            path: PathBuf::from("/app/cursor.json"),
        }
    }
}

/// Defaults applied to split requests that omit a field.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SliceDefaults {
    pub segment_time: i64,
    pub overlap_seconds: i64,
    pub format: String,
    pub dest_root: String,
    pub group_prefix: String,
    pub max_dirs: i64,
    pub max_files_per_dir: i64,
}

impl Default for SliceDefaults {
    fn default() -> Self {
        Self {
            segment_time: 400,
            overlap_seconds: 10,
            format: "wav".into(),
            dest_root: "/音檔".into(),
            group_prefix: "meeting".into(),
            max_dirs: 5,
            max_files_per_dir: 5,
        }
    }
}

/// OAuth app credentials. Only ever read from the environment.
#[derive(Clone)]
pub struct DropboxCredentials {
    pub app_key: String,
    pub app_secret: String,
    pub refresh_token: String,
}

impl DropboxCredentials {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&'static str) -> Option<String>,
    {
        let require = |name: &'static str| {
            non_blank(lookup(name)).ok_or(ConfigError::MissingEnv(name))
        };
        Ok(Self {
            app_key: require(ENV_APP_KEY)?,
            app_secret: require(ENV_APP_SECRET)?,
            refresh_token: require(ENV_REFRESH_TOKEN)?,
        })
    }
}

impl std::fmt::Debug for DropboxCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DropboxCredentials")
            .field("app_key", &self.app_key)
            .finish_non_exhaustive()
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

pub fn load_service_config<P: AsRef<Path>>(path: P) -> Result<ServiceConfig> {
    load_toml(path)
}

fn load_toml<T, P>(path: P) -> Result<T>
where
    T: DeserializeOwned,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        source,
        path: path.to_path_buf(),
    })?;
    toml::from_str(&content).map_err(|source| ConfigError::Parse {
        source,
        path: path.to_path_buf(),
    })
}
