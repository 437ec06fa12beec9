use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::config::{DropboxCredentials, DropboxSection, ServiceConfig};
use crate::error::ConfigError;

use super::{
    ListFolderPage, RemoteError, RemoteResult, RemoteStorage, RetryPolicy, SharedLink,
    SharedLinkSettings,
};

const TOKEN_TIMEOUT: Duration = Duration::from_secs(30);
const TOKEN_REFRESH_MARGIN: Duration = Duration::from_secs(60);

#[derive(Debug, Clone)]
struct CachedToken {
    value: String,
    expires_at: Option<Instant>,
}

impl CachedToken {
    fn is_fresh(&self) -> bool {
        match self.expires_at {
            Some(expires_at) => Instant::now() + TOKEN_REFRESH_MARGIN < expires_at,
            None => false,
        }
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error_summary: String,
}

#[derive(Debug, Default, Deserialize)]
struct TemporaryLinkResponse {
    #[serde(default)]
    link: String,
}

#[derive(Debug, Default, Deserialize)]
struct SharedLinksResponse {
    #[serde(default)]
    links: Vec<SharedLink>,
}

/// Dropbox HTTP API client. Access tokens are minted from the refresh token
/// and reused until shortly before they expire.
pub struct DropboxClient {
    http: Client,
    config: Arc<DropboxSection>,
    credentials: Option<DropboxCredentials>,
    token: Mutex<Option<CachedToken>>,
    upload_retry: RetryPolicy,
}

impl DropboxClient {
    pub fn new(
        config: DropboxSection,
        credentials: Option<DropboxCredentials>,
        upload_retry: RetryPolicy,
    ) -> RemoteResult<Self> {
        let http = Client::builder()
            .user_agent("slicebox/0.1")
            .build()
            .map_err(|err| RemoteError::Network(err.to_string()))?;
        Ok(Self {
            http,
            config: Arc::new(config),
            credentials,
            token: Mutex::new(None),
            upload_retry,
        })
    }

    /// Builds a client from the service config and the credential
    /// environment. Missing credentials are reported on each call.
    pub fn from_config(config: &ServiceConfig) -> RemoteResult<Self> {
        let credentials = match DropboxCredentials::from_env() {
            Ok(credentials) => Some(credentials),
            Err(err) => {
                warn!(error = %err, "dropbox credentials unavailable");
                None
            }
        };
        Self::new(
            config.dropbox.clone(),
            credentials,
            RetryPolicy::from(&config.upload),
        )
    }

    fn credentials(&self) -> RemoteResult<&DropboxCredentials> {
        self.credentials
            .as_ref()
            .ok_or(RemoteError::Config(ConfigError::MissingCredentials))
    }

    async fn access_token(&self) -> RemoteResult<String> {
        let credentials = self.credentials()?;
        let mut cached = self.token.lock().await;
        if let Some(token) = cached.as_ref().filter(|token| token.is_fresh()) {
            return Ok(token.value.clone());
        }
        let response = self
            .http
            .post(&self.config.oauth_url)
            .basic_auth(&credentials.app_key, Some(&credentials.app_secret))
            .form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", credentials.refresh_token.as_str()),
            ])
            .timeout(TOKEN_TIMEOUT)
            .send()
            .await?;
        let response = self.check("oauth2/token", response).await?;
        let token: TokenResponse = decode(response, "oauth2/token").await?;
        let expires_at = token
            .expires_in
            .map(|seconds| Instant::now() + Duration::from_secs(seconds));
        *cached = Some(CachedToken {
            value: token.access_token.clone(),
            expires_at,
        });
        Ok(token.access_token)
    }

    async fn rpc<T: DeserializeOwned>(&self, endpoint: &str, payload: Value) -> RemoteResult<T> {
        let token = self.access_token().await?;
        let url = format!("{}/{}", self.config.api_base, endpoint.trim_start_matches('/'));
        let response = self
            .http
            .post(url)
            .bearer_auth(token)
            .json(&payload)
            .timeout(self.config.api_timeout())
            .send()
            .await?;
        decode(self.check(endpoint, response).await?, endpoint).await
    }

    async fn check(&self, endpoint: &str, response: Response) -> RemoteResult<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        let summary = serde_json::from_str::<ErrorBody>(&body)
            .map(|parsed| parsed.error_summary)
            .unwrap_or(body);
        Err(RemoteError::Api {
            endpoint: endpoint.to_string(),
            status: status.as_u16(),
            summary,
        })
    }

    async fn upload_once(&self, body: Vec<u8>, api_arg: &str) -> RemoteResult<()> {
        let token = self.access_token().await?;
        let response = self
            .http
            .post(format!("{}/files/upload", self.config.content_base))
            .bearer_auth(token)
            .header("Content-Type", "application/octet-stream")
            .header("Dropbox-API-Arg", api_arg)
            .body(body)
            .timeout(self.config.transfer_timeout())
            .send()
            .await?;
        self.check("files/upload", response).await.map(|_| ())
    }
}

async fn decode<T: DeserializeOwned>(response: Response, endpoint: &str) -> RemoteResult<T> {
    let bytes = response.bytes().await?;
    serde_json::from_slice(&bytes).map_err(|err| RemoteError::Decode {
        endpoint: endpoint.to_string(),
        message: err.to_string(),
    })
}

/// JSON with every non-ASCII character escaped, as HTTP header values must
/// be ASCII.
pub(crate) fn ascii_json(value: &Value) -> String {
    let raw = value.to_string();
    let mut escaped = String::with_capacity(raw.len());
    let mut units = [0u16; 2];
    for ch in raw.chars() {
        if ch.is_ascii() {
            escaped.push(ch);
        } else {
            for unit in ch.encode_utf16(&mut units) {
                escaped.push_str(&format!("\\u{:04x}", unit));
            }
        }
    }
    escaped
}

#[async_trait]
impl RemoteStorage for DropboxClient {
    async fn create_folder(&self, path: &str) -> RemoteResult<()> {
        let _: Value = self
            .rpc(
                "files/create_folder_v2",
                json!({ "path": path, "autorename": false }),
            )
            .await?;
        Ok(())
    }

    async fn list_folder(
        &self,
        path: &str,
        recursive: bool,
        limit: u32,
    ) -> RemoteResult<ListFolderPage> {
        self.rpc(
            "files/list_folder",
            json!({ "path": path, "recursive": recursive, "limit": limit }),
        )
        .await
    }

    async fn list_folder_continue(&self, cursor: &str) -> RemoteResult<ListFolderPage> {
        self.rpc("files/list_folder/continue", json!({ "cursor": cursor }))
            .await
    }

    async fn get_temporary_link(&self, path: &str) -> RemoteResult<String> {
        let response: TemporaryLinkResponse = self
            .rpc("files/get_temporary_link", json!({ "path": path }))
            .await?;
        Ok(response.link)
    }

    async fn list_shared_links(
        &self,
        path: &str,
        direct_only: bool,
    ) -> RemoteResult<Vec<SharedLink>> {
        let response: SharedLinksResponse = self
            .rpc(
                "sharing/list_shared_links",
                json!({ "path": path, "direct_only": direct_only }),
            )
            .await?;
        Ok(response.links)
    }

    async fn create_shared_link(
        &self,
        path: &str,
        settings: &SharedLinkSettings,
    ) -> RemoteResult<SharedLink> {
        self.rpc(
            "sharing/create_shared_link_with_settings",
            json!({ "path": path, "settings": settings }),
        )
        .await
    }

    async fn upload(&self, local: &Path, remote_path: &str) -> RemoteResult<()> {
        let body = fs::read(local).await.map_err(|source| RemoteError::Io {
            path: local.to_path_buf(),
            source,
        })?;
        let api_arg = ascii_json(&json!({
            "path": remote_path,
            "mode": "overwrite",
            "autorename": false,
            "mute": true,
        }));
        self.upload_retry
            .run("files/upload", || self.upload_once(body.clone(), &api_arg))
            .await?;
        debug!(remote = remote_path, "upload complete");
        Ok(())
    }
}
