//! Turns a remote path into a URL that downloads directly.
//!
//! Strategies are tried in a fixed order and the first success wins:
//! a temporary link, then an existing direct shared link, then a freshly
//! created public shared link. Shared links are rewritten to force a
//! download instead of a preview page.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::remote::{RemoteError, RemoteStorage, SharedLinkSettings};

/// Query parameter that switches a shared link between preview and download.
pub const DOWNLOAD_PARAM: &str = "dl";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkKind {
    Temporary,
    SharedExisting,
    SharedCreated,
}

impl LinkKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            LinkKind::Temporary => "temporary",
            LinkKind::SharedExisting => "shared_existing",
            LinkKind::SharedCreated => "shared_created",
        }
    }
}

impl std::fmt::Display for LinkKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadableLink {
    pub url: String,
    pub kind: LinkKind,
}

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("{kind} link request failed: {source}")]
    Remote {
        kind: LinkKind,
        #[source]
        source: RemoteError,
    },
    #[error("{0} link response had no usable url")]
    Empty(LinkKind),
    #[error("no link strategy configured")]
    NoStrategies,
}

pub type ResolveResult<T> = Result<T, ResolveError>;

/// Ordering used by [`resolve_downloadable_url`].
pub const DEFAULT_STRATEGIES: [LinkKind; 3] = [
    LinkKind::Temporary,
    LinkKind::SharedExisting,
    LinkKind::SharedCreated,
];

/// Resolves `path` with the default strategy order.
pub async fn resolve_downloadable_url(
    storage: &dyn RemoteStorage,
    path: &str,
) -> ResolveResult<DownloadableLink> {
    resolve_with(storage, path, &DEFAULT_STRATEGIES).await
}

/// Runs `strategies` in order and returns the first success. When all of
/// them fail, the last failure is returned.
pub async fn resolve_with(
    storage: &dyn RemoteStorage,
    path: &str,
    strategies: &[LinkKind],
) -> ResolveResult<DownloadableLink> {
    let mut last_error = ResolveError::NoStrategies;
    for &kind in strategies {
        match attempt(storage, path, kind).await {
            Ok(link) => {
                debug!(path, kind = %kind, "resolved downloadable link");
                return Ok(link);
            }
            Err(err) => {
                warn!(path, kind = %kind, error = %err, "link strategy failed, trying next");
                last_error = err;
            }
        }
    }
    Err(last_error)
}

async fn attempt(
    storage: &dyn RemoteStorage,
    path: &str,
    kind: LinkKind,
) -> ResolveResult<DownloadableLink> {
    let remote = |source| ResolveError::Remote { kind, source };
    let url = match kind {
        LinkKind::Temporary => storage.get_temporary_link(path).await.map_err(remote)?,
        LinkKind::SharedExisting => storage
            .list_shared_links(path, true)
            .await
            .map_err(remote)?
            .into_iter()
            .next()
            .map(|link| force_download(&link.url))
            .unwrap_or_default(),
        LinkKind::SharedCreated => {
            let link = storage
                .create_shared_link(path, &SharedLinkSettings::public_download())
                .await
                .map_err(remote)?;
            force_download(&link.url)
        }
    };
    if url.trim().is_empty() {
        return Err(ResolveError::Empty(kind));
    }
    Ok(DownloadableLink { url, kind })
}

/// Sets the download parameter to `1`, replacing any other value or
/// appending it with the right separator. Applying it twice changes nothing.
pub fn force_download(url: &str) -> String {
    if url.is_empty() {
        return String::new();
    }
    let (without_fragment, fragment) = match url.split_once('#') {
        Some((head, fragment)) => (head, Some(fragment)),
        None => (url, None),
    };
    let (base, query) = match without_fragment.split_once('?') {
        Some((base, query)) => (base, Some(query)),
        None => (without_fragment, None),
    };
    let forced = format!("{DOWNLOAD_PARAM}=1");
    let rebuilt = match query {
        Some(query) if !query.is_empty() => {
            let mut found = false;
            let params: Vec<String> = query
                .split('&')
                .map(|param| {
                    let key = param.split_once('=').map_or(param, |(key, _)| key);
                    if key == DOWNLOAD_PARAM {
                        found = true;
                        forced.clone()
                    } else {
                        param.to_string()
                    }
                })
                .collect();
            let mut query = params.join("&");
            if !found {
                query.push('&');
                query.push_str(&forced);
            }
            format!("{base}?{query}")
        }
        _ => format!("{base}?{forced}"),
    };
    match fragment {
        Some(fragment) => format!("{rebuilt}#{fragment}"),
        None => rebuilt,
    }
}

/// Whether `url` points at the Dropbox web host, whose links need
/// [`force_download`] before fetching.
pub fn is_dropbox_share(url: &str) -> bool {
    url::Url::parse(url)
        .ok()
        .and_then(|parsed| parsed.host_str().map(|host| host.to_ascii_lowercase()))
        .is_some_and(|host| host == "dropbox.com" || host.ends_with(".dropbox.com"))
}
