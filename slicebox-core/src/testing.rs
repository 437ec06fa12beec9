//! In-memory stand-ins for the remote store and the media tool.
//!
//! `MemoryRemote` answers with the same `error_summary` shapes the real
//! provider uses, so the not-found/conflict handling in `remote`, `shards`
//! and `links` runs unchanged against it.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tokio::sync::Mutex;

use crate::remote::{
    parent_folder, ListFolderPage, RemoteEntry, RemoteError, RemoteResult, RemoteStorage,
    SharedLink, SharedLinkSettings,
};
use crate::splitter::{MediaTool, SplitError, SplitResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RemoteOp {
    CreateFolder,
    ListFolder,
    ListFolderContinue,
    TemporaryLink,
    ListSharedLinks,
    CreateSharedLink,
    Upload,
}

impl RemoteOp {
    fn endpoint(self) -> &'static str {
        match self {
            RemoteOp::CreateFolder => "files/create_folder_v2",
            RemoteOp::ListFolder => "files/list_folder",
            RemoteOp::ListFolderContinue => "files/list_folder/continue",
            RemoteOp::TemporaryLink => "files/get_temporary_link",
            RemoteOp::ListSharedLinks => "sharing/list_shared_links",
            RemoteOp::CreateSharedLink => "sharing/create_shared_link_with_settings",
            RemoteOp::Upload => "files/upload",
        }
    }
}

#[derive(Debug, Clone)]
struct Failure {
    status: u16,
    summary: String,
}

#[derive(Debug, Default)]
struct State {
    folders: BTreeSet<String>,
    files: BTreeMap<String, Vec<u8>>,
    shared_links: HashMap<String, Vec<String>>,
    failures: HashMap<RemoteOp, Failure>,
    uploads_before_failure: Option<usize>,
    uploads: Vec<String>,
    calls: HashMap<RemoteOp, usize>,
    pending: HashMap<String, Vec<RemoteEntry>>,
    next_cursor: usize,
    next_link: usize,
}

impl State {
    fn record(&mut self, op: RemoteOp) -> RemoteResult<()> {
        *self.calls.entry(op).or_default() += 1;
        match self.failures.get(&op) {
            Some(failure) => Err(api_error(op, failure.status, &failure.summary)),
            None => Ok(()),
        }
    }

    fn is_folder(&self, path: &str) -> bool {
        path.is_empty() || self.folders.contains(path)
    }

    fn add_ancestors(&mut self, path: &str) {
        let mut current = parent_folder(path);
        while let Some(folder) = current {
            self.folders.insert(folder.to_string());
            current = parent_folder(folder);
        }
    }

    fn children(&self, path: &str, recursive: bool) -> Vec<RemoteEntry> {
        let prefix = format!("{path}/");
        let direct = |candidate: &str| {
            candidate
                .strip_prefix(&prefix)
                .is_some_and(|rest| recursive || !rest.contains('/'))
        };
        let mut entries: Vec<RemoteEntry> = self
            .folders
            .iter()
            .filter(|folder| direct(folder.as_str()))
            .map(|folder| entry_for(folder, false))
            .collect();
        entries.extend(
            self.files
                .keys()
                .filter(|file| direct(file.as_str()))
                .map(|file| entry_for(file, true)),
        );
        entries
    }

    fn page(&mut self, mut remaining: Vec<RemoteEntry>, page_size: usize) -> ListFolderPage {
        let rest = if remaining.len() > page_size {
            remaining.split_off(page_size)
        } else {
            Vec::new()
        };
        self.next_cursor += 1;
        let cursor = format!("cursor-{}", self.next_cursor);
        let has_more = !rest.is_empty();
        self.pending.insert(cursor.clone(), rest);
        ListFolderPage {
            entries: remaining,
            cursor,
            has_more,
        }
    }
}

fn entry_for(path: &str, is_file: bool) -> RemoteEntry {
    let (parent, name) = path.rsplit_once('/').unwrap_or(("", path));
    if is_file {
        RemoteEntry::file(name, parent)
    } else {
        RemoteEntry::folder(name, parent)
    }
}

fn api_error(op: RemoteOp, status: u16, summary: &str) -> RemoteError {
    RemoteError::Api {
        endpoint: op.endpoint().to_string(),
        status,
        summary: summary.to_string(),
    }
}

fn normalize(path: &str) -> String {
    path.trim_end_matches('/').to_string()
}

/// Remote folder tree held in memory.
#[derive(Debug)]
pub struct MemoryRemote {
    state: Mutex<State>,
    page_size: usize,
}

impl Default for MemoryRemote {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryRemote {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State::default()),
            page_size: 500,
        }
    }

    /// Limits listing pages so continuation is exercised.
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Adds `path` and any missing ancestors.
    pub async fn add_folder(&self, path: &str) {
        let path = normalize(path);
        let mut state = self.state.lock().await;
        state.add_ancestors(&path);
        state.folders.insert(path);
    }

    /// Adds a file, creating its parent folders.
    pub async fn add_file(&self, path: &str, contents: &[u8]) {
        let path = normalize(path);
        let mut state = self.state.lock().await;
        state.add_ancestors(&path);
        state.files.insert(path, contents.to_vec());
    }

    /// Adds `count` files named `<prefix>-NNN.wav` under `folder`.
    pub async fn fill_folder(&self, folder: &str, prefix: &str, count: usize) {
        for index in 0..count {
            self.add_file(&format!("{folder}/{prefix}-{index:03}.wav"), b"")
                .await;
        }
    }

    pub async fn add_shared_link(&self, path: &str, url: &str) {
        let mut state = self.state.lock().await;
        state
            .shared_links
            .entry(normalize(path))
            .or_default()
            .push(url.to_string());
    }

    /// Every later call of `op` fails with `status` and `summary`.
    pub async fn fail(&self, op: RemoteOp, status: u16, summary: &str) {
        self.state.lock().await.failures.insert(
            op,
            Failure {
                status,
                summary: summary.to_string(),
            },
        );
    }

    /// Uploads succeed `count` times, then fail with a storage error.
    pub async fn fail_uploads_after(&self, count: usize) {
        self.state.lock().await.uploads_before_failure = Some(count);
    }

    pub async fn has_folder(&self, path: &str) -> bool {
        self.state.lock().await.folders.contains(&normalize(path))
    }

    pub async fn has_file(&self, path: &str) -> bool {
        self.state.lock().await.files.contains_key(&normalize(path))
    }

    pub async fn file_contents(&self, path: &str) -> Option<Vec<u8>> {
        self.state.lock().await.files.get(&normalize(path)).cloned()
    }

    /// Names of the files directly inside `folder`, sorted.
    pub async fn files_in(&self, folder: &str) -> Vec<String> {
        let state = self.state.lock().await;
        state
            .children(&normalize(folder), false)
            .into_iter()
            .filter(RemoteEntry::is_file)
            .map(|entry| entry.name)
            .collect()
    }

    /// Remote paths written by `upload`, in call order.
    pub async fn uploads(&self) -> Vec<String> {
        self.state.lock().await.uploads.clone()
    }

    pub async fn calls(&self, op: RemoteOp) -> usize {
        self.state
            .lock()
            .await
            .calls
            .get(&op)
            .copied()
            .unwrap_or_default()
    }
}

#[async_trait]
impl RemoteStorage for MemoryRemote {
    async fn create_folder(&self, path: &str) -> RemoteResult<()> {
        let op = RemoteOp::CreateFolder;
        let path = normalize(path);
        let mut state = self.state.lock().await;
        state.record(op)?;
        if state.files.contains_key(&path) {
            return Err(api_error(op, 409, "path/conflict/file/.."));
        }
        if state.folders.contains(&path) {
            return Err(api_error(op, 409, "path/conflict/folder/.."));
        }
        if let Some(parent) = parent_folder(&path) {
            if !state.is_folder(parent) {
                return Err(api_error(op, 409, "path/not_found/.."));
            }
        }
        state.folders.insert(path);
        Ok(())
    }

    async fn list_folder(
        &self,
        path: &str,
        recursive: bool,
        _limit: u32,
    ) -> RemoteResult<ListFolderPage> {
        let op = RemoteOp::ListFolder;
        let path = normalize(path);
        let mut state = self.state.lock().await;
        state.record(op)?;
        if !state.is_folder(&path) {
            return Err(api_error(op, 409, "path/not_found/.."));
        }
        let entries = state.children(&path, recursive);
        Ok(state.page(entries, self.page_size))
    }

    async fn list_folder_continue(&self, cursor: &str) -> RemoteResult<ListFolderPage> {
        let op = RemoteOp::ListFolderContinue;
        let mut state = self.state.lock().await;
        state.record(op)?;
        let remaining = state
            .pending
            .remove(cursor)
            .ok_or_else(|| api_error(op, 409, "reset/.."))?;
        Ok(state.page(remaining, self.page_size))
    }

    async fn get_temporary_link(&self, path: &str) -> RemoteResult<String> {
        let op = RemoteOp::TemporaryLink;
        let path = normalize(path);
        let mut state = self.state.lock().await;
        state.record(op)?;
        if !state.files.contains_key(&path) {
            return Err(api_error(op, 409, "path/not_found/.."));
        }
        Ok(format!("https://content.example.test/temp{path}"))
    }

    async fn list_shared_links(
        &self,
        path: &str,
        _direct_only: bool,
    ) -> RemoteResult<Vec<SharedLink>> {
        let mut state = self.state.lock().await;
        state.record(RemoteOp::ListSharedLinks)?;
        Ok(state
            .shared_links
            .get(&normalize(path))
            .map(|urls| urls.iter().map(SharedLink::new).collect())
            .unwrap_or_default())
    }

    async fn create_shared_link(
        &self,
        path: &str,
        _settings: &SharedLinkSettings,
    ) -> RemoteResult<SharedLink> {
        let op = RemoteOp::CreateSharedLink;
        let path = normalize(path);
        let mut state = self.state.lock().await;
        state.record(op)?;
        if !state.files.contains_key(&path) {
            return Err(api_error(op, 409, "path/not_found/.."));
        }
        if state.shared_links.contains_key(&path) {
            return Err(api_error(op, 409, "shared_link_already_exists/.."));
        }
        state.next_link += 1;
        let name = path.rsplit('/').next().unwrap_or_default();
        let url = format!("https://www.dropbox.com/s/{}/{}?dl=0", state.next_link, name);
        state.shared_links.insert(path, vec![url.clone()]);
        Ok(SharedLink::new(url))
    }

    async fn upload(&self, local: &Path, remote_path: &str) -> RemoteResult<()> {
        let op = RemoteOp::Upload;
        let bytes = fs::read(local).await.map_err(|source| RemoteError::Io {
            source,
            path: local.to_path_buf(),
        })?;
        let path = normalize(remote_path);
        let mut state = self.state.lock().await;
        state.record(op)?;
        if let Some(remaining) = state.uploads_before_failure.as_mut() {
            if *remaining == 0 {
                return Err(api_error(op, 507, "path/insufficient_space/.."));
            }
            *remaining -= 1;
        }
        state.add_ancestors(&path);
        state.files.insert(path.clone(), bytes);
        state.uploads.push(path);
        Ok(())
    }
}

/// Media tool reporting a fixed duration and writing placeholder pieces.
#[derive(Debug)]
pub struct ScriptedMediaTool {
    duration: f64,
    fail_at: Option<usize>,
    extracted: Mutex<Vec<(PathBuf, f64, f64)>>,
}

impl ScriptedMediaTool {
    pub fn new(duration: f64) -> Self {
        Self {
            duration,
            fail_at: None,
            extracted: Mutex::new(Vec::new()),
        }
    }

    /// The extraction with zero-based position `index` fails.
    pub fn failing_at(mut self, index: usize) -> Self {
        self.fail_at = Some(index);
        self
    }

    /// `(output, start, duration)` per successful extraction.
    pub async fn extracted(&self) -> Vec<(PathBuf, f64, f64)> {
        self.extracted.lock().await.clone()
    }
}

#[async_trait]
impl MediaTool for ScriptedMediaTool {
    async fn probe_duration(&self, input: &Path) -> SplitResult<f64> {
        fs::metadata(input).await.map_err(|source| SplitError::Io {
            source,
            path: input.to_path_buf(),
        })?;
        Ok(self.duration)
    }

    async fn extract(
        &self,
        _input: &Path,
        start: f64,
        duration: f64,
        output: &Path,
    ) -> SplitResult<()> {
        let mut extracted = self.extracted.lock().await;
        if self.fail_at == Some(extracted.len()) {
            return Err(SplitError::Transcode {
                command: "scripted".to_string(),
                status: Some(1),
                stderr: format!("refusing piece at {start:.3}"),
            });
        }
        let contents = format!("{start:.3}+{duration:.3}");
        fs::write(output, contents)
            .await
            .map_err(|source| SplitError::Io {
                source,
                path: output.to_path_buf(),
            })?;
        extracted.push((output.to_path_buf(), start, duration));
        Ok(())
    }
}
