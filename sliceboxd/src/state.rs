//! Application state shared across handlers.

use std::sync::Arc;

use slicebox_core::config::ServiceConfig;
use slicebox_core::{
    CursorStore, DownloadError, Downloader, DropboxClient, FfmpegTool, JsonFileCursorStore,
    MediaTool, RemoteStorage, SlicePipeline, Splitter,
};

use crate::AppError;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServiceConfig>,
    pub storage: Arc<dyn RemoteStorage>,
    pub cursors: Arc<dyn CursorStore>,
    pub pipeline: SlicePipeline,
}

impl AppState {
    pub fn new(
        config: ServiceConfig,
        storage: Arc<dyn RemoteStorage>,
        cursors: Arc<dyn CursorStore>,
        media: Arc<dyn MediaTool>,
    ) -> Result<Self, DownloadError> {
        let downloader = Downloader::new(config.dropbox.transfer_timeout())?;
        let pipeline = SlicePipeline::new(storage.clone(), downloader, Splitter::new(media));
        Ok(Self {
            config: Arc::new(config),
            storage,
            cursors,
            pipeline,
        })
    }

    /// Production wiring: Dropbox, ffmpeg and the JSON cursor file.
    pub fn from_config(config: ServiceConfig) -> Result<Self, AppError> {
        let storage: Arc<dyn RemoteStorage> = Arc::new(DropboxClient::from_config(&config)?);
        let cursors: Arc<dyn CursorStore> =
            Arc::new(JsonFileCursorStore::new(config.cursor.path.clone()));
        let media: Arc<dyn MediaTool> = Arc::new(FfmpegTool::new(&config.media));
        Ok(Self::new(config, storage, cursors, media)?)
    }
}
