pub mod changes;
pub mod config;
pub mod cursor;
pub mod download;
pub mod error;
pub mod links;
pub mod pipeline;
pub mod remote;
pub mod shards;
pub mod splitter;
pub mod testing;

pub use changes::{list_changes, ChangesPage, ChangesQuery, ListingMode};
pub use config::{
    load_service_config, DropboxCredentials, ServiceConfig, SliceDefaults, DIAGNOSTIC_ENV_KEYS,
};
pub use cursor::{CursorError, CursorStore, JsonFileCursorStore, MemoryCursorStore};
pub use download::{DownloadError, Downloader};
pub use error::{ConfigError, Result};
pub use links::{force_download, resolve_downloadable_url, DownloadableLink, LinkKind, ResolveError};
pub use pipeline::{
    PipelineError, SliceFailure, SliceOutcome, SlicePipeline, SliceReport, SliceRequest,
};
pub use remote::{DropboxClient, RemoteError, RemoteStorage, RetryPolicy};
pub use shards::{pick_destination, AllocationError, ShardFolder, ShardLayout};
pub use splitter::{FfmpegTool, MediaTool, SegmentPiece, SplitError, Splitter};
