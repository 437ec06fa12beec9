use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use slicebox_core::config::SliceDefaults;
use slicebox_core::testing::{MemoryRemote, RemoteOp, ScriptedMediaTool};
use slicebox_core::{
    Downloader, PipelineError, SliceOutcome, SlicePipeline, SliceRequest, Splitter,
};
use tempfile::TempDir;
use url::Url;

struct Harness {
    remote: Arc<MemoryRemote>,
    tool: Arc<ScriptedMediaTool>,
    pipeline: SlicePipeline,
    work: TempDir,
    source_dir: TempDir,
}

fn harness(tool: ScriptedMediaTool) -> Harness {
    let remote = Arc::new(MemoryRemote::new());
    let tool = Arc::new(tool);
    let work = TempDir::new().unwrap();
    let source_dir = TempDir::new().unwrap();
    let pipeline = SlicePipeline::new(
        remote.clone(),
        Downloader::new(Duration::from_secs(5)).unwrap(),
        Splitter::new(tool.clone()),
    )
    .with_work_root(work.path());
    Harness {
        remote,
        tool,
        pipeline,
        work,
        source_dir,
    }
}

fn source_url(dir: &Path) -> String {
    let path = dir.join("meeting.wav");
    std::fs::write(&path, b"RIFF....WAVE").unwrap();
    Url::from_file_path(&path).unwrap().to_string()
}

fn request(url: String) -> SliceRequest {
    SliceRequest {
        url: Some(url),
        max_files_per_dir: 2,
        ..SliceRequest::from_defaults(&SliceDefaults::default())
    }
}

fn work_dir_is_empty(dir: &Path) -> bool {
    std::fs::read_dir(dir).unwrap().next().is_none()
}

#[tokio::test]
async fn pieces_are_spread_across_shards() {
    let h = harness(ScriptedMediaTool::new(1000.0));
    let req = request(source_url(h.source_dir.path()));

    let report = h.pipeline.split_and_upload(&req).await.unwrap();
    assert_eq!(report.count, 3);
    assert_eq!(
        report.uploaded,
        vec![
            "/音檔/01/meeting-001.wav",
            "/音檔/01/meeting-002.wav",
            "/音檔/02/meeting-003.wav",
        ]
    );
    assert_eq!(h.remote.files_in("/音檔/01").await.len(), 2);
    assert_eq!(
        h.remote.file_contents("/音檔/02/meeting-003.wav").await,
        Some(b"780.000+220.000".to_vec())
    );

    let starts: Vec<f64> = h.tool.extracted().await.iter().map(|(_, s, _)| *s).collect();
    assert_eq!(starts, vec![0.0, 390.0, 780.0]);
    assert!(work_dir_is_empty(h.work.path()));
}

#[tokio::test]
async fn request_format_is_lowercased() {
    let h = harness(ScriptedMediaTool::new(30.0));
    let mut req = request(source_url(h.source_dir.path()));
    req.format = "WAV".into();
    req.group_prefix = "standup".into();

    let report = h.pipeline.split_and_upload(&req).await.unwrap();
    assert_eq!(report.uploaded, vec!["/音檔/01/standup-001.wav"]);
}

#[tokio::test]
async fn ensure_slices_skips_existing_group() {
    let h = harness(ScriptedMediaTool::new(1000.0));
    h.remote.fill_folder("/音檔/03", "meeting", 1).await;
    let req = request(source_url(h.source_dir.path()));

    let outcome = h.pipeline.ensure_slices(&req).await.unwrap();
    assert_eq!(outcome, SliceOutcome::Skipped { reason: "group_exists" });
    assert_eq!(h.remote.calls(RemoteOp::Upload).await, 0);
    assert!(h.tool.extracted().await.is_empty());
}

#[tokio::test]
async fn ensure_slices_uploads_new_group() {
    let h = harness(ScriptedMediaTool::new(100.0));
    h.remote.fill_folder("/音檔/01", "other", 1).await;
    let req = request(source_url(h.source_dir.path()));

    match h.pipeline.ensure_slices(&req).await.unwrap() {
        SliceOutcome::Uploaded(report) => {
            assert_eq!(report.uploaded, vec!["/音檔/01/meeting-001.wav"]);
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
}

#[tokio::test]
async fn upload_failure_reports_partial_progress() {
    let h = harness(ScriptedMediaTool::new(1000.0));
    h.remote.fail_uploads_after(1).await;
    let req = request(source_url(h.source_dir.path()));

    let failure = h.pipeline.split_and_upload(&req).await.unwrap_err();
    assert_eq!(failure.uploaded, vec!["/音檔/01/meeting-001.wav"]);
    match failure.error {
        PipelineError::Upload { remote, source, .. } => {
            assert_eq!(remote, "/音檔/01/meeting-002.wav");
            assert_eq!(source.status(), Some(507));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(work_dir_is_empty(h.work.path()));
}

#[tokio::test]
async fn split_failure_uploads_nothing_and_cleans_up() {
    let h = harness(ScriptedMediaTool::new(1000.0).failing_at(1));
    let req = request(source_url(h.source_dir.path()));

    let failure = h.pipeline.split_and_upload(&req).await.unwrap_err();
    assert!(failure.uploaded.is_empty());
    assert!(matches!(failure.error, PipelineError::Split(_)));
    assert_eq!(h.remote.calls(RemoteOp::Upload).await, 0);
    assert!(work_dir_is_empty(h.work.path()));
}

#[tokio::test]
async fn missing_source_is_rejected_before_any_work() {
    let h = harness(ScriptedMediaTool::new(10.0));
    let req = SliceRequest::from_defaults(&SliceDefaults::default());

    let failure = h.pipeline.split_and_upload(&req).await.unwrap_err();
    assert!(matches!(failure.error, PipelineError::MissingSource));
    assert_eq!(h.remote.calls(RemoteOp::CreateFolder).await, 0);
}

#[tokio::test]
async fn unresolvable_path_is_a_resolve_error() {
    let h = harness(ScriptedMediaTool::new(10.0));
    let req = SliceRequest {
        path: Some("/rec/missing.wav".into()),
        ..SliceRequest::from_defaults(&SliceDefaults::default())
    };

    let failure = h.pipeline.split_and_upload(&req).await.unwrap_err();
    assert!(matches!(failure.error, PipelineError::Resolve(_)));
    assert_eq!(h.remote.calls(RemoteOp::Upload).await, 0);
}

#[tokio::test]
async fn unreadable_source_is_a_download_error() {
    let h = harness(ScriptedMediaTool::new(10.0));
    let missing = h.source_dir.path().join("nope.wav");
    let req = request(Url::from_file_path(&missing).unwrap().to_string());

    let failure = h.pipeline.split_and_upload(&req).await.unwrap_err();
    assert!(matches!(failure.error, PipelineError::Download(_)));
    assert!(work_dir_is_empty(h.work.path()));
}
