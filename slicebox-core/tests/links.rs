use slicebox_core::links::{resolve_with, ResolveError};
use slicebox_core::testing::{MemoryRemote, RemoteOp};
use slicebox_core::{resolve_downloadable_url, LinkKind};

#[tokio::test]
async fn temporary_link_is_preferred() {
    let remote = MemoryRemote::new();
    remote.add_file("/rec/a.wav", b"audio").await;
    remote.add_shared_link("/rec/a.wav", "https://x/y").await;

    let link = resolve_downloadable_url(&remote, "/rec/a.wav").await.unwrap();
    assert_eq!(link.kind, LinkKind::Temporary);
    assert_eq!(link.url, "https://content.example.test/temp/rec/a.wav");
    assert_eq!(remote.calls(RemoteOp::ListSharedLinks).await, 0);
}

#[tokio::test]
async fn existing_shared_link_is_forced_to_download() {
    let remote = MemoryRemote::new();
    remote.add_file("/rec/a.wav", b"audio").await;
    remote
        .fail(RemoteOp::TemporaryLink, 401, "missing_scope/files.content.read")
        .await;
    remote.add_shared_link("/rec/a.wav", "https://x/y").await;

    let link = resolve_downloadable_url(&remote, "/rec/a.wav").await.unwrap();
    assert_eq!(link.kind, LinkKind::SharedExisting);
    assert_eq!(link.url, "https://x/y?dl=1");
    assert_eq!(remote.calls(RemoteOp::CreateSharedLink).await, 0);
}

#[tokio::test]
async fn shared_link_is_created_when_none_exists() {
    let remote = MemoryRemote::new();
    remote.add_file("/rec/a.wav", b"audio").await;
    remote
        .fail(RemoteOp::TemporaryLink, 401, "missing_scope/files.content.read")
        .await;

    let link = resolve_downloadable_url(&remote, "/rec/a.wav").await.unwrap();
    assert_eq!(link.kind, LinkKind::SharedCreated);
    assert_eq!(link.url, "https://www.dropbox.com/s/1/a.wav?dl=1");
}

#[tokio::test]
async fn last_failure_is_reported_when_every_strategy_fails() {
    let remote = MemoryRemote::new();

    let err = resolve_downloadable_url(&remote, "/rec/missing.wav")
        .await
        .unwrap_err();
    match err {
        ResolveError::Remote { kind, source } => {
            assert_eq!(kind, LinkKind::SharedCreated);
            assert!(source.is_not_found());
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn empty_shared_link_list_moves_on() {
    let remote = MemoryRemote::new();
    remote.add_file("/rec/a.wav", b"audio").await;

    let err = resolve_with(&remote, "/rec/a.wav", &[LinkKind::SharedExisting])
        .await
        .unwrap_err();
    assert!(matches!(err, ResolveError::Empty(LinkKind::SharedExisting)));

    let err = resolve_with(&remote, "/rec/a.wav", &[]).await.unwrap_err();
    assert!(matches!(err, ResolveError::NoStrategies));
}
