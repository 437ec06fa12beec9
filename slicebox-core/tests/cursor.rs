use std::sync::Arc;

use futures::future::join_all;
use slicebox_core::{CursorStore, JsonFileCursorStore};
use tempfile::TempDir;

#[tokio::test]
async fn missing_file_reads_as_empty() {
    let dir = TempDir::new().unwrap();
    let store = JsonFileCursorStore::new(dir.path().join("cursor.json"));

    assert_eq!(store.get("default").await.unwrap(), None);
}

#[tokio::test]
async fn set_get_and_remove() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("cursor.json");
    let store = JsonFileCursorStore::new(&path);

    store.set("default", Some("AAA")).await.unwrap();
    store.set("inbox", Some("BBB")).await.unwrap();
    assert_eq!(store.get("default").await.unwrap().as_deref(), Some("AAA"));

    let on_disk: serde_json::Value =
        serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
    assert_eq!(on_disk, serde_json::json!({"default": "AAA", "inbox": "BBB"}));

    store.set("default", None).await.unwrap();
    assert_eq!(store.get("default").await.unwrap(), None);
    assert_eq!(store.get("inbox").await.unwrap().as_deref(), Some("BBB"));
}

#[tokio::test]
async fn corrupt_file_is_treated_as_empty_and_replaced() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("cursor.json");
    std::fs::write(&path, b"{not json").unwrap();
    let store = JsonFileCursorStore::new(&path);

    assert_eq!(store.get("default").await.unwrap(), None);
    store.set("default", Some("CCC")).await.unwrap();

    let reopened = JsonFileCursorStore::new(&path);
    assert_eq!(reopened.get("default").await.unwrap().as_deref(), Some("CCC"));
}

#[tokio::test]
async fn concurrent_sets_keep_every_key() {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(JsonFileCursorStore::new(dir.path().join("cursor.json")));

    let writes = (0..16).map(|index| {
        let store = Arc::clone(&store);
        async move {
            let value = format!("cursor-{index}");
            store.set(&format!("key-{index}"), Some(value.as_str())).await
        }
    });
    for result in join_all(writes).await {
        result.unwrap();
    }

    for index in 0..16 {
        assert_eq!(
            store.get(&format!("key-{index}")).await.unwrap(),
            Some(format!("cursor-{index}"))
        );
    }
}
