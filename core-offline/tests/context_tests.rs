//! `OfflineContext` over real directories.

mod common;

use bridge_desktop::TokioOfflineStorage;
use common::{manifest_json, MockHttpClient, RecordingReporter, ACCESS_KEY, BASE_URL};
use core_async::sync::CancellationToken;
use core_offline::{OfflineContext, SceneStatus, StatusReporter, SyncError};
use core_runtime::config::OfflineConfig;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

fn config(root: &Path, http: Arc<MockHttpClient>) -> OfflineConfig {
    OfflineConfig::builder()
        .base_url(BASE_URL)
        .http_client(http)
        .storage(Arc::new(TokioOfflineStorage::new(root.to_path_buf())))
        .build()
        .unwrap()
}

fn file_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .map(|entry| entry.unwrap().file_name().into_string().unwrap())
        .collect();
    names.sort();
    names
}

#[core_async::test]
async fn test_open_loads_existing_scenes() {
    let root = TempDir::new().unwrap();
    let hall = root.path().join("hall");
    std::fs::create_dir_all(&hall).unwrap();
    std::fs::write(hall.join("manifest.json"), manifest_json(&[("mesh.bin", 12)])).unwrap();
    std::fs::write(hall.join("mesh.bin"), b"0123456789ab").unwrap();
    let yard = root.path().join("yard");
    std::fs::create_dir_all(&yard).unwrap();
    std::fs::write(yard.join("manifest.json"), b"not json").unwrap();

    let context = OfflineContext::open(&config(root.path(), MockHttpClient::new()))
        .await
        .unwrap();

    assert_eq!(context.scene_ids().await, vec!["hall", "yard"]);
    let hall = context.scene("hall").await.unwrap();
    assert_eq!(hall.manifest().await.size_of("mesh.bin"), Some(12));
    let yard = context.scene("yard").await.unwrap();
    assert!(yard.manifest().await.is_empty());
}

#[core_async::test]
async fn test_open_on_missing_root_is_empty() {
    let root = TempDir::new().unwrap();
    let missing = root.path().join("not-created-yet");

    let context = OfflineContext::open(&config(&missing, MockHttpClient::new()))
        .await
        .unwrap();

    assert!(context.scene_ids().await.is_empty());
}

#[core_async::test]
async fn test_add_scene_returns_same_handle() {
    let root = TempDir::new().unwrap();
    let context = OfflineContext::new(&config(root.path(), MockHttpClient::new()));

    let first = context.add_scene("hall").await.unwrap();
    let second = context.add_scene("hall").await.unwrap();

    assert!(Arc::ptr_eq(&first, &second));
    assert!(root.path().join("hall").is_dir());
}

#[core_async::test]
async fn test_add_scene_rejects_path_like_ids() {
    let root = TempDir::new().unwrap();
    let context = OfflineContext::new(&config(root.path(), MockHttpClient::new()));

    let err = context.add_scene("../outside").await.unwrap_err();

    assert!(matches!(err, SyncError::Storage(_)));
    assert!(context.scene_ids().await.is_empty());
}

#[core_async::test]
async fn test_sync_to_disk_then_reopen() {
    let root = TempDir::new().unwrap();
    let http = MockHttpClient::new();
    http.serve_scene(&[("a.bin", 4), ("b.bin", 8)]);
    let config = config(root.path(), http.clone());

    let context = OfflineContext::new(&config);
    let scene = context.add_scene("hall").await.unwrap();
    assert!(scene.sync(&CancellationToken::new(), ACCESS_KEY).await);
    assert_eq!(
        file_names(&root.path().join("hall")),
        vec!["a.bin", "b.bin", "manifest.json"]
    );

    // A fresh context sees the committed manifest and skips both files
    let reopened = OfflineContext::open(&config).await.unwrap();
    let scene = reopened.scene("hall").await.unwrap();
    assert_eq!(scene.manifest().await.total_byte_size(), 12);
    http.clear_requests();
    let summary = scene
        .sync_detailed(&CancellationToken::new(), ACCESS_KEY)
        .await
        .unwrap();
    assert_eq!(summary.files_skipped, 2);
    assert_eq!(http.requested(), vec!["manifest.json"]);
}

#[core_async::test]
async fn test_partial_suffixed_asset_is_refused_before_download() {
    let root = TempDir::new().unwrap();
    let http = MockHttpClient::new();
    http.serve_scene(&[("lod.partial", 3), ("mesh.bin", 2)]);
    let config = config(root.path(), http.clone());

    let context = OfflineContext::new(&config);
    let scene = context.add_scene("hall").await.unwrap();
    let outcome = scene
        .sync_detailed(&CancellationToken::new(), ACCESS_KEY)
        .await;

    assert!(matches!(outcome, Err(SyncError::InvalidManifest(_))));
    assert_eq!(http.requested(), vec!["manifest.json"]);
    assert!(file_names(&root.path().join("hall")).is_empty());

    // Reopening must not turn the refused scene into a "synchronized" one
    let reopened = OfflineContext::open(&config).await.unwrap();
    let scene = reopened.scene("hall").await.unwrap();
    assert!(scene.manifest().await.is_empty());
    assert!(!scene.sync(&CancellationToken::new(), ACCESS_KEY).await);
}

#[core_async::test]
async fn test_delete_scene_removes_directory_and_reports() {
    let root = TempDir::new().unwrap();
    let http = MockHttpClient::new();
    http.serve_scene(&[("a.bin", 4)]);
    let context = OfflineContext::new(&config(root.path(), http));
    let context_reporter = RecordingReporter::new();
    context
        .set_reporter(Some(context_reporter.clone() as Arc<dyn StatusReporter>))
        .await;

    let scene = context.add_scene("hall").await.unwrap();
    let scene_reporter = RecordingReporter::new();
    scene
        .set_reporter(Some(scene_reporter.clone() as Arc<dyn StatusReporter>))
        .await;
    assert!(scene.sync(&CancellationToken::new(), ACCESS_KEY).await);

    context.delete_scene("hall").await.unwrap();

    assert!(!root.path().join("hall").exists());
    assert!(context.scene_ids().await.is_empty());
    assert!(scene.manifest().await.is_empty());
    assert_eq!(scene_reporter.statuses().last(), Some(&SceneStatus::Deleting));
    assert_eq!(context_reporter.statuses(), vec![SceneStatus::Deleted]);
}

#[core_async::test]
async fn test_delete_unknown_scene() {
    let root = TempDir::new().unwrap();
    let context = OfflineContext::new(&config(root.path(), MockHttpClient::new()));

    let err = context.delete_scene("nope").await.unwrap_err();

    assert!(matches!(err, SyncError::SceneNotFound { ref scene_id } if scene_id == "nope"));
}
