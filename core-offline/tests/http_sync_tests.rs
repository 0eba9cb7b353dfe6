//! Sync over real HTTP (wiremock) into real directories.

mod common;

use bridge_desktop::{ReqwestHttpClient, TokioOfflineStorage};
use common::{manifest_json, RecordingReporter};
use core_async::sync::CancellationToken;
use core_offline::{OfflineContext, SceneStatus, StatusReporter};
use core_runtime::config::OfflineConfig;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const SAS: &str = "sv=2024-05-04&sig=abc%2Bdef";

fn config(server: &MockServer, root: &Path) -> OfflineConfig {
    OfflineConfig::builder()
        .base_url(format!("{}/scenes", server.uri()))
        .http_client(Arc::new(ReqwestHttpClient::new().unwrap()))
        .storage(Arc::new(TokioOfflineStorage::new(root.to_path_buf())))
        .build()
        .unwrap()
}

async fn serve(server: &MockServer, file: &str, status: u16, body: Vec<u8>) {
    Mock::given(method("GET"))
        .and(path(format!("/scenes/hall/{}", file)))
        .and(query_param("sig", "abc+def"))
        .respond_with(ResponseTemplate::new(status).set_body_bytes(body))
        .expect(1)
        .mount(server)
        .await;
}

#[core_async::test]
async fn test_sync_over_http_writes_files_and_marker() {
    let server = MockServer::start().await;
    let manifest = manifest_json(&[("mesh.bin", 5), ("albedo.png", 3)]);
    serve(&server, "manifest.json", 200, manifest.to_vec()).await;
    serve(&server, "mesh.bin", 200, b"hello".to_vec()).await;
    serve(&server, "albedo.png", 200, b"png".to_vec()).await;

    let root = TempDir::new().unwrap();
    let context = OfflineContext::new(&config(&server, root.path()));
    let scene = context.add_scene("hall").await.unwrap();

    assert!(scene.sync(&CancellationToken::new(), SAS).await);

    let hall = root.path().join("hall");
    assert_eq!(std::fs::read(hall.join("mesh.bin")).unwrap(), b"hello");
    assert_eq!(std::fs::read(hall.join("albedo.png")).unwrap(), b"png");
    assert_eq!(std::fs::read(hall.join("manifest.json")).unwrap(), manifest.to_vec());
}

#[core_async::test]
async fn test_missing_file_over_http_fails_without_marker() {
    let server = MockServer::start().await;
    serve(
        &server,
        "manifest.json",
        200,
        manifest_json(&[("mesh.bin", 5)]).to_vec(),
    )
    .await;
    serve(&server, "mesh.bin", 404, Vec::new()).await;

    let root = TempDir::new().unwrap();
    let context = OfflineContext::new(&config(&server, root.path()));
    let scene = context.add_scene("hall").await.unwrap();
    let reporter = RecordingReporter::new();
    scene
        .set_reporter(Some(reporter.clone() as Arc<dyn StatusReporter>))
        .await;

    assert!(!scene.sync(&CancellationToken::new(), SAS).await);

    assert_eq!(reporter.statuses().last(), Some(&SceneStatus::Error));
    assert_eq!(
        reporter.errors(),
        vec!["Could not fetch mesh.bin! (HTTP 404)"]
    );
    assert!(!root.path().join("hall").join("manifest.json").exists());
}
