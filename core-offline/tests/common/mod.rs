//! Shared fakes for the core-offline integration tests.
#![allow(dead_code)]

use async_trait::async_trait;
use bridge_traits::error::Result as BridgeResult;
use bridge_traits::{
    BridgeError, FileStream, HttpClient, HttpRequest, HttpResponse, NetworkInfo, NetworkMonitor,
    NetworkStatus, NetworkType, OfflineDirectory, OfflineStorage,
};
use bytes::Bytes;
use core_async::sync::Notify;
use core_async::time::Duration;
use core_offline::{OfflineContext, OfflineScene, SceneStatus, StatusReporter};
use core_runtime::config::OfflineConfig;
use core_runtime::events::EventBus;
use futures::StreamExt;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub const BASE_URL: &str = "https://assets.test/scenes";
pub const SCENE_ID: &str = "scene-1";
pub const ACCESS_KEY: &str = "?sv=2024&sig=abc";

pub fn manifest_json(files: &[(&str, u64)]) -> Bytes {
    let files: Vec<(String, u64)> = files.iter().map(|(n, s)| (n.to_string(), *s)).collect();
    Bytes::from(
        serde_json::to_vec(&serde_json::json!({ "version": "1.0", "files": files })).unwrap(),
    )
}

// ============================================================================
// Storage
// ============================================================================

pub struct MemoryDirectory {
    name: String,
    files: Mutex<BTreeMap<String, Bytes>>,
    flushes: AtomicUsize,
}

impl MemoryDirectory {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            files: Mutex::new(BTreeMap::new()),
            flushes: AtomicUsize::new(0),
        }
    }

    pub fn put(&self, name: &str, body: &[u8]) {
        self.files
            .lock()
            .unwrap()
            .insert(name.to_string(), Bytes::copy_from_slice(body));
    }

    pub fn get(&self, name: &str) -> Option<Bytes> {
        self.files.lock().unwrap().get(name).cloned()
    }

    pub fn names(&self) -> Vec<String> {
        self.files.lock().unwrap().keys().cloned().collect()
    }

    pub fn flushes(&self) -> usize {
        self.flushes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl OfflineDirectory for MemoryDirectory {
    fn name(&self) -> &str {
        &self.name
    }

    async fn files(&self) -> BridgeResult<FileStream> {
        let names = self.names();
        Ok(futures::stream::iter(names.into_iter().map(Ok)).boxed())
    }

    async fn read(&self, name: &str) -> BridgeResult<Option<Bytes>> {
        Ok(self.get(name))
    }

    async fn write(&self, name: &str, data: Bytes) -> BridgeResult<()> {
        self.files.lock().unwrap().insert(name.to_string(), data);
        Ok(())
    }

    async fn delete_file(&self, name: &str) -> BridgeResult<()> {
        self.files.lock().unwrap().remove(name);
        Ok(())
    }

    async fn flush(&self) -> BridgeResult<()> {
        self.flushes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn delete(&self) -> BridgeResult<()> {
        self.files.lock().unwrap().clear();
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryStorage {
    dirs: Mutex<HashMap<String, Arc<MemoryDirectory>>>,
}

impl MemoryStorage {
    pub fn dir(&self, name: &str) -> Arc<MemoryDirectory> {
        Arc::clone(
            self.dirs
                .lock()
                .unwrap()
                .entry(name.to_string())
                .or_insert_with(|| Arc::new(MemoryDirectory::new(name))),
        )
    }
}

#[async_trait]
impl OfflineStorage for MemoryStorage {
    async fn directory(&self, name: &str) -> BridgeResult<Arc<dyn OfflineDirectory>> {
        if name.is_empty() {
            return Err(BridgeError::InvalidInput("empty directory name".to_string()));
        }
        let dir: Arc<dyn OfflineDirectory> = self.dir(name);
        Ok(dir)
    }

    async fn directories(&self) -> BridgeResult<Vec<String>> {
        let mut names: Vec<String> = self.dirs.lock().unwrap().keys().cloned().collect();
        names.sort();
        Ok(names)
    }
}

// ============================================================================
// HTTP
// ============================================================================

/// Serves bodies by the last path segment of the request URL.
#[derive(Default)]
pub struct MockHttpClient {
    responses: Mutex<HashMap<String, (u16, Bytes)>>,
    hanging: Mutex<HashSet<String>>,
    delay: Mutex<Duration>,
    requests: Mutex<Vec<String>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    pub hang_started: Notify,
}

impl MockHttpClient {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn serve(&self, name: &str, body: &[u8]) {
        self.respond(name, 200, body);
    }

    pub fn respond(&self, name: &str, status: u16, body: &[u8]) {
        self.responses
            .lock()
            .unwrap()
            .insert(name.to_string(), (status, Bytes::copy_from_slice(body)));
    }

    /// Serve a manifest plus a body of the advertised size for every file.
    pub fn serve_scene(&self, files: &[(&str, u64)]) {
        self.respond("manifest.json", 200, &manifest_json(files));
        for (name, size) in files {
            self.serve(name, &vec![b'x'; *size as usize]);
        }
    }

    /// Requests for `name` never complete until cancelled.
    pub fn hang(&self, name: &str) {
        self.hanging.lock().unwrap().insert(name.to_string());
    }

    pub fn release(&self, name: &str) {
        self.hanging.lock().unwrap().remove(name);
    }

    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = delay;
    }

    /// Requested file names, in request order.
    pub fn requested(&self) -> Vec<String> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .map(|url| last_segment(url))
            .collect()
    }

    pub fn requested_urls(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }

    pub fn clear_requests(&self) {
        self.requests.lock().unwrap().clear();
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

fn last_segment(url: &str) -> String {
    let path = url.split('?').next().unwrap_or_default();
    path.rsplit('/').next().unwrap_or_default().to_string()
}

struct InFlightGuard<'a>(&'a AtomicUsize);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl HttpClient for MockHttpClient {
    async fn execute(&self, request: HttpRequest) -> BridgeResult<HttpResponse> {
        self.requests.lock().unwrap().push(request.url.clone());
        let name = last_segment(&request.url);

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        let _guard = InFlightGuard(&self.in_flight);

        let hangs = self.hanging.lock().unwrap().contains(&name);
        if hangs {
            self.hang_started.notify_one();
            futures::future::pending::<()>().await;
        }

        let delay = *self.delay.lock().unwrap();
        if !delay.is_zero() {
            core_async::time::sleep(delay).await;
        }

        let response = self.responses.lock().unwrap().get(&name).cloned();
        Ok(match response {
            Some((status, body)) => HttpResponse::new(status, body),
            None => HttpResponse::new(404, Bytes::new()),
        })
    }
}

// ============================================================================
// Network monitor
// ============================================================================

mockall::mock! {
    pub Monitor {}

    #[async_trait]
    impl NetworkMonitor for Monitor {
        async fn get_network_info(&self) -> BridgeResult<NetworkInfo>;
    }
}

pub fn monitor(status: NetworkStatus) -> Arc<MockMonitor> {
    let mut monitor = MockMonitor::new();
    monitor.expect_get_network_info().returning(move || {
        Ok(NetworkInfo {
            status,
            network_type: Some(NetworkType::Ethernet),
            is_metered: false,
        })
    });
    Arc::new(monitor)
}

// ============================================================================
// Reporter
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Report {
    Status(SceneStatus),
    Info(String),
    Error(String),
    Progress(Option<u64>, Option<u64>),
}

#[derive(Default)]
pub struct RecordingReporter {
    reports: Mutex<Vec<Report>>,
}

impl RecordingReporter {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn reports(&self) -> Vec<Report> {
        self.reports.lock().unwrap().clone()
    }

    pub fn statuses(&self) -> Vec<SceneStatus> {
        self.reports()
            .into_iter()
            .filter_map(|r| match r {
                Report::Status(status) => Some(status),
                _ => None,
            })
            .collect()
    }

    pub fn errors(&self) -> Vec<String> {
        self.reports()
            .into_iter()
            .filter_map(|r| match r {
                Report::Error(message) => Some(message),
                _ => None,
            })
            .collect()
    }

    pub fn infos(&self) -> Vec<String> {
        self.reports()
            .into_iter()
            .filter_map(|r| match r {
                Report::Info(message) => Some(message),
                _ => None,
            })
            .collect()
    }

    pub fn progress(&self) -> Vec<(Option<u64>, Option<u64>)> {
        self.reports()
            .into_iter()
            .filter_map(|r| match r {
                Report::Progress(done, total) => Some((done, total)),
                _ => None,
            })
            .collect()
    }

    pub fn clear(&self) {
        self.reports.lock().unwrap().clear();
    }

    fn push(&self, report: Report) {
        self.reports.lock().unwrap().push(report);
    }
}

impl StatusReporter for RecordingReporter {
    fn status(&self, status: SceneStatus) {
        self.push(Report::Status(status));
    }

    fn error(&self, message: &str) {
        self.push(Report::Error(message.to_string()));
    }

    fn info(&self, message: &str) {
        self.push(Report::Info(message.to_string()));
    }

    fn progress(&self, done: Option<u64>, total: Option<u64>) {
        self.push(Report::Progress(done, total));
    }
}

// ============================================================================
// Harness
// ============================================================================

pub struct Harness {
    pub http: Arc<MockHttpClient>,
    pub storage: Arc<MemoryStorage>,
    pub reporter: Arc<RecordingReporter>,
    pub context: OfflineContext,
    pub scene: Arc<OfflineScene>,
}

impl Harness {
    pub fn dir(&self) -> Arc<MemoryDirectory> {
        self.storage.dir(SCENE_ID)
    }
}

pub struct HarnessBuilder {
    max_concurrent: usize,
    progress_interval: Duration,
    network: NetworkStatus,
    event_bus: Option<EventBus>,
    storage: Arc<MemoryStorage>,
}

impl HarnessBuilder {
    pub fn new() -> Self {
        Self {
            max_concurrent: 8,
            progress_interval: Duration::from_millis(1),
            network: NetworkStatus::Connected,
            event_bus: None,
            storage: Arc::new(MemoryStorage::default()),
        }
    }

    pub fn max_concurrent(mut self, max: usize) -> Self {
        self.max_concurrent = max;
        self
    }

    pub fn progress_interval(mut self, interval: Duration) -> Self {
        self.progress_interval = interval;
        self
    }

    pub fn network(mut self, status: NetworkStatus) -> Self {
        self.network = status;
        self
    }

    pub fn event_bus(mut self, bus: EventBus) -> Self {
        self.event_bus = Some(bus);
        self
    }

    pub fn storage(mut self, storage: Arc<MemoryStorage>) -> Self {
        self.storage = storage;
        self
    }

    pub async fn build(self) -> Harness {
        let http = MockHttpClient::new();
        let reporter = RecordingReporter::new();

        let mut builder = OfflineConfig::builder()
            .base_url(BASE_URL)
            .http_client(http.clone())
            .storage(self.storage.clone())
            .network_monitor(monitor(self.network))
            .max_concurrent_downloads(self.max_concurrent)
            .progress_interval(self.progress_interval);
        if let Some(bus) = self.event_bus {
            builder = builder.event_bus(bus);
        }
        let config = builder.build().unwrap();

        let context = OfflineContext::new(&config);
        let scene = context.add_scene(SCENE_ID).await.unwrap();
        scene
            .set_reporter(Some(reporter.clone() as Arc<dyn StatusReporter>))
            .await;

        Harness {
            http,
            storage: self.storage,
            reporter,
            context,
            scene,
        }
    }
}
