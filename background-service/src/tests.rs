use crate::{
    BackgroundService, Notifier, Poller, PollerConfig, SimulatedSystem, SystemServices,
    UPLOAD_COMPLETE_TITLE,
};
use async_trait::async_trait;
use chrono::Utc;
use platform_client::{PlatformServices, RetryConfig};
use reeltube_core::{Ack, CoreError, Item, PlatformError, Settings};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use url::Url;

#[derive(Debug, Clone, PartialEq)]
struct UploadCall {
    file_path: PathBuf,
    title: String,
    description: String,
}

/// Test double with per-call scripted failures.
#[derive(Default)]
struct ScriptedPlatform {
    items: Vec<Item>,
    fail_fetch: AtomicBool,
    failing_downloads: HashSet<String>,
    hanging_downloads: HashSet<String>,
    monitor_calls: Mutex<u32>,
    fetch_calls: Mutex<u32>,
    uploads: Mutex<Vec<UploadCall>>,
    upload_delay: Duration,
}

impl ScriptedPlatform {
    fn with_items(items: Vec<Item>) -> Self {
        Self {
            items,
            ..Default::default()
        }
    }

    fn uploads(&self) -> Vec<UploadCall> {
        self.uploads.lock().unwrap().clone()
    }

    fn fetch_calls(&self) -> u32 {
        *self.fetch_calls.lock().unwrap()
    }
}

#[async_trait]
impl PlatformServices for ScriptedPlatform {
    async fn monitor(&self, _account: &str) -> Result<Ack, CoreError> {
        *self.monitor_calls.lock().unwrap() += 1;
        Ok(Ack::new("monitoring"))
    }

    async fn fetch_latest(&self, account: &str) -> Result<Vec<Item>, CoreError> {
        *self.fetch_calls.lock().unwrap() += 1;
        if self.fail_fetch.load(Ordering::SeqCst) {
            return Err(CoreError::Platform(PlatformError::AccountNotFound {
                account: account.to_string(),
            }));
        }
        Ok(self.items.clone())
    }

    async fn download(&self, url: &Url, dest_dir: &Path) -> Result<PathBuf, CoreError> {
        if self.hanging_downloads.contains(url.as_str()) {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        }
        if self.failing_downloads.contains(url.as_str()) {
            return Err(CoreError::Platform(PlatformError::DownloadFailed {
                url: url.to_string(),
                reason: "connection reset".to_string(),
            }));
        }
        let name = url.path_segments().and_then(|s| s.last()).unwrap_or("file");
        Ok(dest_dir.join(name))
    }

    async fn upload(
        &self,
        file_path: &Path,
        title: &str,
        description: &str,
    ) -> Result<Ack, CoreError> {
        if !self.upload_delay.is_zero() {
            tokio::time::sleep(self.upload_delay).await;
        }
        self.uploads.lock().unwrap().push(UploadCall {
            file_path: file_path.to_path_buf(),
            title: title.to_string(),
            description: description.to_string(),
        });
        Ok(Ack::new("uploaded"))
    }
}

#[derive(Default)]
struct RecordingNotifier {
    shown: Mutex<Vec<(String, String)>>,
}

impl RecordingNotifier {
    fn shown(&self) -> Vec<(String, String)> {
        self.shown.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn show_notification(&self, title: &str, message: &str) {
        self.shown
            .lock()
            .unwrap()
            .push((title.to_string(), message.to_string()));
    }
}

fn item(id: &str, url: &str, caption: &str) -> Item {
    Item {
        id: id.to_string(),
        source_url: Url::parse(url).unwrap(),
        caption: caption.to_string(),
        observed_at: Utc::now(),
    }
}

fn test_config() -> PollerConfig {
    PollerConfig {
        interval: Duration::from_secs(300),
        battery_saver_interval: Duration::from_secs(900),
        call_timeout: Duration::from_secs(30),
        upload_timeout: Duration::from_secs(120),
        download_dir: PathBuf::from("/tmp/reels"),
        retry: RetryConfig::no_retry(),
    }
}

fn test_settings() -> Settings {
    Settings {
        title_template: "{caption} video".to_string(),
        description_template: "From Instagram: {caption}".to_string(),
        battery_optimized: false,
        ..Settings::for_account("reels.daily")
    }
}

fn poller_with(platform: Arc<ScriptedPlatform>, notifier: Arc<RecordingNotifier>) -> Poller {
    Poller::new(platform, notifier, test_config())
}

#[tokio::test]
async fn test_caption_is_rendered_into_upload() {
    let platform = Arc::new(ScriptedPlatform::with_items(vec![item(
        "a",
        "https://example.com/a.mp4",
        "hello",
    )]));
    let notifier = Arc::new(RecordingNotifier::default());
    let poller = poller_with(platform.clone(), notifier.clone());

    let report = poller.tick(&test_settings()).await;

    assert_eq!(report.uploaded, 1);
    let uploads = platform.uploads();
    assert_eq!(uploads.len(), 1);
    assert_eq!(uploads[0].title, "hello video");
    assert_eq!(uploads[0].description, "From Instagram: hello");
    assert_eq!(uploads[0].file_path, PathBuf::from("/tmp/reels/a.mp4"));

    let shown = notifier.shown();
    assert_eq!(shown.len(), 1);
    assert_eq!(shown[0].0, UPLOAD_COMPLETE_TITLE);
}

#[tokio::test]
async fn test_failed_download_does_not_block_next_item() {
    let mut platform = ScriptedPlatform::with_items(vec![
        item("a", "https://example.com/a.mp4", "first"),
        item("b", "https://example.com/b.mp4", "second"),
    ]);
    platform
        .failing_downloads
        .insert("https://example.com/a.mp4".to_string());
    let platform = Arc::new(platform);
    let poller = poller_with(platform.clone(), Arc::new(RecordingNotifier::default()));

    let report = poller.tick(&test_settings()).await;

    assert_eq!(report.fetched, 2);
    assert_eq!(report.downloaded, 1);
    assert_eq!(report.uploaded, 1);
    assert_eq!(report.failed, 1);

    let uploads = platform.uploads();
    assert_eq!(uploads.len(), 1);
    assert_eq!(uploads[0].title, "second video");

    let status = poller.status();
    assert_eq!(status.videos_uploaded, 1);
    assert_eq!(status.failed_items, 1);
    assert!(status.degraded);
    assert!(status.last_error.is_some());
}

#[tokio::test]
async fn test_items_are_processed_in_fetch_order() {
    let platform = Arc::new(ScriptedPlatform::with_items(vec![
        item("1", "https://example.com/1.mp4", "one"),
        item("2", "https://example.com/2.mp4", "two"),
        item("3", "https://example.com/3.mp4", "three"),
    ]));
    let poller = poller_with(platform.clone(), Arc::new(RecordingNotifier::default()));

    poller.tick(&test_settings()).await;

    let titles: Vec<String> = platform.uploads().into_iter().map(|u| u.title).collect();
    assert_eq!(titles, vec!["one video", "two video", "three video"]);
}

#[tokio::test]
async fn test_fetch_failure_ends_tick_quietly() {
    let platform = Arc::new(ScriptedPlatform {
        fail_fetch: AtomicBool::new(true),
        ..Default::default()
    });
    let poller = poller_with(platform.clone(), Arc::new(RecordingNotifier::default()));

    let report = poller.tick(&test_settings()).await;

    assert!(report.fetch_failed);
    assert_eq!(report.fetched, 0);
    assert!(platform.uploads().is_empty());

    let status = poller.status();
    assert!(status.degraded);
    assert_eq!(status.consecutive_failed_ticks, 1);
    assert!(status.last_check.is_some());
}

#[tokio::test]
async fn test_clean_tick_clears_degraded_state() {
    let platform = Arc::new(ScriptedPlatform {
        fail_fetch: AtomicBool::new(true),
        ..Default::default()
    });
    let poller = poller_with(platform.clone(), Arc::new(RecordingNotifier::default()));

    poller.tick(&test_settings()).await;
    poller.tick(&test_settings()).await;
    let status = poller.status();
    assert!(status.degraded);
    assert_eq!(status.consecutive_failed_ticks, 2);

    platform.fail_fetch.store(false, Ordering::SeqCst);
    let report = poller.tick(&test_settings()).await;

    assert!(report.is_clean());
    let status = poller.status();
    assert!(!status.degraded);
    assert_eq!(status.consecutive_failed_ticks, 0);
    assert!(status.last_error.is_none());
}

fn default_retry_poller(platform: Arc<ScriptedPlatform>) -> Poller {
    let config = PollerConfig {
        retry: RetryConfig::default(),
        ..test_config()
    };
    Poller::new(platform, Arc::new(RecordingNotifier::default()), config)
}

#[tokio::test(start_paused = true)]
async fn test_failing_items_never_block_later_items_with_default_retry() {
    let mut platform = ScriptedPlatform::with_items(vec![
        item("a1", "https://example.com/a1.mp4", "one"),
        item("a2", "https://example.com/a2.mp4", "two"),
        item("a3", "https://example.com/a3.mp4", "three"),
        item("b", "https://example.com/b.mp4", "four"),
    ]);
    for url in [
        "https://example.com/a1.mp4",
        "https://example.com/a2.mp4",
        "https://example.com/a3.mp4",
    ] {
        platform.failing_downloads.insert(url.to_string());
    }
    let platform = Arc::new(platform);
    let poller = default_retry_poller(platform.clone());

    let report = poller.tick(&test_settings()).await;

    assert_eq!(report.fetched, 4);
    assert_eq!(report.failed, 3);
    assert_eq!(report.uploaded, 1);
    let uploads = platform.uploads();
    assert_eq!(uploads.len(), 1);
    assert_eq!(uploads[0].title, "four video");

    // Item failures do not open the breaker, so the next fetch still runs.
    let next = poller.tick(&test_settings()).await;
    assert!(!next.fetch_failed);
}

#[tokio::test(start_paused = true)]
async fn test_timed_out_items_only_gate_the_next_fetch() {
    let mut platform = ScriptedPlatform::with_items(vec![
        item("a1", "https://example.com/a1.mp4", "one"),
        item("a2", "https://example.com/a2.mp4", "two"),
        item("a3", "https://example.com/a3.mp4", "three"),
        item("b", "https://example.com/b.mp4", "four"),
    ]);
    for url in [
        "https://example.com/a1.mp4",
        "https://example.com/a2.mp4",
        "https://example.com/a3.mp4",
    ] {
        platform.hanging_downloads.insert(url.to_string());
    }
    let platform = Arc::new(platform);
    let poller = default_retry_poller(platform.clone());

    let report = poller.tick(&test_settings()).await;

    // Three timeouts open the breaker, yet the last item is still uploaded.
    assert_eq!(report.failed, 3);
    assert_eq!(report.uploaded, 1);
    assert_eq!(platform.uploads()[0].title, "four video");

    let next = poller.tick(&test_settings()).await;
    assert!(next.fetch_failed);
    assert_eq!(platform.fetch_calls(), 1);
}

#[tokio::test]
async fn test_notifications_respect_setting() {
    let platform = Arc::new(ScriptedPlatform::with_items(vec![item(
        "a",
        "https://example.com/a.mp4",
        "hello",
    )]));
    let notifier = Arc::new(RecordingNotifier::default());
    let poller = poller_with(platform.clone(), notifier.clone());

    let settings = Settings {
        notifications_enabled: false,
        ..test_settings()
    };
    poller.tick(&settings).await;

    assert_eq!(platform.uploads().len(), 1);
    assert!(notifier.shown().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_upload_timeout_counts_as_item_failure() {
    let platform = Arc::new(ScriptedPlatform {
        items: vec![item("a", "https://example.com/a.mp4", "slow")],
        upload_delay: Duration::from_secs(600),
        ..Default::default()
    });
    let poller = poller_with(platform.clone(), Arc::new(RecordingNotifier::default()));

    let report = poller.tick(&test_settings()).await;

    assert_eq!(report.downloaded, 1);
    assert_eq!(report.uploaded, 0);
    assert_eq!(report.failed, 1);
}

#[test]
fn test_battery_optimization_lengthens_interval() {
    let config = test_config();
    let mut settings = test_settings();

    settings.battery_optimized = false;
    assert_eq!(config.interval_for(&settings), Duration::from_secs(300));
    settings.battery_optimized = true;
    assert_eq!(config.interval_for(&settings), Duration::from_secs(900));
}

fn service_with(
    platform: Arc<ScriptedPlatform>,
    system: Arc<SimulatedSystem>,
) -> BackgroundService {
    BackgroundService::new(
        platform,
        Arc::new(RecordingNotifier::default()),
        system,
        test_config(),
    )
}

#[tokio::test]
async fn test_permission_denial_blocks_start() {
    let platform = Arc::new(ScriptedPlatform::default());
    let service = service_with(platform.clone(), Arc::new(SimulatedSystem::new(false)));

    let result = service.start(test_settings()).await;

    assert!(matches!(result, Err(CoreError::PermissionDenied { .. })));
    assert_eq!(*platform.monitor_calls.lock().unwrap(), 0);
}

#[tokio::test]
async fn test_incomplete_settings_cannot_start() {
    let service = service_with(
        Arc::new(ScriptedPlatform::default()),
        Arc::new(SimulatedSystem::new(true)),
    );

    let result = service.start(Settings::default()).await;
    assert!(matches!(result, Err(CoreError::Validation { .. })));
}

#[tokio::test(start_paused = true)]
async fn test_loop_ticks_on_interval_and_stops() {
    let platform = Arc::new(ScriptedPlatform::with_items(vec![item(
        "a",
        "https://example.com/a.mp4",
        "hello",
    )]));
    let system = Arc::new(SimulatedSystem::new(true));
    let service = service_with(platform.clone(), system.clone());

    let handle = service.start(test_settings()).await.unwrap();
    assert_eq!(*platform.monitor_calls.lock().unwrap(), 1);
    assert!(system.is_boot_registered());

    // No check happens before the first interval elapses.
    tokio::time::sleep(Duration::from_secs(299)).await;
    assert_eq!(platform.fetch_calls(), 0);
    assert!(handle.status().next_check.is_some());

    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(platform.fetch_calls(), 1);
    assert_eq!(handle.status().videos_uploaded, 1);

    tokio::time::sleep(Duration::from_secs(300)).await;
    assert_eq!(platform.fetch_calls(), 2);

    service.stop(handle).await.unwrap();

    tokio::time::sleep(Duration::from_secs(3600)).await;
    assert_eq!(platform.fetch_calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_stop_waits_for_in_flight_tick() {
    let platform = Arc::new(ScriptedPlatform {
        items: vec![item("a", "https://example.com/a.mp4", "hello")],
        upload_delay: Duration::from_secs(60),
        ..Default::default()
    });
    let service = service_with(platform.clone(), Arc::new(SimulatedSystem::new(true)));
    let handle = service.start(test_settings()).await.unwrap();

    // Land in the middle of the upload.
    tokio::time::sleep(Duration::from_secs(330)).await;
    assert_eq!(platform.fetch_calls(), 1);
    assert!(platform.uploads().is_empty());

    service.stop(handle).await.unwrap();
    assert_eq!(platform.uploads().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_updated_settings_apply_to_next_tick() {
    let platform = Arc::new(ScriptedPlatform::with_items(vec![item(
        "a",
        "https://example.com/a.mp4",
        "hello",
    )]));
    let service = service_with(platform.clone(), Arc::new(SimulatedSystem::new(true)));
    let handle = service.start(test_settings()).await.unwrap();

    handle.update_settings(Settings {
        title_template: "New: {caption}".to_string(),
        ..test_settings()
    });

    tokio::time::sleep(Duration::from_secs(301)).await;
    assert_eq!(platform.uploads()[0].title, "New: hello");

    service.stop(handle).await.unwrap();
}

#[test]
fn test_system_settings_follow_toggles() {
    let system = Arc::new(SimulatedSystem::new(true));
    let service = service_with(Arc::new(ScriptedPlatform::default()), system.clone());

    service.apply_system_settings(&Settings {
        start_on_boot: true,
        battery_optimized: true,
        ..test_settings()
    });
    assert!(system.is_boot_registered());
    assert!(system.is_battery_optimized());

    service.apply_system_settings(&Settings {
        start_on_boot: false,
        battery_optimized: false,
        ..test_settings()
    });
    assert!(!system.is_boot_registered());
    assert!(!system.is_battery_optimized());
    assert!(system.request_accessibility_permission());
}
