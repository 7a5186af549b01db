use crate::notifier::Notifier;
use crate::status::{ServiceStatus, TickReport};
use chrono::Utc;
use platform_client::{with_timeout, PlatformServices, RetryConfig, RetryExecutor};
use reeltube_core::{
    render_caption, Ack, AppConfig, CoreError, ErrorExt, ErrorReporter, Item, Settings,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info, warn};

pub const UPLOAD_COMPLETE_TITLE: &str = "Upload Complete";
pub const UPLOAD_COMPLETE_MESSAGE: &str = "Successfully uploaded new reel to YouTube";

#[derive(Debug, Clone)]
pub struct PollerConfig {
    pub interval: Duration,
    pub battery_saver_interval: Duration,
    pub call_timeout: Duration,
    pub upload_timeout: Duration,
    pub download_dir: PathBuf,
    pub retry: RetryConfig,
}

impl PollerConfig {
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            interval: config.polling.interval(false),
            battery_saver_interval: config.polling.interval(true),
            call_timeout: config.timeouts.call(),
            upload_timeout: config.timeouts.upload(),
            download_dir: config.download_dir.clone(),
            retry: RetryConfig::from(&config.retry),
        }
    }

    /// Battery optimization trades latency for fewer checks.
    pub fn interval_for(&self, settings: &Settings) -> Duration {
        if settings.battery_optimized {
            self.battery_saver_interval
        } else {
            self.interval
        }
    }
}

/// Runs single checks against the platform and keeps the status counters.
pub struct Poller {
    services: Arc<dyn PlatformServices>,
    notifier: Arc<dyn Notifier>,
    executor: RetryExecutor,
    reporter: ErrorReporter,
    config: PollerConfig,
    status: watch::Sender<ServiceStatus>,
}

impl Poller {
    pub fn new(
        services: Arc<dyn PlatformServices>,
        notifier: Arc<dyn Notifier>,
        config: PollerConfig,
    ) -> Self {
        let (status, _) = watch::channel(ServiceStatus::default());
        Self {
            services,
            notifier,
            executor: RetryExecutor::new(config.retry.clone()),
            reporter: ErrorReporter::new(),
            config,
            status,
        }
    }

    pub fn config(&self) -> &PollerConfig {
        &self.config
    }

    pub fn status(&self) -> ServiceStatus {
        self.status.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<ServiceStatus> {
        self.status.subscribe()
    }

    pub(crate) fn set_next_check(&self, next_check: Option<chrono::DateTime<Utc>>) {
        self.status.send_modify(|status| status.next_check = next_check);
    }

    /// Registers the account with the source platform. A failure only marks
    /// the status degraded; ticks still run.
    pub async fn monitor(&self, account: &str) -> Result<Ack, CoreError> {
        let services = &self.services;
        let limit = self.config.call_timeout;

        let result = self
            .executor
            .execute("monitor", move || {
                with_timeout("monitor", limit, services.monitor(account))
            })
            .await;

        match &result {
            Ok(ack) => info!("Monitoring @{}: {}", account, ack.message),
            Err(e) => {
                self.reporter.report_warning(e);
                let message = e.user_friendly_message();
                self.status.send_modify(|status| status.mark_degraded(message));
            }
        }
        result
    }

    /// One check: fetch the latest items, then download and upload each in
    /// order. A failing item never stops the items after it; only the fetch
    /// is gated by the circuit breaker.
    pub async fn tick(&self, settings: &Settings) -> TickReport {
        let account = settings.monitored_account.as_str();
        debug!("Checking @{} for new reels", account);

        let mut report = TickReport::default();
        let services = &self.services;
        let limit = self.config.call_timeout;

        let fetched = self
            .executor
            .execute("fetch_latest", move || {
                with_timeout("fetch_latest", limit, services.fetch_latest(account))
            })
            .await;

        let items = match fetched {
            Ok(items) => items,
            Err(e) => {
                self.reporter.report_error(&e);
                report.fetch_failed = true;
                self.finish_tick(&report, Some(e.user_friendly_message()));
                return report;
            }
        };

        report.fetched = items.len();
        let mut last_error = None;

        for item in &items {
            if let Err(e) = self.process_item(item, settings, &mut report).await {
                warn!("Failed to process reel {}: {}", item.id, e);
                self.reporter.report_error(&e);
                report.failed += 1;
                self.status.send_modify(|status| status.failed_items += 1);
                last_error = Some(e.user_friendly_message());
            }
        }

        self.finish_tick(&report, last_error);
        report
    }

    async fn process_item(
        &self,
        item: &Item,
        settings: &Settings,
        report: &mut TickReport,
    ) -> Result<(), CoreError> {
        let services = &self.services;
        let url = &item.source_url;
        let dest_dir = self.config.download_dir.as_path();
        let call_limit = self.config.call_timeout;

        let file_path = self
            .executor
            .retry("download", move || {
                with_timeout("download", call_limit, services.download(url, dest_dir))
            })
            .await?;

        report.downloaded += 1;
        self.status
            .send_modify(|status| status.videos_downloaded += 1);

        let title = render_caption(&settings.title_template, &item.caption);
        let description = render_caption(&settings.description_template, &item.caption);
        let file = file_path.as_path();
        let (title_ref, description_ref) = (title.as_str(), description.as_str());
        let upload_limit = self.config.upload_timeout;

        self.executor
            .retry("upload", move || {
                with_timeout(
                    "upload",
                    upload_limit,
                    services.upload(file, title_ref, description_ref),
                )
            })
            .await?;

        report.uploaded += 1;
        self.status.send_modify(|status| status.videos_uploaded += 1);
        info!("Uploaded reel {} as '{}'", item.id, title);

        if settings.notifications_enabled {
            self.notifier
                .show_notification(UPLOAD_COMPLETE_TITLE, UPLOAD_COMPLETE_MESSAGE)
                .await;
        }

        Ok(())
    }

    fn finish_tick(&self, report: &TickReport, last_error: Option<String>) {
        self.status.send_modify(|status| {
            status.last_check = Some(Utc::now());
            if report.is_clean() {
                status.consecutive_failed_ticks = 0;
                status.degraded = false;
                status.last_error = None;
            } else {
                status.consecutive_failed_ticks += 1;
                status.mark_degraded(
                    last_error.unwrap_or_else(|| "The last check did not complete".to_string()),
                );
            }
        });

        debug!(
            "Tick finished: fetched={} downloaded={} uploaded={} failed={}",
            report.fetched, report.downloaded, report.uploaded, report.failed
        );
    }
}
