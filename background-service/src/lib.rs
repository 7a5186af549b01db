use chrono::Utc;
use platform_client::PlatformServices;
use reeltube_core::{CoreError, Settings};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info};

pub mod notifier;
pub mod poller;
pub mod status;
pub mod system;

#[cfg(test)]
mod tests;

pub use notifier::{DesktopNotifier, Notifier};
pub use poller::{Poller, PollerConfig, UPLOAD_COMPLETE_MESSAGE, UPLOAD_COMPLETE_TITLE};
pub use status::{ServiceStatus, TickReport};
pub use system::{SimulatedSystem, SystemServices};

pub struct BackgroundService {
    services: Arc<dyn PlatformServices>,
    notifier: Arc<dyn Notifier>,
    system: Arc<dyn SystemServices>,
    config: PollerConfig,
}

impl BackgroundService {
    pub fn new(
        services: Arc<dyn PlatformServices>,
        notifier: Arc<dyn Notifier>,
        system: Arc<dyn SystemServices>,
        config: PollerConfig,
    ) -> Self {
        Self {
            services,
            notifier,
            system,
            config,
        }
    }

    pub fn config(&self) -> &PollerConfig {
        &self.config
    }

    /// Mirrors the boot and battery toggles onto the device.
    pub fn apply_system_settings(&self, settings: &Settings) {
        if settings.start_on_boot {
            self.system.register_boot_start();
        } else {
            self.system.unregister_boot_start();
        }
        self.system
            .set_battery_optimization(settings.battery_optimized);
    }

    pub fn unregister_boot_start(&self) {
        self.system.unregister_boot_start();
    }

    /// Starts the poll loop for `settings`.
    ///
    /// Fails without spawning anything when the settings are incomplete or the
    /// accessibility permission is denied.
    pub async fn start(&self, settings: Settings) -> Result<PollHandle, CoreError> {
        if !settings.is_complete() {
            return Err(CoreError::validation(
                "monitoredAccount",
                "An account to monitor is required before starting",
            ));
        }

        if !self.system.request_accessibility_permission() {
            return Err(CoreError::PermissionDenied {
                operation: "accessibility service".to_string(),
            });
        }

        self.apply_system_settings(&settings);

        let poller = Poller::new(
            self.services.clone(),
            self.notifier.clone(),
            self.config.clone(),
        );
        // Failure is visible through the degraded status.
        let _ = poller.monitor(&settings.monitored_account).await;

        let status_rx = poller.subscribe();
        let (stop_tx, stop_rx) = watch::channel(false);
        let (settings_tx, settings_rx) = watch::channel(settings);

        let task = tokio::spawn(run_loop(poller, settings_rx, stop_rx));
        info!("Background service started");

        Ok(PollHandle {
            stop_tx,
            settings_tx,
            status_rx,
            task,
        })
    }

    /// Stops the loop behind `handle`. A check that is already running
    /// finishes first.
    pub async fn stop(&self, handle: PollHandle) -> Result<(), CoreError> {
        handle.shutdown().await?;
        info!("Background service stopped");
        Ok(())
    }
}

/// Owned handle to a running poll loop.
pub struct PollHandle {
    stop_tx: watch::Sender<bool>,
    settings_tx: watch::Sender<Settings>,
    status_rx: watch::Receiver<ServiceStatus>,
    task: JoinHandle<()>,
}

impl PollHandle {
    pub fn status(&self) -> ServiceStatus {
        self.status_rx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<ServiceStatus> {
        self.status_rx.clone()
    }

    /// Settings take effect from the next check.
    pub fn update_settings(&self, settings: Settings) {
        self.settings_tx.send_replace(settings);
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    async fn shutdown(self) -> Result<(), CoreError> {
        let _ = self.stop_tx.send(true);
        self.task.await.map_err(|e| CoreError::Internal {
            message: format!("Poll loop task failed: {e}"),
        })
    }
}

async fn run_loop(
    poller: Poller,
    settings_rx: watch::Receiver<Settings>,
    mut stop_rx: watch::Receiver<bool>,
) {
    loop {
        let period = poller.config().interval_for(&settings_rx.borrow());
        let next_check = chrono::Duration::from_std(period)
            .ok()
            .map(|delay| Utc::now() + delay);
        poller.set_next_check(next_check);
        debug!("Next check in {:?}", period);

        // The tick runs inside the select arm, so a stop request waits for it.
        tokio::select! {
            _ = tokio::time::sleep(period) => {
                let settings = settings_rx.borrow().clone();
                poller.tick(&settings).await;
            }
            _ = stop_rx.changed() => break,
        }
    }

    poller.set_next_check(None);
    info!("Poll loop stopped");
}
