use background_service::{
    BackgroundService, DesktopNotifier, PollHandle, PollerConfig, ServiceStatus, SimulatedSystem,
};
use platform_client::{PlatformServices, SimulatedPlatform};
use reeltube_core::{AppConfig, CoreError, ErrorExt, RunState, Settings, Toggle};
use settings_store::SettingsStore;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Everything the dashboard renders, captured at one point in time.
#[derive(Debug, Clone, PartialEq)]
pub struct DashboardSnapshot {
    pub run_state: RunState,
    pub settings: Option<Settings>,
    pub status: ServiceStatus,
}

/// Owns the persisted settings, the run state and the running poll loop.
pub struct AppController {
    store: SettingsStore,
    service: BackgroundService,
    state: RunState,
    settings: Option<Settings>,
    handle: Option<PollHandle>,
    last_status: ServiceStatus,
}

impl AppController {
    pub fn new(store: SettingsStore, service: BackgroundService) -> Self {
        Self {
            store,
            service,
            state: RunState::Unconfigured,
            settings: None,
            handle: None,
            last_status: ServiceStatus::default(),
        }
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn settings(&self) -> Option<&Settings> {
        self.settings.as_ref()
    }

    /// Restores the run state from the store. The loop never starts here.
    pub async fn startup(&mut self) -> Result<RunState, CoreError> {
        self.settings = self.store.load().await?;
        self.state = if self.settings.is_some() {
            RunState::ConfiguredStopped
        } else {
            RunState::Unconfigured
        };
        info!("Starting in state {:?}", self.state);
        Ok(self.state)
    }

    pub async fn complete_setup(&mut self, settings: Settings) -> Result<(), CoreError> {
        if !settings.is_complete() {
            return Err(CoreError::validation(
                "monitoredAccount",
                "Please enter an Instagram username",
            ));
        }

        self.stop_loop().await;
        self.store.save(&settings).await?;
        self.service.apply_system_settings(&settings);

        info!("Setup complete for @{}", settings.monitored_account);
        self.settings = Some(settings);
        self.state = RunState::ConfiguredStopped;
        Ok(())
    }

    pub async fn start(&mut self) -> Result<(), CoreError> {
        if self.state.is_running() && !self.loop_alive() {
            warn!("Poll loop ended on its own, restarting it");
            self.stop_loop().await;
        }

        let settings = match (self.state, &self.settings) {
            (RunState::ConfiguredRunning, _) => {
                debug!("Start requested while already running");
                return Ok(());
            }
            (RunState::ConfiguredStopped, Some(settings)) => settings.clone(),
            _ => {
                return Err(CoreError::InvalidInput {
                    message: "Complete setup before starting the automation".to_string(),
                })
            }
        };

        let handle = self.service.start(settings).await?;
        self.last_status = handle.status();
        self.handle = Some(handle);
        self.state = RunState::ConfiguredRunning;
        Ok(())
    }

    pub async fn stop(&mut self) -> Result<(), CoreError> {
        self.stop_loop().await;
        Ok(())
    }

    /// Rewrites the whole record with one flag changed and pushes it to the
    /// device and to a running loop.
    pub async fn set_toggle(&mut self, toggle: Toggle, enabled: bool) -> Result<Settings, CoreError> {
        let current = self.settings.clone().ok_or_else(|| CoreError::InvalidInput {
            message: "No settings to update".to_string(),
        })?;
        let updated = current.with_toggle(toggle, enabled);

        self.store.save(&updated).await?;
        self.service.apply_system_settings(&updated);
        if let Some(handle) = &self.handle {
            handle.update_settings(updated.clone());
        }

        debug!("{} set to {}", toggle.label(), enabled);
        self.settings = Some(updated.clone());
        Ok(updated)
    }

    /// Returns to `Unconfigured` from any state. The in-memory state is reset
    /// even when clearing the store fails; that error is still returned.
    pub async fn reset(&mut self) -> Result<(), CoreError> {
        self.stop_loop().await;
        let cleared = self.store.clear().await;
        self.service.unregister_boot_start();

        self.settings = None;
        self.state = RunState::Unconfigured;
        self.last_status = ServiceStatus::default();
        info!("Automation reset");
        cleared
    }

    /// A loop that ended on its own is shown as stopped.
    pub fn snapshot(&self) -> DashboardSnapshot {
        let run_state = if self.state.is_running() && !self.loop_alive() {
            RunState::ConfiguredStopped
        } else {
            self.state
        };
        DashboardSnapshot {
            run_state,
            settings: self.settings.clone(),
            status: self
                .handle
                .as_ref()
                .map(|handle| handle.status())
                .unwrap_or_else(|| self.last_status.clone()),
        }
    }

    fn loop_alive(&self) -> bool {
        self.handle
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Joins the loop, if any, and leaves the state stopped whatever the join
    /// result. A loop that died is reported through the status.
    async fn stop_loop(&mut self) {
        if let Some(handle) = self.handle.take() {
            let status_rx = handle.subscribe();
            let joined = self.service.stop(handle).await;
            self.last_status = status_rx.borrow().clone();
            if let Err(e) = joined {
                e.log_error();
                self.last_status.mark_degraded(e.user_friendly_message());
            }
        }
        if self.state.is_running() {
            self.state = RunState::ConfiguredStopped;
        }
    }
}

/// Wires the store and the simulated services from `config` and restores the
/// persisted state.
pub async fn bootstrap(config: &AppConfig) -> Result<AppController, CoreError> {
    let mut store = SettingsStore::new(config.database_url.clone());
    store.connect().await?;
    store.run_migrations().await?;

    let services: Arc<dyn PlatformServices> =
        Arc::new(SimulatedPlatform::from_config(&config.simulation));
    let service = BackgroundService::new(
        services,
        Arc::new(DesktopNotifier::new()),
        Arc::new(SimulatedSystem::new(config.simulation.grant_permission)),
        PollerConfig::from_app_config(config),
    );

    let mut controller = AppController::new(store, service);
    controller.startup().await?;
    Ok(controller)
}
