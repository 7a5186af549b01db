use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

pub const DEFAULT_TITLE_TEMPLATE: &str = "{caption}";
pub const DEFAULT_DESCRIPTION_TEMPLATE: &str = "Shared from Instagram\n\n{caption}\n\n#shorts";

/// The single automation settings record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Settings {
    pub monitored_account: String,
    pub title_template: String,
    pub description_template: String,
    pub start_on_boot: bool,
    pub battery_optimized: bool,
    pub notifications_enabled: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            monitored_account: String::new(),
            title_template: DEFAULT_TITLE_TEMPLATE.to_string(),
            description_template: DEFAULT_DESCRIPTION_TEMPLATE.to_string(),
            start_on_boot: true,
            battery_optimized: true,
            notifications_enabled: true,
        }
    }
}

impl Settings {
    pub fn for_account(account: impl Into<String>) -> Self {
        Self {
            monitored_account: account.into(),
            ..Default::default()
        }
    }

    /// A record without a monitored account counts as "no settings".
    pub fn is_complete(&self) -> bool {
        !self.monitored_account.trim().is_empty()
    }

    pub fn toggle(&self, toggle: Toggle) -> bool {
        match toggle {
            Toggle::StartOnBoot => self.start_on_boot,
            Toggle::BatteryOptimized => self.battery_optimized,
            Toggle::Notifications => self.notifications_enabled,
        }
    }

    pub fn with_toggle(mut self, toggle: Toggle, enabled: bool) -> Self {
        match toggle {
            Toggle::StartOnBoot => self.start_on_boot = enabled,
            Toggle::BatteryOptimized => self.battery_optimized = enabled,
            Toggle::Notifications => self.notifications_enabled = enabled,
        }
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Toggle {
    StartOnBoot,
    BatteryOptimized,
    Notifications,
}

impl Toggle {
    pub const ALL: [Toggle; 3] = [
        Toggle::StartOnBoot,
        Toggle::BatteryOptimized,
        Toggle::Notifications,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Toggle::StartOnBoot => "Start on Boot",
            Toggle::BatteryOptimized => "Battery Optimization",
            Toggle::Notifications => "Notifications",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Toggle::StartOnBoot => "Automatically start monitoring when the device boots",
            Toggle::BatteryOptimized => "Optimize battery usage (less frequent checks)",
            Toggle::Notifications => "Receive notifications about uploads",
        }
    }
}

/// One piece of content discovered by a fetch; never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct Item {
    pub id: String,
    pub source_url: Url,
    pub caption: String,
    pub observed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ack {
    pub message: String,
}

impl Ack {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Unconfigured,
    ConfiguredStopped,
    ConfiguredRunning,
}

impl RunState {
    pub fn is_configured(&self) -> bool {
        !matches!(self, RunState::Unconfigured)
    }

    pub fn is_running(&self) -> bool {
        matches!(self, RunState::ConfiguredRunning)
    }
}
