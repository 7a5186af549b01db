use chrono::{DateTime, Utc};

/// Dashboard view of the poll loop.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ServiceStatus {
    pub last_check: Option<DateTime<Utc>>,
    pub next_check: Option<DateTime<Utc>>,
    pub videos_downloaded: u64,
    pub videos_uploaded: u64,
    pub failed_items: u64,
    pub consecutive_failed_ticks: u32,
    pub last_error: Option<String>,
    /// Set when the last tick or monitor call failed in any way.
    pub degraded: bool,
}

impl ServiceStatus {
    pub fn mark_degraded(&mut self, message: impl Into<String>) {
        self.degraded = true;
        self.last_error = Some(message.into());
    }
}

/// What one tick did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    pub fetched: usize,
    pub downloaded: usize,
    pub uploaded: usize,
    pub failed: usize,
    pub fetch_failed: bool,
}

impl TickReport {
    pub fn is_clean(&self) -> bool {
        !self.fetch_failed && self.failed == 0
    }
}
