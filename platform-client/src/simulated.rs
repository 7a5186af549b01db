//! Stand-in platform that logs what a device automation would do.

use crate::PlatformServices;
use async_trait::async_trait;
use chrono::Utc;
use reeltube_core::{Ack, CoreError, Item, PlatformError, SimulationConfig};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info};
use url::Url;

const SAMPLE_REEL_URL: &str = "https://example.com/reel1.mp4";
const SAMPLE_CAPTION: &str = "Check out my latest video! #viral #trending";

/// Accessibility actions walked through for one upload.
pub const UPLOAD_STEPS: [&str; 11] = [
    "Opening YouTube app",
    "Clicking + Create button",
    "Selecting 'Upload a video'",
    "Selecting file from storage",
    "Finding file",
    "Setting title",
    "Setting description",
    "Clicking 'NEXT'",
    "Selecting visibility: 'Shorts'",
    "Clicking 'UPLOAD'",
    "Waiting for upload to complete",
];

#[derive(Debug, Clone)]
pub struct SimulatedPlatform {
    call_delay: Duration,
    step_delay: Duration,
}

impl SimulatedPlatform {
    pub fn new(call_delay: Duration, step_delay: Duration) -> Self {
        Self {
            call_delay,
            step_delay,
        }
    }

    pub fn from_config(config: &SimulationConfig) -> Self {
        Self::new(
            Duration::from_millis(config.call_delay_ms),
            Duration::from_millis(config.upload_step_delay_ms),
        )
    }

    /// No artificial delays, for tests.
    pub fn instant() -> Self {
        Self::new(Duration::ZERO, Duration::ZERO)
    }

    async fn pause(&self, delay: Duration) {
        if !delay.is_zero() {
            sleep(delay).await;
        }
    }
}

impl Default for SimulatedPlatform {
    fn default() -> Self {
        Self::from_config(&SimulationConfig::default())
    }
}

#[async_trait]
impl PlatformServices for SimulatedPlatform {
    async fn monitor(&self, account: &str) -> Result<Ack, CoreError> {
        info!("Monitoring Instagram account: @{}", account);
        self.pause(self.call_delay).await;
        Ok(Ack::new("Successfully monitoring account"))
    }

    async fn fetch_latest(&self, account: &str) -> Result<Vec<Item>, CoreError> {
        debug!("Fetching latest reels for @{}", account);
        self.pause(self.call_delay).await;

        let source_url = Url::parse(SAMPLE_REEL_URL).map_err(|e| {
            CoreError::Platform(PlatformError::InvalidResponse {
                details: e.to_string(),
            })
        })?;

        Ok(vec![Item {
            id: "reel-1".to_string(),
            source_url,
            caption: SAMPLE_CAPTION.to_string(),
            observed_at: Utc::now(),
        }])
    }

    async fn download(&self, url: &Url, dest_dir: &Path) -> Result<PathBuf, CoreError> {
        info!("Downloading reel from {} to {}", url, dest_dir.display());
        self.pause(self.call_delay).await;

        let file_name = url
            .path_segments()
            .and_then(|segments| segments.last())
            .filter(|name| !name.is_empty())
            .ok_or_else(|| {
                CoreError::Platform(PlatformError::DownloadFailed {
                    url: url.to_string(),
                    reason: "URL has no file name".to_string(),
                })
            })?;

        Ok(dest_dir.join(format!("instagram_{}", file_name)))
    }

    async fn upload(
        &self,
        file_path: &Path,
        title: &str,
        description: &str,
    ) -> Result<Ack, CoreError> {
        info!("Uploading video to YouTube: {}", title);

        for (index, step) in UPLOAD_STEPS.iter().enumerate() {
            self.pause(self.step_delay).await;
            match *step {
                "Finding file" => {
                    debug!("{}. {}: {}", index + 1, step, file_path.display())
                }
                "Setting title" => debug!("{}. {}: {}", index + 1, step, title),
                "Setting description" => debug!("{}. {}: {}", index + 1, step, description),
                _ => debug!("{}. {}", index + 1, step),
            }
        }

        Ok(Ack::new("Video uploaded successfully"))
    }
}
