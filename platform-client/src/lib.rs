use async_trait::async_trait;
use reeltube_core::{Ack, CoreError, Item, PlatformError};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

pub mod retry;
pub mod simulated;


pub use retry::{
    calculate_delay, get_retry_strategy, trips_circuit_breaker, CircuitBreaker,
    CircuitBreakerState, RetryConfig, RetryExecutor, RetryMetrics, RetryStrategy,
};
pub use simulated::{SimulatedPlatform, UPLOAD_STEPS};

/// Calls the automation needs from the source and destination platforms.
///
/// Every call is fallible and may be slow; callers wrap them in
/// [`with_timeout`] and a [`RetryExecutor`].
#[async_trait]
pub trait PlatformServices: Send + Sync {
    async fn monitor(&self, account: &str) -> Result<Ack, CoreError>;

    async fn fetch_latest(&self, account: &str) -> Result<Vec<Item>, CoreError>;

    async fn download(&self, url: &Url, dest_dir: &Path) -> Result<PathBuf, CoreError>;

    async fn upload(
        &self,
        file_path: &Path,
        title: &str,
        description: &str,
    ) -> Result<Ack, CoreError>;
}

/// Bounds a platform call, reporting an elapsed call as a request timeout.
pub async fn with_timeout<T, F>(operation: &str, limit: Duration, call: F) -> Result<T, CoreError>
where
    F: Future<Output = Result<T, CoreError>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => {
            tracing::warn!("{} timed out after {:?}", operation, limit);
            Err(CoreError::Platform(PlatformError::RequestTimeout {
                operation: operation.to_string(),
            }))
        }
    }
}
