use reeltube_core::{CoreError, ErrorExt, PlatformError, RetryPolicy};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

/// Configuration for retry behavior
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of attempts per operation
    pub max_attempts: u32,
    /// Base delay for exponential backoff (in milliseconds)
    pub base_delay_ms: u64,
    /// Maximum delay between retries (in milliseconds)
    pub max_delay_ms: u64,
    /// Multiplier for exponential backoff
    pub backoff_multiplier: f64,
    /// Maximum jitter factor (0.0 to 1.0)
    pub jitter_factor: f64,
    /// Circuit breaker failure threshold
    pub failure_threshold: u32,
    /// Circuit breaker recovery timeout (in seconds)
    pub recovery_timeout_s: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self::from(&RetryPolicy::default())
    }
}

impl From<&RetryPolicy> for RetryConfig {
    fn from(policy: &RetryPolicy) -> Self {
        Self {
            max_attempts: policy.max_attempts.max(1),
            base_delay_ms: policy.base_delay_ms,
            max_delay_ms: policy.max_delay_ms,
            backoff_multiplier: policy.backoff_multiplier,
            jitter_factor: policy.jitter_factor,
            failure_threshold: policy.failure_threshold,
            recovery_timeout_s: policy.recovery_timeout_s,
        }
    }
}

impl RetryConfig {
    /// Single attempt, no waiting.
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            base_delay_ms: 0,
            max_delay_ms: 0,
            backoff_multiplier: 1.0,
            jitter_factor: 0.0,
            failure_threshold: u32::MAX,
            recovery_timeout_s: 0,
        }
    }
}

/// Circuit breaker states
#[derive(Debug, Clone, PartialEq)]
pub enum CircuitBreakerState {
    Closed,   // Normal operation
    Open,     // Blocking requests
    HalfOpen, // Testing recovery
}

/// Stops calling a platform that keeps failing until it has had time to recover.
#[derive(Debug)]
pub struct CircuitBreaker {
    state: CircuitBreakerState,
    failure_count: u32,
    last_failure_time: Option<Instant>,
    config: RetryConfig,
}

impl CircuitBreaker {
    pub fn new(config: RetryConfig) -> Self {
        Self {
            state: CircuitBreakerState::Closed,
            failure_count: 0,
            last_failure_time: None,
            config,
        }
    }

    pub fn allow_request(&mut self) -> bool {
        match self.state {
            CircuitBreakerState::Closed => true,
            CircuitBreakerState::Open => {
                if let Some(last_failure) = self.last_failure_time {
                    let recovery_duration = Duration::from_secs(self.config.recovery_timeout_s);
                    if last_failure.elapsed() >= recovery_duration {
                        debug!("Circuit breaker transitioning to half-open for recovery test");
                        self.state = CircuitBreakerState::HalfOpen;
                        true
                    } else {
                        false
                    }
                } else {
                    false
                }
            }
            CircuitBreakerState::HalfOpen => true,
        }
    }

    pub fn record_success(&mut self) {
        match self.state {
            CircuitBreakerState::HalfOpen => {
                info!("Circuit breaker recovery successful, returning to closed state");
                self.state = CircuitBreakerState::Closed;
                self.failure_count = 0;
                self.last_failure_time = None;
            }
            _ => {
                self.failure_count = 0;
            }
        }
    }

    pub fn record_failure(&mut self) {
        self.failure_count = self.failure_count.saturating_add(1);
        self.last_failure_time = Some(Instant::now());

        match self.state {
            CircuitBreakerState::Closed => {
                if self.failure_count >= self.config.failure_threshold {
                    warn!(
                        "Circuit breaker opening due to {} consecutive failures",
                        self.failure_count
                    );
                    self.state = CircuitBreakerState::Open;
                }
            }
            CircuitBreakerState::HalfOpen => {
                warn!("Circuit breaker recovery failed, returning to open state");
                self.state = CircuitBreakerState::Open;
            }
            CircuitBreakerState::Open => {}
        }
    }

    pub fn get_state(&self) -> CircuitBreakerState {
        self.state.clone()
    }
}

/// Retry strategy based on error type
#[derive(Debug, Clone, PartialEq)]
pub enum RetryStrategy {
    /// Retry with exponential backoff
    Retry,
    /// Retry after the delay the platform asked for
    RetryWithDelay(Duration),
    /// Don't retry (for permanent failures)
    NoRetry,
}

/// Rate limits wait for the delay the platform asked for; everything else
/// follows [`ErrorExt::is_retryable`].
pub fn get_retry_strategy(error: &CoreError) -> RetryStrategy {
    match error {
        CoreError::Platform(PlatformError::RateLimitExceeded { retry_after }) => {
            RetryStrategy::RetryWithDelay(Duration::from_secs(*retry_after))
        }
        _ if error.is_retryable() => RetryStrategy::Retry,
        _ => RetryStrategy::NoRetry,
    }
}

/// Calculate delay with exponential backoff and jitter
pub fn calculate_delay(attempt: u32, config: &RetryConfig) -> Duration {
    let base_delay = Duration::from_millis(config.base_delay_ms);
    let max_delay = Duration::from_millis(config.max_delay_ms);

    let exponential_delay = if attempt == 0 {
        base_delay
    } else {
        let multiplier = config.backoff_multiplier.powi(attempt as i32);
        let delay_ms = (config.base_delay_ms as f64 * multiplier) as u64;
        Duration::from_millis(delay_ms.min(config.max_delay_ms))
    };

    let jitter_range = (exponential_delay.as_millis() as f64 * config.jitter_factor) as u64;
    let jitter = fastrand::u64(0..=jitter_range);
    let final_delay = exponential_delay + Duration::from_millis(jitter);

    final_delay.min(max_delay)
}

#[derive(Debug, Clone, Default)]
pub struct RetryMetrics {
    pub total_retries: u64,
    pub successful_retries: u64,
    pub failed_operations: u64,
    pub circuit_breaker_trips: u64,
    pub average_retry_delay_ms: f64,
}

/// Wraps platform calls with backoff, a shared circuit breaker and metrics.
#[derive(Debug)]
pub struct RetryExecutor {
    config: RetryConfig,
    circuit_breaker: Arc<Mutex<CircuitBreaker>>,
    metrics: Arc<Mutex<RetryMetrics>>,
}

impl RetryExecutor {
    pub fn new(config: RetryConfig) -> Self {
        let circuit_breaker = Arc::new(Mutex::new(CircuitBreaker::new(config.clone())));
        let metrics = Arc::new(Mutex::new(RetryMetrics::default()));

        Self {
            config,
            circuit_breaker,
            metrics,
        }
    }

    /// Runs `operation` through [`Self::retry`] unless the circuit breaker is
    /// open, in which case it fails fast with `ServiceUnavailable`.
    pub async fn execute<F, Fut, T>(&self, operation_name: &str, operation: F) -> Result<T, CoreError>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = Result<T, CoreError>>,
    {
        {
            let mut breaker = lock(&self.circuit_breaker);
            if !breaker.allow_request() {
                drop(breaker);
                lock(&self.metrics).circuit_breaker_trips += 1;

                warn!(
                    "Circuit breaker is open, blocking request for {}",
                    operation_name
                );
                return Err(CoreError::Platform(PlatformError::ServiceUnavailable {
                    service: format!("{} (circuit breaker open)", operation_name),
                }));
            }
        }

        self.retry(operation_name, operation).await
    }

    /// Runs `operation` until it succeeds, fails permanently, or runs out of
    /// attempts, without consulting the circuit breaker. Service-level
    /// failures still count towards opening it. The last error is returned
    /// as-is.
    pub async fn retry<F, Fut, T>(&self, operation_name: &str, operation: F) -> Result<T, CoreError>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = Result<T, CoreError>>,
    {
        let mut total_delay_ms = 0u64;
        let mut attempt = 0u32;

        let last_error = loop {
            if attempt > 0 {
                debug!("Retry attempt {} for {}", attempt, operation_name);
            }

            let start_time = Instant::now();
            let error = match operation().await {
                Ok(result) => {
                    lock(&self.circuit_breaker).record_success();

                    if attempt > 0 {
                        let mut metrics = lock(&self.metrics);
                        metrics.successful_retries += 1;
                        metrics.average_retry_delay_ms = (metrics.average_retry_delay_ms
                            * (metrics.successful_retries - 1) as f64
                            + total_delay_ms as f64)
                            / metrics.successful_retries as f64;

                        info!(
                            "Operation {} succeeded after {} retries (total delay: {}ms)",
                            operation_name, attempt, total_delay_ms
                        );
                    }

                    return Ok(result);
                }
                Err(error) => error,
            };

            debug!(
                "Attempt {} failed for {} after {:?}: {}",
                attempt + 1,
                operation_name,
                start_time.elapsed(),
                error
            );

            let has_attempts_left = attempt + 1 < self.config.max_attempts;
            let delay = match get_retry_strategy(&error) {
                RetryStrategy::Retry if has_attempts_left => calculate_delay(attempt, &self.config),
                RetryStrategy::RetryWithDelay(delay) if has_attempts_left => delay,
                RetryStrategy::NoRetry => {
                    debug!(
                        "Not retrying {} due to error type: {}",
                        operation_name, error
                    );
                    break error;
                }
                _ => {
                    debug!("Max retry attempts reached for {}", operation_name);
                    break error;
                }
            };

            info!(
                "Retrying {} in {:?} due to: {}",
                operation_name, delay, error
            );
            total_delay_ms += delay.as_millis() as u64;
            lock(&self.metrics).total_retries += 1;
            sleep(delay).await;
            attempt += 1;
        };

        if trips_circuit_breaker(&last_error) {
            lock(&self.circuit_breaker).record_failure();
        }
        lock(&self.metrics).failed_operations += 1;

        error!(
            "Operation {} failed after {} attempt(s) with total delay of {}ms",
            operation_name,
            attempt + 1,
            total_delay_ms
        );

        Err(last_error)
    }

    pub fn get_metrics(&self) -> RetryMetrics {
        lock(&self.metrics).clone()
    }

    pub fn get_circuit_breaker_state(&self) -> CircuitBreakerState {
        lock(&self.circuit_breaker).get_state()
    }

    pub fn reset_metrics(&self) {
        *lock(&self.metrics) = RetryMetrics::default();
    }
}

/// Only an unreachable or unresponsive platform counts against the breaker.
/// Failures tied to one account or one item do not.
pub fn trips_circuit_breaker(error: &CoreError) -> bool {
    matches!(
        error,
        CoreError::Platform(
            PlatformError::ServiceUnavailable { .. } | PlatformError::RequestTimeout { .. }
        ) | CoreError::Timeout { .. }
    )
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
