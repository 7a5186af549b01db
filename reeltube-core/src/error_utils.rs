use crate::error::*;
use std::time::Duration;
use tracing::{error, info, warn};

pub trait ErrorExt {
    fn log_error(&self) -> &Self;
    fn log_warn(&self) -> &Self;
    fn is_retryable(&self) -> bool;
    fn retry_after(&self) -> Option<Duration>;
    fn user_friendly_message(&self) -> String;
    fn error_code(&self) -> String;
}

impl ErrorExt for CoreError {
    fn log_error(&self) -> &Self {
        error!("CoreError: {}", self);
        match self {
            CoreError::Platform(e) => {
                error!("Platform error details: {:?}", e);
            }
            CoreError::Store(e) => {
                error!("Settings store error details: {:?}", e);
            }
            CoreError::Config(e) => {
                error!("Configuration error details: {:?}", e);
            }
            _ => {}
        }
        self
    }

    fn log_warn(&self) -> &Self {
        warn!("CoreError (warning): {}", self);
        self
    }

    fn is_retryable(&self) -> bool {
        match self {
            CoreError::Platform(e) => e.is_retryable(),
            CoreError::Store(e) => e.is_retryable(),
            CoreError::Timeout { .. } => true,
            _ => false,
        }
    }

    fn retry_after(&self) -> Option<Duration> {
        match self {
            CoreError::Platform(e) => e.retry_after(),
            CoreError::Store(e) => e.retry_after(),
            CoreError::Timeout { seconds } => Some(Duration::from_secs(*seconds)),
            _ => None,
        }
    }

    fn user_friendly_message(&self) -> String {
        match self {
            CoreError::Platform(e) => e.user_friendly_message(),
            CoreError::Store(e) => e.user_friendly_message(),
            CoreError::Config(e) => e.user_friendly_message(),
            CoreError::Validation { message, .. } => message.clone(),
            CoreError::InvalidInput { .. } => {
                "Invalid input provided. Please check your input and try again.".to_string()
            }
            CoreError::Timeout { .. } => {
                "The operation took too long to complete. Please try again.".to_string()
            }
            CoreError::PermissionDenied { operation } => {
                format!("Permission denied for: {}", operation)
            }
            _ => "An unexpected error occurred. Please try again later.".to_string(),
        }
    }

    fn error_code(&self) -> String {
        match self {
            CoreError::Platform(_) => "PLATFORM".to_string(),
            CoreError::Store(_) => "STORE".to_string(),
            CoreError::Config(_) => "CONFIG".to_string(),
            CoreError::Validation { .. } => "VALIDATION".to_string(),
            CoreError::Serialization(_) => "SERIALIZATION".to_string(),
            CoreError::InvalidInput { .. } => "INVALID_INPUT".to_string(),
            CoreError::Timeout { .. } => "TIMEOUT".to_string(),
            CoreError::PermissionDenied { .. } => "PERMISSION_DENIED".to_string(),
            CoreError::Internal { .. } => "INTERNAL".to_string(),
        }
    }
}

impl ErrorExt for PlatformError {
    fn log_error(&self) -> &Self {
        error!("PlatformError: {}", self);
        self
    }

    fn log_warn(&self) -> &Self {
        warn!("PlatformError (warning): {}", self);
        self
    }

    fn is_retryable(&self) -> bool {
        match self {
            PlatformError::RateLimitExceeded { .. } => true,
            PlatformError::RequestTimeout { .. } => true,
            PlatformError::ServiceUnavailable { .. } => true,
            PlatformError::DownloadFailed { .. } => true,
            PlatformError::AutomationStepFailed { .. } => true,
            _ => false,
        }
    }

    fn retry_after(&self) -> Option<Duration> {
        match self {
            PlatformError::RateLimitExceeded { retry_after } => {
                Some(Duration::from_secs(*retry_after))
            }
            _ if self.is_retryable() => Some(Duration::from_secs(30)),
            _ => None,
        }
    }

    fn user_friendly_message(&self) -> String {
        match self {
            PlatformError::AccountNotFound { account } => {
                format!("Account '@{}' was not found or is private.", account)
            }
            PlatformError::RateLimitExceeded { retry_after } => format!(
                "Too many requests. Please wait {} seconds before trying again.",
                retry_after
            ),
            PlatformError::RequestTimeout { .. } => {
                "The platform did not respond in time. Please try again.".to_string()
            }
            PlatformError::DownloadFailed { .. } => {
                "A reel could not be downloaded. It will be picked up on the next check."
                    .to_string()
            }
            PlatformError::UploadFailed { .. } | PlatformError::AutomationStepFailed { .. } => {
                "The upload did not complete. Please check the YouTube app.".to_string()
            }
            _ => "Platform error occurred. Please try again later.".to_string(),
        }
    }

    fn error_code(&self) -> String {
        match self {
            PlatformError::AccountNotFound { .. } => "PLATFORM_ACCOUNT_NOT_FOUND".to_string(),
            PlatformError::RateLimitExceeded { .. } => "PLATFORM_RATE_LIMIT".to_string(),
            PlatformError::RequestTimeout { .. } => "PLATFORM_TIMEOUT".to_string(),
            PlatformError::ServiceUnavailable { .. } => "PLATFORM_UNAVAILABLE".to_string(),
            PlatformError::DownloadFailed { .. } => "PLATFORM_DOWNLOAD_FAILED".to_string(),
            PlatformError::UploadFailed { .. } => "PLATFORM_UPLOAD_FAILED".to_string(),
            PlatformError::AutomationStepFailed { .. } => "PLATFORM_AUTOMATION_STEP".to_string(),
            PlatformError::InvalidResponse { .. } => "PLATFORM_INVALID_RESPONSE".to_string(),
        }
    }
}

impl ErrorExt for StoreError {
    fn log_error(&self) -> &Self {
        error!("StoreError: {}", self);
        self
    }

    fn log_warn(&self) -> &Self {
        warn!("StoreError (warning): {}", self);
        self
    }

    fn is_retryable(&self) -> bool {
        matches!(
            self,
            StoreError::DatabaseLocked | StoreError::ConnectionFailed { .. }
        )
    }

    fn retry_after(&self) -> Option<Duration> {
        match self {
            StoreError::DatabaseLocked => Some(Duration::from_millis(100)),
            _ if self.is_retryable() => Some(Duration::from_secs(1)),
            _ => None,
        }
    }

    fn user_friendly_message(&self) -> String {
        match self {
            StoreError::NotConnected | StoreError::ConnectionFailed { .. } => {
                "Settings could not be opened. Please try again.".to_string()
            }
            StoreError::MalformedRecord { .. } => {
                "Saved settings were unreadable and have been reset.".to_string()
            }
            StoreError::DatabaseLocked => {
                "Settings are temporarily busy. Please try again.".to_string()
            }
            _ => "Settings could not be saved. Please try again.".to_string(),
        }
    }

    fn error_code(&self) -> String {
        match self {
            StoreError::NotConnected => "STORE_NOT_CONNECTED".to_string(),
            StoreError::ConnectionFailed { .. } => "STORE_CONNECTION_FAILED".to_string(),
            StoreError::MalformedRecord { .. } => "STORE_MALFORMED_RECORD".to_string(),
            StoreError::DatabaseLocked => "STORE_LOCKED".to_string(),
            StoreError::Migration(_) => "STORE_MIGRATION_FAILED".to_string(),
            StoreError::Sql(_) => "STORE_SQL_ERROR".to_string(),
        }
    }
}

impl ErrorExt for ConfigError {
    fn log_error(&self) -> &Self {
        error!("ConfigError: {}", self);
        self
    }

    fn log_warn(&self) -> &Self {
        warn!("ConfigError (warning): {}", self);
        self
    }

    fn is_retryable(&self) -> bool {
        false // Config errors need the user to fix the file
    }

    fn retry_after(&self) -> Option<Duration> {
        None
    }

    fn user_friendly_message(&self) -> String {
        match self {
            ConfigError::FileNotFound { path } => {
                format!("Configuration file '{}' not found.", path)
            }
            ConfigError::InvalidValue { field, .. } => {
                format!("Invalid value for configuration field '{}'.", field)
            }
            ConfigError::PermissionDenied { .. } => {
                "Permission denied accessing configuration. Please check file permissions."
                    .to_string()
            }
            ConfigError::Parse(_) => {
                "Configuration file format is invalid. Please check the settings.".to_string()
            }
        }
    }

    fn error_code(&self) -> String {
        match self {
            ConfigError::FileNotFound { .. } => "CONFIG_FILE_NOT_FOUND".to_string(),
            ConfigError::InvalidValue { .. } => "CONFIG_INVALID_VALUE".to_string(),
            ConfigError::PermissionDenied { .. } => "CONFIG_PERMISSION_DENIED".to_string(),
            ConfigError::Parse(_) => "CONFIG_PARSE_ERROR".to_string(),
        }
    }
}

/// Logs an error with its code, user-facing message and retry hint.
pub struct ErrorReporter;

impl ErrorReporter {
    pub fn new() -> Self {
        Self
    }

    pub fn report_error(&self, error: &CoreError) {
        error.log_error();
        info!("Error code: {}", error.error_code());
        info!("User message: {}", error.user_friendly_message());
        if error.is_retryable() {
            if let Some(retry_after) = error.retry_after() {
                info!("Error is retryable. Retry after: {:?}", retry_after);
            }
        }
    }

    pub fn report_warning(&self, error: &CoreError) {
        error.log_warn();
    }
}

impl Default for ErrorReporter {
    fn default() -> Self {
        Self::new()
    }
}
