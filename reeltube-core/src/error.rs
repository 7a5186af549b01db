use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Platform error: {0}")]
    Platform(#[from] PlatformError),

    #[error("Settings store error: {0}")]
    Store(#[from] StoreError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Validation failed for {field}: {message}")]
    Validation { field: String, message: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    #[error("Operation timeout after {seconds} seconds")]
    Timeout { seconds: u64 },

    #[error("Permission denied: {operation}")]
    PermissionDenied { operation: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl CoreError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        CoreError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }
}

#[derive(Error, Debug, Clone)]
pub enum PlatformError {
    #[error("Account not found: @{account}")]
    AccountNotFound { account: String },

    #[error("Rate limit exceeded. Retry after {retry_after} seconds")]
    RateLimitExceeded { retry_after: u64 },

    #[error("Request timeout in {operation}")]
    RequestTimeout { operation: String },

    #[error("Service unavailable: {service}")]
    ServiceUnavailable { service: String },

    #[error("Download of {url} failed: {reason}")]
    DownloadFailed { url: String, reason: String },

    #[error("Upload failed: {reason}")]
    UploadFailed { reason: String },

    #[error("Automation step failed: {step}")]
    AutomationStepFailed { step: String },

    #[error("Invalid response: {details}")]
    InvalidResponse { details: String },
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Settings store is not connected")]
    NotConnected,

    #[error("Connection failed: {reason}")]
    ConnectionFailed { reason: String },

    #[error("Malformed record in slot {key}")]
    MalformedRecord { key: String },

    #[error("Database locked")]
    DatabaseLocked,

    #[error("Migration failed: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("SQL error: {0}")]
    Sql(#[from] sqlx::Error),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found: {path}")]
    FileNotFound { path: String },

    #[error("Invalid value for {field}: {value}")]
    InvalidValue { field: String, value: String },

    #[error("Permission denied accessing config: {path}")]
    PermissionDenied { path: String },

    #[error("Configuration parsing error: {0}")]
    Parse(#[from] toml::de::Error),
}
