use thiserror::Error;

/// Failure reported by a push transport for a single subscription.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeliveryError {
    /// The push service reports the endpoint as gone; it should not be used again.
    #[error("endpoint expired: {0}")]
    Expired(String),
    #[error("transient delivery failure: {0}")]
    Transient(String),
    #[error("delivery failed: {0}")]
    Other(String),
}

impl DeliveryError {
    pub fn is_expired(&self) -> bool {
        matches!(self, DeliveryError::Expired(_))
    }
}

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("employee '{0}' not found")]
    NotFound(String),
    #[error("employee store error: {0}")]
    Store(String),
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("employee '{0}' not found")]
    NotFound(String),
    #[error("employee store i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("employee store json error: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("failed to fetch employees: {0}")]
    Fetch(String),
    #[error("an inactivity scan is already running")]
    AlreadyRunning,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid inactivity window '{0}'; expected <number>[d|w]")]
    InvalidWindow(String),
    #[error("inactivity window must be greater than 0")]
    EmptyWindow,
    #[error("invalid scan time '{0}'; expected HH:MM")]
    InvalidTimeOfDay(String),
    #[error("invalid utc offset '{0}'; expected +HH:MM or -HH:MM")]
    InvalidUtcOffset(String),
    #[error("failed to read config file {path}: {source}")]
    ReadFile {
        path: std::path::PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config file {path}: {source}")]
    ParseFile {
        path: std::path::PathBuf,
        source: toml::de::Error,
    },
}

#[derive(Debug, Error)]
pub enum ServeError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("server i/o error: {0}")]
    Io(#[from] std::io::Error),
}
