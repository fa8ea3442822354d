use crate::push::InactivityWindow;

use std::net::SocketAddr;
use std::path::PathBuf;
use time::macros::{offset, time};
use time::{Time, UtcOffset};

pub const DEFAULT_REMINDER_URL: &str = "/profile";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind: SocketAddr,
    /// JSON file backing the employee store; in-memory only when absent.
    pub employees: Option<PathBuf>,
    pub vapid_private_key: Option<String>,
    pub vapid_public_key: Option<String>,
    pub vapid_subject: Option<String>,
    pub scan: ScanConfig,
}

/// Settings of the daily inactivity scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanConfig {
    pub window: InactivityWindow,
    /// Local wall-clock time at which the scan fires.
    pub run_at: Time,
    /// Offset that defines "local" for `run_at`.
    pub utc_offset: UtcOffset,
    pub reminder_url: String,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            window: InactivityWindow::default(),
            run_at: time!(09:00),
            utc_offset: offset!(UTC),
            reminder_url: DEFAULT_REMINDER_URL.to_string(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([127, 0, 0, 1], 3000)),
            employees: None,
            vapid_private_key: None,
            vapid_public_key: None,
            vapid_subject: None,
            scan: ScanConfig::default(),
        }
    }
}
