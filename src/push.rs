mod dispatch;
mod inactivity;
mod registry;
mod scheduler;
pub(crate) mod vapid;

pub use dispatch::{DispatchSummary, Dispatcher};
pub use inactivity::{DEFAULT_WINDOW_DAYS, InactivityWindow, MAX_WINDOW_DAYS, is_inactive};
pub use registry::{
    ParsedSubscriptions, Registration, SubscriptionRegistry, employee_subscriptions,
    parse_subscriptions,
};
pub use scheduler::{
    InactivityScheduler, ScanReport, SchedulerHandle, SchedulerStatus, next_run_at,
};
pub use vapid::{
    VapidConfigStatus, VapidCredentials, generate_vapid_credentials, load_vapid_config,
    sender_from_config,
};
