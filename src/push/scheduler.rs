use crate::config::ScanConfig;
use crate::error::ScanError;
use crate::ports;
use crate::push::dispatch::{DispatchSummary, Dispatcher};
use crate::push::inactivity::is_inactive;
use crate::types::employee::{EmployeeFilter, RoleType};
use crate::types::notification::Notification;

use futures::future::join_all;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use time::{OffsetDateTime, Time, UtcOffset};
use tokio::task::JoinHandle;

/// Owns the background task driving daily scans. Dropping the handle leaves
/// the task running; call [`SchedulerHandle::stop`] to end it.
pub struct SchedulerHandle {
    handle: JoinHandle<()>,
}

impl SchedulerHandle {
    pub fn stop(&self) {
        self.handle.abort();
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SchedulerStatus {
    #[serde(with = "time::serde::rfc3339::option")]
    pub next_run_at: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub last_run_at: Option<OffsetDateTime>,
    pub last_notified: Option<usize>,
    pub last_error: Option<String>,
    pub running: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ScanReport {
    pub evaluated: usize,
    pub notified: usize,
    pub delivery: DispatchSummary,
}

#[derive(Default)]
struct SchedulerState {
    running: AtomicBool,
    status: Mutex<SchedulerStatus>,
}

struct RunningGuard<'a>(&'a AtomicBool);

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Daily scan that reminds individual contributors who have neither logged
/// in nor touched their details within the inactivity window.
///
/// Scans never overlap: a scan requested while another is in flight is
/// skipped with [`ScanError::AlreadyRunning`].
#[derive(Clone)]
pub struct InactivityScheduler<T, D, S> {
    time: T,
    dispatcher: Dispatcher<D, S>,
    config: ScanConfig,
    state: Arc<SchedulerState>,
}

impl<T, D, S> InactivityScheduler<T, D, S>
where
    T: ports::TimeProvider,
    D: ports::EmployeeStore,
    S: ports::PushSender,
{
    pub fn new(time: T, dispatcher: Dispatcher<D, S>, config: ScanConfig) -> Self {
        Self {
            time,
            dispatcher,
            config,
            state: Arc::new(SchedulerState::default()),
        }
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    pub fn status(&self) -> SchedulerStatus {
        let mut status = self
            .state
            .status
            .lock()
            .expect("scheduler status lock")
            .clone();
        status.running = self.state.running.load(Ordering::Acquire);
        status
    }

    pub fn start(&self) -> SchedulerHandle {
        let scheduler = self.clone();
        let handle = tokio::spawn(async move {
            scheduler.run_forever().await;
        });
        tracing::info!(
            run_at = %self.config.run_at,
            utc_offset = %self.config.utc_offset,
            window = ?self.config.window,
            "inactivity scheduler started"
        );
        SchedulerHandle { handle }
    }

    async fn run_forever(self) {
        let mut previous: Option<OffsetDateTime> = None;
        loop {
            let now = self.time.now_at(self.config.utc_offset);
            let from = match previous {
                Some(previous) if previous > now => previous,
                _ => now,
            };
            let at = next_run_at(from, self.config.run_at, self.config.utc_offset);
            self.update_status(|status| status.next_run_at = Some(at));
            if let Some(delay) = compute_delay(&self.time, at) {
                self.time.sleep(delay).await;
            }
            previous = Some(at);

            if let Ok(report) = self.run_once().await {
                tracing::info!(
                    notified = report.notified,
                    evaluated = report.evaluated,
                    "scheduled inactivity scan completed"
                );
            }
        }
    }

    /// Runs one scan now. Fetch failures abort the scan; the next scheduled
    /// run is the only retry.
    pub async fn run_once(&self) -> Result<ScanReport, ScanError> {
        if self.state.running.swap(true, Ordering::AcqRel) {
            tracing::warn!("inactivity scan already running; skipping");
            return Err(ScanError::AlreadyRunning);
        }
        let _running = RunningGuard(&self.state.running);

        let started_at = self.time.now();
        let result = self.scan(started_at).await;
        match &result {
            Ok(report) => {
                let notified = report.notified;
                self.update_status(|status| {
                    status.last_run_at = Some(started_at);
                    status.last_notified = Some(notified);
                    status.last_error = None;
                });
            }
            Err(err) => {
                tracing::error!(error = %err, "inactivity scan aborted");
                let message = err.to_string();
                self.update_status(|status| {
                    status.last_run_at = Some(started_at);
                    status.last_notified = None;
                    status.last_error = Some(message);
                });
            }
        }
        result
    }

    async fn scan(&self, now: OffsetDateTime) -> Result<ScanReport, ScanError> {
        let cutoff = self.config.window.cutoff(now);
        let filter = EmployeeFilter::ExcludingRole(RoleType::Manager);
        let employees = self
            .dispatcher
            .registry()
            .store()
            .list_employees(&filter)
            .await
            .map_err(|err| ScanError::Fetch(err.to_string()))?;

        let stale: Vec<_> = employees
            .iter()
            .filter(|employee| filter.matches(employee) && is_inactive(employee, cutoff))
            .collect();
        let reminder = Notification::inactivity_reminder(self.config.reminder_url.clone());
        let mut sends = Vec::with_capacity(stale.len());
        for employee in &stale {
            sends.push(
                self.dispatcher
                    .send_to_user(&employee.employee_id, reminder.clone()),
            );
        }
        let summaries = join_all(sends).await;

        let mut delivery = DispatchSummary::default();
        for summary in summaries {
            delivery.merge(summary);
        }
        let report = ScanReport {
            evaluated: employees.len(),
            notified: stale.len(),
            delivery,
        };
        tracing::info!(
            %cutoff,
            evaluated = report.evaluated,
            notified = report.notified,
            delivered = delivery.delivered,
            "inactivity scan finished"
        );
        Ok(report)
    }

    fn update_status(&self, update: impl FnOnce(&mut SchedulerStatus)) {
        let mut status = self.state.status.lock().expect("scheduler status lock");
        update(&mut status);
    }
}

/// First instant strictly after `after` whose wall-clock time in `offset` is
/// `run_at`.
pub fn next_run_at(after: OffsetDateTime, run_at: Time, offset: UtcOffset) -> OffsetDateTime {
    let local = after.to_offset(offset);
    let today = local.replace_time(run_at);
    if today > local {
        today
    } else {
        today + time::Duration::days(1)
    }
}

fn compute_delay<T: ports::TimeProvider>(time: &T, at: OffsetDateTime) -> Option<Duration> {
    let now = time.now();
    let delay = at - now;
    if delay.is_positive() {
        match delay.try_into() {
            Ok(std_delay) => Some(std_delay),
            Err(_) => Some(Duration::MAX),
        }
    } else {
        None
    }
}

#[cfg(test)]
#[allow(non_snake_case)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use crate::push::InactivityWindow;
    use crate::push::registry::SubscriptionRegistry;
    use crate::store::JsonEmployeeStore;
    use crate::testing::{TestSender, TestTime, subscription};
    use crate::types::employee::{Employee, EmployeeUpdate};
    use crate::types::notification::Payload;
    use serde_json::json;
    use std::future::Future;
    use std::pin::Pin;
    use time::macros::{datetime, offset, time};

    fn employee(
        id: &str,
        role: &str,
        last_login: Option<OffsetDateTime>,
        updated_at: Option<OffsetDateTime>,
    ) -> Employee {
        let mut employee = Employee::new(id, role);
        employee.last_login = last_login;
        employee.updated_at = updated_at;
        employee.push_subscriptions = json!([subscription(&format!("https://push.example/{id}"))]);
        employee
    }

    fn scheduler<D: ports::EmployeeStore>(
        time: TestTime,
        store: D,
        sender: TestSender,
    ) -> InactivityScheduler<TestTime, D, TestSender> {
        let dispatcher = Dispatcher::new(SubscriptionRegistry::new(store), sender);
        InactivityScheduler::new(time, dispatcher, ScanConfig::default())
    }

    async fn wait_until(mut condition: impl FnMut() -> bool) {
        for _ in 0..1000 {
            if condition() {
                return;
            }
            tokio::task::yield_now().await;
        }
        panic!("condition not met");
    }

    #[test]
    fn compute_delay__should_return_none_for_past() {
        let now = datetime!(2025-01-12 09:30 UTC);
        let time = TestTime::new(now);

        assert!(compute_delay(&time, now - time::Duration::seconds(5)).is_none());
        assert!(compute_delay(&time, now).is_none());
    }

    #[test]
    fn compute_delay__should_return_duration_for_future() {
        let now = datetime!(2025-01-12 09:30 UTC);
        let time = TestTime::new(now);
        let at = now + time::Duration::milliseconds(1500);

        let delay = compute_delay(&time, at).expect("delay");
        assert_eq!(delay, Duration::from_millis(1500));
    }

    #[test]
    fn next_run_at__should_pick_today_when_time_ahead() {
        let after = datetime!(2024-03-01 08:00 UTC);

        assert_eq!(
            next_run_at(after, time!(09:00), offset!(UTC)),
            datetime!(2024-03-01 09:00 UTC)
        );
    }

    #[test]
    fn next_run_at__should_roll_to_tomorrow_at_or_after_run_time() {
        assert_eq!(
            next_run_at(datetime!(2024-03-01 09:00 UTC), time!(09:00), offset!(UTC)),
            datetime!(2024-03-02 09:00 UTC)
        );
        assert_eq!(
            next_run_at(datetime!(2024-03-01 17:00 UTC), time!(09:00), offset!(UTC)),
            datetime!(2024-03-02 09:00 UTC)
        );
    }

    #[test]
    fn next_run_at__should_respect_local_offset() {
        // 06:30 UTC is 08:30 at +02:00, so 09:00 local is still ahead today.
        let next = next_run_at(datetime!(2024-03-01 06:30 UTC), time!(09:00), offset!(+2));

        assert_eq!(next, datetime!(2024-03-01 07:00 UTC));
    }

    #[tokio::test]
    async fn run_once__should_notify_only_stale_contributors() {
        // Given
        let store = JsonEmployeeStore::in_memory();
        let stale_login = Some(datetime!(2024-02-10 00:00 UTC));
        let stale_update = Some(datetime!(2024-02-05 00:00 UTC));
        store.insert(employee("e1", "IC", stale_login, stale_update));
        store.insert(employee("e2", "Manager", stale_login, stale_update));
        store.insert(employee(
            "e4",
            "IC",
            stale_login,
            Some(datetime!(2024-02-28 00:00 UTC)),
        ));
        store.insert(employee("e5", "IC", None, None));
        let time = TestTime::new(datetime!(2024-03-01 00:00 UTC));
        let sender = TestSender::default();
        let scheduler = scheduler(time, store, sender.clone());

        // When
        let report = scheduler.run_once().await.expect("scan");

        // Then
        assert_eq!(report.evaluated, 3);
        assert_eq!(report.notified, 2);
        assert_eq!(
            sender.endpoints(),
            vec!["https://push.example/e1", "https://push.example/e5"]
        );
        let sent = sender.sent.lock().expect("sent lock").clone();
        let payload: Payload = serde_json::from_str(&sent[0].1).expect("payload json");
        assert_eq!(payload.url, "/profile");
        assert_eq!(scheduler.status().last_notified, Some(2));
    }

    #[tokio::test]
    async fn run_once__should_honor_working_day_window() {
        // Given
        let store = JsonEmployeeStore::in_memory();
        // Friday evening activity; Monday scan with a one working day window.
        let friday = Some(datetime!(2024-03-01 18:00 UTC));
        store.insert(employee("e1", "IC", friday, friday));
        let time = TestTime::new(datetime!(2024-03-04 09:00 UTC));
        let sender = TestSender::default();
        let dispatcher = Dispatcher::new(SubscriptionRegistry::new(store), sender.clone());
        let config = ScanConfig {
            window: InactivityWindow::WorkingDays(1),
            ..ScanConfig::default()
        };
        let scheduler = InactivityScheduler::new(time, dispatcher, config);

        // When
        let report = scheduler.run_once().await.expect("scan");

        // Then
        assert_eq!(report.notified, 0);
        assert!(sender.endpoints().is_empty());
    }

    #[derive(Clone)]
    struct FailingStore;

    type BoxFut<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + Send + 'a>>;

    impl ports::EmployeeStore for FailingStore {
        type Error = StoreError;
        type FindFut<'a>
            = BoxFut<'a, Option<Employee>>
        where
            Self: 'a;
        type ListFut<'a>
            = BoxFut<'a, Vec<Employee>>
        where
            Self: 'a;
        type UpdateFut<'a>
            = BoxFut<'a, ()>
        where
            Self: 'a;

        fn find_employee<'a>(&'a self, _employee_id: &'a str) -> Self::FindFut<'a> {
            Box::pin(async { Ok(None) })
        }

        fn list_employees<'a>(&'a self, _filter: &'a EmployeeFilter) -> Self::ListFut<'a> {
            Box::pin(async {
                Err(StoreError::Io(std::io::Error::other("database unavailable")))
            })
        }

        fn update_employee<'a>(
            &'a self,
            employee_id: &'a str,
            _update: EmployeeUpdate,
        ) -> Self::UpdateFut<'a> {
            Box::pin(async move { Err(StoreError::NotFound(employee_id.to_string())) })
        }
    }

    #[tokio::test]
    async fn run_once__should_abort_on_fetch_failure() {
        // Given
        let time = TestTime::new(datetime!(2024-03-01 00:00 UTC));
        let sender = TestSender::default();
        let scheduler = scheduler(time, FailingStore, sender.clone());

        // When
        let result = scheduler.run_once().await;

        // Then
        assert!(matches!(result, Err(ScanError::Fetch(_))));
        assert!(sender.sent.lock().expect("sent lock").is_empty());
        let status = scheduler.status();
        assert!(status.last_error.is_some());
        assert!(!status.running);
    }

    #[tokio::test]
    async fn run_once__should_skip_when_already_running() {
        // Given
        let time = TestTime::new(datetime!(2024-03-01 00:00 UTC));
        let scheduler = scheduler(time, JsonEmployeeStore::in_memory(), TestSender::default());
        scheduler.state.running.store(true, Ordering::Release);

        // When
        let result = scheduler.run_once().await;

        // Then
        assert!(matches!(result, Err(ScanError::AlreadyRunning)));
    }

    #[tokio::test]
    async fn start__should_wait_for_run_time_then_scan() {
        // Given
        let store = JsonEmployeeStore::in_memory();
        store.insert(employee("e1", "IC", None, None));
        let time = TestTime::new(datetime!(2024-03-01 08:00 UTC));
        let sender = TestSender::default();
        let scheduler = scheduler(time.clone(), store, sender.clone());

        // When
        let handle = scheduler.start();
        wait_until(|| time.sleep_durations().len() == 1).await;

        // Then
        assert_eq!(time.sleep_durations(), vec![Duration::from_secs(3600)]);
        assert_eq!(
            scheduler.status().next_run_at,
            Some(datetime!(2024-03-01 09:00 UTC))
        );
        assert!(sender.sent.lock().expect("sent lock").is_empty());

        time.set_now(datetime!(2024-03-01 09:00 UTC));
        time.trigger_all();
        wait_until(|| time.sleep_durations().len() == 2).await;

        assert_eq!(sender.endpoints(), vec!["https://push.example/e1"]);
        assert_eq!(
            time.sleep_durations()[1],
            Duration::from_secs(24 * 60 * 60)
        );
        assert_eq!(scheduler.status().last_notified, Some(1));

        handle.stop();
    }
}
