use crate::ports::{EmployeeStore, PushSender, TimeProvider};
use crate::push::{DispatchSummary, Dispatcher};
use crate::types::employee::{EmployeeUpdate, RoleType};
use crate::types::notification::Notification;

use tokio::task::JoinHandle;

/// Hooks for the flows that notify as a side effect: sign-in, password
/// change, profile edits and project creation.
///
/// Every hook spawns its work and returns immediately. The returned handle may
/// be awaited, but callers on a request path should not.
#[derive(Clone)]
pub struct Notifier<T, D, S> {
    time: T,
    dispatcher: Dispatcher<D, S>,
}

#[derive(Debug, Clone, Copy)]
enum Activity {
    Login,
    DetailsChanged,
}

impl<T, D, S> Notifier<T, D, S>
where
    T: TimeProvider,
    D: EmployeeStore,
    S: PushSender,
{
    pub fn new(time: T, dispatcher: Dispatcher<D, S>) -> Self {
        Self { time, dispatcher }
    }

    pub fn dispatcher(&self) -> &Dispatcher<D, S> {
        &self.dispatcher
    }

    /// Fire-and-forget `send_to_user`.
    pub fn notify_user(
        &self,
        employee_id: impl Into<String>,
        notification: Notification,
    ) -> JoinHandle<DispatchSummary> {
        let dispatcher = self.dispatcher.clone();
        let employee_id = employee_id.into();
        tokio::spawn(async move { dispatcher.send_to_user(&employee_id, notification).await })
    }

    /// Fire-and-forget `broadcast_to_role`.
    pub fn broadcast(
        &self,
        excluded_role: RoleType,
        notification: Notification,
    ) -> JoinHandle<DispatchSummary> {
        let dispatcher = self.dispatcher.clone();
        tokio::spawn(async move {
            dispatcher
                .broadcast_to_role(&excluded_role, notification)
                .await
        })
    }

    pub fn on_login(&self, employee_id: impl Into<String>) -> JoinHandle<()> {
        self.record(employee_id.into(), Activity::Login, Some(Notification::login_alert()))
    }

    pub fn on_password_changed(&self, employee_id: impl Into<String>) -> JoinHandle<()> {
        self.record(
            employee_id.into(),
            Activity::DetailsChanged,
            Some(Notification::password_changed()),
        )
    }

    pub fn on_profile_updated(&self, employee_id: impl Into<String>) -> JoinHandle<()> {
        self.record(employee_id.into(), Activity::DetailsChanged, None)
    }

    pub fn on_project_created(&self, project_name: &str) -> JoinHandle<DispatchSummary> {
        self.broadcast(RoleType::Manager, Notification::project_created(project_name))
    }

    fn record(
        &self,
        employee_id: String,
        activity: Activity,
        notification: Option<Notification>,
    ) -> JoinHandle<()> {
        let now = self.time.now();
        let dispatcher = self.dispatcher.clone();
        tokio::spawn(async move {
            let update = match activity {
                Activity::Login => EmployeeUpdate {
                    last_login: Some(now),
                    ..EmployeeUpdate::default()
                },
                Activity::DetailsChanged => EmployeeUpdate {
                    updated_at: Some(now),
                    ..EmployeeUpdate::default()
                },
            };
            if let Err(err) = dispatcher
                .registry()
                .store()
                .update_employee(&employee_id, update)
                .await
            {
                tracing::warn!(
                    employee_id = %employee_id,
                    ?activity,
                    error = %err,
                    "failed to record activity"
                );
            }
            if let Some(notification) = notification {
                dispatcher.send_to_user(&employee_id, notification).await;
            }
        })
    }
}
