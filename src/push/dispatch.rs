use crate::error::DeliveryError;
use crate::ports::{EmployeeStore, PushSender};
use crate::push::registry::{SubscriptionRegistry, employee_subscriptions};
use crate::types::employee::{EmployeeFilter, RoleType};
use crate::types::notification::Notification;
use crate::types::push::Subscription;

use futures::future::join_all;
use serde::Serialize;

/// Aggregate outcome of one dispatch, used for logging only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DispatchSummary {
    pub recipients: usize,
    pub delivered: usize,
    pub expired: usize,
    pub failed: usize,
}

impl DispatchSummary {
    pub fn attempted(&self) -> usize {
        self.delivered + self.expired + self.failed
    }

    pub fn merge(&mut self, other: DispatchSummary) {
        self.recipients += other.recipients;
        self.delivered += other.delivered;
        self.expired += other.expired;
        self.failed += other.failed;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Delivery {
    Delivered,
    Expired,
    Failed,
}

/// Normalizes notifications into payloads, resolves recipients and fans the
/// payload out to every subscription concurrently.
#[derive(Clone)]
pub struct Dispatcher<D, S> {
    registry: SubscriptionRegistry<D>,
    sender: S,
}

impl<D, S> Dispatcher<D, S>
where
    D: EmployeeStore,
    S: PushSender,
{
    pub fn new(registry: SubscriptionRegistry<D>, sender: S) -> Self {
        Self { registry, sender }
    }

    pub fn registry(&self) -> &SubscriptionRegistry<D> {
        &self.registry
    }

    /// Delivers to every subscription of one employee. Unknown employees and
    /// employees without subscriptions are a silent no-op.
    pub async fn send_to_user(
        &self,
        employee_id: &str,
        notification: Notification,
    ) -> DispatchSummary {
        let Some(body) = encode(notification) else {
            return DispatchSummary::default();
        };
        let subscriptions = self.registry.list(employee_id).await;
        let summary = self.deliver(employee_id, subscriptions, &body).await;
        tracing::debug!(
            employee_id,
            delivered = summary.delivered,
            expired = summary.expired,
            failed = summary.failed,
            "dispatched notification to employee"
        );
        summary
    }

    /// Delivers to every employee whose role is not `excluded_role`. Each
    /// employee and each of their subscriptions is an independent branch.
    pub async fn broadcast_to_role(
        &self,
        excluded_role: &RoleType,
        notification: Notification,
    ) -> DispatchSummary {
        let Some(body) = encode(notification) else {
            return DispatchSummary::default();
        };
        let filter = EmployeeFilter::ExcludingRole(excluded_role.clone());
        let employees = match self.registry.store().list_employees(&filter).await {
            Ok(employees) => employees,
            Err(err) => {
                tracing::error!(
                    excluded_role = %excluded_role,
                    error = %err,
                    "broadcast aborted: failed to fetch employees"
                );
                return DispatchSummary::default();
            }
        };

        let mut branches = Vec::with_capacity(employees.len());
        for employee in &employees {
            if !filter.matches(employee) {
                continue;
            }
            let subscriptions = employee_subscriptions(employee);
            branches.push(self.deliver(&employee.employee_id, subscriptions, &body));
        }
        let mut summary = DispatchSummary::default();
        for branch in join_all(branches).await {
            summary.merge(branch);
        }
        tracing::info!(
            excluded_role = %excluded_role,
            recipients = summary.recipients,
            delivered = summary.delivered,
            expired = summary.expired,
            failed = summary.failed,
            "broadcast finished"
        );
        summary
    }

    async fn deliver(
        &self,
        employee_id: &str,
        subscriptions: Vec<Subscription>,
        body: &str,
    ) -> DispatchSummary {
        if subscriptions.is_empty() {
            return DispatchSummary::default();
        }

        let mut sends = Vec::with_capacity(subscriptions.len());
        for subscription in &subscriptions {
            sends.push(self.deliver_one(employee_id, subscription, body));
        }
        let outcomes = join_all(sends).await;

        let mut summary = DispatchSummary {
            recipients: 1,
            ..DispatchSummary::default()
        };
        for (subscription, outcome) in subscriptions.iter().zip(outcomes) {
            match outcome {
                Delivery::Delivered => summary.delivered += 1,
                Delivery::Failed => summary.failed += 1,
                Delivery::Expired => {
                    summary.expired += 1;
                    self.forget(employee_id, &subscription.endpoint).await;
                }
            }
        }
        summary
    }

    async fn deliver_one(
        &self,
        employee_id: &str,
        subscription: &Subscription,
        body: &str,
    ) -> Delivery {
        match self.sender.send(subscription, body).await {
            Ok(()) => Delivery::Delivered,
            Err(DeliveryError::Expired(reason)) => {
                tracing::warn!(
                    employee_id,
                    endpoint = %subscription.endpoint,
                    %reason,
                    "push endpoint expired"
                );
                Delivery::Expired
            }
            Err(err @ DeliveryError::Transient(_)) => {
                tracing::warn!(
                    employee_id,
                    endpoint = %subscription.endpoint,
                    error = %err,
                    "push delivery failed; not retrying"
                );
                Delivery::Failed
            }
            Err(err @ DeliveryError::Other(_)) => {
                tracing::error!(
                    employee_id,
                    endpoint = %subscription.endpoint,
                    error = %err,
                    "push delivery error"
                );
                Delivery::Failed
            }
        }
    }

    async fn forget(&self, employee_id: &str, endpoint: &str) {
        if let Err(err) = self
            .registry
            .remove_by_endpoint(employee_id, endpoint)
            .await
        {
            tracing::warn!(
                employee_id,
                endpoint,
                error = %err,
                "failed to remove expired subscription"
            );
        }
    }
}

fn encode(notification: Notification) -> Option<String> {
    match notification.into_payload().to_json() {
        Ok(body) => Some(body),
        Err(err) => {
            tracing::error!(error = %err, "failed to encode notification payload");
            None
        }
    }
}
