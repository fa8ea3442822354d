use crate::error::RegistryError;
use crate::ports::EmployeeStore;
use crate::types::employee::{Employee, EmployeeUpdate};
use crate::types::push::Subscription;

use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Registration {
    Added,
    AlreadyPresent,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedSubscriptions {
    pub subscriptions: Vec<Subscription>,
    /// Entries that could not be read as a subscription and were dropped.
    pub rejected: usize,
}

/// Reads whatever the store holds in `push_subscriptions` into an ordered,
/// endpoint-unique list. Accepts null, a JSON-encoded string, an array or a
/// single object; anything unreadable is counted in `rejected` and skipped.
pub fn parse_subscriptions(value: &Value) -> ParsedSubscriptions {
    let mut parsed = ParsedSubscriptions::default();
    collect(value, &mut parsed, true);
    parsed
}

fn collect(value: &Value, parsed: &mut ParsedSubscriptions, decode_strings: bool) {
    match value {
        Value::Null => {}
        Value::String(raw) if raw.trim().is_empty() => {}
        Value::String(raw) if decode_strings => match serde_json::from_str::<Value>(raw) {
            Ok(inner) => collect(&inner, parsed, false),
            Err(_) => parsed.rejected += 1,
        },
        Value::Array(items) => {
            for item in items {
                push_entry(item, parsed);
            }
        }
        Value::Object(_) => push_entry(value, parsed),
        _ => parsed.rejected += 1,
    }
}

fn push_entry(item: &Value, parsed: &mut ParsedSubscriptions) {
    match serde_json::from_value::<Subscription>(item.clone()) {
        Ok(subscription) if subscription.endpoint.trim().is_empty() => parsed.rejected += 1,
        Ok(subscription) => {
            let known = parsed
                .subscriptions
                .iter()
                .any(|existing| existing.endpoint == subscription.endpoint);
            if !known {
                parsed.subscriptions.push(subscription);
            }
        }
        Err(_) => parsed.rejected += 1,
    }
}

/// Typed subscription list of one employee row; malformed entries are logged
/// and ignored.
pub fn employee_subscriptions(employee: &Employee) -> Vec<Subscription> {
    let parsed = parse_subscriptions(&employee.push_subscriptions);
    if parsed.rejected > 0 {
        tracing::warn!(
            employee_id = %employee.employee_id,
            rejected = parsed.rejected,
            "ignoring malformed stored push subscriptions"
        );
    }
    parsed.subscriptions
}

/// Per-employee push subscriptions, stored on the employee record.
///
/// Mutations for the same employee are serialized so concurrent
/// read-modify-write cycles cannot drop each other's changes.
#[derive(Clone)]
pub struct SubscriptionRegistry<D> {
    store: D,
    locks: Arc<Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>>,
}

impl<D: EmployeeStore> SubscriptionRegistry<D> {
    pub fn new(store: D) -> Self {
        Self {
            store,
            locks: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn store(&self) -> &D {
        &self.store
    }

    pub async fn register(
        &self,
        employee_id: &str,
        subscription: Subscription,
    ) -> Result<Registration, RegistryError> {
        let lock = self.lock_for(employee_id);
        let result = {
            let _guard = lock.lock().await;
            self.register_locked(employee_id, subscription).await
        };
        self.release(employee_id, lock);
        result
    }

    async fn register_locked(
        &self,
        employee_id: &str,
        subscription: Subscription,
    ) -> Result<Registration, RegistryError> {
        let employee = self.find(employee_id).await?;
        let mut subscriptions = employee_subscriptions(&employee);
        if subscriptions
            .iter()
            .any(|existing| existing.endpoint == subscription.endpoint)
        {
            tracing::debug!(employee_id, endpoint = %subscription.endpoint, "subscription already registered");
            return Ok(Registration::AlreadyPresent);
        }

        let endpoint = subscription.endpoint.clone();
        subscriptions.push(subscription);
        let count = subscriptions.len();
        self.store
            .update_employee(
                employee_id,
                EmployeeUpdate {
                    push_subscriptions: Some(subscriptions),
                    ..EmployeeUpdate::default()
                },
            )
            .await
            .map_err(|err| RegistryError::Store(err.to_string()))?;
        tracing::info!(employee_id, %endpoint, subscriptions = count, "registered push subscription");
        Ok(Registration::Added)
    }

    /// Subscriptions to deliver to. Unknown employees and lookup failures
    /// yield an empty list.
    pub async fn list(&self, employee_id: &str) -> Vec<Subscription> {
        match self.store.find_employee(employee_id).await {
            Ok(Some(employee)) => employee_subscriptions(&employee),
            Ok(None) => {
                tracing::debug!(employee_id, "no such employee; nothing to deliver");
                Vec::new()
            }
            Err(err) => {
                tracing::warn!(employee_id, error = %err, "failed to read push subscriptions");
                Vec::new()
            }
        }
    }

    /// Drops the subscription with `endpoint`. Returns whether anything was
    /// removed.
    pub async fn remove_by_endpoint(
        &self,
        employee_id: &str,
        endpoint: &str,
    ) -> Result<bool, RegistryError> {
        let lock = self.lock_for(employee_id);
        let result = {
            let _guard = lock.lock().await;
            self.remove_locked(employee_id, endpoint).await
        };
        self.release(employee_id, lock);
        result
    }

    async fn remove_locked(&self, employee_id: &str, endpoint: &str) -> Result<bool, RegistryError> {
        let employee = self.find(employee_id).await?;
        let mut subscriptions = employee_subscriptions(&employee);
        let before = subscriptions.len();
        subscriptions.retain(|subscription| subscription.endpoint != endpoint);
        if subscriptions.len() == before {
            return Ok(false);
        }
        self.store
            .update_employee(
                employee_id,
                EmployeeUpdate {
                    push_subscriptions: Some(subscriptions),
                    ..EmployeeUpdate::default()
                },
            )
            .await
            .map_err(|err| RegistryError::Store(err.to_string()))?;
        tracing::info!(employee_id, endpoint, "removed push subscription");
        Ok(true)
    }

    async fn find(&self, employee_id: &str) -> Result<Employee, RegistryError> {
        self.store
            .find_employee(employee_id)
            .await
            .map_err(|err| RegistryError::Store(err.to_string()))?
            .ok_or_else(|| RegistryError::NotFound(employee_id.to_string()))
    }

    fn lock_for(&self, employee_id: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.locks.lock().expect("registry locks lock");
        Arc::clone(locks.entry(employee_id.to_string()).or_default())
    }

    fn release(&self, employee_id: &str, lock: Arc<tokio::sync::Mutex<()>>) {
        let mut locks = self.locks.lock().expect("registry locks lock");
        // Only the map and this caller hold it: nobody else is waiting.
        if Arc::strong_count(&lock) == 2 {
            locks.remove(employee_id);
        }
    }
}
