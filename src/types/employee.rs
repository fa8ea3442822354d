use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::types::push::Subscription;

const MANAGER: &str = "Manager";

/// Employee category. `Manager` is the only distinguished value; every other
/// role is an individual contributor and keeps its stored label.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum RoleType {
    Manager,
    Contributor(String),
}

impl RoleType {
    pub fn as_str(&self) -> &str {
        match self {
            RoleType::Manager => MANAGER,
            RoleType::Contributor(label) => label,
        }
    }
}

impl From<String> for RoleType {
    fn from(value: String) -> Self {
        if value.trim().eq_ignore_ascii_case(MANAGER) {
            RoleType::Manager
        } else {
            RoleType::Contributor(value)
        }
    }
}

impl From<&str> for RoleType {
    fn from(value: &str) -> Self {
        RoleType::from(value.to_string())
    }
}

impl From<RoleType> for String {
    fn from(value: RoleType) -> Self {
        match value {
            RoleType::Manager => MANAGER.to_string(),
            RoleType::Contributor(label) => label,
        }
    }
}

impl std::fmt::Display for RoleType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The slice of an employee row the notification core reads and writes.
///
/// `push_subscriptions` keeps whatever shape the store holds; use
/// [`crate::push::parse_subscriptions`] to get a typed list out of it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Employee {
    pub employee_id: String,
    pub role_type: RoleType,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub last_login: Option<OffsetDateTime>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub updated_at: Option<OffsetDateTime>,
    #[serde(default)]
    pub push_subscriptions: serde_json::Value,
}

impl Employee {
    pub fn new(employee_id: impl Into<String>, role_type: impl Into<RoleType>) -> Self {
        Self {
            employee_id: employee_id.into(),
            role_type: role_type.into(),
            last_login: None,
            updated_at: None,
            push_subscriptions: serde_json::Value::Null,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EmployeeFilter {
    All,
    ExcludingRole(RoleType),
}

impl EmployeeFilter {
    pub fn matches(&self, employee: &Employee) -> bool {
        match self {
            EmployeeFilter::All => true,
            EmployeeFilter::ExcludingRole(role) => employee.role_type != *role,
        }
    }
}

/// Field-level update; `None` leaves the stored value untouched.
#[derive(Debug, Clone, Default)]
pub struct EmployeeUpdate {
    pub last_login: Option<OffsetDateTime>,
    pub updated_at: Option<OffsetDateTime>,
    pub push_subscriptions: Option<Vec<Subscription>>,
}
