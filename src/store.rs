use crate::error::StoreError;
use crate::ports::EmployeeStore;
use crate::types::employee::{Employee, EmployeeFilter, EmployeeUpdate};

use std::collections::BTreeMap;
use std::future::{Ready, ready};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Employee store kept in memory, optionally mirrored to a JSON file holding
/// an array of employee rows. Every successful update rewrites the file.
#[derive(Debug, Clone, Default)]
pub struct JsonEmployeeStore {
    employees: Arc<Mutex<BTreeMap<String, Employee>>>,
    path: Option<Arc<PathBuf>>,
}

impl JsonEmployeeStore {
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Loads `path` if it exists; a missing file yields an empty store that
    /// will be created on the first write.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let employees = match std::fs::read(path) {
            Ok(bytes) => {
                let rows: Vec<Employee> = serde_json::from_slice(&bytes)?;
                rows.into_iter()
                    .map(|employee| (employee.employee_id.clone(), employee))
                    .collect()
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(err) => return Err(err.into()),
        };
        tracing::info!(
            path = %path.display(),
            employees = employees.len(),
            "loaded employee store"
        );
        Ok(Self {
            employees: Arc::new(Mutex::new(employees)),
            path: Some(Arc::new(path.to_path_buf())),
        })
    }

    pub fn insert(&self, employee: Employee) {
        let mut guard = self.employees.lock().expect("employee store lock");
        guard.insert(employee.employee_id.clone(), employee);
    }

    pub fn get(&self, employee_id: &str) -> Option<Employee> {
        let guard = self.employees.lock().expect("employee store lock");
        guard.get(employee_id).cloned()
    }

    fn list(&self, filter: &EmployeeFilter) -> Vec<Employee> {
        let guard = self.employees.lock().expect("employee store lock");
        guard
            .values()
            .filter(|employee| filter.matches(employee))
            .cloned()
            .collect()
    }

    /// The in-memory row only changes once the file write has succeeded.
    fn update(&self, employee_id: &str, update: EmployeeUpdate) -> Result<(), StoreError> {
        let mut guard = self.employees.lock().expect("employee store lock");
        let mut employee = guard
            .get(employee_id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(employee_id.to_string()))?;
        if let Some(last_login) = update.last_login {
            employee.last_login = Some(last_login);
        }
        if let Some(updated_at) = update.updated_at {
            employee.updated_at = Some(updated_at);
        }
        if let Some(subscriptions) = update.push_subscriptions {
            employee.push_subscriptions = serde_json::to_value(subscriptions)?;
        }

        if self.path.is_some() {
            let mut staged = guard.clone();
            staged.insert(employee_id.to_string(), employee.clone());
            self.persist(&staged)?;
        }
        guard.insert(employee_id.to_string(), employee);
        Ok(())
    }

    fn persist(&self, employees: &BTreeMap<String, Employee>) -> Result<(), StoreError> {
        let Some(path) = self.path.as_deref() else {
            return Ok(());
        };
        let rows: Vec<&Employee> = employees.values().collect();
        let bytes = serde_json::to_vec_pretty(&rows)?;
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, bytes)?;
        std::fs::rename(&tmp, path)?;
        Ok(())
    }
}

impl EmployeeStore for JsonEmployeeStore {
    type Error = StoreError;
    type FindFut<'a>
        = Ready<Result<Option<Employee>, StoreError>>
    where
        Self: 'a;
    type ListFut<'a>
        = Ready<Result<Vec<Employee>, StoreError>>
    where
        Self: 'a;
    type UpdateFut<'a>
        = Ready<Result<(), StoreError>>
    where
        Self: 'a;

    fn find_employee<'a>(&'a self, employee_id: &'a str) -> Self::FindFut<'a> {
        ready(Ok(self.get(employee_id)))
    }

    fn list_employees<'a>(&'a self, filter: &'a EmployeeFilter) -> Self::ListFut<'a> {
        ready(Ok(self.list(filter)))
    }

    fn update_employee<'a>(
        &'a self,
        employee_id: &'a str,
        update: EmployeeUpdate,
    ) -> Self::UpdateFut<'a> {
        ready(self.update(employee_id, update))
    }
}
