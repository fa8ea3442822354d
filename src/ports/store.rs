use crate::types::employee::{Employee, EmployeeFilter, EmployeeUpdate};

/// Read/update primitives of the persistent employee store.
pub trait EmployeeStore: Clone + Send + Sync + 'static {
    type Error: std::fmt::Display + Send + Sync + 'static;
    type FindFut<'a>: Future<Output = Result<Option<Employee>, Self::Error>> + Send + 'a
    where
        Self: 'a;
    type ListFut<'a>: Future<Output = Result<Vec<Employee>, Self::Error>> + Send + 'a
    where
        Self: 'a;
    type UpdateFut<'a>: Future<Output = Result<(), Self::Error>> + Send + 'a
    where
        Self: 'a;

    fn find_employee<'a>(&'a self, employee_id: &'a str) -> Self::FindFut<'a>;
    fn list_employees<'a>(&'a self, filter: &'a EmployeeFilter) -> Self::ListFut<'a>;
    fn update_employee<'a>(
        &'a self,
        employee_id: &'a str,
        update: EmployeeUpdate,
    ) -> Self::UpdateFut<'a>;
}
