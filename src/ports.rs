pub mod push;
pub mod store;
pub mod time;

pub use push::PushSender;
pub use store::EmployeeStore;
pub use time::TimeProvider;
