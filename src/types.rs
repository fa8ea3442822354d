pub mod employee;
pub mod notification;
pub mod push;
