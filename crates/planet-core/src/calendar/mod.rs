//! Calendar views and event mutations

pub mod layout;
mod service;

pub use layout::{completion_by_day, month_layout};
pub use service::CalendarService;
