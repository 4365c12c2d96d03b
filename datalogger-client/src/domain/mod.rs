pub mod alert;
pub mod daily_summary;
pub mod reading;

pub use alert::{Alert, AlertCode};
pub use daily_summary::DailySummary;
pub use reading::{NewReading, Reading};
