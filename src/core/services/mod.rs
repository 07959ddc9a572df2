pub mod summary_service;

pub use summary_service::{CategoryShare, MonthTotals, SummaryService};
