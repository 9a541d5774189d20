mod enumerate;
mod report;
mod walker;

pub use enumerate::{is_reportable, target_paths};
pub use report::AggregateReport;
pub use walker::{Aggregator, aggregate};
