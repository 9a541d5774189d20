pub mod aggregate;
pub mod config;
pub mod error;
pub mod scanner;

pub use aggregate::DirectoryAggregate;
pub use config::{AggregateConfig, SizeMode};
pub use error::{DirsumError, Result};
pub use scanner::{AggregateReport, Aggregator, aggregate, is_reportable, target_paths};
