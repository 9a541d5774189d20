use std::time::Duration;

use crate::aggregate::DirectoryAggregate;

/// Outcome of one aggregation run
#[derive(Debug, Clone, Default)]
pub struct AggregateReport {
    /// Reported aggregates in arrival order
    pub aggregates: Vec<DirectoryAggregate>,
    /// Number of reportable directories found before traversal started
    pub expected: usize,
    /// Wall-clock time spent enumerating, traversing and collecting
    pub elapsed: Duration,
}

impl AggregateReport {
    /// False when the run timed out or the tree changed underneath it
    pub fn is_complete(&self) -> bool {
        self.aggregates.len() == self.expected
    }

    pub fn total_bytes(&self) -> u64 {
        self.aggregates.iter().map(|a| a.total_bytes()).sum()
    }

    pub fn into_aggregates(self) -> Vec<DirectoryAggregate> {
        self.aggregates
    }
}
