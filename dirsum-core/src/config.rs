use std::fs::Metadata;
use std::time::Duration;

#[cfg(unix)]
use std::os::unix::fs::MetadataExt;

/// How a regular file's size is measured
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SizeMode {
    /// Logical file length
    #[default]
    Apparent,
    /// Allocated disk usage (accounts for sparse files and block size)
    OnDisk,
}

impl SizeMode {
    pub fn file_size(self, metadata: &Metadata) -> u64 {
        match self {
            SizeMode::Apparent => metadata.len(),
            SizeMode::OnDisk => disk_usage(metadata),
        }
    }
}

/// st_blocks is in 512-byte units
#[cfg(unix)]
fn disk_usage(metadata: &Metadata) -> u64 {
    metadata.blocks() * 512
}

#[cfg(not(unix))]
fn disk_usage(metadata: &Metadata) -> u64 {
    metadata.len()
}

/// Aggregation configuration
#[derive(Debug, Clone)]
pub struct AggregateConfig {
    /// Directories at `report_depth + 1` below the root are reported
    pub report_depth: usize,
    /// Subdirectories of directories at depth <= this value get their own thread
    pub async_depth: usize,
    /// Capacity of the results channel (0 = number of CPUs)
    pub worker_hint: usize,
    /// File size measurement
    pub size_mode: SizeMode,
    /// Stop waiting for results after this long (None = wait for all)
    pub timeout: Option<Duration>,
}

impl Default for AggregateConfig {
    fn default() -> Self {
        Self {
            report_depth: 0,
            async_depth: 3,
            worker_hint: 0, // auto
            size_mode: SizeMode::Apparent,
            timeout: None,
        }
    }
}

impl AggregateConfig {
    /// Results channel capacity, resolving `worker_hint == 0` to the CPU count
    pub fn channel_capacity(&self) -> usize {
        if self.worker_hint > 0 {
            self.worker_hint
        } else {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        }
    }
}
