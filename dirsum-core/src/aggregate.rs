use std::fmt;
use std::path::{Path, PathBuf};

/// Recursive byte and file totals for one directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryAggregate {
    path: PathBuf,
    total_bytes: u64,
    file_count: u64,
}

impl DirectoryAggregate {
    pub fn new(path: PathBuf, total_bytes: u64, file_count: u64) -> Self {
        Self {
            path,
            total_bytes,
            file_count,
        }
    }

    /// Aggregate of a directory holding no files
    pub fn empty(path: PathBuf) -> Self {
        Self::new(path, 0, 0)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn total_bytes(&self) -> u64 {
        self.total_bytes
    }

    pub fn file_count(&self) -> u64 {
        self.file_count
    }
}

impl fmt::Display for DirectoryAggregate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} bytes, {} files",
            self.path.display(),
            self.total_bytes,
            self.file_count
        )
    }
}

/// Running totals for a directory whose traversal is still in flight
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Totals {
    pub bytes: u64,
    pub files: u64,
}

impl Totals {
    pub fn add_file(&mut self, size: u64) {
        self.bytes += size;
        self.files += 1;
    }

    pub fn merge(&mut self, child: &DirectoryAggregate) {
        self.bytes += child.total_bytes;
        self.files += child.file_count;
    }

    pub fn finish(self, path: PathBuf) -> DirectoryAggregate {
        DirectoryAggregate::new(path, self.bytes, self.files)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let agg = DirectoryAggregate::new(PathBuf::from("/test/path"), 1024, 5);
        assert_eq!(agg.to_string(), "/test/path: 1024 bytes, 5 files");

        let empty = DirectoryAggregate::empty(PathBuf::from("/empty"));
        assert_eq!(empty.to_string(), "/empty: 0 bytes, 0 files");
    }

    #[test]
    fn test_merge_order_independent() {
        let children = [
            DirectoryAggregate::new(PathBuf::from("a"), 100, 1),
            DirectoryAggregate::new(PathBuf::from("b"), 250, 3),
            DirectoryAggregate::new(PathBuf::from("c"), 0, 0),
        ];

        let mut forward = Totals::default();
        forward.add_file(7);
        for child in &children {
            forward.merge(child);
        }

        let mut backward = Totals::default();
        for child in children.iter().rev() {
            backward.merge(child);
        }
        backward.add_file(7);

        assert_eq!(forward, backward);
        let agg = forward.finish(PathBuf::from("root"));
        assert_eq!(agg.total_bytes(), 357);
        assert_eq!(agg.file_count(), 5);
    }
}
