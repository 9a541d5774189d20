use std::io::{self, Write};

use dirsum_core::DirectoryAggregate;

use crate::size::format_size;

/// Sort largest first; equal sizes fall back to path order
pub fn rank(results: &mut [DirectoryAggregate]) {
    results.sort_by(|a, b| {
        b.total_bytes()
            .cmp(&a.total_bytes())
            .then_with(|| a.path().cmp(b.path()))
    });
}

/// Write the first `limit` results as `path,size,count` lines
pub fn write_ranked<W: Write>(
    out: &mut W,
    results: &[DirectoryAggregate],
    limit: usize,
) -> io::Result<()> {
    for result in results.iter().take(limit) {
        writeln!(
            out,
            "{},{},{}",
            result.path().display(),
            format_size(result.total_bytes()),
            result.file_count()
        )?;
    }
    Ok(())
}

/// Write every result as CSV records with raw byte counts
pub fn write_csv<W: Write>(writer: W, results: &[DirectoryAggregate]) -> csv::Result<()> {
    let mut csv = csv::Writer::from_writer(writer);
    csv.write_record(["Path", "Size", "FileCount"])?;

    for result in results {
        let path = result.path().to_string_lossy();
        let size = result.total_bytes().to_string();
        let count = result.file_count().to_string();
        csv.write_record([&*path, size.as_str(), count.as_str()])?;
    }

    csv.flush()?;
    Ok(())
}
