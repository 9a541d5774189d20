// Run with: cargo run -p dirsum-core --example debug_scan -- /path/to/scan [report_depth]
// Times one aggregation per async depth so the parallel cutoff can be tuned.

use dirsum_core::{AggregateConfig, Aggregator};
use std::path::PathBuf;

fn main() {
    let mut args = std::env::args().skip(1);
    let path = args
        .next()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."));
    let report_depth = args.next().and_then(|d| d.parse().ok()).unwrap_or(0);

    println!("Scanning: {:?} (report depth {})", path, report_depth);

    let mut baseline: Option<Vec<(PathBuf, u64, u64)>> = None;
    for async_depth in [0, 1, 2, 3, 5] {
        let config = AggregateConfig {
            report_depth,
            async_depth,
            ..Default::default()
        };

        let report = match Aggregator::new(config).run(&path) {
            Ok(r) => r,
            Err(e) => {
                println!("ERROR: {}", e);
                return;
            }
        };

        println!(
            "[async_depth={}] {:>6.3}s dirs={:<6} bytes={:<14} complete={}",
            async_depth,
            report.elapsed.as_secs_f64(),
            report.aggregates.len(),
            report.total_bytes(),
            report.is_complete()
        );

        let mut rows: Vec<_> = report
            .aggregates
            .iter()
            .map(|a| (a.path().to_path_buf(), a.total_bytes(), a.file_count()))
            .collect();
        rows.sort();

        match &baseline {
            Some(base) if *base != rows => println!("  MISMATCH against async_depth=0"),
            Some(_) => {}
            None => baseline = Some(rows),
        }
    }
}
