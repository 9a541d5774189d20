mod output;
mod size;

use std::fs::File;
use std::io::{self, Write};
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use color_eyre::Result;
use color_eyre::eyre::WrapErr;
use dirsum_core::{AggregateConfig, Aggregator, SizeMode};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use size::{format_count, format_size};

/// DIRSUM - where did my disk space go?
#[derive(Parser, Debug)]
#[command(name = "dirsum")]
#[command(about = "Report which directories use the most space, ranked by size")]
#[command(version)]
struct Args {
    /// Directory to analyze
    path: PathBuf,

    /// Write every result to this CSV file
    #[arg(short, long)]
    outfile: Option<PathBuf>,

    /// Depth up to which subdirectories are scanned in parallel
    #[arg(short = 'd', long, default_value_t = 3)]
    async_depth: usize,

    /// Report directories this many levels below the root's children
    #[arg(short, long, default_value_t = 0)]
    report_depth: usize,

    /// Number of results to print
    #[arg(short, long, default_value_t = 20)]
    count: usize,

    /// Result buffer size hint (0 = number of CPUs)
    #[arg(short = 'j', long, default_value_t = 0)]
    workers: usize,

    /// Measure allocated disk usage instead of apparent file size
    #[arg(long)]
    disk_usage: bool,

    /// Give up waiting for results after this many seconds
    #[arg(long)]
    timeout: Option<u64>,

    /// Log verbosely
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    fn aggregate_config(&self) -> AggregateConfig {
        AggregateConfig {
            report_depth: self.report_depth,
            async_depth: self.async_depth,
            worker_hint: self.workers,
            size_mode: if self.disk_usage {
                SizeMode::OnDisk
            } else {
                SizeMode::Apparent
            },
            timeout: self.timeout.map(Duration::from_secs),
        }
    }
}

fn main() -> Result<()> {
    color_eyre::install()?;

    let args = Args::parse();
    init_logging(args.verbose);

    run(&args)
}

fn run(args: &Args) -> Result<()> {
    let config = args.aggregate_config();
    debug!(
        path = %args.path.display(),
        async_depth = config.async_depth,
        report_depth = config.report_depth,
        channel_capacity = config.channel_capacity(),
        "configuration"
    );

    let report = Aggregator::new(config)
        .run(&args.path)
        .wrap_err_with(|| format!("Failed to analyze {}", args.path.display()))?;

    if !report.is_complete() {
        warn!(
            "Only {} of {} directories reported; results are partial",
            report.aggregates.len(),
            report.expected
        );
    }
    info!(
        "Analyzed {} directories ({}) in {:.2}s",
        format_count(report.aggregates.len() as u64),
        format_size(report.total_bytes()),
        report.elapsed.as_secs_f64()
    );

    let mut results = report.into_aggregates();
    output::rank(&mut results);

    let stdout = io::stdout();
    let mut out = stdout.lock();
    output::write_ranked(&mut out, &results, args.count)?;
    out.flush()?;

    if let Some(outfile) = &args.outfile {
        let file = File::create(outfile)
            .wrap_err_with(|| format!("Failed to create {}", outfile.display()))?;
        output::write_csv(file, &results)
            .wrap_err_with(|| format!("Failed to write {}", outfile.display()))?;
        info!("Results written to {}", outfile.display());
    }

    Ok(())
}

fn init_logging(verbose: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("dirsum=debug,dirsum_core=debug,warn")
        } else {
            EnvFilter::new("dirsum=info,dirsum_core=info,warn")
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .init();
}
