use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender, select};
use tracing::{debug, warn};

use super::enumerate::{enumerate, is_reportable, resolve_root};
use super::report::AggregateReport;
use crate::aggregate::{DirectoryAggregate, Totals};
use crate::config::{AggregateConfig, SizeMode};
use crate::error::{DirsumError, Result};

/// State shared by every traversal task of one run
struct TaskContext {
    report_depth: usize,
    async_depth: usize,
    size_mode: SizeMode,
    /// Reportable aggregates go here
    sink: Sender<DirectoryAggregate>,
}

/// Depth-bounded parallel directory aggregator
pub struct Aggregator {
    config: AggregateConfig,
}

impl Aggregator {
    pub fn new(config: AggregateConfig) -> Self {
        Self { config }
    }

    /// Aggregate every reportable directory under `root`.
    ///
    /// Fails only when `root` itself is unusable. Unreadable subdirectories
    /// are reported as empty and never abort the run.
    pub fn run(&self, root: impl AsRef<Path>) -> Result<AggregateReport> {
        let started = Instant::now();
        let root = resolve_root(root.as_ref())?;

        let expected = enumerate(&root, self.config.report_depth).len();
        debug!(
            root = %root.display(),
            expected,
            async_depth = self.config.async_depth,
            "starting traversal"
        );

        let (tx, rx) = crossbeam_channel::bounded(self.config.channel_capacity());
        let ctx = Arc::new(TaskContext {
            report_depth: self.config.report_depth,
            async_depth: self.config.async_depth,
            size_mode: self.config.size_mode,
            sink: tx,
        });

        // The root thread is detached: if the collector gives up early the
        // remaining tasks finish on their own and their sends simply fail.
        thread::Builder::new()
            .name("dirsum-root".to_string())
            .spawn(move || {
                let total = traverse(&ctx, root, 0);
                debug!(
                    bytes = total.total_bytes(),
                    files = total.file_count(),
                    "traversal finished"
                );
            })?;

        let aggregates = collect(&rx, expected, self.config.timeout);

        let report = AggregateReport {
            aggregates,
            expected,
            elapsed: started.elapsed(),
        };
        debug!(
            expected,
            received = report.aggregates.len(),
            elapsed_secs = report.elapsed.as_secs_f64(),
            "aggregation complete"
        );
        Ok(report)
    }
}

/// Aggregate `root` with `config` and return the reported directories in
/// arbitrary order.
pub fn aggregate(
    root: impl AsRef<Path>,
    config: &AggregateConfig,
) -> Result<Vec<DirectoryAggregate>> {
    Aggregator::new(config.clone())
        .run(root)
        .map(AggregateReport::into_aggregates)
}

/// Receive until `expected` results arrived, every task has finished, or the
/// timeout elapsed.
fn collect(
    rx: &Receiver<DirectoryAggregate>,
    expected: usize,
    timeout: Option<Duration>,
) -> Vec<DirectoryAggregate> {
    let deadline = match timeout {
        Some(t) => crossbeam_channel::after(t),
        None => crossbeam_channel::never(),
    };

    let mut results = Vec::with_capacity(expected);
    while results.len() < expected {
        select! {
            recv(rx) -> msg => match msg {
                Ok(aggregate) => results.push(aggregate),
                Err(_) => {
                    // All senders gone: the tree changed since enumeration
                    warn!(
                        expected,
                        received = results.len(),
                        "traversal ended before every directory reported"
                    );
                    break;
                }
            },
            recv(deadline) -> _ => {
                warn!(
                    expected,
                    received = results.len(),
                    "timed out waiting for results"
                );
                break;
            }
        }
    }
    results
}

/// Spawn a task that aggregates `path` and hands the result to `parent`.
fn spawn_task(
    ctx: Arc<TaskContext>,
    path: PathBuf,
    depth: usize,
    parent: Sender<DirectoryAggregate>,
) -> std::io::Result<()> {
    thread::Builder::new()
        .name(format!("dirsum-d{depth}"))
        .spawn(move || {
            let aggregate = traverse(&ctx, path, depth);
            // The parent only disappears if it panicked
            let _ = parent.send(aggregate);
        })?;
    Ok(())
}

/// Compute the recursive totals of `path`, which sits `depth` levels below
/// the root.
///
/// Subdirectories of a directory at `depth <= async_depth` are traversed on
/// their own threads. Anything deeper is walked on the current thread with
/// an explicit stack, so tree depth never turns into call-stack depth.
fn traverse(ctx: &Arc<TaskContext>, path: PathBuf, depth: usize) -> DirectoryAggregate {
    if depth > ctx.async_depth {
        return walk_sequential(ctx, path, depth);
    }

    let Frame {
        path,
        depth,
        mut totals,
        subdirs,
    } = Frame::open(ctx, path, depth);

    let (child_tx, child_rx) = crossbeam_channel::unbounded();
    let mut pending = 0usize;
    for child in subdirs {
        match spawn_task(Arc::clone(ctx), child.clone(), depth + 1, child_tx.clone()) {
            Ok(()) => pending += 1,
            Err(e) => {
                warn!(path = %child.display(), "cannot spawn task, walking in-line: {e}");
                // Recursion here is bounded by async_depth
                totals.merge(&traverse(ctx, child, depth + 1));
            }
        }
    }

    // Only the children's clones remain, so a dead child cannot hang us
    drop(child_tx);
    let mut received = 0usize;
    for child in child_rx.iter().take(pending) {
        totals.merge(&child);
        received += 1;
    }
    if received < pending {
        warn!(
            path = %path.display(),
            missing = pending - received,
            "subdirectory tasks exited without a result"
        );
    }

    complete(ctx, path, depth, totals)
}

/// Post-order walk of the subtree at `path` on the current thread.
fn walk_sequential(ctx: &TaskContext, path: PathBuf, depth: usize) -> DirectoryAggregate {
    let mut ancestors: Vec<Frame> = Vec::new();
    let mut current = Frame::open(ctx, path, depth);

    loop {
        if let Some(child) = current.subdirs.pop() {
            let child_frame = Frame::open(ctx, child, current.depth + 1);
            ancestors.push(std::mem::replace(&mut current, child_frame));
            continue;
        }

        let aggregate = complete(ctx, current.path, current.depth, current.totals);
        match ancestors.pop() {
            Some(mut parent) => {
                parent.totals.merge(&aggregate);
                current = parent;
            }
            None => return aggregate,
        }
    }
}

/// A listed directory: its own files are already summed, its
/// subdirectories are still to be visited.
struct Frame {
    path: PathBuf,
    depth: usize,
    totals: Totals,
    subdirs: Vec<PathBuf>,
}

impl Frame {
    /// List `path`. An unreadable directory becomes an empty frame.
    fn open(ctx: &TaskContext, path: PathBuf, depth: usize) -> Self {
        let mut totals = Totals::default();
        let mut subdirs = Vec::new();

        match list_dir(&path) {
            Ok(entries) => {
                for entry in entries {
                    let file_type = match entry.file_type() {
                        Ok(t) => t,
                        Err(e) => {
                            debug!(path = %entry.path().display(), "cannot read file type: {e}");
                            continue;
                        }
                    };

                    if file_type.is_dir() {
                        subdirs.push(entry.path());
                    } else if file_type.is_file() {
                        match entry.metadata() {
                            Ok(meta) => totals.add_file(ctx.size_mode.file_size(&meta)),
                            Err(e) => {
                                debug!(path = %entry.path().display(), "cannot stat file: {e}");
                            }
                        }
                    }
                }
            }
            Err(err) => debug!("{err}"),
        }

        Self {
            path,
            depth,
            totals,
            subdirs,
        }
    }
}

/// Seal the totals of a finished directory and report it if it is reportable.
fn complete(ctx: &TaskContext, path: PathBuf, depth: usize, totals: Totals) -> DirectoryAggregate {
    let aggregate = totals.finish(path);
    if is_reportable(depth, ctx.report_depth) {
        // The collector may have stopped listening after a timeout
        let _ = ctx.sink.send(aggregate.clone());
    }
    aggregate
}

/// Read a whole directory listing, releasing the handle before returning.
fn list_dir(path: &Path) -> Result<Vec<fs::DirEntry>> {
    let unreadable = |source| DirsumError::SubtreeUnreadable {
        path: path.to_path_buf(),
        source,
    };

    let mut entries = Vec::new();
    for entry in fs::read_dir(path).map_err(unreadable)? {
        match entry {
            Ok(e) => entries.push(e),
            Err(e) => debug!(path = %path.display(), "skipping unreadable entry: {e}"),
        }
    }
    Ok(entries)
}
