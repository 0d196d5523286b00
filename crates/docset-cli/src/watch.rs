//! `docset watch`: re-scan on every change and print each new report.
//!
//! Each scan runs on its own thread with a generation number. A change that
//! arrives mid-scan cancels it, and the cell only accepts reports at least as
//! new as the one it holds.

use std::io::{self, Write};
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use docset_core::Schema;
use docset_graph::{check_cancellable, CancelToken, CheckOptions, ReportCell, ReportFormat};
use docset_vault::VaultWatcher;

use crate::ScanArgs;

/// Quiet period that closes a burst of file events.
const DEBOUNCE: Duration = Duration::from_millis(200);

/// How long to block waiting for the first event of a burst.
const POLL: Duration = Duration::from_secs(1);

struct Scan {
    cancel: CancelToken,
    handle: JoinHandle<()>,
}

pub fn run(scan: &ScanArgs, format: ReportFormat) -> Result<ExitCode> {
    let schema = Arc::new(crate::load_schema(scan)?);
    let root = scan.root.clone();
    if !root.is_dir() {
        anyhow::bail!("{} is not a directory", root.display());
    }

    let watcher = VaultWatcher::start(&root, schema.extensions())
        .with_context(|| format!("failed to watch {}", root.display()))?;
    let cell = Arc::new(ReportCell::new());
    let options = scan.options();

    info!(root = %root.display(), "watching for changes");

    let mut generation = 0u64;
    let mut in_flight = Some(spawn_scan(generation, &root, &schema, &options, &cell, format));

    loop {
        let Some(first) = watcher.recv_timeout(POLL) else {
            if in_flight.as_ref().is_some_and(|s| s.handle.is_finished()) {
                reap(in_flight.take());
            }
            continue;
        };
        let burst = 1 + watcher.drain(DEBOUNCE).len();
        debug!(path = %first.path().display(), events = burst, "change detected");

        if let Some(previous) = in_flight.take() {
            previous.cancel.cancel();
            reap(Some(previous));
        }

        generation += 1;
        in_flight = Some(spawn_scan(generation, &root, &schema, &options, &cell, format));
    }
}

fn spawn_scan(
    generation: u64,
    root: &Path,
    schema: &Arc<Schema>,
    options: &CheckOptions,
    cell: &Arc<ReportCell>,
    format: ReportFormat,
) -> Scan {
    let cancel = CancelToken::new();
    let token = cancel.clone();
    let root = root.to_path_buf();
    let schema = Arc::clone(schema);
    let options = options.clone();
    let cell = Arc::clone(cell);

    let handle = thread::spawn(move || {
        let inputs = match docset_vault::discover(&root, schema.extensions()) {
            Ok(inputs) => inputs,
            Err(e) => {
                warn!(error = %e, "scan skipped");
                return;
            }
        };
        let Some(report) = check_cancellable(&inputs, &schema, &options, &token) else {
            debug!(generation, "scan cancelled");
            return;
        };

        // Hold stdout across publish so reports print in generation order.
        let mut out = io::stdout().lock();
        if let Some(report) = cell.publish(generation, report) {
            if let Err(e) = out
                .write_all(report.render(format).as_bytes())
                .and_then(|()| out.flush())
            {
                warn!(error = %e, "failed to write report");
            }
        }
    });

    Scan { cancel, handle }
}

fn reap(scan: Option<Scan>) {
    if let Some(scan) = scan {
        if scan.handle.join().is_err() {
            warn!("scan thread panicked");
        }
    }
}
