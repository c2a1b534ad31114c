//! Async watcher workers: one per log source, no shared mutable state.

use std::sync::Arc;
use std::time::Duration;

use sentinel_core::{LineMirror, ServerSlot};
use sentinel_triggers::Dispatcher;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::ansi::clean_line;
use crate::error::WatchError;
use crate::source::LogSource;
use crate::tail::LogTail;

/// EOF back-off between polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Receives every cleaned, non-empty line with the slot of its source.
/// Called on the blocking pool; may block.
pub trait LineHandler: Send + Sync + 'static {
    fn on_line(&self, line: &str, slot: ServerSlot);
}

impl LineHandler for Dispatcher {
    fn on_line(&self, line: &str, slot: ServerSlot) {
        let report = self.handle(line, slot);
        if report.matched() > 0 {
            debug!(%slot, fired = ?report.fired, failed = report.failed.len(), "line dispatched");
        }
    }
}

/// Copies every line to a [`LineMirror`] before handing it on. Mirror
/// failures are logged and never reach the inner handler.
pub struct Mirrored<H> {
    inner: H,
    mirror: Arc<dyn LineMirror>,
}

impl<H: LineHandler> Mirrored<H> {
    pub fn new(inner: H, mirror: Arc<dyn LineMirror>) -> Self {
        Self { inner, mirror }
    }
}

impl<H: LineHandler> LineHandler for Mirrored<H> {
    fn on_line(&self, line: &str, slot: ServerSlot) {
        if let Err(e) = self.mirror.mirror_line(slot, line) {
            warn!(%slot, error = %e, "mirroring log line failed");
        }
        self.inner.on_line(line, slot);
    }
}

/// Tail one source until a read fails. Never returns `Ok` on its own.
pub async fn watch_source<H: LineHandler>(
    source: LogSource,
    handler: Arc<H>,
    poll: Duration,
) -> Result<(), WatchError> {
    let LogSource { path, slot } = source;

    let open_path = path.clone();
    let mut tail = tokio::task::spawn_blocking(move || LogTail::open(&open_path))
        .await?
        .map_err(|source| WatchError::Open {
            path: path.clone(),
            source,
        })?;
    info!(path = %path.display(), %slot, "watching log file");

    loop {
        let (returned, polled) = tokio::task::spawn_blocking(move || {
            let polled = tail.poll_lines();
            (tail, polled)
        })
        .await?;
        tail = returned;

        let lines = polled.map_err(|source| WatchError::Read {
            path: path.clone(),
            source,
        })?;
        if lines.is_empty() {
            tokio::time::sleep(poll).await;
            continue;
        }

        let handler = Arc::clone(&handler);
        tokio::task::spawn_blocking(move || {
            for raw in lines {
                let line = clean_line(&raw);
                if !line.is_empty() {
                    handler.on_line(&line, slot);
                }
            }
        })
        .await?;
    }
}

/// Start one worker per source and wait for all of them to exit.
/// Returns the sources whose worker stopped, with the reason.
pub async fn watch_all<H: LineHandler>(
    sources: Vec<LogSource>,
    handler: Arc<H>,
    poll: Duration,
) -> Vec<(LogSource, WatchError)> {
    let mut workers = JoinSet::new();
    for source in sources {
        let handler = Arc::clone(&handler);
        workers.spawn(async move {
            let result = watch_source(source.clone(), handler, poll).await;
            (source, result)
        });
    }

    let mut failures = Vec::new();
    while let Some(joined) = workers.join_next().await {
        match joined {
            Ok((source, Err(e))) => {
                error!(path = %source.path.display(), slot = %source.slot, error = %e, "log watcher stopped");
                failures.push((source, e));
            }
            Ok((source, Ok(()))) => {
                info!(path = %source.path.display(), "log watcher finished");
            }
            Err(e) => error!(error = %e, "log watcher task panicked or was cancelled"),
        }
    }
    failures
}
