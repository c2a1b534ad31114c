use std::path::PathBuf;

use thiserror::Error;

/// Why a single watcher stopped. Fatal to that watcher only.
#[derive(Debug, Error)]
pub enum WatchError {
    #[error("failed to open {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("watcher task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}
