//! Error types for the tmux backend.

use sentinel_core::CollabError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TmuxError {
    /// The targeted tmux server is not running. It has no sessions.
    #[error("no tmux server on {socket}")]
    NoServer { socket: String },

    #[error("tmux binary {0:?} not found")]
    NotFound(String),

    #[error("tmux {command} failed ({status}): {stderr}")]
    CommandFailed {
        command: String,
        status: String,
        stderr: String,
    },

    #[error("tmux io error: {0}")]
    Io(#[from] std::io::Error),
}

impl TmuxError {
    pub fn is_no_server(&self) -> bool {
        matches!(self, Self::NoServer { .. })
    }
}

impl From<TmuxError> for CollabError {
    fn from(err: TmuxError) -> Self {
        match err {
            TmuxError::Io(e) => CollabError::Io(e),
            other => CollabError::failed("tmux", other.to_string()),
        }
    }
}
