//! Collaborator interfaces consumed by the watcher, dispatch engine and
//! reconciler. Implementations live at the edges (tmux crate, runtime
//! binary) or in tests.
//!
//! Every method is synchronous and may block; async callers run them on
//! the blocking pool.

use std::sync::Arc;

use thiserror::Error;

use crate::types::{Notice, ServerRecord, ServerSlot};

#[derive(Debug, Error)]
pub enum CollabError {
    #[error("unknown slot: {0}")]
    UnknownSlot(String),

    #[error("no server assigned to the {0} slot")]
    SlotUnassigned(ServerSlot),

    #[error("no server record named {0:?}")]
    UnknownServer(String),

    #[error("no server record with id {0}")]
    UnknownServerId(i64),

    #[error("session {0:?} is already running")]
    AlreadyRunning(String),

    #[error("session {0:?} is not running")]
    NotRunning(String),

    #[error("{collaborator}: {detail}")]
    Failed {
        collaborator: &'static str,
        detail: String,
    },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl CollabError {
    pub fn failed(collaborator: &'static str, detail: impl Into<String>) -> Self {
        Self::Failed {
            collaborator,
            detail: detail.into(),
        }
    }
}

// ─── Session Inspector ───────────────────────────────────────────

/// Host session multiplexer: lists, starts and stops named sessions.
pub trait SessionInspector: Send + Sync {
    fn list_active_sessions(&self) -> Result<Vec<String>, CollabError>;

    /// Launch `server` under the fixed session identity of `slot`.
    fn start_session(&self, slot: ServerSlot, server: &ServerRecord) -> Result<(), CollabError>;

    /// Stop the session, escalating to a forced kill after a grace period.
    fn stop_session(&self, name: &str) -> Result<(), CollabError>;

    fn is_session_active(&self, name: &str) -> Result<bool, CollabError>;
}

impl<T: SessionInspector + ?Sized> SessionInspector for &T {
    fn list_active_sessions(&self) -> Result<Vec<String>, CollabError> {
        (**self).list_active_sessions()
    }
    fn start_session(&self, slot: ServerSlot, server: &ServerRecord) -> Result<(), CollabError> {
        (**self).start_session(slot, server)
    }
    fn stop_session(&self, name: &str) -> Result<(), CollabError> {
        (**self).stop_session(name)
    }
    fn is_session_active(&self, name: &str) -> Result<bool, CollabError> {
        (**self).is_session_active(name)
    }
}

impl<T: SessionInspector + ?Sized> SessionInspector for Arc<T> {
    fn list_active_sessions(&self) -> Result<Vec<String>, CollabError> {
        (**self).list_active_sessions()
    }
    fn start_session(&self, slot: ServerSlot, server: &ServerRecord) -> Result<(), CollabError> {
        (**self).start_session(slot, server)
    }
    fn stop_session(&self, name: &str) -> Result<(), CollabError> {
        (**self).stop_session(name)
    }
    fn is_session_active(&self, name: &str) -> Result<bool, CollabError> {
        (**self).is_session_active(name)
    }
}

// ─── Desired-State Source ────────────────────────────────────────

/// Externally owned slot assignment. Implementations must read fresh on
/// every call; callers never cache results across a tick or a log event.
pub trait DesiredStateSource: Send + Sync {
    fn declared_server(&self, slot: ServerSlot) -> Result<ServerRecord, CollabError>;

    /// Whether `server_id` currently occupies any slot.
    fn is_declared(&self, server_id: i64) -> Result<bool, CollabError>;

    fn server_by_name(&self, name: &str) -> Result<ServerRecord, CollabError>;
}

impl<T: DesiredStateSource + ?Sized> DesiredStateSource for &T {
    fn declared_server(&self, slot: ServerSlot) -> Result<ServerRecord, CollabError> {
        (**self).declared_server(slot)
    }
    fn is_declared(&self, server_id: i64) -> Result<bool, CollabError> {
        (**self).is_declared(server_id)
    }
    fn server_by_name(&self, name: &str) -> Result<ServerRecord, CollabError> {
        (**self).server_by_name(name)
    }
}

impl<T: DesiredStateSource + ?Sized> DesiredStateSource for Arc<T> {
    fn declared_server(&self, slot: ServerSlot) -> Result<ServerRecord, CollabError> {
        (**self).declared_server(slot)
    }
    fn is_declared(&self, server_id: i64) -> Result<bool, CollabError> {
        (**self).is_declared(server_id)
    }
    fn server_by_name(&self, name: &str) -> Result<ServerRecord, CollabError> {
        (**self).server_by_name(name)
    }
}

// ─── Outbound side effects ───────────────────────────────────────

/// Outbound chat notifications. Fire-and-forget from the core's view:
/// callers log failures and move on.
pub trait NotificationSink: Send + Sync {
    /// `server` is `None` for fleet-level notices such as reconcile summaries.
    fn notify(&self, server: Option<&ServerRecord>, notice: &Notice) -> Result<(), CollabError>;
}

/// Forwards raw console lines of a slot somewhere readable (a chat channel
/// per slot). Same failure policy as [`NotificationSink`].
pub trait LineMirror: Send + Sync {
    fn mirror_line(&self, slot: ServerSlot, line: &str) -> Result<(), CollabError>;
}

/// Executes a console command inside a running server.
pub trait RemoteConsole: Send + Sync {
    fn send_command(&self, server: &ServerRecord, command: &str) -> Result<(), CollabError>;
}

/// Persistent record of player connections.
pub trait PlayerLedger: Send + Sync {
    fn record_join(&self, server: &ServerRecord, player: &str) -> Result<(), CollabError>;
    fn record_leave(&self, server: &ServerRecord, player: &str) -> Result<(), CollabError>;
}
