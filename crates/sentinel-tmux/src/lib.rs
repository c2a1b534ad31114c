//! sentinel-tmux: tmux IO boundary.
//! Subprocess execution plus the session-level operations the reconciler
//! and trigger actions need (list, start, stop, send keys). No business
//! logic: which sessions *should* run is decided elsewhere.

pub mod error;
pub mod executor;
pub mod sessions;

pub use error::TmuxError;
pub use executor::{TmuxCommandRunner, TmuxExecutor, TmuxSocket, is_no_server_message};
pub use sessions::{
    LIST_SESSIONS_FORMAT, TmuxSessions, launch_command, list_sessions, parse_list_sessions_output,
};
