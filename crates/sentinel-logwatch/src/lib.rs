//! sentinel-logwatch: Log Stream Watcher.
//!
//! Discovers `*.log` files, resolves each to a server slot by its trailing
//! numeral, and tails every resolved file on its own worker, handing each
//! cleaned line to a [`LineHandler`] in file order.

pub mod ansi;
pub mod error;
pub mod source;
pub mod tail;
pub mod worker;

pub use ansi::{clean_line, strip_ansi};
pub use error::WatchError;
pub use source::{Discovery, LogSource, discover, role_tag};
pub use tail::LogTail;
pub use worker::{DEFAULT_POLL_INTERVAL, LineHandler, Mirrored, watch_all, watch_source};
