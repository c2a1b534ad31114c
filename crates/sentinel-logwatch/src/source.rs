//! Log source discovery and role-tag resolution.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use sentinel_core::ServerSlot;
use tracing::warn;

/// One monitored file and the slot its lines belong to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogSource {
    pub path: PathBuf,
    pub slot: ServerSlot,
}

impl LogSource {
    /// Resolve `path` to a source; `None` when its name carries no known role tag.
    pub fn from_path(path: impl Into<PathBuf>) -> Option<Self> {
        let path = path.into();
        let slot = role_tag(&path)?;
        Some(Self { path, slot })
    }
}

/// Slot named by the trailing numeral of a `.log` file name:
/// `1.log` is primary, `2.log` secondary, `3.log` partner.
pub fn role_tag(path: &Path) -> Option<ServerSlot> {
    if path.extension()? != "log" {
        return None;
    }
    let digit = path.file_stem()?.to_str()?.chars().last()?.to_digit(10)?;
    ServerSlot::from_session_id(u8::try_from(digit).ok()?)
}

/// Result of scanning a log directory.
#[derive(Debug, Default)]
pub struct Discovery {
    /// Resolved sources, sorted by path.
    pub sources: Vec<LogSource>,
    /// `.log` files whose role tag did not resolve; never watched.
    pub skipped: Vec<PathBuf>,
}

/// Scan `dir` (non-recursively) for `*.log` files.
pub fn discover(dir: &Path) -> io::Result<Discovery> {
    let mut paths = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let path = entry.path();
        if path.extension().is_some_and(|ext| ext == "log") {
            paths.push(path);
        }
    }
    paths.sort();

    let mut discovery = Discovery::default();
    for path in paths {
        match LogSource::from_path(path.clone()) {
            Some(source) => discovery.sources.push(source),
            None => {
                warn!(path = %path.display(), "cannot resolve a server slot from log file name, not watching");
                discovery.skipped.push(path);
            }
        }
    }
    Ok(discovery)
}
