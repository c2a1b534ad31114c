//! Append-only JSONL player ledger.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use sentinel_core::{CollabError, PlayerLedger, ServerRecord};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LedgerEvent {
    Join,
    Leave,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub at: DateTime<Utc>,
    pub event: LedgerEvent,
    pub server_id: i64,
    pub server: String,
    pub game: String,
    pub player: String,
}

pub struct JsonlPlayerLedger {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonlPlayerLedger {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    fn append(&self, event: LedgerEvent, server: &ServerRecord, player: &str) -> Result<(), CollabError> {
        let entry = LedgerEntry {
            at: Utc::now(),
            event,
            server_id: server.id,
            server: server.name.clone(),
            game: server.game.clone(),
            player: player.to_string(),
        };
        let mut line = serde_json::to_string(&entry)
            .map_err(|e| CollabError::failed("player ledger", e.to_string()))?;
        line.push('\n');

        let _guard = self
            .write_lock
            .lock()
            .map_err(|_| CollabError::failed("player ledger", "writer lock poisoned"))?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(line.as_bytes())?;
        Ok(())
    }
}

impl PlayerLedger for JsonlPlayerLedger {
    fn record_join(&self, server: &ServerRecord, player: &str) -> Result<(), CollabError> {
        self.append(LedgerEvent::Join, server, player)
    }

    fn record_leave(&self, server: &ServerRecord, player: &str) -> Result<(), CollabError> {
        self.append(LedgerEvent::Leave, server, player)
    }
}

/// Ledger used when no ledger file is configured.
pub struct NoLedger;

impl PlayerLedger for NoLedger {
    fn record_join(&self, _server: &ServerRecord, _player: &str) -> Result<(), CollabError> {
        Ok(())
    }

    fn record_leave(&self, _server: &ServerRecord, _player: &str) -> Result<(), CollabError> {
        Ok(())
    }
}
