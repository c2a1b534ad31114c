//! JSON-file state store: slot assignment plus server records.
//!
//! ```json
//! {
//!   "slots": { "primary": 1, "secondary": 2 },
//!   "servers": [ { "id": 1, "name": "Alpha", "game": "Minecraft", ... } ]
//! }
//! ```
//!
//! The file is owned by operators as much as by this process, so every
//! read goes to disk.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use sentinel_core::{CollabError, DesiredStateSource, ServerRecord, ServerSlot};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateFile {
    #[serde(default)]
    pub slots: BTreeMap<ServerSlot, i64>,
    #[serde(default)]
    pub servers: Vec<ServerRecord>,
}

impl StateFile {
    fn server(&self, id: i64) -> Result<&ServerRecord, CollabError> {
        self.servers
            .iter()
            .find(|s| s.id == id)
            .ok_or(CollabError::UnknownServerId(id))
    }
}

#[derive(Debug, Clone)]
pub struct JsonStateStore {
    path: PathBuf,
}

impl JsonStateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<StateFile, CollabError> {
        let text = fs::read_to_string(&self.path)?;
        serde_json::from_str(&text).map_err(|e| {
            CollabError::failed("state store", format!("{}: {e}", self.path.display()))
        })
    }

    /// Point `slot` at the server named `server_name`. Returns the record.
    pub fn assign(&self, slot: ServerSlot, server_name: &str) -> Result<ServerRecord, CollabError> {
        let mut state = self.load()?;
        let record = state
            .servers
            .iter()
            .find(|s| s.name == server_name)
            .cloned()
            .ok_or_else(|| CollabError::UnknownServer(server_name.to_string()))?;
        state.slots.insert(slot, record.id);
        self.save(&state)?;
        Ok(record)
    }

    /// Write through a sibling temp file so readers never see a partial file.
    fn save(&self, state: &StateFile) -> Result<(), CollabError> {
        let text = serde_json::to_string_pretty(state)
            .map_err(|e| CollabError::failed("state store", e.to_string()))?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, text + "\n")?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl DesiredStateSource for JsonStateStore {
    fn declared_server(&self, slot: ServerSlot) -> Result<ServerRecord, CollabError> {
        let state = self.load()?;
        let id = *state.slots.get(&slot).ok_or(CollabError::SlotUnassigned(slot))?;
        state.server(id).cloned()
    }

    fn is_declared(&self, server_id: i64) -> Result<bool, CollabError> {
        Ok(self.load()?.slots.values().any(|id| *id == server_id))
    }

    fn server_by_name(&self, name: &str) -> Result<ServerRecord, CollabError> {
        self.load()?
            .servers
            .into_iter()
            .find(|s| s.name == name)
            .ok_or_else(|| CollabError::UnknownServer(name.to_string()))
    }
}
