//! In-memory collaborators for unit tests.

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use sentinel_core::{
    CollabError, DesiredStateSource, Notice, NotificationSink, PlayerLedger, RemoteConsole,
    ServerRecord, ServerSlot,
};

use crate::actions::ActionContext;

pub(crate) fn record(id: i64, name: &str, game: &str) -> ServerRecord {
    ServerRecord {
        id,
        name: name.to_string(),
        game: game.to_string(),
        version: String::new(),
        embed_color: "#9adfba".to_string(),
        workdir: PathBuf::from(format!("/srv/{name}")),
        start_script: "start.sh".to_string(),
    }
}

#[derive(Default)]
pub(crate) struct MemoryState {
    slots: Mutex<HashMap<ServerSlot, ServerRecord>>,
}

impl DesiredStateSource for MemoryState {
    fn declared_server(&self, slot: ServerSlot) -> Result<ServerRecord, CollabError> {
        self.slots
            .lock()
            .expect("lock")
            .get(&slot)
            .cloned()
            .ok_or(CollabError::SlotUnassigned(slot))
    }

    fn is_declared(&self, server_id: i64) -> Result<bool, CollabError> {
        Ok(self
            .slots
            .lock()
            .expect("lock")
            .values()
            .any(|r| r.id == server_id))
    }

    fn server_by_name(&self, name: &str) -> Result<ServerRecord, CollabError> {
        self.slots
            .lock()
            .expect("lock")
            .values()
            .find(|r| r.name == name)
            .cloned()
            .ok_or_else(|| CollabError::UnknownServer(name.to_string()))
    }
}

#[derive(Default)]
pub(crate) struct RecordingNotifier {
    sent: Mutex<Vec<(Option<String>, Notice)>>,
    fail: bool,
}

impl RecordingNotifier {
    pub(crate) fn notices(&self) -> Vec<(Option<String>, Notice)> {
        self.sent.lock().expect("lock").clone()
    }
}

impl NotificationSink for RecordingNotifier {
    fn notify(&self, server: Option<&ServerRecord>, notice: &Notice) -> Result<(), CollabError> {
        if self.fail {
            return Err(CollabError::failed("webhook", "503 Service Unavailable"));
        }
        self.sent
            .lock()
            .expect("lock")
            .push((server.map(|s| s.name.clone()), notice.clone()));
        Ok(())
    }
}

#[derive(Default)]
pub(crate) struct RecordingConsole {
    sent: Mutex<Vec<(String, String)>>,
    offline: Mutex<HashSet<String>>,
}

impl RecordingConsole {
    pub(crate) fn commands(&self) -> Vec<(String, String)> {
        self.sent.lock().expect("lock").clone()
    }

    pub(crate) fn set_offline(&self, name: &str) {
        self.offline.lock().expect("lock").insert(name.to_string());
    }
}

impl RemoteConsole for RecordingConsole {
    fn send_command(&self, server: &ServerRecord, command: &str) -> Result<(), CollabError> {
        if self.offline.lock().expect("lock").contains(&server.name) {
            return Err(CollabError::NotRunning(server.name.clone()));
        }
        self.sent
            .lock()
            .expect("lock")
            .push((server.name.clone(), command.to_string()));
        Ok(())
    }
}

#[derive(Default)]
pub(crate) struct RecordingLedger {
    entries: Mutex<Vec<String>>,
}

impl RecordingLedger {
    pub(crate) fn entries(&self) -> Vec<String> {
        self.entries.lock().expect("lock").clone()
    }
}

impl PlayerLedger for RecordingLedger {
    fn record_join(&self, server: &ServerRecord, player: &str) -> Result<(), CollabError> {
        self.entries
            .lock()
            .expect("lock")
            .push(format!("join {} {player}", server.name));
        Ok(())
    }

    fn record_leave(&self, server: &ServerRecord, player: &str) -> Result<(), CollabError> {
        self.entries
            .lock()
            .expect("lock")
            .push(format!("leave {} {player}", server.name));
        Ok(())
    }
}

/// One set of fakes, shared between the test body and the [`ActionContext`].
#[derive(Default)]
pub(crate) struct Fixture {
    pub state: Arc<MemoryState>,
    pub notifier: Arc<RecordingNotifier>,
    pub console: Arc<RecordingConsole>,
    pub ledger: Arc<RecordingLedger>,
}

impl Fixture {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn declare(self, slot: ServerSlot, server: ServerRecord) -> Self {
        self.state.slots.lock().expect("lock").insert(slot, server);
        self
    }

    pub(crate) fn failing_notifier(mut self) -> Self {
        self.notifier = Arc::new(RecordingNotifier {
            fail: true,
            ..RecordingNotifier::default()
        });
        self
    }

    pub(crate) fn ctx(&self) -> ActionContext {
        ActionContext {
            desired: self.state.clone(),
            notifier: self.notifier.clone(),
            console: self.console.clone(),
            ledger: self.ledger.clone(),
        }
    }
}
