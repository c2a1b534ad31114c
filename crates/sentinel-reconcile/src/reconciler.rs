use std::collections::BTreeSet;
use std::time::Duration;

use chrono::Utc;
use sentinel_core::{CollabError, DesiredStateSource, ServerRecord, ServerSlot, SessionInspector};
use tracing::{debug, info, warn};

use crate::error::ReconcileError;
use crate::result::{CorrectiveAction, ReconciliationResult, SessionError};

/// Validate the configured tick interval.
pub fn tick_interval(minutes: i64) -> Result<Duration, ReconcileError> {
    match u64::try_from(minutes) {
        Ok(m) if m > 0 => Ok(Duration::from_secs(m * 60)),
        _ => Err(ReconcileError::InvalidInterval(minutes)),
    }
}

/// Diffs active sessions against the declared slots and corrects reality.
/// Holds no state between ticks.
pub struct Reconciler<I, D> {
    inspector: I,
    desired: D,
}

impl<I: SessionInspector, D: DesiredStateSource> Reconciler<I, D> {
    pub fn new(inspector: I, desired: D) -> Self {
        Self { inspector, desired }
    }

    /// Run one tick. Only a failure to read the declared slots aborts it;
    /// every per-session failure lands in the result.
    pub fn reconcile(&self) -> Result<ReconciliationResult, ReconcileError> {
        // 1. Observe reality, then intent.
        let mut running: BTreeSet<String> = match self.inspector.list_active_sessions() {
            Ok(sessions) => sessions.into_iter().collect(),
            Err(e) => {
                warn!(error = %e, "listing sessions failed, treating as no sessions");
                BTreeSet::new()
            }
        };
        let declared = self.declared_slots()?;
        let declared_names: BTreeSet<&str> =
            declared.iter().map(|(_, server)| server.name.as_str()).collect();

        let mut actions = Vec::new();
        let mut errors = Vec::new();

        // 2. Prune. Completes before any start is issued.
        for session in running.clone() {
            match self.should_stop(&session, &declared_names) {
                Ok(false) => {}
                Ok(true) => match self.inspector.stop_session(&session) {
                    Ok(()) => {
                        info!(session = %session, "stopped undeclared session");
                        running.remove(&session);
                        actions.push(CorrectiveAction::stop(&session));
                    }
                    Err(e) => {
                        warn!(session = %session, error = %e, "stopping undeclared session failed");
                        errors.push(session_error(&session, &e));
                    }
                },
                Err(e) => {
                    warn!(session = %session, error = %e, "cannot tell whether session is declared");
                    errors.push(session_error(&session, &e));
                }
            }
        }

        // 3. Restore, in slot order. A server declared in two slots starts once.
        for (slot, server) in &declared {
            if running.contains(&server.name) {
                continue;
            }
            match self.inspector.start_session(*slot, server) {
                Ok(()) => {
                    info!(session = %server.name, %slot, "started declared session");
                    running.insert(server.name.clone());
                    actions.push(CorrectiveAction::start(&server.name, *slot));
                }
                Err(e) => {
                    warn!(session = %server.name, %slot, error = %e, "starting declared session failed");
                    errors.push(session_error(&server.name, &e));
                }
            }
        }

        // 4. Never an empty result.
        if actions.is_empty() {
            actions.push(CorrectiveAction::no_op());
        }

        let open_sessions = match self.inspector.list_active_sessions() {
            Ok(sessions) => Some(sessions),
            Err(e) => {
                debug!(error = %e, "listing sessions for the report failed");
                None
            }
        };

        let result = ReconciliationResult {
            checked_at: Utc::now(),
            actions,
            errors,
            open_sessions,
        };
        info!(
            corrective = result.corrective_count(),
            errors = result.errors.len(),
            "reconcile tick complete"
        );
        Ok(result)
    }

    /// Fresh read of every slot. An unassigned slot is empty; any other
    /// failure aborts the tick.
    fn declared_slots(&self) -> Result<Vec<(ServerSlot, ServerRecord)>, ReconcileError> {
        let mut declared = Vec::with_capacity(ServerSlot::ALL.len());
        for slot in ServerSlot::ALL {
            match self.desired.declared_server(slot) {
                Ok(server) => declared.push((slot, server)),
                Err(CollabError::SlotUnassigned(_)) => debug!(%slot, "slot unassigned"),
                Err(source) => return Err(ReconcileError::DesiredState { slot, source }),
            }
        }
        Ok(declared)
    }

    /// The session name is the server's identity. A session is kept when a
    /// slot in this tick's snapshot declares a server of that name, stopped
    /// when the name belongs only to undeclared records, and left running
    /// (as an error) when no record has that name.
    fn should_stop(&self, session: &str, declared: &BTreeSet<&str>) -> Result<bool, CollabError> {
        if declared.contains(session) {
            return Ok(false);
        }
        self.desired.server_by_name(session)?;
        Ok(true)
    }
}

fn session_error(session: &str, err: &CollabError) -> SessionError {
    SessionError {
        session: session.to_string(),
        message: err.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::{HashMap, HashSet};
    use std::path::PathBuf;
    use std::sync::Mutex;

    use crate::result::ActionKind;

    // ─── Fakes ───────────────────────────────────────────────────────

    #[derive(Default)]
    struct FakeInspector {
        sessions: Mutex<Vec<String>>,
        calls: Mutex<Vec<String>>,
        fail_stop: HashSet<String>,
        fail_start: HashSet<String>,
        broken_list: bool,
    }

    impl FakeInspector {
        fn with_sessions(names: &[&str]) -> Self {
            Self {
                sessions: Mutex::new(names.iter().map(|s| s.to_string()).collect()),
                ..Self::default()
            }
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().expect("lock").clone()
        }

        fn sessions(&self) -> Vec<String> {
            self.sessions.lock().expect("lock").clone()
        }
    }

    impl SessionInspector for FakeInspector {
        fn list_active_sessions(&self) -> Result<Vec<String>, CollabError> {
            if self.broken_list {
                return Err(CollabError::failed("tmux", "server exited unexpectedly"));
            }
            Ok(self.sessions())
        }

        fn start_session(&self, slot: ServerSlot, server: &ServerRecord) -> Result<(), CollabError> {
            self.calls
                .lock()
                .expect("lock")
                .push(format!("start {} {}", server.name, slot.session_id()));
            if self.fail_start.contains(&server.name) {
                return Err(CollabError::failed("tmux", "new-session failed"));
            }
            let mut sessions = self.sessions.lock().expect("lock");
            if sessions.contains(&server.name) {
                return Err(CollabError::AlreadyRunning(server.name.clone()));
            }
            sessions.push(server.name.clone());
            Ok(())
        }

        fn stop_session(&self, name: &str) -> Result<(), CollabError> {
            self.calls.lock().expect("lock").push(format!("stop {name}"));
            if self.fail_stop.contains(name) {
                return Err(CollabError::failed("tmux", "kill-session failed"));
            }
            self.sessions.lock().expect("lock").retain(|s| s != name);
            Ok(())
        }

        fn is_session_active(&self, name: &str) -> Result<bool, CollabError> {
            Ok(self.sessions().iter().any(|s| s == name))
        }
    }

    #[derive(Default)]
    struct FakeState {
        slots: HashMap<ServerSlot, i64>,
        records: Vec<ServerRecord>,
        broken: bool,
    }

    impl FakeState {
        fn record(mut self, id: i64, name: &str) -> Self {
            self.records.push(ServerRecord {
                id,
                name: name.to_string(),
                game: "Minecraft".to_string(),
                version: String::new(),
                embed_color: String::new(),
                workdir: PathBuf::from("/srv").join(name),
                start_script: "start.sh".to_string(),
            });
            self
        }

        fn assign(mut self, slot: ServerSlot, id: i64) -> Self {
            self.slots.insert(slot, id);
            self
        }
    }

    impl DesiredStateSource for FakeState {
        fn declared_server(&self, slot: ServerSlot) -> Result<ServerRecord, CollabError> {
            if self.broken {
                return Err(CollabError::failed("state store", "unreadable"));
            }
            let id = *self.slots.get(&slot).ok_or(CollabError::SlotUnassigned(slot))?;
            self.records
                .iter()
                .find(|r| r.id == id)
                .cloned()
                .ok_or(CollabError::UnknownServerId(id))
        }

        fn is_declared(&self, server_id: i64) -> Result<bool, CollabError> {
            Ok(self.slots.values().any(|id| *id == server_id))
        }

        fn server_by_name(&self, name: &str) -> Result<ServerRecord, CollabError> {
            self.records
                .iter()
                .find(|r| r.name == name)
                .cloned()
                .ok_or_else(|| CollabError::UnknownServer(name.to_string()))
        }
    }

    fn fleet() -> FakeState {
        FakeState::default()
            .record(1, "Alpha")
            .record(2, "Beta")
            .record(3, "Gamma")
            .assign(ServerSlot::Primary, 1)
            .assign(ServerSlot::Secondary, 2)
    }

    /// Desired state whose per-id membership answer disagrees with its slots,
    /// as if an operator wrote the store mid-tick.
    struct SnapshotOnly(FakeState);

    impl DesiredStateSource for SnapshotOnly {
        fn declared_server(&self, slot: ServerSlot) -> Result<ServerRecord, CollabError> {
            self.0.declared_server(slot)
        }

        fn is_declared(&self, _server_id: i64) -> Result<bool, CollabError> {
            Ok(true)
        }

        fn server_by_name(&self, name: &str) -> Result<ServerRecord, CollabError> {
            self.0.server_by_name(name)
        }
    }

    fn kinds(result: &ReconciliationResult) -> Vec<ActionKind> {
        result.actions.iter().map(|a| a.kind).collect()
    }

    // ─── Tests ───────────────────────────────────────────────────────

    #[test]
    fn interval_must_be_positive() {
        assert_eq!(tick_interval(5).expect("valid"), Duration::from_secs(300));
        assert!(matches!(tick_interval(0), Err(ReconcileError::InvalidInterval(0))));
        assert!(matches!(tick_interval(-3), Err(ReconcileError::InvalidInterval(-3))));
    }

    #[test]
    fn stops_undeclared_and_starts_missing() {
        let inspector = FakeInspector::with_sessions(&["Alpha", "Gamma"]);
        let reconciler = Reconciler::new(&inspector, fleet());

        let result = reconciler.reconcile().expect("tick");
        assert_eq!(result.corrective_count(), 2);
        assert_eq!(kinds(&result), vec![ActionKind::Stop, ActionKind::Start]);
        assert_eq!(result.actions[0].session.as_deref(), Some("Gamma"));
        assert_eq!(result.actions[1].session.as_deref(), Some("Beta"));
        assert_eq!(result.actions[1].slot, Some(ServerSlot::Secondary));
        assert_eq!(inspector.calls(), vec!["stop Gamma", "start Beta 2"]);
        assert!(result.errors.is_empty());
        assert_eq!(
            result.open_sessions,
            Some(vec!["Alpha".to_string(), "Beta".to_string()])
        );
    }

    #[test]
    fn second_tick_is_a_no_op() {
        let inspector = FakeInspector::with_sessions(&["Alpha", "Gamma"]);
        let reconciler = Reconciler::new(&inspector, fleet());

        reconciler.reconcile().expect("first tick");
        let second = reconciler.reconcile().expect("second tick");
        assert_eq!(second.corrective_count(), 0);
        assert_eq!(kinds(&second), vec![ActionKind::NoOp]);
        assert!(second.summary().contains("Nothing to do"));
    }

    #[test]
    fn prune_completes_before_restore() {
        // Primary moved from Gamma to Alpha while Gamma was running.
        let state = FakeState::default()
            .record(1, "Alpha")
            .record(3, "Gamma")
            .assign(ServerSlot::Primary, 1);
        let inspector = FakeInspector::with_sessions(&["Gamma"]);

        let result = Reconciler::new(&inspector, state).reconcile().expect("tick");
        assert_eq!(inspector.calls(), vec!["stop Gamma", "start Alpha 1"]);
        assert_eq!(kinds(&result), vec![ActionKind::Stop, ActionKind::Start]);
    }

    #[test]
    fn shared_name_follows_the_declared_record_in_any_order() {
        // Records 7 and 1 are both called "Alpha"; only 1 is declared.
        for ids in [[7, 1], [1, 7]] {
            let state = FakeState::default()
                .record(ids[0], "Alpha")
                .record(ids[1], "Alpha")
                .assign(ServerSlot::Primary, 1);
            let inspector = FakeInspector::with_sessions(&["Alpha"]);

            let result = Reconciler::new(&inspector, state).reconcile().expect("tick");
            assert!(inspector.calls().is_empty(), "order {ids:?}: {:?}", inspector.calls());
            assert!(result.is_no_op());
            assert!(result.errors.is_empty());
        }
    }

    #[test]
    fn shared_name_without_declared_record_is_stopped_in_any_order() {
        for ids in [[7, 8], [8, 7]] {
            let state = FakeState::default()
                .record(ids[0], "Alpha")
                .record(ids[1], "Alpha")
                .record(1, "Beta")
                .assign(ServerSlot::Primary, 1);
            let inspector = FakeInspector::with_sessions(&["Alpha", "Beta"]);

            let result = Reconciler::new(&inspector, state).reconcile().expect("tick");
            assert_eq!(inspector.calls(), vec!["stop Alpha"], "order {ids:?}");
            assert_eq!(result.corrective_count(), 1);
        }
    }

    #[test]
    fn prune_uses_the_tick_snapshot() {
        // is_declared would say Gamma is declared; the snapshot says otherwise.
        let state = SnapshotOnly(fleet());
        let inspector = FakeInspector::with_sessions(&["Alpha", "Beta", "Gamma"]);

        Reconciler::new(&inspector, state).reconcile().expect("tick");
        assert_eq!(inspector.calls(), vec!["stop Gamma"]);
    }

    #[test]
    fn failed_stop_does_not_block_restore() {
        let mut inspector = FakeInspector::with_sessions(&["Gamma"]);
        inspector.fail_stop.insert("Gamma".to_string());

        let result = Reconciler::new(&inspector, fleet()).reconcile().expect("tick");
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].session, "Gamma");
        assert_eq!(kinds(&result), vec![ActionKind::Start, ActionKind::Start]);
        assert_eq!(inspector.calls(), vec!["stop Gamma", "start Alpha 1", "start Beta 2"]);
    }

    #[test]
    fn failed_start_is_recorded_and_others_continue() {
        let mut inspector = FakeInspector::with_sessions(&[]);
        inspector.fail_start.insert("Alpha".to_string());

        let result = Reconciler::new(&inspector, fleet()).reconcile().expect("tick");
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].session, "Alpha");
        assert_eq!(result.corrective_count(), 1);
        assert_eq!(result.actions[0].session.as_deref(), Some("Beta"));
    }

    #[test]
    fn listing_failure_counts_as_no_sessions() {
        let inspector = FakeInspector {
            broken_list: true,
            ..FakeInspector::default()
        };
        let result = Reconciler::new(&inspector, fleet()).reconcile().expect("tick");
        assert_eq!(inspector.calls(), vec!["start Alpha 1", "start Beta 2"]);
        assert_eq!(result.open_sessions, None);
    }

    #[test]
    fn desired_state_failure_aborts_tick() {
        let inspector = FakeInspector::with_sessions(&["Gamma"]);
        let state = FakeState {
            broken: true,
            ..fleet()
        };
        let err = Reconciler::new(&inspector, state)
            .reconcile()
            .expect_err("tick aborted");
        assert!(matches!(
            err,
            ReconcileError::DesiredState {
                slot: ServerSlot::Primary,
                ..
            }
        ));
        assert!(inspector.calls().is_empty(), "no corrective action without intent");
    }

    #[test]
    fn session_without_record_is_left_running() {
        let inspector = FakeInspector::with_sessions(&["Alpha", "Beta", "admin-shell"]);
        let result = Reconciler::new(&inspector, fleet()).reconcile().expect("tick");
        assert!(inspector.calls().is_empty());
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].session, "admin-shell");
        assert!(result.is_no_op());
    }

    #[test]
    fn unassigned_server_is_never_started() {
        let inspector = FakeInspector::with_sessions(&["Alpha", "Beta"]);
        let result = Reconciler::new(&inspector, fleet()).reconcile().expect("tick");
        assert!(result.is_no_op());
        assert!(!inspector.calls().iter().any(|c| c.contains("Gamma")));
    }

    #[test]
    fn server_declared_twice_starts_once() {
        let state = FakeState::default()
            .record(1, "Alpha")
            .assign(ServerSlot::Primary, 1)
            .assign(ServerSlot::Secondary, 1);
        let inspector = FakeInspector::with_sessions(&[]);
        let result = Reconciler::new(&inspector, state).reconcile().expect("tick");
        assert_eq!(inspector.calls(), vec!["start Alpha 1"]);
        assert_eq!(result.corrective_count(), 1);
    }
}
