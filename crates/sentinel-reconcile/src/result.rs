//! Per-tick reconciliation report.

use chrono::{DateTime, Utc};
use sentinel_core::{Notice, NoticeLevel, ServerSlot};
use serde::Serialize;

pub const NOTHING_TO_DO: &str = "✔ Nothing to do, all servers are running as expected.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ActionKind {
    Start,
    Stop,
    NoOp,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CorrectiveAction {
    pub kind: ActionKind,
    /// Session acted on; `None` for the no-op entry.
    pub session: Option<String>,
    /// Slot a start restored.
    pub slot: Option<ServerSlot>,
    pub description: String,
}

impl CorrectiveAction {
    pub fn start(session: &str, slot: ServerSlot) -> Self {
        Self {
            kind: ActionKind::Start,
            session: Some(session.to_string()),
            slot: Some(slot),
            description: format!("✔ Started server: {session} ({slot} slot)"),
        }
    }

    pub fn stop(session: &str) -> Self {
        Self {
            kind: ActionKind::Stop,
            session: Some(session.to_string()),
            slot: None,
            description: format!("✘ Stopped server: {session} (not supposed to be running)"),
        }
    }

    pub fn no_op() -> Self {
        Self {
            kind: ActionKind::NoOp,
            session: None,
            slot: None,
            description: NOTHING_TO_DO.to_string(),
        }
    }
}

/// A per-session failure that did not abort the tick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionError {
    pub session: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReconciliationResult {
    pub checked_at: DateTime<Utc>,
    /// Corrective actions in issue order (stops first), or a single no-op.
    pub actions: Vec<CorrectiveAction>,
    pub errors: Vec<SessionError>,
    /// Sessions open once the tick finished; `None` if that listing failed.
    pub open_sessions: Option<Vec<String>>,
}

impl ReconciliationResult {
    pub fn corrective_count(&self) -> usize {
        self.actions
            .iter()
            .filter(|a| a.kind != ActionKind::NoOp)
            .count()
    }

    pub fn is_no_op(&self) -> bool {
        self.corrective_count() == 0
    }

    pub fn level(&self) -> NoticeLevel {
        if !self.errors.is_empty() {
            NoticeLevel::Error
        } else if self.actions.iter().any(|a| a.kind == ActionKind::Stop) {
            NoticeLevel::Warn
        } else {
            NoticeLevel::Ok
        }
    }

    /// Multi-line, human-readable report.
    pub fn summary(&self) -> String {
        let mut lines: Vec<String> = self.actions.iter().map(|a| a.description.clone()).collect();
        for err in &self.errors {
            lines.push(format!("⚠ {}: {}", err.session, err.message));
        }
        let mut out = lines.join("\n");
        if let Some(open) = &self.open_sessions {
            out.push_str("\n\nCurrently open sessions:");
            for name in open {
                out.push_str("\n- ");
                out.push_str(name);
            }
            let plural = if open.len() == 1 { "" } else { "s" };
            out.push_str(&format!("\n{} open session{plural}.", open.len()));
        }
        out
    }

    pub fn notice(&self) -> Notice {
        Notice::new("♟ Server periodic check", self.summary())
            .with_level(self.level())
            .stamped(self.checked_at)
    }
}
