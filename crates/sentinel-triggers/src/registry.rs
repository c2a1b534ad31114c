//! Trigger registry and dispatch.

use std::collections::HashSet;
use std::sync::Arc;

use sentinel_core::ServerSlot;
use tracing::{debug, warn};

use crate::actions::{ActionContext, run_action};
use crate::catalogue::catalogue;
use crate::error::TriggerError;
use crate::trigger::Trigger;

/// Ordered, name-unique set of active triggers. Built once at startup and
/// read-only afterwards.
#[derive(Debug, Clone)]
pub struct TriggerRegistry {
    triggers: Vec<Trigger>,
}

impl TriggerRegistry {
    pub fn new(triggers: Vec<Trigger>) -> Result<Self, TriggerError> {
        let mut seen = HashSet::new();
        for trigger in &triggers {
            if !seen.insert(trigger.name.as_str()) {
                return Err(TriggerError::DuplicateTrigger(trigger.name.clone()));
            }
        }
        Ok(Self { triggers })
    }

    /// The catalogue filtered to `enabled`. An empty filter enables every
    /// trigger. Catalogue order is kept whatever order the names come in.
    pub fn from_catalogue(enabled: &[String]) -> Result<Self, TriggerError> {
        let all = catalogue();
        if let Some(unknown) = enabled
            .iter()
            .find(|name| !all.iter().any(|t| &t.name == *name))
        {
            return Err(TriggerError::UnknownTrigger(unknown.clone()));
        }
        let triggers = if enabled.is_empty() {
            all
        } else {
            all.into_iter()
                .filter(|t| enabled.contains(&t.name))
                .collect()
        };
        Self::new(triggers)
    }

    pub fn len(&self) -> usize {
        self.triggers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.triggers.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.triggers.iter().map(|t| t.name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Trigger> {
        self.triggers.iter()
    }

    /// Evaluate every trigger against `line` and run the action of each one
    /// that matches, in registry order. A failing action is logged and does
    /// not stop the remaining triggers.
    pub fn dispatch(&self, line: &str, slot: ServerSlot, ctx: &ActionContext) -> DispatchReport {
        let mut report = DispatchReport::default();
        for trigger in self.triggers.iter().filter(|t| t.condition.matches(line)) {
            debug!(trigger = %trigger.name, %slot, "trigger matched");
            match run_action(trigger.event, line, slot, ctx) {
                Ok(()) => report.fired.push(trigger.name.clone()),
                Err(e) => {
                    warn!(trigger = %trigger.name, %slot, error = %e, "trigger action failed");
                    report.failed.push((trigger.name.clone(), e.to_string()));
                }
            }
        }
        report
    }
}

/// Outcome of dispatching one line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchReport {
    /// Triggers whose action completed.
    pub fired: Vec<String>,
    /// Triggers whose action failed, with the error text.
    pub failed: Vec<(String, String)>,
}

impl DispatchReport {
    pub fn matched(&self) -> usize {
        self.fired.len() + self.failed.len()
    }
}

/// A registry bound to its collaborators; what the log watchers hand lines to.
#[derive(Clone)]
pub struct Dispatcher {
    registry: Arc<TriggerRegistry>,
    ctx: ActionContext,
}

impl Dispatcher {
    pub fn new(registry: Arc<TriggerRegistry>, ctx: ActionContext) -> Self {
        Self { registry, ctx }
    }

    pub fn registry(&self) -> &TriggerRegistry {
        &self.registry
    }

    pub fn handle(&self, line: &str, slot: ServerSlot) -> DispatchReport {
        self.registry.dispatch(line, slot, &self.ctx)
    }
}
