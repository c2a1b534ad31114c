//! sentinel-triggers: Trigger Registry and Dispatch Engine.
//!
//! Triggers are data: a name, a pure [`Condition`] over a cleaned log line,
//! and the [`EventKind`] whose action runs when the condition holds. Every
//! matching trigger fires (multi-match); action failures are logged and
//! stay local to the trigger. Game-specific line formats live in one lookup
//! table keyed by game-type tag (see [`games`]).

pub mod actions;
pub mod catalogue;
pub mod error;
pub mod games;
pub mod registry;
pub mod trigger;

#[cfg(test)]
pub(crate) mod testing;

pub use actions::ActionContext;
pub use catalogue::{CATALOGUE_NAMES, catalogue};
pub use error::{ActionError, TriggerError};
pub use registry::{DispatchReport, Dispatcher, TriggerRegistry};
pub use trigger::{Condition, EventKind, Pattern, Trigger, is_chat_line};
