use sentinel_core::CollabError;
use thiserror::Error;

use crate::trigger::EventKind;

/// Registry construction errors (configuration time).
#[derive(Debug, Error)]
pub enum TriggerError {
    #[error("unknown trigger name: {0:?}")]
    UnknownTrigger(String),

    #[error("duplicate trigger name: {0:?}")]
    DuplicateTrigger(String),
}

/// Failure of a single trigger action. Logged by the dispatch engine,
/// never propagated past it.
#[derive(Debug, Error)]
pub enum ActionError {
    #[error(transparent)]
    Collab(#[from] CollabError),

    #[error("no line formats registered for game {0:?}")]
    UnsupportedGame(String),

    #[error("{event} events are not supported for game {game:?}")]
    Unsupported { event: EventKind, game: String },

    #[error("line does not match the {game} {event} format")]
    Unparsed { event: EventKind, game: String },
}
