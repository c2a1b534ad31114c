use sentinel_core::{CollabError, ServerSlot};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReconcileError {
    /// Raised before the loop starts.
    #[error("reconcile interval must be greater than 0 minutes, got {0}")]
    InvalidInterval(i64),

    /// Aborts the current tick only.
    #[error("cannot read the declared {slot} server: {source}")]
    DesiredState {
        slot: ServerSlot,
        #[source]
        source: CollabError,
    },
}
