//! sentinel-reconcile: Desired-State Reconciler.
//!
//! One [`Reconciler::reconcile`] call is one tick: observe the active
//! sessions, read the declared slots fresh, stop what should not run, then
//! start what is missing. The outcome is a [`ReconciliationResult`] that is
//! never empty.

pub mod error;
pub mod reconciler;
pub mod result;

pub use error::ReconcileError;
pub use reconciler::{Reconciler, tick_interval};
pub use result::{ActionKind, CorrectiveAction, ReconciliationResult, SessionError};
