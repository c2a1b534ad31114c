//! sentinel-core: shared vocabulary for the server sentinel.
//! Slot and server-record types plus the collaborator traits the core
//! consumes (session multiplexer, desired state, notifications, remote
//! console, player ledger). No business logic, no IO.

pub mod collab;
pub mod types;

pub use collab::{
    CollabError, DesiredStateSource, LineMirror, NotificationSink, PlayerLedger, RemoteConsole,
    SessionInspector,
};
pub use types::{GAME_MINECRAFT, GAME_PALWORLD, Notice, NoticeLevel, ServerRecord, ServerSlot};
