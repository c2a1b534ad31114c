use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::collab::CollabError;

/// Game-type tag for Minecraft servers (key into the per-game parser table).
pub const GAME_MINECRAFT: &str = "Minecraft";
/// Game-type tag for Palworld servers.
pub const GAME_PALWORLD: &str = "Palworld";

// ─── Slots ───────────────────────────────────────────────────────

/// A "must be running" role. Each slot owns one fixed session identity,
/// which is also the numeral in its log file name (`1.log`, `2.log`, `3.log`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServerSlot {
    Primary,
    Secondary,
    Partner,
}

impl ServerSlot {
    pub const ALL: [Self; 3] = [Self::Primary, Self::Secondary, Self::Partner];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Primary => "primary",
            Self::Secondary => "secondary",
            Self::Partner => "partner",
        }
    }

    /// Fixed numeric session identity of this slot.
    pub fn session_id(self) -> u8 {
        match self {
            Self::Primary => 1,
            Self::Secondary => 2,
            Self::Partner => 3,
        }
    }

    pub fn from_session_id(id: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|slot| slot.session_id() == id)
    }

    /// The slot whose players see relayed chat/join/leave lines from this one.
    /// Primary and secondary mirror each other; the partner slot is standalone.
    pub fn counterpart(self) -> Option<Self> {
        match self {
            Self::Primary => Some(Self::Secondary),
            Self::Secondary => Some(Self::Primary),
            Self::Partner => None,
        }
    }
}

impl fmt::Display for ServerSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ServerSlot {
    type Err = CollabError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "primary" | "1" => Ok(Self::Primary),
            "secondary" | "2" => Ok(Self::Secondary),
            "partner" | "3" => Ok(Self::Partner),
            _ => Err(CollabError::UnknownSlot(s.to_string())),
        }
    }
}

// ─── Server records ──────────────────────────────────────────────

/// A game server as declared in the state store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerRecord {
    pub id: i64,
    /// Session name; also the server's display name.
    pub name: String,
    /// Game-type tag, e.g. [`GAME_MINECRAFT`].
    pub game: String,
    #[serde(default)]
    pub version: String,
    /// Hex colour used when rendering notifications, e.g. `#9adfba`.
    #[serde(default)]
    pub embed_color: String,
    /// Directory the session is launched from.
    pub workdir: PathBuf,
    /// Script (relative to `workdir`) that runs the server in the foreground.
    pub start_script: String,
}

// ─── Notices ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Ok,
    Warn,
    Error,
}

impl NoticeLevel {
    /// Default colour for notices that are not tied to a server.
    pub fn color(self) -> &'static str {
        match self {
            Self::Ok => "#9adfba",
            Self::Warn => "#ff8c00",
            Self::Error => "#ff0000",
        }
    }
}

/// One outbound notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub title: String,
    pub body: String,
    pub level: NoticeLevel,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

impl Notice {
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
            level: NoticeLevel::Ok,
            timestamp: None,
        }
    }

    #[must_use]
    pub fn with_level(mut self, level: NoticeLevel) -> Self {
        self.level = level;
        self
    }

    #[must_use]
    pub fn stamped(mut self, at: DateTime<Utc>) -> Self {
        self.timestamp = Some(at);
        self
    }
}
