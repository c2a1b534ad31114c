//! Trigger rule data: pattern, condition and event family.

use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;

static RE_CHAT_LINE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^<>]+>").unwrap());

/// Whether a line looks like a player chat message (`<name> text`).
pub fn is_chat_line(line: &str) -> bool {
    RE_CHAT_LINE.is_match(line)
}

// ─── Conditions ──────────────────────────────────────────────────

/// A cheap, pure line test.
#[derive(Debug, Clone)]
pub enum Pattern {
    Contains(&'static str),
    Regex(Regex),
}

impl Pattern {
    pub fn is_match(&self, line: &str) -> bool {
        match self {
            Self::Contains(needle) => line.contains(needle),
            Self::Regex(re) => re.is_match(line),
        }
    }
}

/// Pattern plus the optional chat guard. A guarded condition never matches
/// a chat line, so text typed by players cannot impersonate server events.
#[derive(Debug, Clone)]
pub struct Condition {
    pattern: Pattern,
    chat_guard: bool,
}

impl Condition {
    pub fn contains(needle: &'static str) -> Self {
        Self {
            pattern: Pattern::Contains(needle),
            chat_guard: false,
        }
    }

    pub fn regex(re: Regex) -> Self {
        Self {
            pattern: Pattern::Regex(re),
            chat_guard: false,
        }
    }

    #[must_use]
    pub fn guarded(mut self) -> Self {
        self.chat_guard = true;
        self
    }

    pub fn matches(&self, line: &str) -> bool {
        if self.chat_guard && is_chat_line(line) {
            return false;
        }
        self.pattern.is_match(line)
    }
}

// ─── Event families ──────────────────────────────────────────────

/// Which action a trigger runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Chat,
    Started,
    Stopping,
    Crashed,
    PlayerJoined,
    PlayerLeft,
    Advancement,
    PlayerDeath,
}

impl EventKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Chat => "chat",
            Self::Started => "started",
            Self::Stopping => "stopping",
            Self::Crashed => "crashed",
            Self::PlayerJoined => "player-joined",
            Self::PlayerLeft => "player-left",
            Self::Advancement => "advancement",
            Self::PlayerDeath => "player-death",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named (condition, event) rule.
#[derive(Debug, Clone)]
pub struct Trigger {
    pub name: String,
    pub condition: Condition,
    pub event: EventKind,
}

impl Trigger {
    pub fn new(name: impl Into<String>, condition: Condition, event: EventKind) -> Self {
        Self {
            name: name.into(),
            condition,
            event,
        }
    }
}
