//! Per-game line formats.
//!
//! One [`GameFormats`] entry per game-type tag, one parser per event
//! family. Supporting a new game means writing its parsers and adding an
//! entry to [`GAME_TABLE`]; the dispatch engine and actions never branch on
//! the game themselves.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;
use sentinel_core::{GAME_MINECRAFT, GAME_PALWORLD};
use serde_json::json;

/// A player name plus the free text attached to the event
/// (chat message, advancement title, death message).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerLine {
    pub player: String,
    pub text: String,
}

/// Something worth echoing into the counterpart server's console.
#[derive(Debug, Clone, Copy)]
pub enum RelayMessage<'a> {
    Chat {
        player: &'a str,
        message: &'a str,
        color: &'a str,
    },
    Joined {
        player: &'a str,
        server: &'a str,
    },
    Left {
        player: &'a str,
        server: &'a str,
    },
}

pub type PlayerLineParser = fn(&str) -> Option<PlayerLine>;
pub type PlayerNameParser = fn(&str) -> Option<String>;
pub type RelayFormatter = fn(&RelayMessage<'_>) -> String;

/// Line parsers and console formatter for one game.
#[derive(Debug, Clone, Copy)]
pub struct GameFormats {
    pub chat: PlayerLineParser,
    pub joined: PlayerNameParser,
    pub left: PlayerNameParser,
    pub advancement: Option<PlayerLineParser>,
    pub death: Option<PlayerLineParser>,
    /// `None` when the game has no console command for broadcasting text.
    pub relay: Option<RelayFormatter>,
}

pub static GAME_TABLE: Lazy<HashMap<&'static str, GameFormats>> = Lazy::new(|| {
    HashMap::from([
        (
            GAME_MINECRAFT,
            GameFormats {
                chat: minecraft_chat,
                joined: minecraft_joined,
                left: minecraft_left,
                advancement: Some(minecraft_advancement),
                death: Some(minecraft_death),
                relay: Some(minecraft_relay),
            },
        ),
        (
            GAME_PALWORLD,
            GameFormats {
                chat: palworld_chat,
                joined: palworld_joined,
                left: palworld_left,
                advancement: None,
                death: None,
                relay: None,
            },
        ),
    ])
});

pub fn formats_for(game: &str) -> Option<&'static GameFormats> {
    GAME_TABLE.get(game)
}

// ─── Minecraft ───────────────────────────────────────────────────

static RE_MC_CHAT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\[\d{2}:\d{2}:\d{2}\] \[Server thread/INFO\](?: \[.+?/MinecraftServer\])?: <(.+?)> (.+)")
        .unwrap()
});
static RE_MC_JOINED: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\[\d{2}:\d{2}:\d{2}\] \[Server thread/INFO\](?: \[.+?/MinecraftServer\])?: (\S+) joined the game")
        .unwrap()
});
static RE_MC_LEFT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\[\d{2}:\d{2}:\d{2}\] \[Server thread/INFO\].*?: (\S+) left the game").unwrap()
});
static RE_MC_ADVANCEMENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\[\d{2}:\d{2}:\d{2}\] \[Server thread/INFO\].*?: (\S+) has made the advancement \[(.+?)\]")
        .unwrap()
});
pub(crate) static RE_MC_DEATH: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"\[.*?\] \[.*?\]: (\S+) (was slain by|was shot by|was killed by|was blown up by|was run over by|drowned|starved to death|blew up|burned to death|withered away|froze to death|fell from a high place|fell out of the world|hit the ground too hard|tried to swim in lava|suffocated in a wall|went up in flames)(.*)",
    )
    .unwrap()
});

/// Minecraft account names are 3 to 16 characters.
fn is_minecraft_name(name: &str) -> bool {
    (3..=16).contains(&name.len())
}

fn minecraft_chat(line: &str) -> Option<PlayerLine> {
    let caps = RE_MC_CHAT.captures(line)?;
    Some(PlayerLine {
        player: caps[1].to_string(),
        text: caps[2].to_string(),
    })
}

fn minecraft_joined(line: &str) -> Option<String> {
    let caps = RE_MC_JOINED.captures(line)?;
    Some(caps[1].to_string()).filter(|name| is_minecraft_name(name))
}

fn minecraft_left(line: &str) -> Option<String> {
    let caps = RE_MC_LEFT.captures(line)?;
    Some(caps[1].to_string()).filter(|name| is_minecraft_name(name))
}

fn minecraft_advancement(line: &str) -> Option<PlayerLine> {
    let caps = RE_MC_ADVANCEMENT.captures(line)?;
    Some(PlayerLine {
        player: caps[1].to_string(),
        text: caps[2].to_string(),
    })
}

fn minecraft_death(line: &str) -> Option<PlayerLine> {
    let caps = RE_MC_DEATH.captures(line)?;
    let player = caps[1].to_string();
    let text = format!("{player} {}{}", &caps[2], caps[3].trim_end());
    Some(PlayerLine { player, text })
}

fn minecraft_relay(msg: &RelayMessage<'_>) -> String {
    let component = match *msg {
        RelayMessage::Chat {
            player,
            message,
            color,
        } => {
            let color = if color.is_empty() { "white" } else { color };
            json!(["", {"text": format!("<{player}>"), "color": color}, {"text": format!(" {message}")}])
        }
        RelayMessage::Joined { player, server } => {
            json!({"text": format!("{player} joined {server}"), "color": "yellow"})
        }
        RelayMessage::Left { player, server } => {
            json!({"text": format!("{player} left {server}"), "color": "yellow"})
        }
    };
    format!("tellraw @a {component}")
}

// ─── Palworld ────────────────────────────────────────────────────

static RE_PW_CHAT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\[\d{4}-\d{2}-\d{2} \d{2}:\d{2}:\d{2}\] \[CHAT\] <(.+?)> (.+)").unwrap()
});
static RE_PW_JOINED: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"\[\d{4}-\d{2}-\d{2} \d{2}:\d{2}:\d{2}\] \[LOG\] (.+?) \d{1,3}(?:\.\d{1,3}){3} connected the server",
    )
    .unwrap()
});
static RE_PW_LEFT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\[\d{4}-\d{2}-\d{2} \d{2}:\d{2}:\d{2}\] \[LOG\] (.+?) left the server").unwrap()
});

fn palworld_chat(line: &str) -> Option<PlayerLine> {
    let caps = RE_PW_CHAT.captures(line)?;
    Some(PlayerLine {
        player: caps[1].to_string(),
        text: caps[2].to_string(),
    })
}

fn palworld_joined(line: &str) -> Option<String> {
    RE_PW_JOINED.captures(line).map(|caps| caps[1].to_string())
}

fn palworld_left(line: &str) -> Option<String> {
    RE_PW_LEFT.captures(line).map(|caps| caps[1].to_string())
}
