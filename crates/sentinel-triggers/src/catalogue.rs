//! The fixed catalogue of recognised log events.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::games::RE_MC_DEATH;
use crate::trigger::{Condition, EventKind, Trigger};

static RE_CHAT: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^<>]+> ").unwrap());
static RE_MC_DONE: Lazy<Regex> = Lazy::new(|| Regex::new(r"Done\s*\(.*?\)!").unwrap());
static RE_PW_RUNNING: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Running Palworld dedicated server on :\d+").unwrap());
static RE_PW_CONNECTED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"connected the server\. \(User id: ").unwrap());

/// Names of every catalogue trigger, in registry order.
pub const CATALOGUE_NAMES: [&str; 11] = [
    "player_chat",
    "minecraft_started",
    "minecraft_stopping",
    "minecraft_crashed",
    "minecraft_player_joined",
    "minecraft_player_left",
    "minecraft_advancement",
    "minecraft_player_death",
    "palworld_started",
    "palworld_player_joined",
    "palworld_player_left",
];

/// Build the full catalogue. Every non-chat condition carries the chat guard.
pub fn catalogue() -> Vec<Trigger> {
    use EventKind::*;

    vec![
        Trigger::new("player_chat", Condition::regex(RE_CHAT.clone()), Chat),
        Trigger::new(
            "minecraft_started",
            Condition::regex(RE_MC_DONE.clone()).guarded(),
            Started,
        ),
        Trigger::new(
            "minecraft_stopping",
            Condition::contains("Stopping the server").guarded(),
            Stopping,
        ),
        Trigger::new(
            "minecraft_crashed",
            Condition::contains("has crashed").guarded(),
            Crashed,
        ),
        Trigger::new(
            "minecraft_player_joined",
            Condition::contains("joined the game").guarded(),
            PlayerJoined,
        ),
        Trigger::new(
            "minecraft_player_left",
            Condition::contains("left the game").guarded(),
            PlayerLeft,
        ),
        Trigger::new(
            "minecraft_advancement",
            Condition::contains("has made the advancement").guarded(),
            Advancement,
        ),
        Trigger::new(
            "minecraft_player_death",
            Condition::regex(RE_MC_DEATH.clone()).guarded(),
            PlayerDeath,
        ),
        Trigger::new(
            "palworld_started",
            Condition::regex(RE_PW_RUNNING.clone()).guarded(),
            Started,
        ),
        Trigger::new(
            "palworld_player_joined",
            Condition::regex(RE_PW_CONNECTED.clone()).guarded(),
            PlayerJoined,
        ),
        Trigger::new(
            "palworld_player_left",
            Condition::contains("left the server").guarded(),
            PlayerLeft,
        ),
    ]
}
