//! Trigger actions. Each action receives the cleaned line, the slot the
//! line came from, and an explicit [`ActionContext`] of collaborator
//! handles; the server behind the slot is re-read on every event.

use std::sync::Arc;

use chrono::Utc;
use sentinel_core::{
    CollabError, DesiredStateSource, Notice, NoticeLevel, NotificationSink, PlayerLedger,
    RemoteConsole, ServerRecord, ServerSlot,
};
use tracing::{debug, warn};

use crate::error::ActionError;
use crate::games::{GameFormats, RelayMessage, formats_for};
use crate::trigger::EventKind;

/// Collaborators an action may touch.
#[derive(Clone)]
pub struct ActionContext {
    pub desired: Arc<dyn DesiredStateSource>,
    pub notifier: Arc<dyn NotificationSink>,
    pub console: Arc<dyn RemoteConsole>,
    pub ledger: Arc<dyn PlayerLedger>,
}

pub(crate) fn run_action(
    event: EventKind,
    line: &str,
    slot: ServerSlot,
    ctx: &ActionContext,
) -> Result<(), ActionError> {
    let server = ctx.desired.declared_server(slot)?;

    match event {
        EventKind::Started => notify(
            ctx,
            &server,
            Notice::new(
                format!("{} is online", server.name),
                format!("The {} server is up, come and play!", server.game),
            ),
        ),
        EventKind::Stopping => notify(
            ctx,
            &server,
            Notice::new(
                format!("{} is shutting down", server.name),
                format!("The {} server is going offline.", server.game),
            ),
        ),
        EventKind::Crashed => notify(
            ctx,
            &server,
            Notice::new(
                format!("{} crashed", server.name),
                format!("The {} server is offline.", server.game),
            )
            .with_level(NoticeLevel::Error),
        ),
        EventKind::Chat => {
            let formats = formats(&server)?;
            let chat = (formats.chat)(line).ok_or_else(|| unparsed(event, &server))?;
            notify(
                ctx,
                &server,
                Notice::new(chat.player.clone(), chat.text.clone()),
            );
            relay(
                ctx,
                slot,
                &server,
                &RelayMessage::Chat {
                    player: &chat.player,
                    message: &chat.text,
                    color: &server.embed_color,
                },
            )?;
        }
        EventKind::PlayerJoined => {
            let formats = formats(&server)?;
            let player = (formats.joined)(line).ok_or_else(|| unparsed(event, &server))?;
            notify(
                ctx,
                &server,
                Notice::new(format!("{player} joined {}", server.name), ""),
            );
            ctx.ledger.record_join(&server, &player)?;
            relay(
                ctx,
                slot,
                &server,
                &RelayMessage::Joined {
                    player: &player,
                    server: &server.name,
                },
            )?;
        }
        EventKind::PlayerLeft => {
            let formats = formats(&server)?;
            let player = (formats.left)(line).ok_or_else(|| unparsed(event, &server))?;
            notify(
                ctx,
                &server,
                Notice::new(format!("{player} left {}", server.name), ""),
            );
            ctx.ledger.record_leave(&server, &player)?;
            relay(
                ctx,
                slot,
                &server,
                &RelayMessage::Left {
                    player: &player,
                    server: &server.name,
                },
            )?;
        }
        EventKind::Advancement => {
            let parse = formats(&server)?
                .advancement
                .ok_or_else(|| unsupported(event, &server))?;
            let adv = parse(line).ok_or_else(|| unparsed(event, &server))?;
            notify(
                ctx,
                &server,
                Notice::new(
                    adv.text.clone(),
                    format!(
                        "{} has made the advancement \"{}\" on {}!",
                        adv.player, adv.text, server.name
                    ),
                )
                .stamped(Utc::now()),
            );
        }
        EventKind::PlayerDeath => {
            let parse = formats(&server)?
                .death
                .ok_or_else(|| unsupported(event, &server))?;
            let death = parse(line).ok_or_else(|| unparsed(event, &server))?;
            notify(
                ctx,
                &server,
                Notice::new(format!("{} died", death.player), death.text).stamped(Utc::now()),
            );
        }
    }
    Ok(())
}

fn formats(server: &ServerRecord) -> Result<&'static GameFormats, ActionError> {
    formats_for(&server.game).ok_or_else(|| ActionError::UnsupportedGame(server.game.clone()))
}

fn unparsed(event: EventKind, server: &ServerRecord) -> ActionError {
    ActionError::Unparsed {
        event,
        game: server.game.clone(),
    }
}

fn unsupported(event: EventKind, server: &ServerRecord) -> ActionError {
    ActionError::Unsupported {
        event,
        game: server.game.clone(),
    }
}

/// Notifications are fire-and-forget: a failed send is logged, the action goes on.
fn notify(ctx: &ActionContext, server: &ServerRecord, notice: Notice) {
    if let Err(e) = ctx.notifier.notify(Some(server), &notice) {
        warn!(server = %server.name, title = %notice.title, error = %e, "notification failed");
    }
}

/// Echo an event into the counterpart slot's console, when there is one and
/// its game can broadcast text.
fn relay(
    ctx: &ActionContext,
    slot: ServerSlot,
    source: &ServerRecord,
    msg: &RelayMessage<'_>,
) -> Result<(), ActionError> {
    let Some(target_slot) = slot.counterpart() else {
        return Ok(());
    };
    let target = match ctx.desired.declared_server(target_slot) {
        Ok(target) => target,
        Err(CollabError::SlotUnassigned(_)) => return Ok(()),
        Err(e) => return Err(e.into()),
    };
    if target.id == source.id {
        return Ok(());
    }
    let Some(format) = formats_for(&target.game).and_then(|f| f.relay) else {
        return Ok(());
    };
    match ctx.console.send_command(&target, &format(msg)) {
        Ok(()) => Ok(()),
        Err(CollabError::NotRunning(name)) => {
            debug!(target = %name, "relay target not running, skipped");
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Fixture, record};
    use sentinel_core::{GAME_MINECRAFT, GAME_PALWORLD};

    const MC_JOIN: &str = "[09:15:42] [Server thread/INFO]: Notch joined the game";

    #[test]
    fn join_notifies_records_and_relays() {
        let fx = Fixture::new()
            .declare(ServerSlot::Primary, record(1, "Alpha", GAME_MINECRAFT))
            .declare(ServerSlot::Secondary, record(2, "Beta", GAME_MINECRAFT));

        run_action(EventKind::PlayerJoined, MC_JOIN, ServerSlot::Primary, &fx.ctx())
            .expect("action");

        let notices = fx.notifier.notices();
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].0.as_deref(), Some("Alpha"));
        assert_eq!(notices[0].1.title, "Notch joined Alpha");
        assert_eq!(fx.ledger.entries(), vec!["join Alpha Notch".to_string()]);
        let commands = fx.console.commands();
        assert_eq!(commands.len(), 1);
        assert_eq!(commands[0].0, "Beta");
        assert!(commands[0].1.contains("Notch joined Alpha"));
    }

    #[test]
    fn partner_slot_does_not_relay() {
        let fx = Fixture::new()
            .declare(ServerSlot::Primary, record(1, "Alpha", GAME_MINECRAFT))
            .declare(ServerSlot::Partner, record(3, "Gamma", GAME_MINECRAFT));

        run_action(EventKind::PlayerJoined, MC_JOIN, ServerSlot::Partner, &fx.ctx())
            .expect("action");
        assert!(fx.console.commands().is_empty());
        assert_eq!(fx.notifier.notices().len(), 1);
    }

    #[test]
    fn relay_skipped_for_games_without_console_broadcast() {
        let fx = Fixture::new()
            .declare(ServerSlot::Primary, record(1, "Alpha", GAME_MINECRAFT))
            .declare(ServerSlot::Secondary, record(2, "Island", GAME_PALWORLD));

        let chat = "[14:02:11] [Server thread/INFO]: <Steve> hi";
        run_action(EventKind::Chat, chat, ServerSlot::Primary, &fx.ctx()).expect("action");
        assert!(fx.console.commands().is_empty());
        assert_eq!(fx.notifier.notices()[0].1.body, "hi");
    }

    #[test]
    fn relay_target_not_running_is_fine() {
        let fx = Fixture::new()
            .declare(ServerSlot::Primary, record(1, "Alpha", GAME_MINECRAFT))
            .declare(ServerSlot::Secondary, record(2, "Beta", GAME_MINECRAFT));
        fx.console.set_offline("Beta");

        run_action(EventKind::PlayerJoined, MC_JOIN, ServerSlot::Primary, &fx.ctx())
            .expect("offline relay target is not an error");
    }

    #[test]
    fn same_server_in_both_slots_does_not_echo() {
        let alpha = record(1, "Alpha", GAME_MINECRAFT);
        let fx = Fixture::new()
            .declare(ServerSlot::Primary, alpha.clone())
            .declare(ServerSlot::Secondary, alpha);

        run_action(EventKind::PlayerJoined, MC_JOIN, ServerSlot::Primary, &fx.ctx())
            .expect("action");
        assert!(fx.console.commands().is_empty());
    }

    #[test]
    fn unknown_game_fails_parsed_events_only() {
        let fx = Fixture::new().declare(ServerSlot::Primary, record(1, "Alpha", "Terraria"));

        let err = run_action(EventKind::PlayerJoined, MC_JOIN, ServerSlot::Primary, &fx.ctx())
            .expect_err("no formats for Terraria");
        assert!(matches!(err, ActionError::UnsupportedGame(_)));

        run_action(EventKind::Started, "anything", ServerSlot::Primary, &fx.ctx())
            .expect("lifecycle notices need no parser");
        assert_eq!(fx.notifier.notices()[0].1.title, "Alpha is online");
    }

    #[test]
    fn advancement_unsupported_for_palworld() {
        let fx = Fixture::new().declare(ServerSlot::Primary, record(1, "Island", GAME_PALWORLD));
        let err = run_action(
            EventKind::Advancement,
            "Mika has made the advancement [x]",
            ServerSlot::Primary,
            &fx.ctx(),
        )
        .expect_err("palworld has no advancements");
        assert!(matches!(err, ActionError::Unsupported { .. }));
    }

    #[test]
    fn unparsable_line_is_an_action_error() {
        let fx = Fixture::new().declare(ServerSlot::Primary, record(1, "Alpha", GAME_MINECRAFT));
        let err = run_action(
            EventKind::Chat,
            "<Steve> missing the log prefix",
            ServerSlot::Primary,
            &fx.ctx(),
        )
        .expect_err("unparsed");
        assert!(matches!(err, ActionError::Unparsed { .. }));
    }

    #[test]
    fn notification_failure_does_not_fail_action() {
        let fx = Fixture::new()
            .declare(ServerSlot::Primary, record(1, "Alpha", GAME_MINECRAFT))
            .failing_notifier();
        run_action(EventKind::PlayerJoined, MC_JOIN, ServerSlot::Primary, &fx.ctx())
            .expect("notify failure is swallowed");
        assert_eq!(fx.ledger.entries().len(), 1);
    }

    #[test]
    fn unassigned_slot_fails_action() {
        let fx = Fixture::new();
        let err = run_action(EventKind::Started, "x", ServerSlot::Secondary, &fx.ctx())
            .expect_err("nothing declared");
        assert!(matches!(
            err,
            ActionError::Collab(CollabError::SlotUnassigned(ServerSlot::Secondary))
        ));
    }

    #[test]
    fn death_notice_is_stamped() {
        let fx = Fixture::new().declare(ServerSlot::Primary, record(1, "Alpha", GAME_MINECRAFT));
        run_action(
            EventKind::PlayerDeath,
            "[20:11:09] [Server thread/INFO]: Alex was shot by Skeleton",
            ServerSlot::Primary,
            &fx.ctx(),
        )
        .expect("action");
        let notice = &fx.notifier.notices()[0].1;
        assert_eq!(notice.title, "Alex died");
        assert_eq!(notice.body, "Alex was shot by Skeleton");
        assert!(notice.timestamp.is_some());
    }
}
