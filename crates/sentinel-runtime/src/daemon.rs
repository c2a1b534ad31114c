//! Daemon wiring: log watchers → dispatcher, reconcile timer → status
//! notifications, shutdown on ctrl-c / SIGTERM.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use sentinel_core::{
    DesiredStateSource, LineMirror, Notice, NoticeLevel, NotificationSink, PlayerLedger,
    SessionInspector,
};
use sentinel_logwatch::{Mirrored, discover, watch_all};
use sentinel_reconcile::{ReconcileError, ReconciliationResult, Reconciler, tick_interval};
use sentinel_tmux::{TmuxExecutor, TmuxSessions, TmuxSocket};
use sentinel_triggers::{ActionContext, Dispatcher, TriggerRegistry};
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tracing::{error, info, warn};

use crate::config::{Config, TmuxConfig};
use crate::ledger::{JsonlPlayerLedger, NoLedger};
use crate::notify::{LogNotifier, WebhookLineMirror, WebhookNotifier};
use crate::store::JsonStateStore;

pub type Sessions = TmuxSessions<TmuxExecutor>;
pub type SentinelReconciler = Reconciler<Arc<Sessions>, Arc<JsonStateStore>>;

// ─── Services ────────────────────────────────────────────────────

/// Concrete collaborators built from the config.
pub struct Services {
    pub store: Arc<JsonStateStore>,
    pub sessions: Arc<Sessions>,
    pub notifier: Arc<dyn NotificationSink>,
    pub status_notifier: Arc<dyn NotificationSink>,
    pub ledger: Arc<dyn PlayerLedger>,
    /// Present when at least one slot webhook is configured.
    pub line_mirror: Option<Arc<dyn LineMirror>>,
}

impl Services {
    /// Must be called from inside the tokio runtime.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let executor = TmuxExecutor::on_socket(tmux_target(&config.tmux, |key| std::env::var(key).ok()));
        let sessions = TmuxSessions::new(executor, &config.log_dir)
            .with_stop_command(config.stop_command.clone())
            .with_stop_grace(config.stop_grace());

        let notifier = webhook_or_log(config.notifications.webhook_url.as_deref())?;
        let status_notifier = webhook_or_log(config.status_webhook_url())?;
        let ledger: Arc<dyn PlayerLedger> = match &config.player_ledger {
            Some(path) => Arc::new(JsonlPlayerLedger::new(path)),
            None => Arc::new(NoLedger),
        };
        let slot_webhooks = &config.notifications.slot_webhooks;
        let line_mirror: Option<Arc<dyn LineMirror>> = if slot_webhooks.is_empty() {
            None
        } else {
            Some(Arc::new(
                WebhookLineMirror::new(slot_webhooks.clone()).context("failed to build webhook client")?,
            ))
        };

        Ok(Self {
            store: Arc::new(JsonStateStore::new(&config.state_file)),
            sessions: Arc::new(sessions),
            notifier,
            status_notifier,
            ledger,
            line_mirror,
        })
    }

    pub fn action_context(&self) -> ActionContext {
        ActionContext {
            desired: self.store.clone(),
            notifier: Arc::clone(&self.notifier),
            console: self.sessions.clone(),
            ledger: Arc::clone(&self.ledger),
        }
    }

    pub fn reconciler(&self) -> SentinelReconciler {
        Reconciler::new(Arc::clone(&self.sessions), Arc::clone(&self.store))
    }
}

fn webhook_or_log(url: Option<&str>) -> anyhow::Result<Arc<dyn NotificationSink>> {
    Ok(match url {
        Some(url) => Arc::new(WebhookNotifier::new(url).context("failed to build webhook client")?),
        None => Arc::new(LogNotifier),
    })
}

/// Socket targeting: SENTINEL_TMUX_SOCKET_PATH > SENTINEL_TMUX_SOCKET_NAME
/// > config socket_path > config socket_name > tmux default.
pub fn tmux_target(cfg: &TmuxConfig, env: impl Fn(&str) -> Option<String>) -> TmuxSocket {
    env("SENTINEL_TMUX_SOCKET_PATH")
        .map(TmuxSocket::Path)
        .or_else(|| env("SENTINEL_TMUX_SOCKET_NAME").map(TmuxSocket::Name))
        .or_else(|| cfg.socket_path.clone().map(TmuxSocket::Path))
        .or_else(|| cfg.socket_name.clone().map(TmuxSocket::Name))
        .unwrap_or_default()
}

// ─── Reconcile loop ──────────────────────────────────────────────

/// Run one tick on the blocking pool and forward its report (or the
/// reason it aborted) to `notifier`.
pub async fn reconcile_and_notify<I, D>(
    reconciler: &Arc<Reconciler<I, D>>,
    notifier: &Arc<dyn NotificationSink>,
) -> anyhow::Result<ReconciliationResult>
where
    I: SessionInspector + 'static,
    D: DesiredStateSource + 'static,
{
    let reconciler = Arc::clone(reconciler);
    let notifier = Arc::clone(notifier);
    let result = tokio::task::spawn_blocking(move || {
        let outcome = reconciler.reconcile();
        let notice = match &outcome {
            Ok(result) => result.notice(),
            Err(e) => tick_failure_notice(e),
        };
        if let Err(e) = notifier.notify(None, &notice) {
            warn!(error = %e, "failed to send reconcile report");
        }
        outcome
    })
    .await??;
    Ok(result)
}

fn tick_failure_notice(err: &ReconcileError) -> Notice {
    Notice::new("♟ Server periodic check", format!("✘ Check aborted: {err}"))
        .with_level(NoticeLevel::Error)
        .stamped(chrono::Utc::now())
}

/// First tick fires one interval after start; a failed tick does not stop the loop.
async fn run_reconcile_loop<I, D>(
    reconciler: Arc<Reconciler<I, D>>,
    notifier: Arc<dyn NotificationSink>,
    every: Duration,
) where
    I: SessionInspector + 'static,
    D: DesiredStateSource + 'static,
{
    let mut ticker = interval_at(Instant::now() + every, every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        ticker.tick().await;
        match reconcile_and_notify(&reconciler, &notifier).await {
            Ok(result) => info!(
                corrective = result.corrective_count(),
                errors = result.errors.len(),
                "reconcile tick"
            ),
            Err(e) => error!(error = %format!("{e:#}"), "reconcile tick aborted"),
        }
    }
}

// ─── Daemon ──────────────────────────────────────────────────────

pub async fn run_daemon(config: Config) -> anyhow::Result<()> {
    // Configuration errors surface before anything starts.
    let registry = TriggerRegistry::from_catalogue(&config.triggers).context("invalid trigger filter")?;
    let tick = if config.servers_check_enabled {
        Some(tick_interval(config.reconcile_interval_minutes)?)
    } else {
        info!("server checks disabled");
        None
    };

    let services = Services::from_config(&config)?;

    let log_dir = config.log_dir.clone();
    let discovery = tokio::task::spawn_blocking(move || discover(&log_dir))
        .await?
        .with_context(|| format!("cannot scan log directory {}", config.log_dir.display()))?;
    if discovery.sources.is_empty() {
        warn!(dir = %config.log_dir.display(), "no log files found, are the servers writing to the log directory?");
    }

    let dispatcher = Dispatcher::new(Arc::new(registry), services.action_context());
    info!(
        triggers = dispatcher.registry().len(),
        sources = discovery.sources.len(),
        skipped = discovery.skipped.len(),
        mirrored_slots = config.notifications.slot_webhooks.len(),
        "sentinel daemon starting"
    );

    let poll = config.poll_interval();
    let line_mirror = services.line_mirror.clone();
    let mut watchers = tokio::spawn(async move {
        let failures = match line_mirror {
            Some(mirror) => {
                let handler = Arc::new(Mirrored::new(dispatcher, mirror));
                watch_all(discovery.sources, handler, poll).await
            }
            None => watch_all(discovery.sources, Arc::new(dispatcher), poll).await,
        };
        warn!(failed = failures.len(), "all log watchers have stopped");
    });

    let mut reconcile = match tick {
        Some(every) => {
            let reconciler = Arc::new(services.reconciler());
            let notifier = Arc::clone(&services.status_notifier);
            info!(every = ?every, "reconcile loop scheduled");
            Some(tokio::spawn(run_reconcile_loop(reconciler, notifier, every)))
        }
        None => None,
    };
    let reconcile_running = reconcile.is_some();

    let reconcile_exit = async {
        match reconcile.as_mut() {
            Some(handle) => handle.await,
            None => std::future::pending().await,
        }
    };

    tokio::select! {
        res = shutdown_signal() => res?,
        _ = reconcile_exit => warn!("reconcile loop exited unexpectedly"),
        _ = &mut watchers, if !reconcile_running => info!("nothing left to supervise"),
    }

    watchers.abort();
    if let Some(handle) = reconcile {
        handle.abort();
    }
    info!("sentinel daemon stopped");
    Ok(())
}

/// Wait for ctrl-c or SIGTERM.
async fn shutdown_signal() -> anyhow::Result<()> {
    #[cfg(unix)]
    {
        let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .context("failed to register SIGTERM handler")?;
        tokio::select! {
            res = tokio::signal::ctrl_c() => {
                res?;
                info!("received ctrl-c, shutting down");
            }
            _ = sigterm.recv() => info!("received SIGTERM, shutting down"),
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await?;
        info!("received ctrl-c, shutting down");
    }

    Ok(())
}
