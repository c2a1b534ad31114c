//! sentinel: game-server supervisor binary.
//! Watches server logs for triggers and keeps the declared tmux sessions
//! running.

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use sentinel_core::{DesiredStateSource, ServerSlot, SessionInspector};
use sentinel_triggers::TriggerRegistry;

mod cli;
mod config;
mod daemon;
mod ledger;
mod notify;
mod store;

use config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = cli::Cli::parse();

    let filter = std::env::var("SENTINEL_LOG")
        .or_else(|_| std::env::var("RUST_LOG"))
        .unwrap_or_else(|_| "info".to_string());
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(filter))
        .with_writer(std::io::stderr)
        .init();

    let config = Config::load(&args.config)?;

    match args.command {
        cli::Command::Daemon => daemon::run_daemon(config).await?,
        cli::Command::Reconcile(opts) => cmd_reconcile(&config, &opts).await?,
        cli::Command::Sessions => cmd_sessions(&config).await?,
        cli::Command::Assign(opts) => cmd_assign(&config, &opts).await?,
        cli::Command::Triggers => {
            let registry =
                TriggerRegistry::from_catalogue(&config.triggers).context("invalid trigger filter")?;
            for name in registry.names() {
                println!("{name}");
            }
        }
    }

    Ok(())
}

async fn cmd_reconcile(config: &Config, opts: &cli::ReconcileOpts) -> anyhow::Result<()> {
    let services = daemon::Services::from_config(config)?;
    let reconciler = Arc::new(services.reconciler());

    let result = if opts.notify {
        daemon::reconcile_and_notify(&reconciler, &services.status_notifier).await?
    } else {
        let r = Arc::clone(&reconciler);
        tokio::task::spawn_blocking(move || r.reconcile()).await??
    };

    if opts.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        println!("{}", result.summary());
    }
    Ok(())
}

async fn cmd_sessions(config: &Config) -> anyhow::Result<()> {
    let services = daemon::Services::from_config(config)?;
    let sessions = Arc::clone(&services.sessions);
    let names = tokio::task::spawn_blocking(move || sessions.list_active_sessions())
        .await?
        .context("failed to list tmux sessions")?;
    for name in names {
        println!("{name}");
    }
    Ok(())
}

async fn cmd_assign(config: &Config, opts: &cli::AssignOpts) -> anyhow::Result<()> {
    let slot: ServerSlot = opts.slot.parse()?;
    let services = daemon::Services::from_config(config)?;

    let store = Arc::clone(&services.store);
    let name = opts.server.clone();
    let record = tokio::task::spawn_blocking(move || {
        let record = store.assign(slot, &name)?;
        // Read back through the same path the reconciler uses.
        store.declared_server(slot)?;
        Ok::<_, sentinel_core::CollabError>(record)
    })
    .await?
    .with_context(|| format!("cannot assign {} to the {slot} slot", opts.server))?;

    println!(
        "{slot} (session {}) → {} (id {}, {})",
        slot.session_id(),
        record.name,
        record.id,
        record.game
    );
    Ok(())
}
