//! CLI definition using clap derive.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub const DEFAULT_CONFIG_PATH: &str = "/opt/sentinel/config.json";

#[derive(Parser)]
#[command(name = "sentinel", about = "Game-server supervisor for tmux sessions")]
pub struct Cli {
    /// Config file (JSON)
    #[arg(long, short = 'c', global = true, env = "SENTINEL_CONFIG", default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the log watchers and the reconcile loop until interrupted
    Daemon,
    /// Run one reconcile tick and print its report
    Reconcile(ReconcileOpts),
    /// List active tmux sessions
    Sessions,
    /// Assign a server to a slot in the state file
    Assign(AssignOpts),
    /// Print the enabled trigger names
    Triggers,
}

#[derive(clap::Args)]
pub struct ReconcileOpts {
    /// Print the result as JSON
    #[arg(long)]
    pub json: bool,

    /// Also send the report to the status webhook
    #[arg(long)]
    pub notify: bool,
}

#[derive(clap::Args)]
pub struct AssignOpts {
    /// primary | secondary | partner (or 1 | 2 | 3)
    pub slot: String,
    /// Server name as recorded in the state file
    pub server: String,
}
