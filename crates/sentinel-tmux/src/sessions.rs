//! Session-level tmux operations: the Session Inspector and Remote Console
//! implementations backed by a [`TmuxCommandRunner`].

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use sentinel_core::{CollabError, RemoteConsole, ServerRecord, ServerSlot, SessionInspector};
use tracing::{info, warn};

use crate::error::TmuxError;
use crate::executor::TmuxCommandRunner;

/// Format string for `tmux list-sessions -F`.
pub const LIST_SESSIONS_FORMAT: &str = "#{session_name}";

const DEFAULT_STOP_COMMAND: &str = "stop";
const DEFAULT_STOP_GRACE: Duration = Duration::from_secs(2);
const DEFAULT_POLL_STEP: Duration = Duration::from_millis(250);

/// Execute `tmux list-sessions` and parse the names.
///
/// A tmux server that is not running has no sessions, so that failure maps
/// to an empty list.
pub fn list_sessions(runner: &impl TmuxCommandRunner) -> Result<Vec<String>, TmuxError> {
    match runner.run(&["list-sessions", "-F", LIST_SESSIONS_FORMAT]) {
        Ok(output) => Ok(parse_list_sessions_output(&output)),
        Err(e) if e.is_no_server() => Ok(Vec::new()),
        Err(e) => Err(e),
    }
}

pub fn parse_list_sessions_output(output: &str) -> Vec<String> {
    output
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(String::from)
        .collect()
}

/// Shell command a session runs: the server's start script with its output
/// appended to the slot's log file, which the log watcher tails.
pub fn launch_command(server: &ServerRecord, slot: ServerSlot, log_dir: &Path) -> String {
    let log_file = log_dir.join(format!("{}.log", slot.session_id()));
    format!(
        "./{} 2>&1 | tee -a {}",
        shell_quote(&server.start_script),
        shell_quote(&log_file.to_string_lossy())
    )
}

fn shell_quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', r"'\''"))
}

/// Exact-match session target (tmux otherwise accepts prefixes).
fn session_target(name: &str) -> String {
    format!("={name}")
}

/// Pane target inside an exactly-matched session.
fn pane_target(name: &str) -> String {
    format!("={name}:")
}

/// tmux-backed [`SessionInspector`] and [`RemoteConsole`].
pub struct TmuxSessions<R> {
    runner: R,
    log_dir: PathBuf,
    stop_command: String,
    stop_grace: Duration,
    poll_step: Duration,
}

impl<R: TmuxCommandRunner> TmuxSessions<R> {
    pub fn new(runner: R, log_dir: impl Into<PathBuf>) -> Self {
        Self {
            runner,
            log_dir: log_dir.into(),
            stop_command: DEFAULT_STOP_COMMAND.to_string(),
            stop_grace: DEFAULT_STOP_GRACE,
            poll_step: DEFAULT_POLL_STEP,
        }
    }

    /// Text typed into a session to request a graceful shutdown.
    #[must_use]
    pub fn with_stop_command(mut self, command: impl Into<String>) -> Self {
        self.stop_command = command.into();
        self
    }

    #[must_use]
    pub fn with_stop_grace(mut self, grace: Duration) -> Self {
        self.stop_grace = grace;
        self
    }

    #[must_use]
    pub fn with_poll_step(mut self, step: Duration) -> Self {
        self.poll_step = step;
        self
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    fn type_line(&self, name: &str, text: &str) -> Result<(), TmuxError> {
        let target = pane_target(name);
        self.runner.run(&["send-keys", "-t", &target, "-l", text])?;
        self.runner.run(&["send-keys", "-t", &target, "Enter"])?;
        Ok(())
    }

    /// Poll until the session disappears or the grace period runs out.
    fn wait_gone(&self, name: &str) -> Result<bool, CollabError> {
        let deadline = Instant::now() + self.stop_grace;
        loop {
            if !self.is_session_active(name)? {
                return Ok(true);
            }
            let now = Instant::now();
            if now >= deadline {
                return Ok(false);
            }
            std::thread::sleep(self.poll_step.min(deadline - now));
        }
    }
}

impl<R: TmuxCommandRunner> SessionInspector for TmuxSessions<R> {
    fn list_active_sessions(&self) -> Result<Vec<String>, CollabError> {
        Ok(list_sessions(&self.runner)?)
    }

    fn start_session(&self, slot: ServerSlot, server: &ServerRecord) -> Result<(), CollabError> {
        if self.is_session_active(&server.name)? {
            return Err(CollabError::AlreadyRunning(server.name.clone()));
        }
        let command = launch_command(server, slot, &self.log_dir);
        let workdir = server.workdir.to_string_lossy();
        self.runner.run(&[
            "new-session",
            "-d",
            "-s",
            &server.name,
            "-c",
            &workdir,
            &command,
        ])?;
        info!(session = %server.name, %slot, script = %server.start_script, "session started");
        Ok(())
    }

    fn stop_session(&self, name: &str) -> Result<(), CollabError> {
        if !self.is_session_active(name)? {
            return Err(CollabError::NotRunning(name.to_string()));
        }
        self.type_line(name, &self.stop_command)?;
        if self.wait_gone(name)? {
            info!(session = name, "session stopped");
            return Ok(());
        }
        warn!(session = name, grace = ?self.stop_grace, "session ignored stop command, killing");
        self.runner
            .run(&["kill-session", "-t", &session_target(name)])?;
        Ok(())
    }

    fn is_session_active(&self, name: &str) -> Result<bool, CollabError> {
        Ok(list_sessions(&self.runner)?.iter().any(|s| s == name))
    }
}

impl<R: TmuxCommandRunner> RemoteConsole for TmuxSessions<R> {
    fn send_command(&self, server: &ServerRecord, command: &str) -> Result<(), CollabError> {
        if !self.is_session_active(&server.name)? {
            return Err(CollabError::NotRunning(server.name.clone()));
        }
        Ok(self.type_line(&server.name, command)?)
    }
}
