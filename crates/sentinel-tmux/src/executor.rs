//! Subprocess boundary: every tmux call the sentinel makes goes through a
//! [`TmuxCommandRunner`], so session logic can be tested against a fake.

use std::process::{Command, Output};

use tracing::debug;

use crate::error::TmuxError;

/// Runs one tmux invocation and returns its stdout.
pub trait TmuxCommandRunner: Send + Sync {
    fn run(&self, args: &[&str]) -> Result<String, TmuxError>;
}

impl<T: TmuxCommandRunner + ?Sized> TmuxCommandRunner for &T {
    fn run(&self, args: &[&str]) -> Result<String, TmuxError> {
        (**self).run(args)
    }
}

/// Which tmux server the game sessions live on.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TmuxSocket {
    /// The invoking user's default server.
    #[default]
    Default,
    /// `-S <path>`
    Path(String),
    /// `-L <name>`
    Name(String),
}

impl TmuxSocket {
    fn args(&self) -> Vec<&str> {
        match self {
            Self::Default => Vec::new(),
            Self::Path(path) => vec!["-S", path.as_str()],
            Self::Name(name) => vec!["-L", name.as_str()],
        }
    }

    fn label(&self) -> String {
        match self {
            Self::Default => "the default socket".to_string(),
            Self::Path(path) => format!("socket {path}"),
            Self::Name(name) => format!("socket name {name}"),
        }
    }
}

/// Runs the tmux binary against one server socket.
#[derive(Debug, Clone)]
pub struct TmuxExecutor {
    tmux_bin: String,
    socket: TmuxSocket,
}

impl TmuxExecutor {
    pub fn new(tmux_bin: impl Into<String>, socket: TmuxSocket) -> Self {
        Self {
            tmux_bin: tmux_bin.into(),
            socket,
        }
    }

    /// `tmux` from `$PATH` on the given socket.
    pub fn on_socket(socket: TmuxSocket) -> Self {
        Self::new("tmux", socket)
    }

    pub fn socket(&self) -> &TmuxSocket {
        &self.socket
    }

    fn spawn(&self, args: &[&str]) -> Result<Output, TmuxError> {
        Command::new(&self.tmux_bin)
            .args(self.socket.args())
            .args(args)
            .output()
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => TmuxError::NotFound(self.tmux_bin.clone()),
                _ => TmuxError::Io(e),
            })
    }

    /// Turn a non-zero exit into a typed error. An absent server is its
    /// own variant because callers treat it as "no sessions".
    fn failure(&self, args: &[&str], output: &Output) -> TmuxError {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        if is_no_server_message(&stderr) {
            return TmuxError::NoServer {
                socket: self.socket.label(),
            };
        }
        TmuxError::CommandFailed {
            command: args.first().copied().unwrap_or("").to_string(),
            status: output
                .status
                .code()
                .map(|c| format!("exit {c}"))
                .unwrap_or_else(|| "signal".to_string()),
            stderr,
        }
    }
}

impl Default for TmuxExecutor {
    fn default() -> Self {
        Self::on_socket(TmuxSocket::Default)
    }
}

impl TmuxCommandRunner for TmuxExecutor {
    fn run(&self, args: &[&str]) -> Result<String, TmuxError> {
        debug!(socket = ?self.socket, ?args, "tmux");
        let output = self.spawn(args)?;
        if !output.status.success() {
            return Err(self.failure(args, &output));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// tmux wording when no server listens on the socket.
pub fn is_no_server_message(stderr: &str) -> bool {
    stderr.contains("no server running") || stderr.contains("error connecting to")
}
