//! External command execution
//!
//! Commands run to completion one at a time. Their stdout and stderr are
//! relayed line by line into the log while a tail of the output is kept for
//! the error report if the command fails.

use crate::error::{DeployError, Result};
use std::collections::VecDeque;
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;

/// Lines of output kept for a failure diagnostic
pub const DIAGNOSTIC_TAIL: usize = 40;

/// An external command line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    /// Program to execute
    pub program: String,
    /// Arguments
    pub args: Vec<String>,
    /// Working directory, inherited when unset
    pub current_dir: Option<PathBuf>,
}

impl CommandSpec {
    /// Create a command for `program` with no arguments
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            current_dir: None,
        }
    }

    /// Append an argument
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append several arguments
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Run in `dir`
    pub fn current_dir(mut self, dir: &Path) -> Self {
        self.current_dir = Some(dir.to_path_buf());
        self
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args).stdin(Stdio::null());
        if let Some(dir) = &self.current_dir {
            cmd.current_dir(dir);
        }
        cmd
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
enum Stream {
    Stdout,
    Stderr,
}

impl Stream {
    fn as_str(self) -> &'static str {
        match self {
            Stream::Stdout => "stdout",
            Stream::Stderr => "stderr",
        }
    }
}

/// Run a command, relaying its output, and fail on a non-zero exit.
pub async fn run(spec: &CommandSpec) -> Result<()> {
    tracing::info!(command = %spec, "Running");

    let mut child = spec
        .command()
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| DeployError::ExternalCommandFailed {
            command: spec.to_string(),
            status: "failed to start".to_string(),
            output: e.to_string(),
        })?;

    let stdout = child.stdout.take();
    let stderr = child.stderr.take();

    // Both pipes are drained together so a chatty stderr cannot block the
    // child while stdout is being read.
    let (out, err) = tokio::join!(
        relay(stdout, Stream::Stdout),
        relay(stderr, Stream::Stderr)
    );
    let status = child.wait().await?;

    if status.success() {
        tracing::debug!(command = %spec, "Command finished");
        return Ok(());
    }

    let status = match status.code() {
        Some(code) => format!("exit code {}", code),
        None => "terminated by signal".to_string(),
    };
    let tail = if err.is_empty() { out } else { err };

    Err(DeployError::ExternalCommandFailed {
        command: spec.to_string(),
        status,
        output: tail.into_iter().collect::<Vec<_>>().join("\n"),
    })
}

/// Run a command quietly and return its trimmed stdout if it succeeded.
///
/// A command that cannot be started or exits non-zero yields `None`.
pub async fn capture(spec: &CommandSpec) -> Option<String> {
    let output = match spec.command().output().await {
        Ok(output) => output,
        Err(e) => {
            tracing::debug!(command = %spec, error = %e, "Command could not be started");
            return None;
        }
    };

    if !output.status.success() {
        tracing::debug!(
            command = %spec,
            stderr = %String::from_utf8_lossy(&output.stderr).trim(),
            "Command failed"
        );
        return None;
    }

    Some(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

async fn relay<R>(reader: Option<R>, stream: Stream) -> VecDeque<String>
where
    R: AsyncRead + Unpin,
{
    let mut tail = VecDeque::with_capacity(DIAGNOSTIC_TAIL);
    let Some(reader) = reader else {
        return tail;
    };

    let mut lines = BufReader::new(reader).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                tracing::info!(stream = stream.as_str(), "{}", line);
                if tail.len() == DIAGNOSTIC_TAIL {
                    tail.pop_front();
                }
                tail.push_back(line);
            }
            Ok(None) => break,
            Err(e) => {
                tracing::warn!(stream = stream.as_str(), error = %e, "Stopped relaying output");
                break;
            }
        }
    }

    tail
}
