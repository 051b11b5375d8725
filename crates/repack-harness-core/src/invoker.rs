// crates/repack-harness-core/src/invoker.rs
// ============================================================================
// Module: Tool Invoker
// Description: Runs the external repackaging tool as a child process.
// Purpose: Gate scenario progress on the tool's exit status.
// Dependencies: serde, std::process
// ============================================================================

//! ## Overview
//! The external tool is a black box driven through three subcommands. The
//! invoker only looks at the exit status; whatever files the tool writes are
//! checked later by the digest verifier.
//!
//! Launch conventions differ per host (argument vector vs. a single shell
//! command line). Both live behind [`ProcessLauncher`] and one implementation
//! is chosen when the invoker is built; call sites never branch on platform.
//! Invariants:
//! - Tool output is never parsed.
//! - A timed-out tool is killed with every process it started, and the
//!   direct child is reaped before the error is returned.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
#[cfg(unix)]
use std::os::unix::process::CommandExt;
use std::path::Path;
use std::path::PathBuf;
use std::process::Child;
use std::process::Command;
use std::process::ExitStatus;
use std::process::Stdio;
use std::thread;
use std::time::Duration;
use std::time::Instant;

use serde::Deserialize;
use serde::Serialize;

use crate::error::HarnessError;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Initial poll interval while waiting on a bounded child.
const POLL_INITIAL: Duration = Duration::from_millis(10);
/// Poll interval ceiling while waiting on a bounded child.
const POLL_MAX: Duration = Duration::from_millis(200);

// ============================================================================
// SECTION: Tool Commands
// ============================================================================

/// Subcommands understood by the external tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolCommand {
    /// Split input images into the build tree and descriptor.
    Unpack,
    /// Rebuild and sign images from the build tree.
    Pack,
    /// Remove the tool's own intermediate state.
    Clear,
}

impl ToolCommand {
    /// Returns the subcommand argument.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Unpack => "unpack",
            Self::Pack => "pack",
            Self::Clear => "clear",
        }
    }
}

impl fmt::Display for ToolCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Program plus fixed leading arguments for the external tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolSpec {
    /// Executable or script to launch.
    pub program: String,
    /// Arguments placed before the subcommand.
    #[serde(default)]
    pub args: Vec<String>,
}

impl ToolSpec {
    /// Creates a tool spec without leading arguments.
    #[must_use]
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Returns the conventional Gradle wrapper for the host.
    #[must_use]
    pub fn host_default() -> Self {
        if cfg!(windows) { Self::new("gradlew.bat") } else { Self::new("./gradlew") }
    }

    /// Returns the full argument list for a subcommand.
    fn argv(&self, command: ToolCommand) -> Vec<&str> {
        self.args.iter().map(String::as_str).chain(std::iter::once(command.as_str())).collect()
    }
}

// ============================================================================
// SECTION: Launchers
// ============================================================================

/// Process launch convention.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LaunchMode {
    /// Shell on Windows, argument vector elsewhere.
    #[default]
    Auto,
    /// Argument vector.
    Argv,
    /// Single command line through the platform shell.
    Shell,
}

impl LaunchMode {
    /// Resolves `Auto` for the current host.
    #[must_use]
    pub const fn resolve(self) -> Self {
        match self {
            Self::Auto => {
                if cfg!(windows) {
                    Self::Shell
                } else {
                    Self::Argv
                }
            }
            other => other,
        }
    }

    /// Returns the launcher implementing this convention.
    #[must_use]
    pub fn launcher(self) -> Box<dyn ProcessLauncher> {
        match self.resolve() {
            Self::Shell => Box::new(ShellLauncher),
            Self::Argv | Self::Auto => Box::new(ArgvLauncher),
        }
    }
}

/// Builds the child process for one tool subcommand.
pub trait ProcessLauncher: Send + Sync {
    /// Returns an unspawned command for the subcommand.
    fn command(&self, tool: &ToolSpec, subcommand: ToolCommand) -> Command;

    /// Returns the launch convention implemented.
    fn mode(&self) -> LaunchMode;
}

/// Launches the program directly with an argument vector.
pub struct ArgvLauncher;

impl ProcessLauncher for ArgvLauncher {
    fn command(&self, tool: &ToolSpec, subcommand: ToolCommand) -> Command {
        let mut command = Command::new(&tool.program);
        command.args(tool.argv(subcommand));
        command
    }

    fn mode(&self) -> LaunchMode {
        LaunchMode::Argv
    }
}

/// Launches a single command line through the platform shell.
pub struct ShellLauncher;

impl ShellLauncher {
    /// Joins the program and arguments into one command line.
    #[must_use]
    pub fn command_line(tool: &ToolSpec, subcommand: ToolCommand) -> String {
        std::iter::once(tool.program.as_str())
            .chain(tool.argv(subcommand))
            .map(quote_word)
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl ProcessLauncher for ShellLauncher {
    fn command(&self, tool: &ToolSpec, subcommand: ToolCommand) -> Command {
        let line = Self::command_line(tool, subcommand);
        let mut command = if cfg!(windows) {
            let mut command = Command::new("cmd");
            command.arg("/C");
            command
        } else {
            let mut command = Command::new("sh");
            command.arg("-c");
            command
        };
        command.arg(line);
        command
    }

    fn mode(&self) -> LaunchMode {
        LaunchMode::Shell
    }
}

/// Double-quotes a word containing whitespace.
fn quote_word(word: &str) -> String {
    if word.chars().any(char::is_whitespace) {
        format!("\"{word}\"")
    } else {
        word.to_string()
    }
}

// ============================================================================
// SECTION: Invoker
// ============================================================================

/// Where child stdout/stderr go.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputMode {
    /// Share the harness's stdout/stderr.
    #[default]
    Inherit,
    /// Discard child output.
    Quiet,
}

/// Completed invocation details.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvocationReport {
    /// Subcommand that ran.
    pub command: ToolCommand,
    /// Exit code (always zero on success).
    pub exit_code: Option<i32>,
    /// Wall-clock duration.
    pub elapsed: Duration,
}

/// Runs tool subcommands in the workspace directory.
pub struct ToolInvoker {
    /// Tool program and leading args.
    tool: ToolSpec,
    /// Launch convention selected at construction.
    launcher: Box<dyn ProcessLauncher>,
    /// Child working directory.
    working_dir: PathBuf,
    /// Optional wait bound.
    timeout: Option<Duration>,
    /// Child output routing.
    output: OutputMode,
}

impl ToolInvoker {
    /// Creates an invoker with the given launch convention.
    #[must_use]
    pub fn new(tool: ToolSpec, mode: LaunchMode, working_dir: impl Into<PathBuf>) -> Self {
        Self::with_launcher(tool, mode.launcher(), working_dir)
    }

    /// Creates an invoker around an explicit launcher.
    #[must_use]
    pub fn with_launcher(
        tool: ToolSpec,
        launcher: Box<dyn ProcessLauncher>,
        working_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            tool,
            launcher,
            working_dir: working_dir.into(),
            timeout: None,
            output: OutputMode::Inherit,
        }
    }

    /// Bounds every invocation by `timeout`.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets child output routing.
    #[must_use]
    pub const fn with_output(mut self, output: OutputMode) -> Self {
        self.output = output;
        self
    }

    /// Returns the tool spec.
    #[must_use]
    pub const fn tool(&self) -> &ToolSpec {
        &self.tool
    }

    /// Returns the active launch convention.
    #[must_use]
    pub fn mode(&self) -> LaunchMode {
        self.launcher.mode()
    }

    /// Returns the child working directory.
    #[must_use]
    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }

    /// Runs a subcommand and waits for it to exit.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::ToolLaunch`] when the child cannot start,
    /// [`HarnessError::ToolTimedOut`] when the wait bound elapses, and
    /// [`HarnessError::ToolInvocationFailed`] on a non-zero exit.
    pub fn invoke(&self, command: ToolCommand) -> Result<InvocationReport, HarnessError> {
        let mut process = self.launcher.command(&self.tool, command);
        process.current_dir(&self.working_dir).stdin(Stdio::null());
        if self.timeout.is_some() {
            lead_process_group(&mut process);
        }
        if self.output == OutputMode::Quiet {
            process.stdout(Stdio::null()).stderr(Stdio::null());
        }
        let started = Instant::now();
        let mut child = process.spawn().map_err(|err| HarnessError::ToolLaunch {
            command,
            message: err.to_string(),
        })?;
        let status = match self.timeout {
            Some(timeout) => wait_bounded(&mut child, command, timeout)?,
            None => child.wait().map_err(|err| HarnessError::ToolLaunch {
                command,
                message: err.to_string(),
            })?,
        };
        if !status.success() {
            return Err(HarnessError::ToolInvocationFailed {
                command,
                exit_code: status.code(),
            });
        }
        Ok(InvocationReport {
            command,
            exit_code: status.code(),
            elapsed: started.elapsed(),
        })
    }
}

/// Polls a child until it exits or the bound elapses.
fn wait_bounded(
    child: &mut Child,
    command: ToolCommand,
    timeout: Duration,
) -> Result<ExitStatus, HarnessError> {
    let deadline = Instant::now() + timeout;
    let mut interval = POLL_INITIAL;
    loop {
        let polled = child.try_wait().map_err(|err| HarnessError::ToolLaunch {
            command,
            message: err.to_string(),
        })?;
        if let Some(status) = polled {
            return Ok(status);
        }
        let now = Instant::now();
        if now >= deadline {
            terminate_tree(child);
            let _ = child.kill();
            let _ = child.wait();
            return Err(HarnessError::ToolTimedOut {
                command,
                timeout,
            });
        }
        thread::sleep(interval.min(deadline - now));
        interval = (interval * 2).min(POLL_MAX);
    }
}

/// Starts the child as leader of a new process group so a timeout can kill
/// the wrapper and everything it spawned.
#[cfg(unix)]
fn lead_process_group(process: &mut Command) {
    process.process_group(0);
}

/// Windows kills the tree by parent pid; no group setup is needed.
#[cfg(not(unix))]
const fn lead_process_group(_process: &mut Command) {}

/// Kills the child and every descendant sharing its process group.
#[cfg(unix)]
fn terminate_tree(child: &Child) {
    let group = format!("-{}", child.id());
    let _ = Command::new("kill")
        .args(["-KILL", "--", group.as_str()])
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status();
}

/// Kills the child and its descendant process tree.
#[cfg(windows)]
fn terminate_tree(child: &Child) {
    let pid = child.id().to_string();
    let _ = Command::new("taskkill")
        .args(["/F", "/T", "/PID", pid.as_str()])
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status();
}

/// Falls back to killing the direct child only.
#[cfg(not(any(unix, windows)))]
const fn terminate_tree(_child: &Child) {}
