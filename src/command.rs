//! Shell command steps (deploy and lint).
//!
//! Deploy targets and the lint step are ordered lists of opaque shell
//! commands from `config.toml`. They run through the [`CommandRunner`] trait so
//! the sequencing logic can be tested without spawning processes; the
//! production runner is [`ShellRunner`] (`sh -c <command>`).
//!
//! A step succeeds on exit status zero. [`run_sequence`] stops at the first
//! failing step and returns [`CommandError::Failed`] carrying the command,
//! its status and its captured stderr verbatim. Nothing is retried.

use std::fmt;
use std::path::Path;
use std::process::Command;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CommandError {
    #[error("failed to start `{command}`: {source}")]
    Spawn {
        command: String,
        source: std::io::Error,
    },
    #[error("`{command}` failed with {status}\n{stderr}")]
    Failed {
        command: String,
        status: StepStatus,
        stderr: String,
    },
}

/// Exit status of a finished command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepStatus {
    Code(i32),
    /// Terminated without an exit code (e.g. by a signal).
    Killed,
}

impl StepStatus {
    pub fn success(self) -> bool {
        self == StepStatus::Code(0)
    }
}

impl fmt::Display for StepStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StepStatus::Code(c) => write!(f, "exit status {c}"),
            StepStatus::Killed => f.write_str("no exit status (killed)"),
        }
    }
}

/// Captured result of one command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    pub command: String,
    pub status: StepStatus,
    pub stdout: String,
    pub stderr: String,
}

/// Runs one shell command to completion.
pub trait CommandRunner: Sync {
    /// Run `command` in `cwd`, capturing its output.
    ///
    /// A non-zero exit is not an error at this level; only failing to start
    /// the command is.
    fn run(&self, command: &str, cwd: &Path) -> Result<CommandOutput, CommandError>;
}

/// Runs commands through `sh -c`.
#[derive(Debug, Default, Clone, Copy)]
pub struct ShellRunner;

impl CommandRunner for ShellRunner {
    fn run(&self, command: &str, cwd: &Path) -> Result<CommandOutput, CommandError> {
        let output = Command::new("sh")
            .arg("-c")
            .arg(command)
            .current_dir(cwd)
            .output()
            .map_err(|source| CommandError::Spawn {
                command: command.to_string(),
                source,
            })?;
        Ok(CommandOutput {
            command: command.to_string(),
            status: output.status.code().map_or(StepStatus::Killed, StepStatus::Code),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

/// Run `commands` in order, stopping at the first failure.
///
/// `on_step` sees every completed step, including the failing one, before the
/// sequence decides whether to continue.
pub fn run_sequence(
    runner: &dyn CommandRunner,
    commands: &[String],
    cwd: &Path,
    mut on_step: impl FnMut(&CommandOutput),
) -> Result<Vec<CommandOutput>, CommandError> {
    let mut outputs = Vec::with_capacity(commands.len());
    for command in commands {
        let output = runner.run(command, cwd)?;
        on_step(&output);
        if !output.status.success() {
            return Err(CommandError::Failed {
                command: output.command,
                status: output.status,
                stderr: output.stderr,
            });
        }
        outputs.push(output);
    }
    Ok(outputs)
}
