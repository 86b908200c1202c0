//! Subprocess invocation behind a trait so probes and script fallbacks can be
//! exercised without spawning real processes.

use std::{
    collections::VecDeque,
    io,
    process::Command,
    sync::Mutex,
};

/// Captured result of a finished subprocess.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code; `None` when the process was terminated by a signal.
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(stdout: impl Into<String>) -> Self {
        Self {
            code: Some(0),
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    pub fn failure(code: i32, stderr: impl Into<String>) -> Self {
        Self {
            code: Some(code),
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.code == Some(0)
    }
}

/// Runs a program to completion and captures its output.
///
/// No timeout is applied; a hung child blocks the caller until it exits.
pub trait CommandRunner: Send + Sync {
    fn run(&self, program: &str, args: &[String]) -> io::Result<CommandOutput>;
}

/// Spawns real processes with [`std::process::Command`].
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, program: &str, args: &[String]) -> io::Result<CommandOutput> {
        let output = Command::new(program).args(args).output()?;
        Ok(CommandOutput {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

/// One recorded call made through a [`ScriptedRunner`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
}

/// Replays queued outputs in order and records every invocation.
///
/// When the queue is empty, calls fail with `NotFound` as if the program
/// were missing.
#[derive(Debug, Default)]
pub struct ScriptedRunner {
    replies: Mutex<VecDeque<io::Result<CommandOutput>>>,
    calls: Mutex<Vec<Invocation>>,
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, reply: io::Result<CommandOutput>) -> &Self {
        self.replies
            .lock()
            .unwrap_or_else(|err| err.into_inner())
            .push_back(reply);
        self
    }

    pub fn calls(&self) -> Vec<Invocation> {
        self.calls
            .lock()
            .unwrap_or_else(|err| err.into_inner())
            .clone()
    }
}

impl CommandRunner for ScriptedRunner {
    fn run(&self, program: &str, args: &[String]) -> io::Result<CommandOutput> {
        self.calls
            .lock()
            .unwrap_or_else(|err| err.into_inner())
            .push(Invocation {
                program: program.to_string(),
                args: args.to_vec(),
            });
        self.replies
            .lock()
            .unwrap_or_else(|err| err.into_inner())
            .pop_front()
            .unwrap_or_else(|| {
                Err(io::Error::new(
                    io::ErrorKind::NotFound,
                    format!("no scripted reply for {program}"),
                ))
            })
    }
}
