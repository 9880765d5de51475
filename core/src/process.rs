//! Spawning an external helper and waiting for it to exit.
//!
//! Each target provides one [`HelperLauncher`]. The retry policy lives here,
//! in [`HelperState`], so every target waits the same way.

use crate::FsMgrError;
use log::{error, info};
use std::path::Path;

/// Result of a single wait call on a child.
#[derive(Debug)]
pub enum WaitEvent {
    /// The child with `pid` exited with `code`.
    Exited { pid: u32, code: i32 },
    /// Some state change that is not an exit (signal, stop, continue).
    Changed { pid: Option<u32> },
    /// The wait call itself failed.
    Failed(std::io::Error),
}

pub trait HelperChild {
    fn pid(&self) -> u32;

    /// Blocks until the child changes state.
    fn wait(&mut self) -> WaitEvent;
}

pub trait HelperLauncher: Send + Sync {
    fn spawn(&self, program: &Path, args: &[String]) -> Result<Box<dyn HelperChild>, FsMgrError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HelperState {
    Spawned { pid: u32 },
    Waiting { pid: u32 },
    Exited(i32),
    Error(String),
}

impl HelperState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, HelperState::Exited(_) | HelperState::Error(_))
    }

    /// Transition on the outcome of one wait call.
    pub fn on_wait(self, event: WaitEvent) -> HelperState {
        let expected = match self {
            HelperState::Spawned { pid } | HelperState::Waiting { pid } => pid,
            terminal => return terminal,
        };

        match event {
            WaitEvent::Exited { pid, code } if pid == expected => HelperState::Exited(code),
            WaitEvent::Changed { pid: Some(pid) } if pid == expected => {
                HelperState::Waiting { pid }
            }
            WaitEvent::Exited { pid, .. } | WaitEvent::Changed { pid: Some(pid) } => {
                HelperState::Error(format!("waited for {} but got {}", expected, pid))
            }
            WaitEvent::Changed { pid: None } => {
                HelperState::Error(format!("wait for {} returned no child", expected))
            }
            WaitEvent::Failed(e) => HelperState::Error(format!("wait for {} failed: {}", expected, e)),
        }
    }
}

/// Spawns `program` and waits until it exits, returning its exit status.
pub fn run_to_exit(
    launcher: &dyn HelperLauncher,
    program: &Path,
    args: &[String],
) -> Result<i32, FsMgrError> {
    let mut child = launcher.spawn(program, args)?;
    let mut state = HelperState::Spawned { pid: child.pid() };

    loop {
        state = state.on_wait(child.wait());
        match &state {
            HelperState::Exited(code) => {
                info!("{} done, status {}", program.display(), code);
                return Ok(*code);
            }
            HelperState::Error(reason) => {
                error!("Error waiting for child process - {}", reason);
                return Err(FsMgrError::HelperWait(reason.clone()));
            }
            _ => error!("Still waiting for {}...", program.display()),
        }
    }
}
