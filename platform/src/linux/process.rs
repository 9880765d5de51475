use fsmgr_core::{FsMgrError, HelperChild, HelperLauncher, WaitEvent};
use log::debug;
use nix::sys::wait::{waitpid, WaitStatus};
use nix::unistd::Pid;
use std::path::Path;
use std::process::{Child, Command, Stdio};

/// Spawns helpers with `std::process` and waits on their exact pid with
/// `waitpid(2)`, so a wait that reports some other child is visible.
pub struct WaitpidLauncher;

impl HelperLauncher for WaitpidLauncher {
    fn spawn(&self, program: &Path, args: &[String]) -> Result<Box<dyn HelperChild>, FsMgrError> {
        debug!("Running {} {:?}", program.display(), args);

        let child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .spawn()
            .map_err(|e| FsMgrError::HelperSpawn {
                program: program.to_path_buf(),
                source: e,
            })?;

        Ok(Box::new(WaitpidChild::new(child)))
    }
}

pub struct WaitpidChild {
    pid: Pid,
    // Kept so stdio handles live as long as the child.
    _child: Child,
}

impl WaitpidChild {
    fn new(child: Child) -> Self {
        Self {
            pid: Pid::from_raw(child.id() as i32),
            _child: child,
        }
    }
}

fn raw_pid(pid: Pid) -> u32 {
    pid.as_raw() as u32
}

impl HelperChild for WaitpidChild {
    fn pid(&self) -> u32 {
        raw_pid(self.pid)
    }

    fn wait(&mut self) -> WaitEvent {
        match waitpid(self.pid, None) {
            Ok(WaitStatus::Exited(pid, code)) => WaitEvent::Exited {
                pid: raw_pid(pid),
                code,
            },
            Ok(status) => {
                debug!("Child {} changed state: {:?}", self.pid, status);
                WaitEvent::Changed {
                    pid: status.pid().map(raw_pid),
                }
            }
            Err(errno) => WaitEvent::Failed(errno.into()),
        }
    }
}
