//! Non-blocking collection of exited children.

use std::fmt;

use nix::errno::Errno;
use nix::sys::signal::{kill, Signal};
use nix::sys::wait::{waitpid, WaitPidFlag, WaitStatus};
use nix::unistd::Pid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitKind {
    Code(i32),
    Signal(Signal),
}

impl fmt::Display for ExitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExitKind::Code(code) => write!(f, "exit code {code}"),
            ExitKind::Signal(sig) => write!(f, "killed by {}", sig.as_str()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Exit {
    pub pid: Pid,
    pub kind: ExitKind,
}

#[derive(Debug, Default)]
pub struct Reaped {
    pub exits: Vec<Exit>,
    /// `waitpid` reported that this process has no children left.
    pub no_children: bool,
}

/// Serialises tests that reap with `waitpid(-1)`, which would otherwise
/// collect each other's children.
#[cfg(test)]
pub(super) static TEST_REAP_LOCK: std::sync::Mutex<()> = std::sync::Mutex::new(());

/// Collect every child that has already exited, without blocking.
pub fn reap_exited() -> Reaped {
    let mut reaped = Reaped::default();
    loop {
        match waitpid(Pid::from_raw(-1), Some(WaitPidFlag::WNOHANG)) {
            Ok(WaitStatus::Exited(pid, code)) => reaped.exits.push(Exit {
                pid,
                kind: ExitKind::Code(code),
            }),
            Ok(WaitStatus::Signaled(pid, sig, _)) => reaped.exits.push(Exit {
                pid,
                kind: ExitKind::Signal(sig),
            }),
            Ok(WaitStatus::StillAlive) => break,
            // Stop/continue notifications are not requested; skip anything else.
            Ok(_) => continue,
            Err(Errno::EINTR) => continue,
            Err(Errno::ECHILD) => {
                reaped.no_children = true;
                break;
            }
            Err(e) => {
                tracing::warn!(error = %e, "waitpid failed");
                break;
            }
        }
    }
    reaped
}

/// Send `sig` to `pid`. Returns false if the process is already gone.
pub fn send_signal(pid: Pid, sig: Signal) -> bool {
    match kill(pid, sig) {
        Ok(()) => true,
        Err(Errno::ESRCH) => false,
        Err(e) => {
            tracing::warn!(%pid, signal = sig.as_str(), error = %e, "kill failed");
            false
        }
    }
}
