//! Signals the supervisor reacts to. Handlers only record delivery; the
//! control loop does all the work.

use tokio::signal::unix::{signal, Signal, SignalKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupervisorEvent {
    ChildExited,
    /// Operator asked the fleet to stop (SIGINT or SIGTSTP).
    Stop(&'static str),
}

pub struct SupervisorSignals {
    child: Signal,
    interrupt: Signal,
    stop: Signal,
    terminate: Signal,
}

impl SupervisorSignals {
    /// Must be called from inside a tokio runtime.
    pub fn install() -> std::io::Result<Self> {
        Ok(Self {
            child: signal(SignalKind::child())?,
            interrupt: signal(SignalKind::interrupt())?,
            stop: signal(SignalKind::from_raw(libc::SIGTSTP))?,
            terminate: signal(SignalKind::terminate())?,
        })
    }

    pub async fn next(&mut self) -> SupervisorEvent {
        tokio::select! {
            _ = self.child.recv() => SupervisorEvent::ChildExited,
            _ = self.interrupt.recv() => SupervisorEvent::Stop("SIGINT"),
            _ = self.stop.recv() => SupervisorEvent::Stop("SIGTSTP"),
            _ = self.terminate.recv() => SupervisorEvent::Stop("SIGTERM"),
        }
    }
}
