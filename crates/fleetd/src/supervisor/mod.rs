//! The watchdog: starts the fleet in dependency order, replaces any member
//! that dies, and tears everything down on an operator stop.
//!
//! All of the work happens in one control loop. Signal delivery only wakes
//! the loop; reaping, table lookups, the respawn delay and the respawn
//! itself all run here, so nothing observes a half-updated table.

mod launcher;
mod reaper;
mod signals;
mod table;

use std::path::PathBuf;
use std::time::Duration;

use nix::sys::signal::Signal;
use tokio::time::{sleep, sleep_until, Instant};

use fleet_core::topology::spawn_waves;
use fleet_core::{EndpointLayout, FleetConfig, Slot};

pub use launcher::Launcher;
pub use reaper::{reap_exited, send_signal, Exit, ExitKind, Reaped};
pub use signals::{SupervisorEvent, SupervisorSignals};
pub use table::{ProcessRecord, ProcessTable};

/// How often shutdown re-checks for exits when no SIGCHLD arrives.
const SHUTDOWN_POLL: Duration = Duration::from_millis(100);

#[derive(Debug, thiserror::Error)]
pub enum SupervisorError {
    #[error("failed to spawn {slot} ({}): {source}", .program.display())]
    Spawn {
        slot: Slot,
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot locate tier executables: {0}")]
    BinDir(std::io::Error),
    #[error("failed to install signal handlers: {0}")]
    Signals(std::io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupervisorState {
    Starting,
    Running,
    ShuttingDown,
    Terminated,
}

enum Flow {
    Continue,
    Stop(&'static str),
}

pub struct Supervisor {
    config: FleetConfig,
    layout: EndpointLayout,
    launcher: Launcher,
    table: ProcessTable,
    signals: SupervisorSignals,
    state: SupervisorState,
}

impl Supervisor {
    /// Installs the supervisor's signal handlers, so it must be called from
    /// inside a tokio runtime and before any child is spawned.
    pub fn new(config: FleetConfig, launcher: Launcher) -> Result<Self, SupervisorError> {
        let signals = SupervisorSignals::install().map_err(SupervisorError::Signals)?;
        Ok(Self {
            layout: EndpointLayout::from_config(&config),
            config,
            launcher,
            table: ProcessTable::new(),
            signals,
            state: SupervisorState::Starting,
        })
    }

    /// Run the fleet until an operator stop or a fatal spawn failure. Every
    /// child is terminated before this returns, either way.
    pub async fn run(mut self) -> Result<(), SupervisorError> {
        let result = match self.start().await {
            Ok(Flow::Continue) => {
                self.transition(SupervisorState::Running);
                self.supervise().await
            }
            Ok(Flow::Stop(signal)) => {
                tracing::info!(signal, "stop requested during startup");
                Ok(())
            }
            Err(e) => Err(e),
        };
        if let Err(e) = &result {
            tracing::error!(error = %e, "fatal supervisor error");
        }
        self.shutdown().await;
        result
    }

    fn transition(&mut self, next: SupervisorState) {
        tracing::debug!(from = ?self.state, to = ?next, "supervisor state");
        self.state = next;
    }

    /// Start each wave, then give it time to bind before the next wave
    /// starts connecting to it.
    async fn start(&mut self) -> Result<Flow, SupervisorError> {
        let settle = self.config.supervisor.settle_delay();
        for wave in spawn_waves() {
            for slot in wave {
                self.spawn(slot)?;
            }
            if let Flow::Stop(signal) = self.pause(settle).await {
                return Ok(Flow::Stop(signal));
            }
        }
        tracing::info!(processes = self.table.live_count(), "fleet started");
        Ok(Flow::Continue)
    }

    async fn supervise(&mut self) -> Result<(), SupervisorError> {
        // A child may have died while startup was pausing.
        if let Flow::Stop(signal) = self.handle_exits().await? {
            tracing::info!(signal, "received operator stop");
            return Ok(());
        }
        loop {
            let flow = match self.signals.next().await {
                SupervisorEvent::ChildExited => self.handle_exits().await?,
                SupervisorEvent::Stop(signal) => Flow::Stop(signal),
            };
            if let Flow::Stop(signal) = flow {
                tracing::info!(signal, "received operator stop");
                return Ok(());
            }
        }
    }

    /// Reap until nothing is left to reap, respawning every fleet member
    /// found dead. All deaths in a batch are recorded before the first
    /// respawn delay starts.
    async fn handle_exits(&mut self) -> Result<Flow, SupervisorError> {
        let respawn_delay = self.config.supervisor.respawn_delay();
        loop {
            let reaped = reap_exited();
            if reaped.exits.is_empty() {
                return Ok(Flow::Continue);
            }

            let mut dead = Vec::new();
            for exit in reaped.exits {
                match self.table.slot_of(exit.pid) {
                    Some(slot) => {
                        let uptime_ms = self
                            .table
                            .get(slot)
                            .map(|r| r.started_at.elapsed().as_millis() as u64)
                            .unwrap_or(0);
                        self.table.mark_exited(slot);
                        tracing::warn!(
                            %slot,
                            pid = %exit.pid,
                            status = %exit.kind,
                            uptime_ms,
                            "fleet member died"
                        );
                        dead.push(slot);
                    }
                    None => tracing::warn!(
                        pid = %exit.pid,
                        status = %exit.kind,
                        "reaped a child that is not in the process table"
                    ),
                }
            }

            for slot in dead {
                if let Flow::Stop(signal) = self.pause(respawn_delay).await {
                    return Ok(Flow::Stop(signal));
                }
                self.spawn(slot)?;
            }
        }
    }

    fn spawn(&mut self, slot: Slot) -> Result<(), SupervisorError> {
        let pid = self.launcher.spawn(slot)?;
        let record = self.table.record_spawn(slot, pid, self.layout.path(slot));
        if record.restarts == 0 {
            tracing::info!(%slot, %pid, endpoint = %record.endpoint.display(), "started");
        } else {
            tracing::info!(%slot, %pid, restarts = record.restarts, "respawned");
        }
        Ok(())
    }

    /// Wait out `delay`, returning early only on an operator stop. Child
    /// exits seen meanwhile are left for the next reap.
    async fn pause(&mut self, delay: Duration) -> Flow {
        let deadline = sleep_until(Instant::now() + delay);
        tokio::pin!(deadline);
        loop {
            tokio::select! {
                _ = &mut deadline => return Flow::Continue,
                event = self.signals.next() => {
                    if let SupervisorEvent::Stop(signal) = event {
                        return Flow::Stop(signal);
                    }
                }
            }
        }
    }

    /// SIGTERM every live child, wait for them to exit, and SIGKILL any
    /// still running after the grace period.
    async fn shutdown(&mut self) {
        self.transition(SupervisorState::ShuttingDown);
        for record in self.table.live() {
            tracing::info!(slot = %record.slot, pid = %record.pid, "terminating");
            send_signal(record.pid, Signal::SIGTERM);
        }

        let deadline = Instant::now() + self.config.supervisor.shutdown_grace();
        let mut escalated = false;
        loop {
            let reaped = reap_exited();
            for exit in reaped.exits {
                if let Some(slot) = self.table.slot_of(exit.pid) {
                    self.table.mark_exited(slot);
                    tracing::info!(%slot, pid = %exit.pid, status = %exit.kind, "exited");
                }
            }
            if self.table.live_count() == 0 {
                break;
            }
            if reaped.no_children {
                tracing::warn!(
                    remaining = self.table.live_count(),
                    "no children left to wait for"
                );
                break;
            }

            if !escalated && Instant::now() >= deadline {
                for record in self.table.live() {
                    tracing::warn!(slot = %record.slot, pid = %record.pid, "grace period expired, killing");
                    send_signal(record.pid, Signal::SIGKILL);
                }
                escalated = true;
            }

            tokio::select! {
                _ = sleep(SHUTDOWN_POLL) => {}
                event = self.signals.next() => {
                    if let SupervisorEvent::Stop(signal) = event {
                        tracing::info!(signal, "already shutting down");
                    }
                }
            }
        }

        self.transition(SupervisorState::Terminated);
        tracing::info!("all fleet processes terminated");
    }
}
