//! Which pid fills which slot.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Instant;

use nix::unistd::Pid;

use fleet_core::Slot;

#[derive(Debug, Clone)]
pub struct ProcessRecord {
    pub slot: Slot,
    pub pid: Pid,
    pub endpoint: PathBuf,
    /// Times this slot has been respawned after a death.
    pub restarts: u32,
    pub started_at: Instant,
    /// False once the process has been reaped and not yet replaced.
    pub alive: bool,
}

/// One record per slot, ordered the same way the fleet is started.
#[derive(Debug, Default)]
pub struct ProcessTable {
    records: BTreeMap<Slot, ProcessRecord>,
}

impl ProcessTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a freshly spawned process. A slot seen before keeps its
    /// history and counts one more restart.
    pub fn record_spawn(&mut self, slot: Slot, pid: Pid, endpoint: PathBuf) -> &ProcessRecord {
        let now = Instant::now();
        let record = self
            .records
            .entry(slot)
            .and_modify(|r| r.restarts += 1)
            .or_insert_with(|| ProcessRecord {
                slot,
                pid,
                endpoint: endpoint.clone(),
                restarts: 0,
                started_at: now,
                alive: true,
            });
        record.pid = pid;
        record.endpoint = endpoint;
        record.started_at = now;
        record.alive = true;
        record
    }

    /// Slot of a live process, if the pid is one of ours.
    pub fn slot_of(&self, pid: Pid) -> Option<Slot> {
        self.records
            .values()
            .find(|r| r.alive && r.pid == pid)
            .map(|r| r.slot)
    }

    pub fn mark_exited(&mut self, slot: Slot) {
        if let Some(record) = self.records.get_mut(&slot) {
            record.alive = false;
        }
    }

    pub fn get(&self, slot: Slot) -> Option<&ProcessRecord> {
        self.records.get(&slot)
    }

    pub fn live(&self) -> impl Iterator<Item = &ProcessRecord> {
        self.records.values().filter(|r| r.alive)
    }

    pub fn live_count(&self) -> usize {
        self.live().count()
    }
}
