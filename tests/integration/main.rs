//! Fleet integration test harness.
//!
//! Runs the whole request path in one process: every tier is a
//! `TieredRelay` task bound to its real endpoint under a private temp dir,
//! so the sockets, the wire records and the policies are the ones the tier
//! executables use. Process supervision is covered by the `fleetd` crate's
//! own tests.
//!
//!   cargo test --test integration

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::UnixStream;
use tokio::task::JoinHandle;
use zerocopy::AsBytes;

use fleet_core::config::RelayConfig;
use fleet_core::topology::spawn_waves;
use fleet_core::{EndpointLayout, Request, Role, Slot};
use fleet_tiers::{
    ComputePolicy, DispatchPolicy, RelaySettings, RouterPolicy, ShutdownFlag, TierPolicy,
    TierStats, TieredRelay,
};

mod failures;
mod lifecycle;
mod routing;

// ── Harness ───────────────────────────────────────────────────────────────────

/// Router reply wait; the dispatch tier and clients add hop margins on top.
pub const RESPONSE_TIMEOUT: Duration = Duration::from_millis(500);

/// Fast timings shared by every tier in a test chain.
pub fn relay_config() -> RelayConfig {
    RelayConfig {
        poll_interval_ms: 20,
        request_timeout_ms: 500,
        response_timeout_ms: RESPONSE_TIMEOUT.as_millis() as u64,
        hop_margin_ms: 200,
    }
}

pub fn compute(k: u32) -> Slot {
    Slot::compute(k).unwrap()
}

pub fn router(k: u32) -> Slot {
    Slot::router(k).unwrap()
}

/// All nine tiers (minus any left out on purpose) serving from one temp dir.
pub struct Chain {
    pub dir: tempfile::TempDir,
    pub layout: EndpointLayout,
    shutdown: ShutdownFlag,
    stats: BTreeMap<Slot, TierStats>,
    tasks: Vec<JoinHandle<()>>,
}

impl Chain {
    pub async fn start() -> Self {
        Self::start_without(&[]).await
    }

    /// Start every tier except `missing`, whose endpoints stay unbound.
    pub async fn start_without(missing: &[Slot]) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let layout = EndpointLayout::new(dir.path());
        let mut chain = Self {
            dir,
            layout,
            shutdown: ShutdownFlag::new(),
            stats: BTreeMap::new(),
            tasks: Vec::new(),
        };

        for slot in spawn_waves().into_iter().flatten() {
            if missing.contains(&slot) {
                continue;
            }
            let relay = relay_config();
            match slot.role {
                Role::Dispatch => {
                    chain.launch(slot, DispatchPolicy::from_config(chain.layout.clone(), &relay))
                }
                Role::Router => chain.launch(
                    slot,
                    RouterPolicy::from_config(slot.index, chain.layout.clone(), &relay),
                ),
                Role::Compute => chain.launch(slot, ComputePolicy::new(slot.index)),
            }
        }
        chain
    }

    fn launch<P: TierPolicy + 'static>(&mut self, slot: Slot, policy: P) {
        let relay = TieredRelay::bind(
            slot,
            &self.layout.path(slot),
            policy,
            RelaySettings::from(&relay_config()),
            self.shutdown.clone(),
        )
        .unwrap();
        self.stats.insert(slot, relay.stats());
        self.tasks.push(tokio::spawn(relay.run()));
    }

    pub fn path(&self, slot: Slot) -> PathBuf {
        self.layout.path(slot)
    }

    pub fn stats(&self, slot: Slot) -> &TierStats {
        &self.stats[&slot]
    }

    /// Requests handled by compute workers `range`.
    pub fn computed_by(&self, range: std::ops::RangeInclusive<u32>) -> u64 {
        range
            .filter_map(|k| self.stats.get(&compute(k)))
            .map(TierStats::handled)
            .sum()
    }

    /// Send one request to the dispatch tier, exactly as a client would.
    pub async fn ask(&self, requester_id: i32, value: f64) -> f64 {
        let mut stream = UnixStream::connect(self.path(Slot::dispatch()))
            .await
            .unwrap();
        stream
            .write_all(Request::new(requester_id, value).as_bytes())
            .await
            .unwrap();
        let mut reply = [0u8; 8];
        tokio::time::timeout(Duration::from_secs(5), stream.read_exact(&mut reply))
            .await
            .expect("no reply within 5s")
            .unwrap();
        f64::from_ne_bytes(reply)
    }

    /// Signal every tier to stop and wait for all of them.
    pub async fn stop(&mut self) {
        self.shutdown.trigger();
        for task in self.tasks.drain(..) {
            tokio::time::timeout(Duration::from_secs(2), task)
                .await
                .expect("tier did not stop")
                .unwrap();
        }
    }
}

impl Drop for Chain {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}
