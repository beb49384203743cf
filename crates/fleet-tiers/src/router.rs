//! Router tier: validates requests and spreads them over owned workers.
//!
//! Router `k` owns compute workers `3(k-1)+1 ..= 3k` and picks one of them
//! uniformly at random per request. Negative values are rejected here,
//! before any worker is contacted.

use std::ops::RangeInclusive;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use fleet_core::config::RelayConfig;
use fleet_core::topology::owned_workers;
use fleet_core::{EndpointLayout, Failure, Outcome, Request, Role, Slot};

use crate::forward::forward;
use crate::policy::TierPolicy;
use crate::stats::TierStats;

pub struct RouterPolicy {
    index: u32,
    workers: RangeInclusive<u32>,
    layout: EndpointLayout,
    response_timeout: Option<Duration>,
    rng: StdRng,
}

impl RouterPolicy {
    pub fn new(index: u32, layout: EndpointLayout, response_timeout: Option<Duration>) -> Self {
        Self::with_rng(index, layout, response_timeout, StdRng::from_entropy())
    }

    /// Router `index` with the reply wait its depth in the fleet calls for.
    pub fn from_config(index: u32, layout: EndpointLayout, relay: &RelayConfig) -> Self {
        Self::new(index, layout, relay.response_timeout_for(Role::Router))
    }

    /// Deterministic worker choice, for tests.
    pub fn with_rng(
        index: u32,
        layout: EndpointLayout,
        response_timeout: Option<Duration>,
        rng: StdRng,
    ) -> Self {
        Self {
            index,
            workers: owned_workers(index),
            layout,
            response_timeout,
            rng,
        }
    }

    /// Pick one owned worker uniformly at random.
    pub fn choose_worker(&mut self) -> u32 {
        self.rng.gen_range(self.workers.clone())
    }
}

/// Only non-negative values are legal. NaN is not.
pub fn is_legal(value: f64) -> bool {
    value >= 0.0
}

impl TierPolicy for RouterPolicy {
    async fn handle(&mut self, request: Request, stats: &TierStats) -> Outcome {
        if !is_legal(request.value) {
            tracing::warn!(
                router = self.index,
                requester_id = request.requester_id,
                value = request.value,
                "illegal request, returning failure"
            );
            return Outcome::Failed(Failure::IllegalRequest);
        }

        let worker = self.choose_worker();
        tracing::info!(
            router = self.index,
            requester_id = request.requester_id,
            worker,
            "request received, forwarding to worker"
        );
        stats.record_selection(worker);

        let slot = Slot {
            role: Role::Compute,
            index: worker,
        };
        let outcome = forward(&self.layout.path(slot), &request, self.response_timeout).await;
        if let Outcome::Failed(failure) = outcome {
            tracing::warn!(
                router = self.index,
                requester_id = request.requester_id,
                worker,
                %failure,
                "worker did not produce a result, returning failure"
            );
        }
        outcome
    }
}
