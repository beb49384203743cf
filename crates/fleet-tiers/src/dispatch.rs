//! Dispatch tier: the fleet's single entry point.
//!
//! Picks a router by requester parity and forwards. No validation happens
//! here; a negative value travels on to the router, which rejects it.

use std::time::Duration;

use fleet_core::config::RelayConfig;
use fleet_core::topology::router_for;
use fleet_core::{EndpointLayout, Outcome, Request, Role, Slot};

use crate::forward::forward;
use crate::policy::TierPolicy;
use crate::stats::TierStats;

pub struct DispatchPolicy {
    layout: EndpointLayout,
    response_timeout: Option<Duration>,
}

impl DispatchPolicy {
    pub fn new(layout: EndpointLayout, response_timeout: Option<Duration>) -> Self {
        Self {
            layout,
            response_timeout,
        }
    }

    /// Waits one hop margin longer than the routers, so a router that gives
    /// up on a silent worker still gets its failure reply through.
    pub fn from_config(layout: EndpointLayout, relay: &RelayConfig) -> Self {
        Self::new(layout, relay.response_timeout_for(Role::Dispatch))
    }
}

impl TierPolicy for DispatchPolicy {
    async fn handle(&mut self, request: Request, stats: &TierStats) -> Outcome {
        let router = router_for(request.requester_id);
        let slot = Slot {
            role: Role::Router,
            index: router,
        };
        tracing::info!(
            requester_id = request.requester_id,
            router,
            "request received, forwarding to router"
        );
        stats.record_selection(router);

        let outcome = forward(&self.layout.path(slot), &request, self.response_timeout).await;
        if let Outcome::Failed(failure) = outcome {
            tracing::warn!(
                requester_id = request.requester_id,
                router,
                %failure,
                "router did not produce a result, returning failure"
            );
        }
        outcome
    }
}
