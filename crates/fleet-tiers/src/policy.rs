//! Policy trait for relay tiers.
//!
//! Every tier runs the same accept loop ([`crate::relay::TieredRelay`]).
//! What differs is what happens to a request once it is read: the dispatch
//! tier picks a router, a router validates and picks a worker, a worker
//! computes. That decision is the policy.

use std::future::Future;

use fleet_core::{Outcome, Request};

use crate::stats::TierStats;

/// Per-request behaviour of a tier.
///
/// Called once per accepted connection, strictly sequentially. The relay
/// owns the inbound socket; the policy never sees it and never writes the
/// reply itself. Returning an [`Outcome`] is the whole contract.
pub trait TierPolicy: Send {
    /// Handle one well-formed request. `stats` belongs to the calling relay
    /// and is where a policy records which downstream it chose.
    fn handle(
        &mut self,
        request: Request,
        stats: &TierStats,
    ) -> impl Future<Output = Outcome> + Send;
}
