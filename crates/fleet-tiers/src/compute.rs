//! Compute tier, the leaf. Returns the square root of the request value.

use fleet_core::{Outcome, Request};

use crate::policy::TierPolicy;
use crate::stats::TierStats;

pub struct ComputePolicy {
    index: u32,
}

impl ComputePolicy {
    pub fn new(index: u32) -> Self {
        Self { index }
    }
}

/// The compute function. Routers only let non-negative values through.
pub fn compute(value: f64) -> f64 {
    value.sqrt()
}

impl TierPolicy for ComputePolicy {
    async fn handle(&mut self, request: Request, _stats: &TierStats) -> Outcome {
        let result = compute(request.value);
        tracing::info!(
            worker = self.index,
            requester_id = request.requester_id,
            value = request.value,
            result,
            "computed result"
        );
        Outcome::Value(result)
    }
}
