//! fleet-tiers — the relay loop and the three tier policies.
//!
//! A tier process is a [`TieredRelay`] bound to its endpoint and driven by
//! one [`TierPolicy`]: [`DispatchPolicy`], [`RouterPolicy`] or
//! [`ComputePolicy`].

pub mod codec;
pub mod compute;
pub mod dispatch;
pub mod forward;
pub mod policy;
pub mod relay;
pub mod router;
pub mod shutdown;
pub mod stats;

pub use compute::ComputePolicy;
pub use dispatch::DispatchPolicy;
pub use policy::TierPolicy;
pub use relay::{RelayError, RelaySettings, TieredRelay};
pub use router::RouterPolicy;
pub use shutdown::ShutdownFlag;
pub use stats::TierStats;
