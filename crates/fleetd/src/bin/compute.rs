use fleet_core::Role;
use fleet_tiers::ComputePolicy;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    fleetd::tier::run(Role::Compute, |slot, _, _| ComputePolicy::new(slot.index)).await
}
