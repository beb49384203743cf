use fleet_core::Role;
use fleet_tiers::RouterPolicy;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    fleetd::tier::run(Role::Router, |slot, config, layout| {
        RouterPolicy::from_config(slot.index, layout, &config.relay)
    })
    .await
}
