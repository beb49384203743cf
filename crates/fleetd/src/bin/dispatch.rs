use fleet_core::Role;
use fleet_tiers::DispatchPolicy;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    fleetd::tier::run(Role::Dispatch, |_, config, layout| {
        DispatchPolicy::from_config(layout, &config.relay)
    })
    .await
}
