//! Shared `main` for `fleet-dispatch`, `fleet-router` and `fleet-compute`.

use anyhow::{bail, Context, Result};
use tracing::Instrument;

use fleet_core::topology::parse_index;
use fleet_core::{EndpointLayout, FleetConfig, Role, Slot};
use fleet_tiers::{RelaySettings, ShutdownFlag, TierPolicy, TieredRelay};

/// Work out which slot this process fills from its arguments
/// (program name already stripped).
pub fn slot_from_args<I>(role: Role, args: I) -> Result<Slot>
where
    I: IntoIterator<Item = String>,
{
    let args: Vec<String> = args.into_iter().collect();
    match (role.takes_index(), args.as_slice()) {
        (false, []) => Ok(Slot::dispatch()),
        (true, [raw]) => Ok(parse_index(role, raw)?),
        _ => bail!("{}", usage(role)),
    }
}

fn usage(role: Role) -> String {
    if role.takes_index() {
        let range = role.instances();
        format!(
            "usage: {} <index {}-{}>",
            role.program(),
            range.start(),
            range.end()
        )
    } else {
        format!("usage: {}", role.program())
    }
}

/// Parse args, load config, bind this slot's endpoint and serve until a
/// terminate request arrives.
///
/// `build` turns the resolved slot and config into the tier's policy.
pub async fn run<P, F>(role: Role, build: F) -> Result<()>
where
    P: TierPolicy,
    F: FnOnce(Slot, &FleetConfig, EndpointLayout) -> P,
{
    crate::telemetry::init();

    let slot = slot_from_args(role, std::env::args().skip(1))?;
    let config = FleetConfig::load().context("failed to load fleet config")?;
    let layout = EndpointLayout::from_config(&config);
    layout
        .prepare()
        .context("failed to prepare runtime directory")?;

    let shutdown = ShutdownFlag::new();
    shutdown
        .listen_for_signals()
        .context("failed to install signal handlers")?;

    let path = layout.path(slot);
    let policy = build(slot, &config, layout);
    let relay = TieredRelay::bind(
        slot,
        &path,
        policy,
        RelaySettings::from(&config.relay),
        shutdown,
    )?;

    let span = tracing::info_span!("tier", %slot, pid = std::process::id());
    relay.run().instrument(span).await;
    Ok(())
}
