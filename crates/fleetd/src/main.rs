//! fleetd — supervisor for the tiered compute fleet.
//!
//! Starts one dispatch tier, two routers and six compute workers as child
//! processes, keeps them alive, and stops them all on Ctrl-C or Ctrl-Z.

use anyhow::{Context, Result};

use fleet_core::{EndpointLayout, FleetConfig};
use fleetd::supervisor::{Launcher, Supervisor};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    fleetd::telemetry::init();

    let config = FleetConfig::load().context("failed to load fleet config")?;
    let layout = EndpointLayout::from_config(&config);
    layout
        .prepare()
        .context("failed to prepare runtime directory")?;
    let launcher = Launcher::from_config(&config)?;

    tracing::info!(
        pid = std::process::id(),
        runtime_dir = %layout.root().display(),
        bin_dir = %launcher.bin_dir().display(),
        "fleetd starting"
    );

    let supervisor = Supervisor::new(config, launcher)?;
    supervisor.run().await?;

    tracing::info!("fleetd stopped");
    Ok(())
}
