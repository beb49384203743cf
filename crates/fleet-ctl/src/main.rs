//! fleet-ctl — one-shot client for the fleet.

use std::io::BufRead;
use std::os::unix::fs::FileTypeExt;
use std::path::Path;

use anyhow::{bail, Context, Result};

use fleet_core::topology::spawn_waves;
use fleet_core::{EndpointLayout, Failure, FleetConfig, Outcome, Request, Slot};
use fleet_tiers::forward::forward;

// ── Argument handling ─────────────────────────────────────────────────────────

#[derive(Debug, PartialEq)]
enum Command {
    Ask { requester_id: i32, value: Option<f64> },
    Status,
    Help,
}

fn parse_args(args: &[String]) -> Result<Command> {
    let args: Vec<&str> = args.iter().map(String::as_str).collect();
    match args.as_slice() {
        ["status"] => Ok(Command::Status),
        ["help"] | ["--help"] | ["-h"] => Ok(Command::Help),
        [id] => Ok(Command::Ask {
            requester_id: parse_id(id)?,
            value: None,
        }),
        [id, value] => Ok(Command::Ask {
            requester_id: parse_id(id)?,
            value: Some(parse_value(value)?),
        }),
        _ => bail!("expected <requester_id> [value] or status"),
    }
}

fn parse_id(raw: &str) -> Result<i32> {
    raw.parse()
        .with_context(|| format!("requester id must be an integer, got {raw:?}"))
}

fn parse_value(raw: &str) -> Result<f64> {
    raw.trim()
        .parse()
        .with_context(|| format!("value must be a number, got {raw:?}"))
}

fn read_value_from_stdin() -> Result<f64> {
    eprint!("Enter a non-negative number: ");
    let mut line = String::new();
    std::io::stdin()
        .lock()
        .read_line(&mut line)
        .context("failed to read value from stdin")?;
    parse_value(&line)
}

fn print_usage() {
    println!("Usage: fleet-ctl <requester_id> [value]");
    println!("       fleet-ctl status");
    println!();
    println!("Sends one request to the dispatch tier and prints the result.");
    println!("The value is read from stdin when omitted.");
    println!();
    println!("Environment:");
    println!("  FLEET_CONFIG, FLEET_ENDPOINTS__RUNTIME_DIR, FLEET_RELAY__RESPONSE_TIMEOUT_MS");
}

// ── Subcommand handlers ───────────────────────────────────────────────────────

async fn cmd_ask(config: &FleetConfig, requester_id: i32, value: f64) -> Result<()> {
    let layout = EndpointLayout::from_config(config);
    let endpoint = layout.path(Slot::dispatch());
    let request = Request::new(requester_id, value);

    match forward(&endpoint, &request, config.relay.client_timeout()).await {
        Outcome::Value(result) => {
            println!("requester {requester_id}: sqrt({value}) = {result}");
            Ok(())
        }
        Outcome::Failed(Failure::Unreachable) => bail!(
            "cannot reach the dispatch tier at {} (is fleetd running?)",
            endpoint.display()
        ),
        Outcome::Failed(Failure::Downstream) => {
            bail!("the dispatch tier closed the connection or did not reply in time")
        }
        Outcome::Failed(failure) => bail!("request failed ({failure}): result -1"),
    }
}

fn endpoint_state(path: &Path) -> &'static str {
    match std::fs::metadata(path) {
        Ok(meta) if meta.file_type().is_socket() => "listening",
        Ok(_) => "not a socket",
        Err(_) => "missing",
    }
}

fn cmd_status(config: &FleetConfig) {
    let layout = EndpointLayout::from_config(config);
    println!("Runtime dir: {}", layout.root().display());
    for slot in spawn_waves().into_iter().flatten() {
        let path = layout.path(slot);
        println!(
            "  {:<12} {:<14} {}",
            slot.to_string(),
            endpoint_state(&path),
            path.display()
        );
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let command = match parse_args(&args) {
        Ok(command) => command,
        Err(e) => {
            eprintln!("{e:#}");
            eprintln!();
            print_usage();
            std::process::exit(2);
        }
    };

    let config = FleetConfig::load().context("failed to load fleet config")?;
    match command {
        Command::Help => print_usage(),
        Command::Status => cmd_status(&config),
        Command::Ask {
            requester_id,
            value,
        } => {
            let value = match value {
                Some(v) => v,
                None => read_value_from_stdin()?,
            };
            cmd_ask(&config, requester_id, value).await?;
        }
    }
    Ok(())
}
