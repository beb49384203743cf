//! Configuration system for the fleet.
//!
//! Resolution order: environment variables → config file → defaults.
//!
//! Config file location:
//!   1. $FLEET_CONFIG (explicit override)
//!   2. $XDG_CONFIG_HOME/tierfleet/config.toml
//!   3. ~/.config/tierfleet/config.toml
//!
//! The supervisor hands its effective configuration to every child through
//! `FLEET_*` variables (see [`FleetConfig::child_env`]), so all tiers agree
//! on endpoints and timeouts regardless of which file they would find.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::topology::Role;

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FleetConfig {
    pub endpoints: EndpointConfig,
    pub relay: RelayConfig,
    pub supervisor: SupervisorConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EndpointConfig {
    /// Directory holding every tier's socket.
    pub runtime_dir: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    /// Accept-poll timeout. Bounds how long a tier takes to notice SIGTERM
    /// while idle.
    pub poll_interval_ms: u64,
    /// Max wait for an inbound request once a connection is accepted.
    /// 0 = wait forever.
    pub request_timeout_ms: u64,
    /// Max wait of a router for its worker's reply. 0 = wait forever.
    pub response_timeout_ms: u64,
    /// Added to the reply wait once per relaying tier between a caller and
    /// the compute tier, so inner hops give up before outer ones.
    pub hop_margin_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SupervisorConfig {
    /// Pause after each spawn wave so the next wave finds its peers bound.
    pub settle_delay_ms: u64,
    /// Pause between noticing a crash and respawning the slot.
    pub respawn_delay_ms: u64,
    /// How long children get to exit after SIGTERM before SIGKILL.
    pub shutdown_grace_ms: u64,
    /// Directory holding the tier executables. Empty = next to fleetd.
    pub bin_dir: PathBuf,
}

// ── Defaults ──────────────────────────────────────────────────────────────────

impl Default for FleetConfig {
    fn default() -> Self {
        Self {
            endpoints: EndpointConfig::default(),
            relay: RelayConfig::default(),
            supervisor: SupervisorConfig::default(),
        }
    }
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            runtime_dir: runtime_dir(),
        }
    }
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 1_000,
            request_timeout_ms: 5_000,
            response_timeout_ms: 5_000,
            hop_margin_ms: 500,
        }
    }
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            settle_delay_ms: 1_000,
            respawn_delay_ms: 1_000,
            shutdown_grace_ms: 5_000,
            bin_dir: PathBuf::new(),
        }
    }
}

// ── Durations ─────────────────────────────────────────────────────────────────

/// 0 means "no limit".
fn optional_ms(ms: u64) -> Option<Duration> {
    (ms > 0).then(|| Duration::from_millis(ms))
}

impl RelayConfig {
    pub fn poll_interval(&self) -> Duration {
        // A zero poll would spin; clamp to 1ms.
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        optional_ms(self.request_timeout_ms)
    }

    pub fn response_timeout(&self) -> Option<Duration> {
        optional_ms(self.response_timeout_ms)
    }

    pub fn hop_margin(&self) -> Duration {
        Duration::from_millis(self.hop_margin_ms)
    }

    /// Reply wait for a tier of `role` forwarding to the next hop.
    pub fn response_timeout_for(&self, role: Role) -> Option<Duration> {
        self.with_margins(role.relays_below())
    }

    /// Reply wait for a client talking to the dispatch tier.
    pub fn client_timeout(&self) -> Option<Duration> {
        self.with_margins(Role::Dispatch.relays_below() + 1)
    }

    fn with_margins(&self, margins: u32) -> Option<Duration> {
        self.response_timeout()
            .map(|base| base + self.hop_margin() * margins)
    }
}

impl SupervisorConfig {
    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn respawn_delay(&self) -> Duration {
        Duration::from_millis(self.respawn_delay_ms)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_millis(self.shutdown_grace_ms)
    }
}

// ── Path helpers ──────────────────────────────────────────────────────────────

fn config_dir() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| dirs_or_home().join(".config"))
        .join("tierfleet")
}

fn runtime_dir() -> PathBuf {
    std::env::var("XDG_RUNTIME_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/tmp"))
        .join("tierfleet")
}

fn dirs_or_home() -> PathBuf {
    std::env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/tmp"))
}

// ── Errors ────────────────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {0}: {1}")]
    ReadFailed(PathBuf, std::io::Error),
    #[error("failed to parse {0}: {1}")]
    ParseFailed(PathBuf, toml::de::Error),
    #[error("invalid value {value:?} for {key}")]
    InvalidEnv { key: &'static str, value: String },
}

// ── Environment keys ──────────────────────────────────────────────────────────

pub const ENV_CONFIG: &str = "FLEET_CONFIG";
pub const ENV_RUNTIME_DIR: &str = "FLEET_ENDPOINTS__RUNTIME_DIR";
pub const ENV_POLL_INTERVAL_MS: &str = "FLEET_RELAY__POLL_INTERVAL_MS";
pub const ENV_REQUEST_TIMEOUT_MS: &str = "FLEET_RELAY__REQUEST_TIMEOUT_MS";
pub const ENV_RESPONSE_TIMEOUT_MS: &str = "FLEET_RELAY__RESPONSE_TIMEOUT_MS";
pub const ENV_HOP_MARGIN_MS: &str = "FLEET_RELAY__HOP_MARGIN_MS";
pub const ENV_SETTLE_DELAY_MS: &str = "FLEET_SUPERVISOR__SETTLE_DELAY_MS";
pub const ENV_RESPAWN_DELAY_MS: &str = "FLEET_SUPERVISOR__RESPAWN_DELAY_MS";
pub const ENV_SHUTDOWN_GRACE_MS: &str = "FLEET_SUPERVISOR__SHUTDOWN_GRACE_MS";
pub const ENV_BIN_DIR: &str = "FLEET_SUPERVISOR__BIN_DIR";

// ── Loading ───────────────────────────────────────────────────────────────────

impl FleetConfig {
    /// Load config: env vars → file → defaults.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::file_path();
        let mut config = if path.exists() {
            Self::from_file(&path)?
        } else {
            FleetConfig::default()
        };
        config.apply_env_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    pub fn from_file(path: &std::path::Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::ReadFailed(path.to_path_buf(), e))?;
        toml::from_str(&text).map_err(|e| ConfigError::ParseFailed(path.to_path_buf(), e))
    }

    /// Config file path.
    pub fn file_path() -> PathBuf {
        std::env::var(ENV_CONFIG)
            .map(PathBuf::from)
            .unwrap_or_else(|_| config_dir().join("config.toml"))
    }

    /// Apply FLEET_* overrides. `lookup` is `std::env::var` in production.
    /// Unlike a missing variable, an unparsable one is an error: a child
    /// must never silently run with different timeouts than its parent.
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let millis = |key: &'static str, slot: &mut u64| -> Result<(), ConfigError> {
            if let Some(v) = lookup(key) {
                *slot = v
                    .trim()
                    .parse()
                    .map_err(|_| ConfigError::InvalidEnv { key, value: v })?;
            }
            Ok(())
        };

        millis(ENV_POLL_INTERVAL_MS, &mut self.relay.poll_interval_ms)?;
        millis(ENV_REQUEST_TIMEOUT_MS, &mut self.relay.request_timeout_ms)?;
        millis(ENV_RESPONSE_TIMEOUT_MS, &mut self.relay.response_timeout_ms)?;
        millis(ENV_HOP_MARGIN_MS, &mut self.relay.hop_margin_ms)?;
        millis(ENV_SETTLE_DELAY_MS, &mut self.supervisor.settle_delay_ms)?;
        millis(ENV_RESPAWN_DELAY_MS, &mut self.supervisor.respawn_delay_ms)?;
        millis(ENV_SHUTDOWN_GRACE_MS, &mut self.supervisor.shutdown_grace_ms)?;

        if let Some(v) = lookup(ENV_RUNTIME_DIR) {
            self.endpoints.runtime_dir = PathBuf::from(v);
        }
        if let Some(v) = lookup(ENV_BIN_DIR) {
            self.supervisor.bin_dir = PathBuf::from(v);
        }
        Ok(())
    }

    /// Env pairs that reproduce this configuration in a child process.
    pub fn child_env(&self) -> Vec<(&'static str, String)> {
        vec![
            (
                ENV_RUNTIME_DIR,
                self.endpoints.runtime_dir.to_string_lossy().into_owned(),
            ),
            (ENV_POLL_INTERVAL_MS, self.relay.poll_interval_ms.to_string()),
            (ENV_REQUEST_TIMEOUT_MS, self.relay.request_timeout_ms.to_string()),
            (ENV_RESPONSE_TIMEOUT_MS, self.relay.response_timeout_ms.to_string()),
            (ENV_HOP_MARGIN_MS, self.relay.hop_margin_ms.to_string()),
        ]
    }
}
