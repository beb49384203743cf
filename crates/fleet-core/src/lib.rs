//! fleet-core — wire format, topology, endpoints and configuration.
//! Every other fleet crate depends on this one.

pub mod config;
pub mod endpoint;
pub mod outcome;
pub mod topology;
pub mod wire;

pub use config::FleetConfig;
pub use endpoint::EndpointLayout;
pub use outcome::{Failure, Outcome};
pub use topology::{Role, Slot};
pub use wire::{Request, Response};
