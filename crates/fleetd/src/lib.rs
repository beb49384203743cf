//! Process side of the fleet: the supervisor and the shared entry point of
//! the three tier executables.

pub mod supervisor;
pub mod telemetry;
pub mod tier;
