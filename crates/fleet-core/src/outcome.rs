//! Tagged per-request result used inside every tier.
//!
//! Handlers never deal in the `-1.0` sentinel. They return an [`Outcome`]
//! and the relay converts it to a [`Response`] only at the socket.

use std::fmt;

use crate::wire::{Response, FAILURE_SENTINEL};

/// Why a request did not produce a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Failure {
    /// The request carried a negative (or NaN) value. Expected, not an error.
    IllegalRequest,
    /// The next hop could not be connected to.
    Unreachable,
    /// The next hop accepted the connection but the exchange failed:
    /// write error, short reply, or no reply within the response timeout.
    Downstream,
    /// The next hop answered with the failure sentinel.
    Propagated,
}

impl Failure {
    pub fn as_str(&self) -> &'static str {
        match self {
            Failure::IllegalRequest => "illegal request",
            Failure::Unreachable => "downstream unreachable",
            Failure::Downstream => "downstream exchange failed",
            Failure::Propagated => "downstream reported failure",
        }
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of handling one request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Outcome {
    Value(f64),
    Failed(Failure),
}

impl Outcome {
    pub fn is_failed(&self) -> bool {
        matches!(self, Outcome::Failed(_))
    }

    pub fn value(&self) -> Option<f64> {
        match self {
            Outcome::Value(v) => Some(*v),
            Outcome::Failed(_) => None,
        }
    }
}

impl From<Outcome> for Response {
    fn from(outcome: Outcome) -> Self {
        match outcome {
            Outcome::Value(v) => Response::new(v),
            Outcome::Failed(_) => Response::new(FAILURE_SENTINEL),
        }
    }
}

impl From<Response> for Outcome {
    fn from(response: Response) -> Self {
        if response.is_failure() {
            Outcome::Failed(Failure::Propagated)
        } else {
            Outcome::Value(response.result)
        }
    }
}
