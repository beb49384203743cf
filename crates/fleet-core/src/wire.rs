//! Fleet wire format: the fixed-size records exchanged between tiers.
//!
//! These types ARE the protocol. There is no length prefix and no framing:
//! a hop reads exactly `size_of::<Request>()` bytes, answers with exactly
//! `size_of::<Response>()` bytes and closes. Fields are native byte order.
//!
//! Layouts mirror the native C records the fleet has always spoken, padding
//! included, so old and new processes can sit on the same path. zerocopy
//! derives give allocation-free encoding with no unsafe code.

use static_assertions::assert_eq_size;
use zerocopy::{AsBytes, FromBytes, FromZeroes};

// ── Request ──────────────────────────────────────────────────────────────────

/// One client request. Forwarded unchanged from the dispatch tier down to
/// the compute tier.
///
/// Wire size: 16 bytes.
#[derive(Debug, Clone, Copy, PartialEq, AsBytes, FromBytes, FromZeroes)]
#[repr(C)]
pub struct Request {
    /// Client-chosen identifier. Its parity selects the router instance.
    pub requester_id: i32,

    /// Alignment padding of the native record. Written as zero, never read.
    pub reserved: [u8; 4],

    /// Input to the compute function. Expected to be non-negative; only the
    /// router tier enforces it.
    pub value: f64,
}

assert_eq_size!(Request, [u8; 16]);

impl Request {
    pub fn new(requester_id: i32, value: f64) -> Self {
        Self {
            requester_id,
            reserved: [0u8; 4],
            value,
        }
    }
}

// ── Response ─────────────────────────────────────────────────────────────────

/// One reply. `result` carries either the computed value or
/// [`FAILURE_SENTINEL`].
///
/// Wire size: 8 bytes.
#[derive(Debug, Clone, Copy, PartialEq, AsBytes, FromBytes, FromZeroes)]
#[repr(C)]
pub struct Response {
    pub result: f64,
}

assert_eq_size!(Response, [u8; 8]);

impl Response {
    pub fn new(result: f64) -> Self {
        Self { result }
    }

    pub fn failure() -> Self {
        Self {
            result: FAILURE_SENTINEL,
        }
    }

    /// True when the result is bit-for-bit the failure sentinel.
    pub fn is_failure(&self) -> bool {
        self.result.to_bits() == FAILURE_SENTINEL.to_bits()
    }
}

// ── Constants ────────────────────────────────────────────────────────────────

/// Reserved result value meaning "something on the path failed".
/// The compute function never yields a negative number, so the value is
/// unambiguous on a healthy fleet.
pub const FAILURE_SENTINEL: f64 = -1.0;

// ── Tests ────────────────────────────────────────────────────────────────────
