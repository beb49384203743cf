//! Fleet topology: which processes exist and who talks to whom.
//!
//! The fleet is fixed: one dispatch tier, two routers, six compute workers.
//! Router `k` owns compute workers `3(k-1)+1 ..= 3k`.

use std::fmt;
use std::ops::RangeInclusive;

pub const ROUTER_COUNT: u32 = 2;
pub const COMPUTE_COUNT: u32 = 6;
pub const WORKERS_PER_ROUTER: u32 = COMPUTE_COUNT / ROUTER_COUNT;

/// The part a process plays in the fleet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Role {
    Dispatch,
    Router,
    Compute,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Dispatch => "dispatch",
            Role::Router => "router",
            Role::Compute => "compute",
        }
    }

    /// Executable that implements this role.
    pub fn program(&self) -> &'static str {
        match self {
            Role::Dispatch => "fleet-dispatch",
            Role::Router => "fleet-router",
            Role::Compute => "fleet-compute",
        }
    }

    /// Valid instance indices. The dispatch tier is a singleton with index 1.
    pub fn instances(&self) -> RangeInclusive<u32> {
        match self {
            Role::Dispatch => 1..=1,
            Role::Router => 1..=ROUTER_COUNT,
            Role::Compute => 1..=COMPUTE_COUNT,
        }
    }

    /// Whether the instance index is passed on the command line.
    pub fn takes_index(&self) -> bool {
        !matches!(self, Role::Dispatch)
    }

    /// Relaying tiers between this role's next hop and the compute tier.
    pub fn relays_below(&self) -> u32 {
        match self {
            Role::Dispatch => 1,
            Role::Router | Role::Compute => 0,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One member of the fleet: a role and an instance index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Slot {
    pub role: Role,
    pub index: u32,
}

impl Slot {
    /// Checked constructor.
    pub fn new(role: Role, index: u32) -> Result<Self, TopologyError> {
        if role.instances().contains(&index) {
            Ok(Self { role, index })
        } else {
            Err(TopologyError::IndexOutOfRange { role, index })
        }
    }

    pub fn dispatch() -> Self {
        Self {
            role: Role::Dispatch,
            index: 1,
        }
    }

    pub fn router(index: u32) -> Result<Self, TopologyError> {
        Self::new(Role::Router, index)
    }

    pub fn compute(index: u32) -> Result<Self, TopologyError> {
        Self::new(Role::Compute, index)
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.role.takes_index() {
            write!(f, "{} #{}", self.role, self.index)
        } else {
            write!(f, "{}", self.role)
        }
    }
}

/// Spawn order: each inner list is a wave that must be bound before the
/// next wave starts connecting to it.
pub fn spawn_waves() -> [Vec<Slot>; 3] {
    [
        vec![Slot::dispatch()],
        Role::Router
            .instances()
            .map(|index| Slot {
                role: Role::Router,
                index,
            })
            .collect(),
        Role::Compute
            .instances()
            .map(|index| Slot {
                role: Role::Compute,
                index,
            })
            .collect(),
    ]
}

/// Router chosen for a requester: odd ids go to router 1, even ids to
/// router 2. Negative ids follow the same parity rule.
pub fn router_for(requester_id: i32) -> u32 {
    if requester_id.rem_euclid(2) == 1 {
        1
    } else {
        2
    }
}

/// Compute workers owned by a router.
pub fn owned_workers(router_index: u32) -> RangeInclusive<u32> {
    let first = WORKERS_PER_ROUTER * (router_index - 1) + 1;
    first..=first + WORKERS_PER_ROUTER - 1
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TopologyError {
    #[error("{role} index {index} out of range {:?}", .role.instances())]
    IndexOutOfRange { role: Role, index: u32 },
    #[error("invalid {role} index {raw:?}: expected a number")]
    InvalidIndex { role: Role, raw: String },
}

/// Parse an instance index as given on the command line.
pub fn parse_index(role: Role, raw: &str) -> Result<Slot, TopologyError> {
    let index: u32 = raw.trim().parse().map_err(|_| TopologyError::InvalidIndex {
        role,
        raw: raw.to_string(),
    })?;
    Slot::new(role, index)
}
