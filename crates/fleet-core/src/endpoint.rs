//! Endpoint identities — where each fleet member listens.
//!
//! Every slot binds a Unix-domain socket under one private runtime
//! directory. Paths depend only on the slot, so a respawned process binds
//! the same address its predecessor did and upstream tiers never need to
//! learn anything new.

use std::path::{Path, PathBuf};

use crate::config::FleetConfig;
use crate::topology::{Role, Slot};

/// sockaddr_un.sun_path is 108 bytes including the trailing NUL.
pub const MAX_SOCKET_PATH: usize = 107;

/// Resolves slots to socket paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointLayout {
    root: PathBuf,
}

impl EndpointLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn from_config(config: &FleetConfig) -> Self {
        Self::new(config.endpoints.runtime_dir.clone())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Socket path for a slot: `dispatch.sock`, `router-{k}.sock`,
    /// `compute-{k}.sock`.
    pub fn path(&self, slot: Slot) -> PathBuf {
        let name = match slot.role {
            Role::Dispatch => "dispatch.sock".to_string(),
            role => format!("{}-{}.sock", role.as_str(), slot.index),
        };
        self.root.join(name)
    }

    /// Create the runtime directory (mode 0700) and check that every
    /// endpoint path fits in a socket address.
    pub fn prepare(&self) -> Result<(), EndpointError> {
        use std::os::unix::fs::DirBuilderExt;

        std::fs::DirBuilder::new()
            .recursive(true)
            .mode(0o700)
            .create(&self.root)
            .map_err(|e| EndpointError::CreateDir(self.root.clone(), e))?;

        let longest = self.path(Slot {
            role: Role::Compute,
            index: crate::topology::COMPUTE_COUNT,
        });
        if longest.as_os_str().len() > MAX_SOCKET_PATH {
            return Err(EndpointError::PathTooLong(longest));
        }
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum EndpointError {
    #[error("failed to create runtime directory {0}: {1}")]
    CreateDir(PathBuf, std::io::Error),
    #[error("socket path {0} exceeds {} bytes", MAX_SOCKET_PATH)]
    PathTooLong(PathBuf),
}
