//! Typed access to the manager's directory, reset and informer services.

use tracing::debug;

use crate::error::{PoolctlError, Result};
use crate::models::{PoolName, PoolSnapshot};
use crate::rpc::{Transport, TransportExt};

/// List pools that support resetting.
pub const RESETTER_LIST: &str = "resetter.List";
/// Reset all workers of one pool.
pub const RESETTER_RESET: &str = "resetter.Reset";
/// List pools that expose worker information.
pub const INFORMER_LIST: &str = "informer.List";
/// Fetch the worker list of one pool.
pub const INFORMER_WORKERS: &str = "informer.Workers";

/// Which service answers a directory listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Directory {
    /// Pools with a resetter (used by `reset`).
    Resetter,
    /// Pools with an informer (used by `workers`).
    Informer,
}

impl Directory {
    fn list_method(self) -> &'static str {
        match self {
            Directory::Resetter => RESETTER_LIST,
            Directory::Informer => INFORMER_LIST,
        }
    }
}

/// Remote operations on pools, all through one shared transport.
#[derive(Clone, Copy)]
pub struct PoolApi<'a> {
    transport: &'a dyn Transport,
}

impl<'a> PoolApi<'a> {
    pub fn new(transport: &'a dyn Transport) -> Self {
        Self { transport }
    }

    /// Known pool names from the given directory.
    pub fn list_pools(&self, directory: Directory, include_all: bool) -> Result<Vec<PoolName>> {
        let pools: Vec<PoolName> = self
            .transport
            .call_typed(directory.list_method(), &include_all)?;
        debug!(?directory, count = pools.len(), "listed pools");
        Ok(pools)
    }

    /// Ask the manager to reset one pool. Returns the manager's acknowledgement.
    pub fn reset_pool(&self, name: &str) -> Result<bool> {
        self.transport.call_typed(RESETTER_RESET, name)
    }

    /// Current workers of one pool.
    pub fn snapshot_pool(&self, name: &str) -> Result<PoolSnapshot> {
        self.transport.call_typed(INFORMER_WORKERS, name)
    }

    /// Use `explicit` verbatim when non-empty, otherwise ask the directory.
    ///
    /// The returned set is fixed for the rest of the invocation.
    pub fn resolve_targets(
        &self,
        explicit: &[PoolName],
        directory: Directory,
    ) -> Result<Vec<PoolName>> {
        if !explicit.is_empty() {
            return Ok(explicit.to_vec());
        }
        self.list_pools(directory, true)
    }
}

/// Turn an unacknowledged reset into an error carrying the pool name.
pub fn require_ack(name: &str, acknowledged: bool) -> Result<()> {
    if acknowledged {
        Ok(())
    } else {
        Err(PoolctlError::remote(
            RESETTER_RESET,
            format!("reset of [{name}] was not acknowledged"),
        ))
    }
}
