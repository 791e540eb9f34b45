//! Locating the manager's RPC endpoint.
//!
//! Precedence: `--rpc-addr` / `POOLCTL_RPC_ADDR`, then `rpc.listen` from the
//! manager's YAML config, then [`DEFAULT_RPC_ADDR`].

use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::debug;

use crate::error::{PoolctlError, Result};

/// Address the manager listens on out of the box.
pub const DEFAULT_RPC_ADDR: &str = "tcp://127.0.0.1:6001";

/// Manager config picked up from the working directory when present.
pub const DEFAULT_CONFIG_FILE: &str = ".rr.yaml";

#[derive(Debug, Default, Deserialize)]
struct FileConfig {
    #[serde(default)]
    rpc: RpcSection,
}

#[derive(Debug, Default, Deserialize)]
struct RpcSection {
    listen: Option<String>,
}

/// Normalize an address to `host:port`.
///
/// Accepts `tcp://host:port` and bare `host:port`; any other scheme is rejected.
pub fn parse_rpc_address(raw: &str) -> Result<String> {
    let raw = raw.trim();
    let addr = match raw.split_once("://") {
        Some(("tcp", rest)) => rest,
        Some(_) => return Err(PoolctlError::InvalidAddress(raw.to_string())),
        None => raw,
    };

    let valid = addr
        .rsplit_once(':')
        .is_some_and(|(host, port)| !host.is_empty() && port.parse::<u16>().is_ok());
    if !valid {
        return Err(PoolctlError::InvalidAddress(raw.to_string()));
    }
    Ok(addr.to_string())
}

/// Read `rpc.listen` from a manager config file.
pub fn read_listen(path: &Path) -> Result<Option<String>> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| PoolctlError::Config(format!("cannot read {}: {e}", path.display())))?;
    if text.trim().is_empty() {
        return Ok(None);
    }
    let config: Option<FileConfig> = serde_yaml::from_str(&text)
        .map_err(|e| PoolctlError::Config(format!("cannot parse {}: {e}", path.display())))?;
    // A comments-only document decodes as null.
    Ok(config.unwrap_or_default().rpc.listen)
}

/// Pick the RPC address to dial.
///
/// An explicit `config` path must exist; the default config file is only used
/// when present.
pub fn resolve_rpc_address(flag: Option<&str>, config: Option<&Path>) -> Result<String> {
    if let Some(addr) = flag {
        return parse_rpc_address(addr);
    }

    let path = match config {
        Some(path) => Some(path.to_path_buf()),
        None => Some(PathBuf::from(DEFAULT_CONFIG_FILE)).filter(|p| p.is_file()),
    };

    if let Some(path) = path
        && let Some(listen) = read_listen(&path)?
    {
        debug!(config = %path.display(), %listen, "using RPC address from config");
        return parse_rpc_address(&listen);
    }

    parse_rpc_address(DEFAULT_RPC_ADDR)
}
