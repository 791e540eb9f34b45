//! Version strings for `--version`.
//!
//! Release builds may set `POOLCTL_GIT_REV` at compile time; the revision is
//! then appended to the version.

use std::sync::LazyLock;

use crate::config::DEFAULT_RPC_ADDR;
use crate::remote::{INFORMER_LIST, INFORMER_WORKERS, RESETTER_LIST, RESETTER_RESET};

/// The package version from Cargo.toml.
pub const PKG_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Git revision baked in at build time (empty string if not set).
pub const GIT_REV: &str = match option_env!("POOLCTL_GIT_REV") {
    Some(rev) => rev,
    None => "",
};

static LONG_VERSION: LazyLock<String> = LazyLock::new(|| {
    let mut version = full_version();
    version.push_str(&format!(
        "\nRPC methods: {RESETTER_LIST}, {RESETTER_RESET}, {INFORMER_LIST}, {INFORMER_WORKERS}"
    ));
    version.push_str(&format!("\nDefault RPC address: {DEFAULT_RPC_ADDR}"));
    version
});

/// `"X.Y.Z"`, or `"X.Y.Z (abcdef0)"` when built with a git revision.
pub fn full_version() -> String {
    if GIT_REV.is_empty() {
        PKG_VERSION.to_string()
    } else {
        format!("{PKG_VERSION} ({GIT_REV})")
    }
}

/// Short version for clap's `-V`.
pub fn clap_version() -> &'static str {
    PKG_VERSION
}

/// Long version for clap's `--version`, listing the RPC surface this build speaks.
pub fn long_version() -> &'static str {
    LONG_VERSION.as_str()
}
