//! Config struct definition and default implementation.

use super::types::*;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration for socklock.
///
/// Unknown fields in the YAML are ignored for forward compatibility.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    // =========================================================================
    // Address settings
    // =========================================================================
    /// Directory that bare lock names (no path separator) are placed in.
    /// Defaults to the OS temp directory when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lock_dir: Option<PathBuf>,

    /// Suffix appended to bare lock names.
    #[serde(default = "default_socket_suffix")]
    pub socket_suffix: String,

    // =========================================================================
    // Election settings
    // =========================================================================
    /// Maximum stale-address retries within one election. `None` is unbounded.
    #[serde(default = "default_reclaim_retry_limit")]
    pub reclaim_retry_limit: Option<u32>,

    /// Pause between a reclaim and the next bind attempt.
    #[serde(default = "default_reclaim_backoff_ms")]
    pub reclaim_backoff_ms: u64,

    /// Poll interval while the address is occupied by something that is not a socket.
    #[serde(default = "default_foreign_poll_ms")]
    pub foreign_poll_ms: u64,

    // =========================================================================
    // Holder settings
    // =========================================================================
    /// Whether the holder sends its metadata line to each connected waiter.
    #[serde(default = "default_true")]
    pub announce_holder: bool,

    /// How long `probe` waits for the holder's metadata line.
    #[serde(default = "default_probe_timeout_ms")]
    pub probe_timeout_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            lock_dir: None,
            socket_suffix: default_socket_suffix(),
            reclaim_retry_limit: default_reclaim_retry_limit(),
            reclaim_backoff_ms: default_reclaim_backoff_ms(),
            foreign_poll_ms: default_foreign_poll_ms(),
            announce_holder: default_true(),
            probe_timeout_ms: default_probe_timeout_ms(),
        }
    }
}
