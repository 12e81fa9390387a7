//! Default values for the Config struct.

pub(crate) fn default_socket_suffix() -> String {
    ".sock".to_string()
}

pub(crate) fn default_reclaim_retry_limit() -> Option<u32> {
    Some(64)
}

pub(crate) fn default_reclaim_backoff_ms() -> u64 {
    5
}

pub(crate) fn default_foreign_poll_ms() -> u64 {
    100
}

pub(crate) fn default_probe_timeout_ms() -> u64 {
    500
}

pub(crate) fn default_true() -> bool {
    true
}

/// Upper bound accepted for any of the millisecond settings.
pub const MAX_DELAY_MS: u64 = 10_000;
