//! Holder metadata announced to waiters.
//!
//! When a waiter connects, the holder writes one JSON line describing itself:
//! - `owner`: `user@HOST`
//! - `pid`: holder process id
//! - `acquired_at`: RFC3339 timestamp of acquisition
//! - `name`: the lock name the holder asked for
//!
//! Waiters treat the line as informational. A peer that sends something else
//! is still a holder; it just has no metadata.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Metadata describing the current holder of a lock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HolderInfo {
    /// Owner of the lock (e.g., `user@HOST`).
    pub owner: String,

    /// Process ID of the holder.
    pub pid: u32,

    /// When the holder acquired the lock.
    pub acquired_at: DateTime<Utc>,

    /// Lock name as requested by the holder.
    pub name: String,
}

impl HolderInfo {
    /// Metadata for the current process acquiring `name` now.
    pub fn current(name: &str) -> Self {
        Self {
            owner: owner_string(),
            pid: std::process::id(),
            acquired_at: Utc::now(),
            name: name.to_string(),
        }
    }

    /// Encode as a single newline-terminated JSON line.
    pub fn to_line(&self) -> Option<String> {
        serde_json::to_string(self).ok().map(|json| json + "\n")
    }

    /// Parse one line; anything that is not holder metadata yields `None`.
    pub fn from_line(line: &str) -> Option<Self> {
        serde_json::from_str(line.trim()).ok()
    }

    /// How long the lock has been held.
    pub fn age(&self) -> Duration {
        Utc::now().signed_duration_since(self.acquired_at)
    }

    /// Format the age as a human-readable string.
    pub fn age_string(&self) -> String {
        let age = self.age();
        let minutes = age.num_minutes();
        let hours = age.num_hours();
        let days = age.num_days();

        if days > 0 {
            format!("{}d {}h", days, hours % 24)
        } else if hours > 0 {
            format!("{}h {}m", hours, minutes % 60)
        } else {
            format!("{}m", minutes)
        }
    }
}

fn owner_string() -> String {
    let user = std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_else(|_| "unknown".to_string());

    let host = hostname::get()
        .map(|h| h.to_string_lossy().to_string())
        .unwrap_or_else(|_| "unknown".to_string());

    format!("{}@{}", user, host)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn current_describes_this_process() {
        let info = HolderInfo::current("jobs");

        assert!(info.owner.contains('@'));
        assert_eq!(info.pid, std::process::id());
        assert_eq!(info.name, "jobs");
        assert!(info.age().num_minutes() < 1);
    }

    #[test]
    fn line_is_single_json_object() {
        let info = HolderInfo::current("jobs");
        let line = info.to_line().unwrap();

        assert!(line.ends_with('\n'));
        assert_eq!(line.matches('\n').count(), 1);
        assert_eq!(HolderInfo::from_line(&line), Some(info));
    }

    #[test]
    fn foreign_lines_are_ignored() {
        assert_eq!(HolderInfo::from_line("HELLO\n"), None);
        assert_eq!(HolderInfo::from_line("{\"unrelated\": 1}"), None);
        assert_eq!(HolderInfo::from_line(""), None);
    }

    #[test]
    fn age_string_scales_units() {
        let mut info = HolderInfo::current("jobs");
        assert!(info.age_string().ends_with('m'));

        info.acquired_at = Utc::now() - Duration::hours(2);
        assert!(info.age_string().contains('h'));

        info.acquired_at = Utc::now() - Duration::days(3);
        assert!(info.age_string().contains('d'));
    }
}
