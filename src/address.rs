//! Channel address resolution.
//!
//! A lock name maps deterministically onto the host's local channel namespace:
//!
//! - A name containing a path separator is taken as a filesystem path and made
//!   absolute against the current directory.
//! - A bare name (`[A-Za-z0-9][A-Za-z0-9._-]*`) is placed inside the configured
//!   lock directory with the configured suffix, e.g. `jobs` becomes
//!   `/tmp/jobs.sock`.
//!
//! On named-pipe hosts the same name maps into the `\\.\pipe\` namespace
//! instead (see [`pipe_address`]).

use crate::config::Config;
use crate::error::{Result, SocklockError};
use regex::Regex;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

static BARE_NAME_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9][A-Za-z0-9._-]*$").expect("Invalid bare lock name regex")
});

/// Prefix of the Windows named-pipe namespace.
pub const PIPE_PREFIX: &str = r"\\.\pipe\";

/// Longest socket path the kernel accepts (`sun_path` minus the terminator).
#[cfg(target_os = "linux")]
pub const MAX_SOCKET_PATH: usize = 107;
#[cfg(not(target_os = "linux"))]
pub const MAX_SOCKET_PATH: usize = 103;

/// A resolved channel address: the bind target for one lock name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChannelAddress {
    name: String,
    path: PathBuf,
}

impl ChannelAddress {
    /// Resolve a lock name against the given config.
    pub fn resolve(name: &str, config: &Config) -> Result<Self> {
        if name.is_empty() {
            return Err(SocklockError::UserError(
                "lock name must not be empty".to_string(),
            ));
        }

        let path = if is_path_like(name) {
            platform_path(Path::new(name)).map_err(|e| SocklockError::platform(name, e))?
        } else if BARE_NAME_REGEX.is_match(name) {
            platform_path(&config.lock_dir().join(format!("{}{}", name, config.socket_suffix)))
                .map_err(|e| SocklockError::platform(name, e))?
        } else {
            return Err(SocklockError::UserError(format!(
                "invalid lock name '{}': use letters, digits, '.', '_' and '-', or a path",
                name
            )));
        };

        check_length(name, &path)?;
        Ok(Self {
            name: name.to_string(),
            path,
        })
    }

    /// An address taken verbatim, with no resolution or validation.
    pub(crate) fn verbatim(name: &str) -> Self {
        Self {
            name: name.to_string(),
            path: PathBuf::from(name),
        }
    }

    /// The name the caller asked for.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The platform bind target.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl fmt::Display for ChannelAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path.display())
    }
}

fn is_path_like(name: &str) -> bool {
    name.contains(['/', '\\']) || name.starts_with('.') || Path::new(name).is_absolute()
}

#[cfg(unix)]
fn platform_path(path: &Path) -> io::Result<PathBuf> {
    std::path::absolute(path)
}

#[cfg(windows)]
fn platform_path(path: &Path) -> io::Result<PathBuf> {
    Ok(pipe_address(&path.to_string_lossy()))
}

/// Map a name or path into the named-pipe namespace.
///
/// Names already inside the namespace are returned unchanged.
pub fn pipe_address(name: &str) -> PathBuf {
    if name.starts_with(PIPE_PREFIX) {
        PathBuf::from(name)
    } else {
        PathBuf::from(format!("{}{}", PIPE_PREFIX, name))
    }
}

fn check_length(name: &str, path: &Path) -> Result<()> {
    if cfg!(unix) && path.as_os_str().len() > MAX_SOCKET_PATH {
        return Err(SocklockError::platform(
            path.display(),
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!(
                    "socket path for '{}' is {} bytes, the limit is {}",
                    name,
                    path.as_os_str().len(),
                    MAX_SOCKET_PATH
                ),
            ),
        ));
    }
    Ok(())
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn config_in(dir: &Path) -> Config {
        Config {
            lock_dir: Some(dir.to_path_buf()),
            ..Config::default()
        }
    }

    #[test]
    fn bare_name_lands_in_lock_dir() {
        let temp = TempDir::new().unwrap();
        let addr = ChannelAddress::resolve("jobs", &config_in(temp.path())).unwrap();

        assert_eq!(addr.name(), "jobs");
        assert_eq!(addr.path(), temp.path().join("jobs.sock"));
    }

    #[test]
    fn resolution_is_stable_and_distinct() {
        let temp = TempDir::new().unwrap();
        let config = config_in(temp.path());

        let a1 = ChannelAddress::resolve("alpha", &config).unwrap();
        let a2 = ChannelAddress::resolve("alpha", &config).unwrap();
        let b = ChannelAddress::resolve("beta", &config).unwrap();

        assert_eq!(a1, a2);
        assert_ne!(a1.path(), b.path());
    }

    #[test]
    fn absolute_path_is_used_verbatim() {
        let addr = ChannelAddress::resolve("/tmp/x/y.sock", &Config::default()).unwrap();
        assert_eq!(addr.path(), Path::new("/tmp/x/y.sock"));
    }

    #[test]
    fn relative_path_is_made_absolute() {
        let addr = ChannelAddress::resolve("./rel.sock", &Config::default()).unwrap();
        assert!(addr.path().is_absolute());
        assert!(addr.path().ends_with("rel.sock"));
    }

    #[test]
    fn invalid_bare_name_rejected() {
        let err = ChannelAddress::resolve("has space", &Config::default()).unwrap_err();
        assert!(matches!(err, SocklockError::UserError(_)));

        let err = ChannelAddress::resolve("", &Config::default()).unwrap_err();
        assert!(err.to_string().contains("empty"));
    }

    #[test]
    fn overlong_path_is_platform_failure() {
        let long = format!("/tmp/{}.sock", "x".repeat(200));
        let err = ChannelAddress::resolve(&long, &Config::default()).unwrap_err();
        assert!(matches!(err, SocklockError::Platform { .. }));
    }

    #[test]
    fn pipe_addresses_use_reserved_namespace() {
        assert_eq!(pipe_address("jobs"), PathBuf::from(r"\\.\pipe\jobs"));
        assert_eq!(
            pipe_address(r"\\.\pipe\already"),
            PathBuf::from(r"\\.\pipe\already")
        );
    }

    #[test]
    fn display_shows_path() {
        let addr = ChannelAddress::resolve("/tmp/shown.sock", &Config::default()).unwrap();
        assert_eq!(addr.to_string(), "/tmp/shown.sock");
    }
}
