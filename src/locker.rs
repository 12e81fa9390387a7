//! Entry point for acquiring named locks.

use crate::address::ChannelAddress;
use crate::config::Config;
use crate::error::{Result, SocklockError};
use crate::handle::{LockHandle, LockState, PendingLock};
use crate::probe::{self, LockEntry, ProbeStatus};
use crate::session::Session;
use crate::transport::Transport;
use globset::{Glob, GlobMatcher};
use std::sync::Arc;
use tokio::sync::oneshot;

#[cfg(unix)]
use crate::transport::UnixTransport;

/// Issues lock requests against one transport and configuration.
///
/// Every `acquire` runs its own election; requests for the same name from the
/// same `Locker` compete exactly like requests from different processes.
pub struct Locker<T: Transport> {
    config: Arc<Config>,
    transport: Arc<T>,
}

impl<T: Transport> Clone for Locker<T> {
    fn clone(&self) -> Self {
        Self {
            config: self.config.clone(),
            transport: self.transport.clone(),
        }
    }
}

#[cfg(unix)]
impl Locker<UnixTransport> {
    /// A locker over Unix-domain sockets.
    pub fn new(config: Config) -> Self {
        Self::with_transport(config, UnixTransport)
    }
}

impl<T: Transport> Locker<T> {
    pub fn with_transport(config: Config, transport: T) -> Self {
        Self {
            config: Arc::new(config),
            transport: Arc::new(transport),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Map a lock name to its channel address.
    pub fn resolve(&self, name: &str) -> Result<ChannelAddress> {
        ChannelAddress::resolve(name, &self.config)
    }

    /// Request the lock named `name`.
    ///
    /// Returns immediately with an unresolved request. Await it to obtain the
    /// handle once this contender holds the lock. Failures (including an
    /// invalid name) are delivered through the request, never here.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn acquire(&self, name: &str) -> PendingLock {
        let (tx, rx) = oneshot::channel();
        match self.resolve(name) {
            Ok(address) => {
                let state = LockState::new(address);
                let pending = PendingLock::new(LockHandle::new(state.clone()), rx);
                let session = Session::new(self.transport.clone(), self.config.clone(), state);
                tokio::spawn(session.run(tx));
                pending
            }
            Err(e) => {
                let state = LockState::new(ChannelAddress::verbatim(name));
                state.release();
                let _ = tx.send(Err(e));
                PendingLock::new(LockHandle::new(state), rx)
            }
        }
    }

    /// Request the lock and deliver the outcome to `callback`.
    ///
    /// The callback fires once, when this contender becomes holder or the
    /// request fails; waiting alone never fires it.
    pub fn acquire_with<F>(&self, name: &str, callback: F) -> LockHandle
    where
        F: FnOnce(Result<LockHandle>) + Send + 'static,
    {
        self.acquire(name).on_complete(callback)
    }

    /// Report what currently occupies the address for `name`.
    pub async fn probe(&self, name: &str) -> Result<ProbeStatus> {
        let address = self.resolve(name)?;
        probe::probe(&*self.transport, &address, &self.config).await
    }

    /// Remove the address for `name` if its holder is gone.
    pub async fn clear(&self, name: &str, force: bool) -> Result<ChannelAddress> {
        let address = self.resolve(name)?;
        probe::clear(&*self.transport, &address, &self.config, force).await?;
        Ok(address)
    }

    /// List lock addresses in the lock directory, optionally filtered by a
    /// glob over the bare lock name.
    pub async fn list(&self, pattern: Option<&str>) -> Result<Vec<LockEntry>> {
        let matcher = pattern.map(build_matcher).transpose()?;
        let dir = self.config.lock_dir();
        let suffix = &self.config.socket_suffix;

        let entries = match std::fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(SocklockError::platform(dir.display(), e)),
        };

        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| SocklockError::platform(dir.display(), e))?;
            let file_name = entry.file_name();
            let Some(file_name) = file_name.to_str() else {
                continue;
            };
            let Some(name) = file_name.strip_suffix(suffix.as_str()) else {
                continue;
            };
            if matcher.as_ref().is_some_and(|m| !m.is_match(name)) {
                continue;
            }
            names.push(name.to_string());
        }
        names.sort();

        let mut locks = Vec::new();
        for name in names {
            // Entries that don't form a valid bare name are not ours.
            let Ok(address) = self.resolve(&name) else {
                continue;
            };
            let status = probe::probe(&*self.transport, &address, &self.config).await?;
            locks.push(LockEntry { address, status });
        }
        Ok(locks)
    }
}

fn build_matcher(pattern: &str) -> Result<GlobMatcher> {
    Glob::new(pattern)
        .map(|g| g.compile_matcher())
        .map_err(|e| SocklockError::UserError(format!("invalid pattern '{}': {}", pattern, e)))
}
