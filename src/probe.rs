//! Read-only inspection of lock addresses, and manual clearing.

use crate::address::ChannelAddress;
use crate::config::Config;
use crate::error::{Result, SocklockError};
use crate::holder::HolderInfo;
use crate::reclaim::{ReclaimOutcome, reclaim};
use crate::transport::Transport;
use crate::waiters::{Greeting, read_greeting};
use std::fmt;
use std::io;

/// What currently occupies a lock address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeStatus {
    /// Nothing is bound; the next request becomes holder immediately.
    Free,
    /// A live holder accepted the probe connection.
    Held(Option<HolderInfo>),
    /// The address exists but refuses connections.
    Stale,
    /// The address is occupied by something that is not a socket.
    Foreign,
}

impl ProbeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProbeStatus::Free => "free",
            ProbeStatus::Held(_) => "held",
            ProbeStatus::Stale => "stale",
            ProbeStatus::Foreign => "foreign",
        }
    }
}

/// A lock address found in the lock directory.
#[derive(Debug, Clone)]
pub struct LockEntry {
    pub address: ChannelAddress,
    pub status: ProbeStatus,
}

impl fmt::Display for LockEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.address.name(), self.status.as_str())?;
        if let ProbeStatus::Held(Some(info)) = &self.status {
            write!(
                f,
                " owner: {}, pid: {}, age: {}",
                info.owner,
                info.pid,
                info.age_string()
            )?;
        }
        Ok(())
    }
}

/// Inspect `address` without contending for it.
pub(crate) async fn probe<T: Transport>(
    transport: &T,
    address: &ChannelAddress,
    config: &Config,
) -> Result<ProbeStatus> {
    let identity = transport
        .identify(address)
        .map_err(|e| SocklockError::platform(address, e))?;
    match identity {
        None => return Ok(ProbeStatus::Free),
        Some(id) if !id.is_socket => return Ok(ProbeStatus::Foreign),
        Some(_) => {}
    }

    match transport.connect(address).await {
        Ok(mut stream) => {
            let info = match tokio::time::timeout(config.probe_timeout(), read_greeting(&mut stream)).await {
                Ok(Greeting::Line(info)) => info,
                Ok(Greeting::Closed) | Err(_) => None,
            };
            Ok(ProbeStatus::Held(info))
        }
        Err(e) if e.kind() == io::ErrorKind::ConnectionRefused => Ok(ProbeStatus::Stale),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(ProbeStatus::Free),
        Err(e) => Err(SocklockError::platform(address, e)),
    }
}

/// Remove a stale address. Live or foreign addresses are refused.
pub(crate) async fn clear<T: Transport>(
    transport: &T,
    address: &ChannelAddress,
    config: &Config,
    force: bool,
) -> Result<()> {
    if !force {
        return Err(SocklockError::UserError(format!(
            "refusing to clear lock without --force flag.\n\n\
             Only clear a lock whose holder has crashed.\n\n\
             To clear the lock, run:\n  socklock clear {} --force",
            address.name()
        )));
    }

    let observed = transport
        .identify(address)
        .map_err(|e| SocklockError::platform(address, e))?;

    match probe(transport, address, config).await? {
        ProbeStatus::Free => Err(SocklockError::UserError(format!(
            "lock '{}' does not exist at: {}",
            address.name(),
            address
        ))),
        ProbeStatus::Held(_) => Err(SocklockError::LockError(format!(
            "lock '{}' is held by a live process",
            address.name()
        ))),
        ProbeStatus::Foreign => Err(SocklockError::UserError(format!(
            "'{}' is not a socket; refusing to remove it",
            address
        ))),
        ProbeStatus::Stale => match reclaim(transport, address, observed)
            .map_err(|e| SocklockError::platform(address, e))?
        {
            ReclaimOutcome::Removed | ReclaimOutcome::AlreadyGone => Ok(()),
            ReclaimOutcome::Replaced => Err(SocklockError::LockError(format!(
                "lock '{}' was re-acquired while clearing",
                address.name()
            ))),
            ReclaimOutcome::Foreign => Err(SocklockError::UserError(format!(
                "'{}' is not a socket; refusing to remove it",
                address
            ))),
        },
    }
}
