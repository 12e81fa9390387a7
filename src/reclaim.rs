//! Stale-channel reclaimer.
//!
//! Invoked only after a connect was refused: the address exists but nothing
//! listens on it, so the previous holder exited without releasing. Removal
//! never confers holder status; the caller goes back to binding.

use crate::address::ChannelAddress;
use crate::transport::{AddressIdentity, Transport};
use std::io;
use tracing::debug;

/// What the reclaimer found and did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ReclaimOutcome {
    /// The stale address was removed.
    Removed,
    /// Someone else removed it first.
    AlreadyGone,
    /// A different entry now occupies the address; it was left alone.
    Replaced,
    /// The address is occupied by something that is not a socket.
    Foreign,
}

/// Remove the stale entry at `address`.
///
/// `observed` is the identity seen just before the refused connect; an entry
/// with a different identity belongs to a newer contender and is kept.
pub(crate) fn reclaim<T: Transport>(
    transport: &T,
    address: &ChannelAddress,
    observed: Option<AddressIdentity>,
) -> io::Result<ReclaimOutcome> {
    let current = match transport.identify(address)? {
        Some(current) => current,
        None => return Ok(ReclaimOutcome::AlreadyGone),
    };

    if !current.is_socket {
        return Ok(ReclaimOutcome::Foreign);
    }

    match observed {
        Some(seen) if seen.same_entry(&current) => {}
        _ => return Ok(ReclaimOutcome::Replaced),
    }

    match transport.remove(address) {
        Ok(()) => {
            debug!(address = %address, "removed stale address");
            Ok(ReclaimOutcome::Removed)
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(ReclaimOutcome::AlreadyGone),
        Err(e) => Err(e),
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::transport::UnixTransport;
    use tempfile::TempDir;

    fn address(temp: &TempDir, name: &str) -> ChannelAddress {
        let path = temp.path().join(name);
        ChannelAddress::resolve(path.to_str().unwrap(), &Config::default()).unwrap()
    }

    async fn stale_socket(addr: &ChannelAddress) -> AddressIdentity {
        drop(UnixTransport.bind(addr).await.unwrap());
        UnixTransport.identify(addr).unwrap().unwrap()
    }

    #[tokio::test]
    async fn removes_observed_stale_socket() {
        let temp = TempDir::new().unwrap();
        let addr = address(&temp, "stale.sock");
        let seen = stale_socket(&addr).await;

        let outcome = reclaim(&UnixTransport, &addr, Some(seen)).unwrap();
        assert_eq!(outcome, ReclaimOutcome::Removed);
        assert!(!addr.path().exists());
    }

    #[tokio::test]
    async fn missing_address_counts_as_success() {
        let temp = TempDir::new().unwrap();
        let addr = address(&temp, "gone.sock");
        let seen = stale_socket(&addr).await;
        std::fs::remove_file(addr.path()).unwrap();

        let outcome = reclaim(&UnixTransport, &addr, Some(seen)).unwrap();
        assert_eq!(outcome, ReclaimOutcome::AlreadyGone);
    }

    #[tokio::test]
    async fn replaced_socket_is_left_alone() {
        let temp = TempDir::new().unwrap();
        let addr = address(&temp, "swap.sock");
        let seen = stale_socket(&addr).await;

        // Another contender reclaims and rebinds before we get to it.
        std::fs::remove_file(addr.path()).unwrap();
        let _live = UnixTransport.bind(&addr).await.unwrap();

        let outcome = reclaim(&UnixTransport, &addr, Some(seen)).unwrap();
        assert_eq!(outcome, ReclaimOutcome::Replaced);
        assert!(addr.path().exists());
    }

    #[tokio::test]
    async fn regular_file_is_never_removed() {
        let temp = TempDir::new().unwrap();
        let addr = address(&temp, "data.txt");
        std::fs::write(addr.path(), b"user data").unwrap();
        let seen = UnixTransport.identify(&addr).unwrap();

        let outcome = reclaim(&UnixTransport, &addr, seen).unwrap();
        assert_eq!(outcome, ReclaimOutcome::Foreign);
        assert_eq!(std::fs::read(addr.path()).unwrap(), b"user data");
    }
}
