//! Release and cleanup path.
//!
//! A holder releases in two steps. Synchronously, inside `release()`, it
//! removes the address it owns so the next contender can bind. Then its
//! session closes the listener and every waiter connection, which is what
//! wakes the waiters.

use crate::address::ChannelAddress;
use crate::transport::{AddressIdentity, ChannelListener, Transport};
use crate::waiters::WaiterQueue;
use std::io;
use tracing::{debug, warn};

/// Remove `address` only if it is still the entry this holder bound.
pub(crate) fn remove_owned_address<T: Transport>(
    transport: &T,
    address: &ChannelAddress,
    owned: Option<AddressIdentity>,
) {
    let Some(owned) = owned else {
        warn!(address = %address, "bound identity unknown; leaving address for reclaim");
        return;
    };

    match transport.identify(address) {
        Ok(Some(current)) if current.same_entry(&owned) => match transport.remove(address) {
            Ok(()) => debug!(address = %address, "address removed"),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => warn!(address = %address, error = %e, "failed to remove address"),
        },
        Ok(Some(_)) => warn!(address = %address, "address was replaced; leaving it in place"),
        Ok(None) => debug!(address = %address, "address already removed"),
        Err(e) => warn!(address = %address, error = %e, "failed to inspect address"),
    }
}

/// Close the listener and disconnect every waiter. Returns how many waiters
/// were notified.
pub(crate) fn close_holder<L: ChannelListener>(listener: L, mut queue: WaiterQueue<L::Stream>) -> usize {
    drop(listener);
    queue.disconnect_all()
}
