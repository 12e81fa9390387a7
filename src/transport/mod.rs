//! Platform channel abstraction.
//!
//! The election engine only needs three primitives from the platform: an
//! exclusive bind, a connect, and a way to inspect or remove whatever currently
//! sits at an address. Keeping them behind [`Transport`] lets the addressing
//! scheme (Unix-domain socket path, named pipe) change without touching the
//! election logic.

use crate::address::ChannelAddress;
use async_trait::async_trait;
use std::io;
use tokio::io::{AsyncRead, AsyncWrite};

#[cfg(unix)]
mod unix;

#[cfg(unix)]
pub use unix::{UnixChannelListener, UnixTransport};

/// The transport used when none is specified.
#[cfg(unix)]
pub type DefaultTransport = UnixTransport;

/// A connected byte stream between a holder and one waiter.
pub trait ChannelStream: AsyncRead + AsyncWrite + Unpin + Send + 'static {
    /// Non-blocking check: has the peer closed its end?
    fn peer_closed(&self) -> bool;
}

/// An exclusively bound address accepting waiter connections.
#[async_trait]
pub trait ChannelListener: Send + Sync + 'static {
    type Stream: ChannelStream;

    async fn accept(&self) -> io::Result<Self::Stream>;

    /// Identity of the entry this listener published, when the platform has
    /// one. Teardown removes the address only while it still matches.
    fn identity(&self) -> Option<AddressIdentity>;
}

/// Identity of the filesystem entry occupying an address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddressIdentity {
    pub dev: u64,
    pub ino: u64,
    /// Whether the entry is a socket (as opposed to a regular file or directory).
    pub is_socket: bool,
}

impl AddressIdentity {
    /// True when both identities name the same filesystem entry.
    pub fn same_entry(&self, other: &AddressIdentity) -> bool {
        self.dev == other.dev && self.ino == other.ino
    }
}

/// Platform primitives for binding, connecting to, and reclaiming addresses.
///
/// `bind` must be exclusive: a second bind on an occupied address fails with
/// [`io::ErrorKind::AddrInUse`] and never silently succeeds. The address must
/// not become visible before the listener accepts connections, or a racing
/// contender would see it refuse and reclaim a live holder.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    type Stream: ChannelStream;
    type Listener: ChannelListener<Stream = Self::Stream>;

    async fn bind(&self, address: &ChannelAddress) -> io::Result<Self::Listener>;

    async fn connect(&self, address: &ChannelAddress) -> io::Result<Self::Stream>;

    /// Inspect the entry at `address`; `Ok(None)` when nothing is there.
    fn identify(&self, address: &ChannelAddress) -> io::Result<Option<AddressIdentity>>;

    /// Remove the entry at `address`.
    fn remove(&self, address: &ChannelAddress) -> io::Result<()>;
}
