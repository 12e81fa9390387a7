//! Unix-domain socket transport.
//!
//! A listener is never published half-ready. `bind(2)` and `listen(2)` are
//! separate calls, and a connect that lands between them is refused exactly
//! like a connect to a dead holder's socket. So the socket is brought up under
//! a private staging name and then hard-linked onto the lock address. The link
//! either creates the address atomically with a listening socket behind it or
//! fails because the address is taken.

use super::{AddressIdentity, ChannelListener, ChannelStream, Transport};
use crate::address::ChannelAddress;
use async_trait::async_trait;
use std::fs::Metadata;
use std::io;
use std::os::unix::fs::{FileTypeExt, MetadataExt};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::net::{UnixListener, UnixStream};
use tracing::debug;

static STAGING_SEQ: AtomicU64 = AtomicU64::new(0);

/// Transport over filesystem-addressed Unix-domain sockets.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnixTransport;

/// A bound Unix listener.
#[derive(Debug)]
pub struct UnixChannelListener {
    inner: UnixListener,
    identity: AddressIdentity,
}

impl ChannelStream for UnixStream {
    fn peer_closed(&self) -> bool {
        let mut probe = [0u8; 1];
        match self.try_read(&mut probe) {
            Ok(0) => true,
            Ok(_) => false,
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => false,
            Err(_) => true,
        }
    }
}

#[async_trait]
impl ChannelListener for UnixChannelListener {
    type Stream = UnixStream;

    async fn accept(&self) -> io::Result<UnixStream> {
        let (stream, _) = self.inner.accept().await?;
        Ok(stream)
    }

    fn identity(&self) -> Option<AddressIdentity> {
        Some(self.identity)
    }
}

#[async_trait]
impl Transport for UnixTransport {
    type Stream = UnixStream;
    type Listener = UnixChannelListener;

    async fn bind(&self, address: &ChannelAddress) -> io::Result<UnixChannelListener> {
        let staging = staging_path(address.path());
        let inner = match UnixListener::bind(&staging) {
            // Left behind by an earlier process with the same pid.
            Err(e) if e.kind() == io::ErrorKind::AddrInUse => {
                std::fs::remove_file(&staging)?;
                UnixListener::bind(&staging)?
            }
            other => other?,
        };

        let published = publish(&staging, address.path());
        if let Err(e) = std::fs::remove_file(&staging)
            && e.kind() != io::ErrorKind::NotFound
        {
            debug!(path = %staging.display(), error = %e, "failed to remove staging socket");
        }

        let identity = published?;
        Ok(UnixChannelListener { inner, identity })
    }

    async fn connect(&self, address: &ChannelAddress) -> io::Result<UnixStream> {
        UnixStream::connect(address.path()).await
    }

    fn identify(&self, address: &ChannelAddress) -> io::Result<Option<AddressIdentity>> {
        match std::fs::symlink_metadata(address.path()) {
            Ok(meta) => Ok(Some(identity_of(&meta))),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn remove(&self, address: &ChannelAddress) -> io::Result<()> {
        std::fs::remove_file(address.path())
    }
}

fn identity_of(meta: &Metadata) -> AddressIdentity {
    AddressIdentity {
        dev: meta.dev(),
        ino: meta.ino(),
        is_socket: meta.file_type().is_socket(),
    }
}

/// A name next to `path` that no other live process will pick.
fn staging_path(path: &Path) -> PathBuf {
    let seq = STAGING_SEQ.fetch_add(1, Ordering::Relaxed);
    path.with_file_name(format!(".{:x}.{:x}", std::process::id(), seq))
}

/// Link the listening socket at `staging` onto `path`.
///
/// Returns the identity of the published entry, which is the staging inode.
fn publish(staging: &Path, path: &Path) -> io::Result<AddressIdentity> {
    let identity = identity_of(&std::fs::symlink_metadata(staging)?);
    match std::fs::hard_link(staging, path) {
        Ok(()) => Ok(identity),
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => Err(io::Error::new(
            io::ErrorKind::AddrInUse,
            format!("{} is already bound", path.display()),
        )),
        Err(e) => Err(e),
    }
}
