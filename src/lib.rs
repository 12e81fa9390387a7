//! Socklock: a named, cross-process mutex built on the exclusivity of binding
//! a local socket address.
//!
//! Every request for a name races to bind the same address. The one bind the
//! platform allows makes its requester the holder; everyone else connects to
//! the holder and waits. When the holder releases (or its process dies) every
//! waiter's connection closes and each of them races again. An address left
//! behind by a crashed holder refuses connections and is reclaimed by the
//! first waiter that notices.
//!
//! ```no_run
//! use socklock::{Config, Locker};
//!
//! # async fn demo() -> socklock::Result<()> {
//! let locker = Locker::new(Config::default());
//! let lock = locker.acquire("nightly-build").await?;
//! assert!(lock.has_lock());
//! // ... critical section ...
//! lock.release();
//! # Ok(())
//! # }
//! ```

pub mod address;
pub mod config;
mod election;
pub mod error;
pub mod exit_codes;
mod handle;
pub mod holder;
mod locker;
mod probe;
mod reclaim;
mod release;
mod session;
pub mod transport;
mod waiters;

pub use address::ChannelAddress;
pub use config::Config;
pub use error::{Result, SocklockError};
pub use handle::{LockHandle, PendingLock, Role};
pub use holder::HolderInfo;
pub use locker::Locker;
pub use probe::{LockEntry, ProbeStatus};
