//! Lock handles.
//!
//! A request returns a [`PendingLock`] synchronously, before the election has
//! produced an outcome. It can be awaited (resolving to a [`LockHandle`] once
//! this contender becomes holder) or turned into a callback registration with
//! [`PendingLock::on_complete`]. Both paths observe the same one-shot
//! completion, so a request resolves at most once.
//!
//! A resolved [`LockHandle`] is not a future: it only reports status and
//! releases.
//!
//! # Release on drop
//!
//! Dropping the last caller-owned clone of a handle releases the lock exactly
//! as [`LockHandle::release`] would.

use crate::address::ChannelAddress;
use crate::error::{Result, SocklockError};
use crate::holder::HolderInfo;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard};
use std::task::{Context, Poll};
use tokio::sync::{oneshot, watch};
use tracing::{debug, info};

/// A contender's relationship to the lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Role {
    /// No election outcome yet (or re-electing after a disconnect).
    #[default]
    Unresolved,
    /// Owns the exclusive bind.
    Holder,
    /// Connected to the current holder, waiting for it to let go.
    Waiter,
    /// Released or abandoned; terminal.
    Released,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Unresolved => "unresolved",
            Role::Holder => "holder",
            Role::Waiter => "waiter",
            Role::Released => "released",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot broadcast to anything watching a request.
#[derive(Debug, Clone, Default)]
pub(crate) struct Progress {
    pub(crate) role: Role,
    /// Number of times this contender connected to a holder as a waiter.
    pub(crate) connects: u32,
    pub(crate) holder: Option<HolderInfo>,
}

/// Runs once when a holder releases: removes the address it owns.
pub(crate) type Teardown = Box<dyn FnOnce() + Send>;

struct Status {
    progress: Progress,
    teardown: Option<Teardown>,
}

/// State shared between a request's election task and its handles.
pub(crate) struct LockState {
    address: ChannelAddress,
    status: Mutex<Status>,
    watch: watch::Sender<Progress>,
}

impl LockState {
    pub(crate) fn new(address: ChannelAddress) -> Arc<Self> {
        let (watch, _) = watch::channel(Progress::default());
        Arc::new(Self {
            address,
            status: Mutex::new(Status {
                progress: Progress::default(),
                teardown: None,
            }),
            watch,
        })
    }

    pub(crate) fn address(&self) -> &ChannelAddress {
        &self.address
    }

    fn status(&self) -> MutexGuard<'_, Status> {
        self.status.lock().unwrap_or_else(|poison| poison.into_inner())
    }

    fn publish(&self, status: &Status) {
        self.watch.send_replace(status.progress.clone());
    }

    pub(crate) fn role(&self) -> Role {
        self.status().progress.role
    }

    pub(crate) fn holder(&self) -> Option<HolderInfo> {
        self.status().progress.holder.clone()
    }

    /// Become holder, unless the request was released in the meantime.
    ///
    /// On success `teardown` is stored and runs on release. On failure it is
    /// handed back so the caller can clean up the bind it just made.
    pub(crate) fn promote(&self, teardown: Teardown) -> std::result::Result<(), Teardown> {
        let mut status = self.status();
        if status.progress.role == Role::Released {
            return Err(teardown);
        }
        status.progress.role = Role::Holder;
        status.progress.holder = None;
        status.teardown = Some(teardown);
        self.publish(&status);
        Ok(())
    }

    /// Record a successful waiter connection. Returns false if released.
    pub(crate) fn enqueue(&self) -> bool {
        let mut status = self.status();
        if status.progress.role == Role::Released {
            return false;
        }
        status.progress.role = Role::Waiter;
        status.progress.connects += 1;
        self.publish(&status);
        true
    }

    /// Remember the metadata the current holder announced.
    pub(crate) fn observe_holder(&self, info: HolderInfo) {
        let mut status = self.status();
        if status.progress.role == Role::Waiter {
            status.progress.holder = Some(info);
            self.publish(&status);
        }
    }

    /// The holder went away; back to contending.
    pub(crate) fn rejoin(&self) {
        let mut status = self.status();
        if status.progress.role == Role::Waiter {
            status.progress.role = Role::Unresolved;
            status.progress.holder = None;
            self.publish(&status);
        }
    }

    /// Move to the terminal state. Returns the role held before, or `None`
    /// if already released.
    pub(crate) fn release(&self) -> Option<Role> {
        let (previous, teardown) = {
            let mut status = self.status();
            let previous = status.progress.role;
            if previous == Role::Released {
                return None;
            }
            status.progress.role = Role::Released;
            status.progress.holder = None;
            let teardown = status.teardown.take();
            self.publish(&status);
            (previous, teardown)
        };
        if let Some(teardown) = teardown {
            teardown();
        }
        Some(previous)
    }

    pub(crate) fn subscribe(&self) -> watch::Receiver<Progress> {
        self.watch.subscribe()
    }

    /// Resolves once the request reaches the terminal state.
    pub(crate) async fn released(&self) {
        let mut rx = self.subscribe();
        let _ = rx.wait_for(|p| p.role == Role::Released).await;
    }
}

/// Releases the lock when the last caller-owned handle clone drops.
struct ReleaseOnDrop {
    state: Arc<LockState>,
}

impl Drop for ReleaseOnDrop {
    fn drop(&mut self) {
        if let Some(Role::Holder) = self.state.release() {
            debug!(address = %self.state.address(), "lock released on drop");
        }
    }
}

/// A contender's handle on a named lock.
///
/// Clones share state; the lock is released when `release` is called on any
/// clone or when the last clone is dropped.
#[derive(Clone)]
pub struct LockHandle {
    guard: Arc<ReleaseOnDrop>,
}

impl LockHandle {
    pub(crate) fn new(state: Arc<LockState>) -> Self {
        Self {
            guard: Arc::new(ReleaseOnDrop { state }),
        }
    }

    fn state(&self) -> &LockState {
        &self.guard.state
    }

    /// Snapshot: is this contender the holder right now?
    pub fn has_lock(&self) -> bool {
        self.state().role() == Role::Holder
    }

    /// Current role of this contender.
    pub fn role(&self) -> Role {
        self.state().role()
    }

    /// The channel address this lock is bound to.
    pub fn address(&self) -> &ChannelAddress {
        self.state().address()
    }

    /// Release the lock, or abandon the request if it has not resolved.
    ///
    /// As holder this removes the address and disconnects every waiter. As
    /// waiter it closes only this contender's connection. Calling it again is
    /// a no-op.
    pub fn release(&self) {
        match self.state().release() {
            Some(Role::Holder) => info!(address = %self.address(), "lock released"),
            Some(role) => debug!(address = %self.address(), %role, "lock request abandoned"),
            None => {}
        }
    }
}

impl fmt::Debug for LockHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LockHandle")
            .field("address", &self.address().to_string())
            .field("role", &self.role())
            .finish()
    }
}

/// An unresolved lock request.
///
/// Awaiting it yields the [`LockHandle`] once this contender holds the lock;
/// while it waits behind another holder it stays pending.
pub struct PendingLock {
    handle: LockHandle,
    completion: oneshot::Receiver<Result<()>>,
}

impl PendingLock {
    pub(crate) fn new(handle: LockHandle, completion: oneshot::Receiver<Result<()>>) -> Self {
        Self { handle, completion }
    }

    /// A handle sharing this request's state.
    pub fn handle(&self) -> LockHandle {
        self.handle.clone()
    }

    pub fn has_lock(&self) -> bool {
        self.handle.has_lock()
    }

    pub fn role(&self) -> Role {
        self.handle.role()
    }

    pub fn address(&self) -> &ChannelAddress {
        self.handle.address()
    }

    /// Abandon the request (or release, if it already holds).
    pub fn release(&self) {
        self.handle.release();
    }

    /// Metadata announced by the holder this request is waiting on.
    pub fn holder(&self) -> Option<HolderInfo> {
        self.handle.state().holder()
    }

    /// Wait for the "connected" notification.
    ///
    /// Returns `true` once this request has connected to a holder as a waiter,
    /// or `false` if it reached holder or terminal state without ever waiting.
    pub async fn connected(&self) -> bool {
        let mut rx = self.handle.state().subscribe();
        let seen = rx
            .wait_for(|p| p.connects > 0 || matches!(p.role, Role::Holder | Role::Released))
            .await
            .map(|p| p.connects > 0);
        seen.unwrap_or(false)
    }

    /// Deliver the outcome to `callback` instead of awaiting it.
    ///
    /// The callback fires exactly once: with the handle when this contender
    /// becomes holder, or with the error if acquisition fails. It does not
    /// fire for a request abandoned through `release`. The registration keeps
    /// the request alive until then; the returned handle observes it.
    pub fn on_complete<F>(self, callback: F) -> LockHandle
    where
        F: FnOnce(Result<LockHandle>) + Send + 'static,
    {
        let handle = self.handle.clone();
        tokio::spawn(async move {
            match self.await {
                Err(SocklockError::Abandoned(address)) => {
                    debug!(%address, "callback dropped for abandoned request");
                }
                outcome => callback(outcome),
            }
        });
        handle
    }
}

impl Future for PendingLock {
    type Output = Result<LockHandle>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match Pin::new(&mut self.completion).poll(cx) {
            Poll::Pending => Poll::Pending,
            Poll::Ready(Ok(Ok(()))) => Poll::Ready(Ok(self.handle.clone())),
            Poll::Ready(Ok(Err(e))) => Poll::Ready(Err(e)),
            Poll::Ready(Err(_)) => Poll::Ready(Err(SocklockError::LockError(format!(
                "election for '{}' ended without an outcome",
                self.handle.address()
            )))),
        }
    }
}

impl fmt::Debug for PendingLock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingLock")
            .field("address", &self.address().to_string())
            .field("role", &self.role())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn state() -> Arc<LockState> {
        LockState::new(ChannelAddress::verbatim("/tmp/handle-test.sock"))
    }

    #[test]
    fn new_state_is_unresolved() {
        let handle = LockHandle::new(state());
        assert_eq!(handle.role(), Role::Unresolved);
        assert!(!handle.has_lock());
    }

    #[test]
    fn promote_runs_teardown_once_on_release() {
        let state = state();
        let runs = Arc::new(AtomicUsize::new(0));
        let counter = runs.clone();
        assert!(
            state
                .promote(Box::new(move || {
                    counter.fetch_add(1, Ordering::SeqCst);
                }))
                .is_ok()
        );

        let handle = LockHandle::new(state);
        assert!(handle.has_lock());

        handle.release();
        handle.release();
        assert!(!handle.has_lock());
        assert_eq!(handle.role(), Role::Released);
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn promote_after_release_hands_teardown_back() {
        let state = state();
        assert_eq!(state.release(), Some(Role::Unresolved));
        assert!(state.promote(Box::new(|| {})).is_err());
        assert_eq!(state.role(), Role::Released);
    }

    #[test]
    fn waiter_rejoins_on_disconnect() {
        let state = state();
        assert!(state.enqueue());
        assert_eq!(state.role(), Role::Waiter);

        state.observe_holder(HolderInfo::current("x"));
        assert!(state.holder().is_some());

        state.rejoin();
        assert_eq!(state.role(), Role::Unresolved);
        assert!(state.holder().is_none());
    }

    #[test]
    fn release_on_waiter_is_quiet_and_idempotent() {
        let state = state();
        state.enqueue();
        let handle = LockHandle::new(state);

        handle.release();
        handle.release();
        assert_eq!(handle.role(), Role::Released);
    }

    #[test]
    fn dropping_last_clone_releases() {
        let state = state();
        let runs = Arc::new(AtomicUsize::new(0));
        let counter = runs.clone();
        let _ = state.promote(Box::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        }));

        let handle = LockHandle::new(state.clone());
        let clone = handle.clone();
        drop(handle);
        assert_eq!(runs.load(Ordering::SeqCst), 0);
        assert!(clone.has_lock());

        drop(clone);
        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert_eq!(state.role(), Role::Released);
    }

    #[tokio::test]
    async fn pending_resolves_to_handle_on_success() {
        let state = state();
        let (tx, rx) = oneshot::channel();
        let pending = PendingLock::new(LockHandle::new(state.clone()), rx);

        let _ = state.promote(Box::new(|| {}));
        tx.send(Ok(())).unwrap();

        let handle = pending.await.unwrap();
        assert!(handle.has_lock());
    }

    #[tokio::test]
    async fn pending_surfaces_dropped_sender_as_lock_error() {
        let (tx, rx) = oneshot::channel::<Result<()>>();
        let pending = PendingLock::new(LockHandle::new(state()), rx);
        drop(tx);

        let err = pending.await.unwrap_err();
        assert!(matches!(err, SocklockError::LockError(_)));
    }

    #[tokio::test]
    async fn connected_reports_waiting() {
        let state = state();
        let (_tx, rx) = oneshot::channel();
        let pending = PendingLock::new(LockHandle::new(state.clone()), rx);

        state.enqueue();
        assert!(pending.connected().await);
    }

    #[tokio::test]
    async fn connected_is_false_for_direct_holder() {
        let state = state();
        let (_tx, rx) = oneshot::channel();
        let pending = PendingLock::new(LockHandle::new(state.clone()), rx);

        let _ = state.promote(Box::new(|| {}));
        assert!(!pending.connected().await);
    }

    #[tokio::test]
    async fn callback_fires_once_with_outcome() {
        let state = state();
        let (tx, rx) = oneshot::channel();
        let pending = PendingLock::new(LockHandle::new(state.clone()), rx);
        let (done_tx, done_rx) = oneshot::channel();

        let _observer = pending.on_complete(move |outcome| {
            let _ = done_tx.send(outcome.map(|h| h.has_lock()));
        });
        let _ = state.promote(Box::new(|| {}));
        tx.send(Ok(())).unwrap();

        assert!(done_rx.await.unwrap().unwrap());
    }

    #[tokio::test]
    async fn callback_skipped_when_abandoned() {
        let state = state();
        let (tx, rx) = oneshot::channel();
        let pending = PendingLock::new(LockHandle::new(state.clone()), rx);
        let (done_tx, done_rx) = oneshot::channel::<()>();

        let observer = pending.on_complete(move |_| {
            let _ = done_tx.send(());
        });
        observer.release();
        tx.send(Err(SocklockError::Abandoned("x".to_string()))).unwrap();

        // The sender is dropped without firing.
        assert!(done_rx.await.is_err());
    }
}
