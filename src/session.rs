//! Per-request lifecycle.
//!
//! Each request runs one task: elect, then either hold (serving waiters until
//! release) or wait (until the holder disconnects, then elect again). Requests
//! within a process never coordinate with each other; they only meet at the
//! platform's bind.

use crate::config::Config;
use crate::election::{Elected, Election};
use crate::error::{Result, SocklockError};
use crate::handle::{LockState, Teardown};
use crate::holder::HolderInfo;
use crate::release::{close_holder, remove_owned_address};
use crate::transport::{ChannelListener, Transport};
use crate::waiters::{WaiterQueue, await_disconnect};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tracing::{debug, info, warn};

/// Pause after a failed accept before trying again.
const ACCEPT_RETRY: Duration = Duration::from_millis(10);

/// How often an idle holder drops connections whose waiter already left.
const WAITER_SWEEP: Duration = Duration::from_secs(1);

pub(crate) struct Session<T: Transport> {
    transport: Arc<T>,
    config: Arc<Config>,
    state: Arc<LockState>,
}

impl<T: Transport> Session<T> {
    pub(crate) fn new(transport: Arc<T>, config: Arc<Config>, state: Arc<LockState>) -> Self {
        Self {
            transport,
            config,
            state,
        }
    }

    /// Drive the request to completion. `completion` fires once: `Ok` when
    /// this contender becomes holder, `Err` on failure or abandonment.
    pub(crate) async fn run(self, completion: oneshot::Sender<Result<()>>) {
        let address = self.state.address().clone();
        loop {
            let elected = tokio::select! {
                biased;
                _ = self.state.released() => {
                    let _ = completion.send(Err(self.abandoned()));
                    return;
                }
                outcome = Election::new(&*self.transport, &address, &self.config).run() => outcome,
            };

            match elected {
                Err(e) => {
                    debug!(address = %address, error = %e, "election failed");
                    self.state.release();
                    let _ = completion.send(Err(e));
                    return;
                }
                Ok(Elected::Holder(listener)) => {
                    self.hold(listener, completion).await;
                    return;
                }
                Ok(Elected::Waiter(stream)) => {
                    if !self.state.enqueue() {
                        let _ = completion.send(Err(self.abandoned()));
                        return;
                    }
                    debug!(address = %address, "connected as waiter");

                    let state = &self.state;
                    tokio::select! {
                        biased;
                        _ = state.released() => {
                            let _ = completion.send(Err(self.abandoned()));
                            return;
                        }
                        _ = await_disconnect(stream, |info| state.observe_holder(info)) => {
                            state.rejoin();
                            debug!(address = %address, "holder disconnected; re-electing");
                        }
                    }
                }
            }
        }
    }

    /// Serve as holder until released.
    async fn hold(&self, listener: T::Listener, completion: oneshot::Sender<Result<()>>) {
        let address = self.state.address().clone();
        let owned = listener.identity();

        let transport = self.transport.clone();
        let teardown_address = address.clone();
        let teardown: Teardown =
            Box::new(move || remove_owned_address(&*transport, &teardown_address, owned));

        if let Err(teardown) = self.state.promote(teardown) {
            teardown();
            let _ = completion.send(Err(self.abandoned()));
            return;
        }
        info!(address = %address, "lock acquired");
        let _ = completion.send(Ok(()));

        let greeting = if self.config.announce_holder {
            HolderInfo::current(address.name()).to_line()
        } else {
            None
        };
        let mut queue = WaiterQueue::new(greeting);
        let mut sweep = interval_at(Instant::now() + WAITER_SWEEP, WAITER_SWEEP);
        sweep.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = self.state.released() => break,
                _ = sweep.tick() => {
                    let departed = queue.prune();
                    if departed > 0 {
                        debug!(address = %address, departed, waiters = queue.len(), "dropped departed waiters");
                    }
                }
                accepted = listener.accept() => match accepted {
                    Ok(stream) => {
                        queue.admit(stream).await;
                        debug!(address = %address, waiters = queue.len(), "waiter queued");
                    }
                    Err(e) => {
                        warn!(address = %address, error = %e, "accept failed");
                        tokio::time::sleep(ACCEPT_RETRY).await;
                    }
                },
            }
        }

        let notified = close_holder(listener, queue);
        debug!(address = %address, waiters = notified, "waiters notified of release");
    }

    fn abandoned(&self) -> SocklockError {
        SocklockError::Abandoned(self.state.address().to_string())
    }
}
