//! Election engine.
//!
//! One election is a bind-or-connect attempt that ends with this contender
//! either holding the exclusive bind or connected as a waiter. It runs as an
//! explicit state machine:
//!
//! | phase        | outcome                         | next                    |
//! |--------------|---------------------------------|-------------------------|
//! | `Binding`    | bound                           | done: holder            |
//! | `Binding`    | address in use                  | `Connecting`            |
//! | `Connecting` | connected                       | done: waiter            |
//! | `Connecting` | refused (stale)                 | `Reclaiming`            |
//! | `Connecting` | address vanished                | `Binding` (retry)       |
//! | `Reclaiming` | removed / already gone / replaced | `Binding` (retry)     |
//! | `Reclaiming` | not a socket                    | `Binding` after a poll  |
//!
//! Anything else is a platform failure and ends the election. Retries are
//! capped by `reclaim_retry_limit`; the engine adds no locking of its own,
//! exclusivity comes from the platform's bind.

use crate::address::ChannelAddress;
use crate::config::Config;
use crate::error::{Result, SocklockError};
use crate::reclaim::{ReclaimOutcome, reclaim};
use crate::transport::{AddressIdentity, Transport};
use std::io;
use tracing::{debug, warn};

/// Where an election currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Phase {
    Binding,
    Connecting,
    /// Refused connect; carries the identity seen before connecting.
    Reclaiming(Option<AddressIdentity>),
}

/// How an election ended.
pub(crate) enum Elected<T: Transport> {
    Holder(T::Listener),
    Waiter(T::Stream),
}

enum Step<T: Transport> {
    Next(Phase),
    Done(Elected<T>),
}

/// Why a connect attempt failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConnectFailure {
    /// Address exists but nothing listens.
    Refused,
    /// Address disappeared after the bind conflict.
    Vanished,
    Platform,
}

fn is_bind_conflict(err: &io::Error) -> bool {
    err.kind() == io::ErrorKind::AddrInUse
}

fn classify_connect(err: &io::Error) -> ConnectFailure {
    match err.kind() {
        io::ErrorKind::ConnectionRefused => ConnectFailure::Refused,
        io::ErrorKind::NotFound => ConnectFailure::Vanished,
        _ => ConnectFailure::Platform,
    }
}

pub(crate) struct Election<'a, T: Transport> {
    transport: &'a T,
    address: &'a ChannelAddress,
    config: &'a Config,
    retries: u32,
}

impl<'a, T: Transport> Election<'a, T> {
    pub(crate) fn new(transport: &'a T, address: &'a ChannelAddress, config: &'a Config) -> Self {
        Self {
            transport,
            address,
            config,
            retries: 0,
        }
    }

    /// Run until this contender is holder or waiter.
    pub(crate) async fn run(mut self) -> Result<Elected<T>> {
        let mut phase = Phase::Binding;
        loop {
            debug!(address = %self.address, ?phase, "election step");
            match self.step(phase).await? {
                Step::Next(next) => phase = next,
                Step::Done(elected) => return Ok(elected),
            }
        }
    }

    async fn step(&mut self, phase: Phase) -> Result<Step<T>> {
        match phase {
            Phase::Binding => match self.transport.bind(self.address).await {
                Ok(listener) => Ok(Step::Done(Elected::Holder(listener))),
                Err(e) if is_bind_conflict(&e) => Ok(Step::Next(Phase::Connecting)),
                Err(e) => Err(self.platform(e)),
            },
            Phase::Connecting => {
                let observed = self.transport.identify(self.address).map_err(|e| self.platform(e))?;
                if observed.is_none() {
                    self.retry().await?;
                    return Ok(Step::Next(Phase::Binding));
                }
                match self.transport.connect(self.address).await {
                    Ok(stream) => Ok(Step::Done(Elected::Waiter(stream))),
                    Err(e) => match classify_connect(&e) {
                        ConnectFailure::Refused => Ok(Step::Next(Phase::Reclaiming(observed))),
                        ConnectFailure::Vanished => {
                            self.retry().await?;
                            Ok(Step::Next(Phase::Binding))
                        }
                        ConnectFailure::Platform => Err(self.platform(e)),
                    },
                }
            }
            Phase::Reclaiming(observed) => {
                match reclaim(self.transport, self.address, observed).map_err(|e| self.platform(e))? {
                    ReclaimOutcome::Removed
                    | ReclaimOutcome::AlreadyGone
                    | ReclaimOutcome::Replaced => {
                        self.retry().await?;
                    }
                    ReclaimOutcome::Foreign => {
                        debug!(address = %self.address, "address occupied by a non-socket; polling");
                        tokio::time::sleep(self.config.foreign_poll()).await;
                    }
                }
                Ok(Step::Next(Phase::Binding))
            }
        }
    }

    /// Count one retry against the cap and back off before the next bind.
    async fn retry(&mut self) -> Result<()> {
        self.retries += 1;
        if let Some(limit) = self.config.reclaim_retry_limit
            && self.retries > limit
        {
            warn!(address = %self.address, retries = self.retries, "giving up on stale address");
            return Err(SocklockError::LockError(format!(
                "gave up on '{}' after {} stale-address retries",
                self.address, limit
            )));
        }
        let backoff = self.config.reclaim_backoff();
        if !backoff.is_zero() {
            tokio::time::sleep(backoff).await;
        }
        Ok(())
    }

    fn platform(&self, source: io::Error) -> SocklockError {
        SocklockError::platform(self.address, source)
    }
}
