//! Implementation of the `socklock hold` command.

use crate::cli::HoldArgs;
use socklock::transport::DefaultTransport;
use socklock::{Locker, Result, SocklockError, exit_codes};
use std::io::Write;
use tokio::signal::unix::{SignalKind, signal};
use tracing::info;

/// Execute the `socklock hold` command.
///
/// Acquires the lock, announces it on stdout, and holds it until SIGINT,
/// SIGTERM or SIGHUP. With `--no-release` the process exits without
/// releasing, which leaves a stale address for the next contender to reclaim.
pub async fn cmd_hold(locker: &Locker<DefaultTransport>, args: HoldArgs) -> Result<i32> {
    let lock = locker.acquire(&args.name).await?;

    println!("acquired {}", lock.address());
    let _ = std::io::stdout().flush();

    wait_for_shutdown().await?;

    if args.no_release {
        info!(address = %lock.address(), "exiting without release");
        std::mem::forget(lock);
    } else {
        lock.release();
    }
    Ok(exit_codes::SUCCESS)
}

async fn wait_for_shutdown() -> Result<()> {
    let install = |kind: SignalKind| {
        signal(kind).map_err(|e| SocklockError::platform("signal handler", e))
    };
    let mut interrupt = install(SignalKind::interrupt())?;
    let mut terminate = install(SignalKind::terminate())?;
    let mut hangup = install(SignalKind::hangup())?;

    tokio::select! {
        _ = interrupt.recv() => info!("received SIGINT"),
        _ = terminate.recv() => info!("received SIGTERM"),
        _ = hangup.recv() => info!("received SIGHUP"),
    }
    Ok(())
}
