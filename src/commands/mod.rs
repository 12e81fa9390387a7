//! Command implementations for socklock.
//!
//! This module provides the dispatcher that routes CLI commands to their
//! implementations. Each command returns the process exit code on success.

mod clear;
mod exec;
mod hold;
mod status;

use crate::cli::{Cli, Command};
use socklock::transport::DefaultTransport;
use socklock::{Config, Locker, Result};

/// Dispatch a command to its implementation.
pub async fn dispatch(cli: Cli) -> Result<i32> {
    let config = Config::discover(cli.config.as_deref())?;
    let locker: Locker<DefaultTransport> = Locker::new(config);

    match cli.command {
        Command::Hold(args) => hold::cmd_hold(&locker, args).await,
        Command::Exec(args) => exec::cmd_exec(&locker, args).await,
        Command::Status(args) => status::cmd_status(&locker, args).await,
        Command::List(args) => status::cmd_list(&locker, args).await,
        Command::Clear(args) => clear::cmd_clear(&locker, args).await,
    }
}
