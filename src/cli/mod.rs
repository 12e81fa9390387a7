//! CLI argument parsing for socklock.
//!
//! Uses clap derive macros for declarative argument definitions.
//! This module defines the command structure; actual implementations
//! are in the `commands` module.

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

/// Socklock: named cross-process locks built on exclusive socket binding.
///
/// A lock name is either a bare name (placed in the configured lock
/// directory) or a filesystem path for the lock's socket.
#[derive(Parser, Debug)]
#[command(name = "socklock")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// YAML config file (overrides SOCKLOCK_CONFIG).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Increase log verbosity (-v debug, -vv trace). RUST_LOG takes precedence.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Available commands for socklock.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Acquire a lock and hold it until interrupted.
    ///
    /// Prints `acquired <address>` once the lock is held, then waits for
    /// SIGINT, SIGTERM or SIGHUP and releases.
    Hold(HoldArgs),

    /// Run a command while holding a lock.
    ///
    /// Exits with the command's exit code.
    Exec(ExecArgs),

    /// Show who holds a lock.
    Status(StatusArgs),

    /// List locks in the lock directory.
    List(ListArgs),

    /// Remove a lock address left behind by a crashed holder.
    ///
    /// Requires --force flag to prevent accidental clearing.
    Clear(ClearArgs),
}

/// Arguments for the `hold` command.
#[derive(Parser, Debug)]
pub struct HoldArgs {
    /// Lock name or socket path.
    pub name: String,

    /// Exit on signal without releasing, leaving the address behind.
    #[arg(long)]
    pub no_release: bool,
}

/// Arguments for the `exec` command.
#[derive(Parser, Debug)]
pub struct ExecArgs {
    /// Lock name or socket path.
    pub name: String,

    /// Command line to run, split with shell quoting rules.
    #[arg(short = 'c', long = "command")]
    pub command: Option<String>,

    /// Program and arguments to run (after `--`).
    #[arg(last = true)]
    pub argv: Vec<String>,
}

/// Arguments for the `status` command.
#[derive(Parser, Debug)]
pub struct StatusArgs {
    /// Lock name or socket path.
    pub name: String,
}

/// Arguments for the `list` command.
#[derive(Parser, Debug)]
pub struct ListArgs {
    /// Glob over bare lock names (e.g. `build-*`).
    #[arg(long)]
    pub pattern: Option<String>,
}

/// Arguments for the `clear` command.
#[derive(Parser, Debug)]
pub struct ClearArgs {
    /// Lock name or socket path.
    pub name: String,

    /// Force clearing the lock (required for safety).
    #[arg(long)]
    pub force: bool,
}

impl Cli {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
