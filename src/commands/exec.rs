//! Implementation of the `socklock exec` command.

use crate::cli::ExecArgs;
use socklock::transport::DefaultTransport;
use socklock::{Locker, Result, SocklockError};
use std::os::unix::process::ExitStatusExt;
use tracing::debug;

/// Execute the `socklock exec` command.
///
/// Holds the lock for exactly the lifetime of the child process and exits
/// with its exit code (128 + signal number if it was killed).
pub async fn cmd_exec(locker: &Locker<DefaultTransport>, args: ExecArgs) -> Result<i32> {
    let argv = command_argv(&args)?;

    let lock = locker.acquire(&args.name).await?;
    debug!(address = %lock.address(), program = %argv[0], "running under lock");

    let status = tokio::process::Command::new(&argv[0])
        .args(&argv[1..])
        .status()
        .await;
    lock.release();

    let status = status.map_err(|e| {
        SocklockError::UserError(format!(
            "failed to execute command: {}\nCommand: {}\nFix: ensure the command is installed and in PATH.",
            e,
            argv.join(" ")
        ))
    })?;

    Ok(status
        .code()
        .or_else(|| status.signal().map(|sig| 128 + sig))
        .unwrap_or(1))
}

/// Resolve the program and arguments from either `-c` or trailing argv.
fn command_argv(args: &ExecArgs) -> Result<Vec<String>> {
    let argv = match (&args.command, args.argv.is_empty()) {
        (Some(_), false) => {
            return Err(SocklockError::UserError(
                "pass the command either with -c or after --, not both".to_string(),
            ));
        }
        (Some(command), true) => shell_words::split(command).map_err(|e| {
            SocklockError::UserError(format!(
                "failed to parse command: {}\nCommand: {}\nFix: check for unmatched quotes or invalid escape sequences.",
                e, command
            ))
        })?,
        (None, false) => args.argv.clone(),
        (None, true) => Vec::new(),
    };

    if argv.is_empty() {
        return Err(SocklockError::UserError(
            "no command given.\nUsage: socklock exec <name> -- <program> [args...]".to_string(),
        ));
    }
    Ok(argv)
}
