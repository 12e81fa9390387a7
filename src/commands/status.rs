//! Implementation of the `socklock status` and `socklock list` commands.

use crate::cli::{ListArgs, StatusArgs};
use socklock::transport::DefaultTransport;
use socklock::{Locker, ProbeStatus, Result, exit_codes};

/// Execute the `socklock status` command.
pub async fn cmd_status(locker: &Locker<DefaultTransport>, args: StatusArgs) -> Result<i32> {
    let address = locker.resolve(&args.name)?;
    let status = locker.probe(&args.name).await?;

    println!("Lock: {}", address.name());
    println!("  Address:    {}", address);
    println!("  Status:     {}", status.as_str());

    match &status {
        ProbeStatus::Held(Some(info)) => {
            println!("  Owner:      {}", info.owner);
            println!("  PID:        {}", info.pid);
            println!(
                "  Acquired:   {}",
                info.acquired_at.format("%Y-%m-%d %H:%M:%S UTC")
            );
            println!("  Age:        {}", info.age_string());
        }
        ProbeStatus::Held(None) => {
            println!("  Owner:      unknown (holder did not announce itself)");
        }
        ProbeStatus::Stale => {
            println!();
            println!(
                "Note: the holder is gone. The next acquisition reclaims it, or run `socklock clear {} --force`.",
                args.name
            );
        }
        ProbeStatus::Free | ProbeStatus::Foreign => {}
    }

    Ok(exit_codes::SUCCESS)
}

/// Execute the `socklock list` command.
pub async fn cmd_list(locker: &Locker<DefaultTransport>, args: ListArgs) -> Result<i32> {
    let locks = locker.list(args.pattern.as_deref()).await?;

    if locks.is_empty() {
        println!("No locks in {}.", locker.config().lock_dir().display());
        return Ok(exit_codes::SUCCESS);
    }

    println!("Locks ({}):", locks.len());
    println!();
    for lock in &locks {
        println!("  {}", lock);
    }

    let stale_count = locks
        .iter()
        .filter(|l| l.status == ProbeStatus::Stale)
        .count();
    if stale_count > 0 {
        println!();
        println!(
            "Note: {} lock(s) are stale. Use `socklock clear <name> --force` to clear.",
            stale_count
        );
    }

    Ok(exit_codes::SUCCESS)
}
