//! Implementation of the `socklock clear` command.

use crate::cli::ClearArgs;
use socklock::transport::DefaultTransport;
use socklock::{Locker, Result, exit_codes};

/// Execute the `socklock clear` command.
///
/// Only stale addresses are removed; a live holder is never disturbed.
pub async fn cmd_clear(locker: &Locker<DefaultTransport>, args: ClearArgs) -> Result<i32> {
    let address = locker.clear(&args.name, args.force).await?;
    println!("Cleared lock: {} ({})", address.name(), address);
    Ok(exit_codes::SUCCESS)
}
