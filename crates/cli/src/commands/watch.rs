use std::time::Duration;

use tracing::{info, warn};

use crate::context::CommandContext;
use crate::error::{CliError, Result};
use crate::output::{CommandOutput, ResultBuilder, WatchData, print_result};

/// Prints every liveness status change until Ctrl-C or the loop ends.
pub async fn run(ctx: &CommandContext, interval: u64) -> Result<CommandOutput> {
	if interval == 0 {
		return Err(CliError::InvalidInput("--interval must be at least 1 second".into()));
	}
	let mut status = ctx.session.start_liveness(Some(Duration::from_secs(interval))).await?;
	info!(target = "cadview", interval, "watching session liveness; Ctrl-C to stop");

	let mut updates = 0;
	loop {
		tokio::select! {
			signal = tokio::signal::ctrl_c() => {
				if let Err(err) = signal {
					warn!(target = "cadview", error = %err, "cannot listen for Ctrl-C");
				}
				break;
			}
			changed = status.changed() => {
				if changed.is_err() {
					break;
				}
				let current = status.borrow_and_update().clone();
				updates += 1;
				print_result(&ResultBuilder::new("watch").data(current).build(), ctx.format);
			}
		}
	}

	ctx.session.stop_liveness().await;
	let last_status = status.borrow().clone();
	ctx.session.cancel();
	CommandOutput::new(&WatchData { updates, last_status })
}
