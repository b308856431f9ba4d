mod calls;
mod login;
mod oris;
mod ping;
mod watch;

use cadview::{CompositeRecord, SubFetchOutcome};

use crate::cli::Commands;
use crate::context::CommandContext;
use crate::error::Result;
use crate::output::{CommandOutput, Diagnostic};

pub async fn dispatch(command: Commands, ctx: &CommandContext) -> Result<CommandOutput> {
	match command {
		Commands::Login { reveal, save } => login::run(ctx, reveal, save).await,
		Commands::Active { details } => calls::active(ctx, details).await,
		Commands::Cleared { from, to, ori, details } => calls::cleared(ctx, from, to, ori, details).await,
		Commands::Call { id } => calls::single(ctx, id).await,
		Commands::Oris => oris::run(ctx).await,
		Commands::Ping => ping::run(ctx).await,
		Commands::Watch { interval } => watch::run(ctx, interval).await,
	}
}

/// One warning per sub-resource collection that could not be read.
pub(crate) fn record_diagnostics(record: &CompositeRecord) -> Vec<Diagnostic> {
	record
		.outcomes
		.iter()
		.filter_map(|(kind, outcome)| match outcome {
			SubFetchOutcome::Failed { message } => Some(Diagnostic::warning(
				format!("call {}: {} unavailable: {message}", record.call_id(), kind.as_str()),
				kind.as_str(),
			)),
			SubFetchOutcome::Fetched { .. } => None,
		})
		.collect()
}
