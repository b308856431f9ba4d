use cadview::dates::parse_record_date;
use cadview::{Call, CompositeRecord};
use chrono::NaiveDateTime;
use tracing::{info, warn};

use super::record_diagnostics;
use crate::context::CommandContext;
use crate::error::{CliError, Result};
use crate::output::{CallsData, CommandOutput, Diagnostic, RecordsData};

pub async fn active(ctx: &CommandContext, details: bool) -> Result<CommandOutput> {
	let calls = ctx.session.active_calls().await?;
	info!(target = "cadview", count = calls.len(), "active calls");
	listing(ctx, calls, details).await
}

pub async fn cleared(ctx: &CommandContext, from: NaiveDateTime, to: NaiveDateTime, ori: Option<String>, details: bool) -> Result<CommandOutput> {
	if from > to {
		return Err(CliError::InvalidInput(format!("--from {from} is after --to {to}")));
	}
	let ori = match ori {
		Some(ori) => ori,
		None => ctx
			.session
			.configured_ori()
			.await?
			.ok_or_else(|| CliError::InvalidInput("no ORI to search: pass --ori or a known --fdid".into()))?,
	};
	let calls = ctx.session.cleared_calls(from, to, &ori).await?;
	info!(target = "cadview", %ori, count = calls.len(), "cleared calls");
	listing(ctx, calls, details).await
}

pub async fn single(ctx: &CommandContext, id: i64) -> Result<CommandOutput> {
	let record = ctx.session.fetch_composite(id).await?;
	let diagnostics = record_diagnostics(&record);
	Ok(CommandOutput::new(&record)?.with_diagnostics(diagnostics))
}

async fn listing(ctx: &CommandContext, mut calls: Vec<Call>, details: bool) -> Result<CommandOutput> {
	sort_by_created(&mut calls);
	if !details {
		return CommandOutput::new(&CallsData { count: calls.len(), calls });
	}

	let mut records: Vec<CompositeRecord> = Vec::with_capacity(calls.len());
	let mut diagnostics = Vec::new();
	for call in calls {
		match ctx.session.fetch_composite(call.call_id).await {
			Ok(record) => {
				diagnostics.extend(record_diagnostics(&record));
				records.push(record);
			}
			Err(err) if !err.is_auth_failure() && !matches!(err, cadview::Error::Cancelled) => {
				warn!(target = "cadview", call_id = call.call_id, error = %err, "skipping call");
				diagnostics.push(Diagnostic::warning(format!("call {} skipped: {err}", call.call_id), "call"));
			}
			Err(err) => return Err(err.into()),
		}
	}
	Ok(CommandOutput::new(&RecordsData { count: records.len(), records })?.with_diagnostics(diagnostics))
}

/// Oldest first; calls without a readable creation time lead.
fn sort_by_created(calls: &mut [Call]) {
	calls.sort_by_cached_key(|call| call.created_date_time.as_deref().and_then(|raw| parse_record_date(raw).ok()));
}
