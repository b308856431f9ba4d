use cadview::fdid_to_ori;

use crate::context::CommandContext;
use crate::error::Result;
use crate::output::{CommandOutput, Diagnostic, OrisData};

pub async fn run(ctx: &CommandContext) -> Result<CommandOutput> {
	let oris = ctx.session.oris().await?;
	let fdid = ctx.session.config().fdid().map(str::to_owned);
	let resolved_ori = fdid.as_deref().and_then(|fdid| fdid_to_ori(&oris, fdid)).map(str::to_owned);

	let mut diagnostics = Vec::new();
	if let (Some(fdid), None) = (&fdid, &resolved_ori) {
		diagnostics.push(Diagnostic::warning(format!("FDID {fdid} matches no ORI"), "fdid"));
	}
	Ok(CommandOutput::new(&OrisData { oris, fdid, resolved_ori })?.with_diagnostics(diagnostics))
}
