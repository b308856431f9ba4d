use crate::context::CommandContext;
use crate::error::Result;
use crate::output::{CommandOutput, PingData};

pub async fn run(ctx: &CommandContext) -> Result<CommandOutput> {
	let alive = ctx.session.ping().await?;
	let authorized = ctx.session.is_authorized().await?;
	CommandOutput::new(&PingData { alive, authorized })
}
