use std::path::PathBuf;

use cadview::Error;
use tracing::info;

use crate::context::CommandContext;
use crate::error::{CliError, Result};
use crate::output::{CommandOutput, LoginData};

pub async fn run(ctx: &CommandContext, reveal: bool, save: Option<PathBuf>) -> Result<CommandOutput> {
	if ctx.preloaded {
		return Err(CliError::InvalidInput("login performs its own browser login; drop --credential".into()));
	}
	ctx.session.initialize().await?;
	let credential = ctx.session.credential().ok_or(Error::Unauthenticated)?;

	if let Some(path) = &save {
		let json = serde_json::to_string_pretty(credential.as_ref()).map_err(|source| CliError::CredentialFile {
			path: path.clone(),
			source,
		})?;
		std::fs::write(path, json).map_err(|source| CliError::Io { path: path.clone(), source })?;
		info!(target = "cadview", path = %path.display(), "credential saved");
	}

	let observed_urls = ctx.session.traffic().map(|traffic| traffic.urls().len()).unwrap_or_default();
	let data = LoginData {
		token_type: credential.token_type.clone(),
		token: credential.fingerprint(),
		scope: credential.scope.clone(),
		expires_at: credential.expires_at,
		auth_time: credential.profile.auth_time,
		subject: credential.profile.sub.clone(),
		credential: reveal.then(|| credential.as_ref().clone()),
		saved_to: save,
		observed_urls,
	};
	CommandOutput::new(&data)
}
