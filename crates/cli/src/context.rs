//! Builds the session a command runs against.

use std::path::Path;

use cadview::{BrowserOptions, Credential, Session, SessionConfig};
use chrono::Utc;
use tracing::{debug, warn};

use crate::cli::GlobalArgs;
use crate::error::{CliError, Result};
use crate::output::OutputFormat;

/// Per-invocation state shared by all commands.
pub struct CommandContext {
	pub format: OutputFormat,
	pub session: Session,
	/// Whether the session was seeded from `--credential`.
	pub preloaded: bool,
}

impl CommandContext {
	pub fn from_args(args: &GlobalArgs) -> Result<Self> {
		let session = Session::new(session_config(args)?)?;
		let preloaded = match &args.credential {
			Some(path) => {
				let credential = load_credential(path)?;
				if credential.is_expired_at(Utc::now().timestamp()) {
					warn!(target = "cadview", path = %path.display(), expires_at = credential.expires_at, "saved credential has expired; the API will likely reject it");
				}
				session.set_credential(credential)?;
				debug!(target = "cadview", path = %path.display(), "credential loaded from file");
				true
			}
			None => false,
		};
		Ok(Self {
			format: args.format,
			session,
			preloaded,
		})
	}
}

pub fn session_config(args: &GlobalArgs) -> Result<SessionConfig> {
	let url = args
		.url
		.as_deref()
		.ok_or_else(|| CliError::InvalidInput("a CADView URL is required (--url or CADVIEW_URL)".into()))?;

	let mut config = SessionConfig::new(url)?
		.with_credentials(args.username.clone().unwrap_or_default(), args.password.clone().unwrap_or_default())
		.with_login_timeout(args.login_timeout())
		.with_browser(BrowserOptions {
			headless: !args.headful,
			executable: args.chrome.clone(),
			cdp_endpoint: args.cdp_endpoint.clone(),
		});
	if let Some(api_base) = &args.api_base {
		config = config.with_api_base(api_base)?;
	}
	if let Some(fdid) = &args.fdid {
		config = config.with_fdid(fdid.clone());
	}
	Ok(config)
}

pub fn load_credential(path: &Path) -> Result<Credential> {
	let raw = std::fs::read_to_string(path).map_err(|source| CliError::Io {
		path: path.to_path_buf(),
		source,
	})?;
	serde_json::from_str(&raw).map_err(|source| CliError::CredentialFile {
		path: path.to_path_buf(),
		source,
	})
}

#[cfg(test)]
mod tests {
	use clap::Parser;

	use super::*;
	use crate::cli::Cli;

	fn global(args: &[&str]) -> GlobalArgs {
		let mut argv = vec!["cadview"];
		argv.extend_from_slice(args);
		argv.push("ping");
		Cli::try_parse_from(argv).unwrap().global
	}

	#[test]
	fn flags_become_session_config() {
		let args = global(&[
			"--url",
			"https://cad.example/NewWorld.CadView",
			"--username",
			"dispatcher",
			"--password",
			"secret",
			"--fdid",
			"07001",
			"--headful",
			"--timeout",
			"30",
		]);
		let config = session_config(&args).unwrap();
		assert_eq!(config.username(), "dispatcher");
		assert_eq!(config.fdid(), Some("07001"));
		assert_eq!(config.login_timeout().as_secs(), 30);
		assert!(!config.browser().headless);
		assert_eq!(config.login_url().as_str(), "https://cad.example/NewWorld.CadView");
	}

	#[test]
	fn bad_credential_file_is_reported() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("credential.json");
		std::fs::write(&path, "not json").unwrap();
		assert!(matches!(load_credential(&path), Err(CliError::CredentialFile { .. })));
		assert!(matches!(load_credential(&dir.path().join("missing.json")), Err(CliError::Io { .. })));
	}
}
