//! CLI error type and its mapping onto output error codes.

use std::path::PathBuf;

use thiserror::Error;

use crate::output::ErrorCode;

pub type Result<T> = std::result::Result<T, CliError>;

#[derive(Debug, Error)]
pub enum CliError {
	#[error(transparent)]
	Cadview(#[from] cadview::Error),

	#[error("invalid input: {0}")]
	InvalidInput(String),

	#[error("failed to access {path}: {source}")]
	Io {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	#[error("credential file {path} is not valid: {source}")]
	CredentialFile {
		path: PathBuf,
		#[source]
		source: serde_json::Error,
	},

	#[error("cannot encode command output: {0}")]
	Output(#[from] serde_json::Error),
}

impl CliError {
	pub fn code(&self) -> ErrorCode {
		use cadview::Error as E;

		match self {
			CliError::InvalidInput(_) => ErrorCode::InvalidInput,
			CliError::Io { .. } => ErrorCode::IoError,
			CliError::CredentialFile { .. } => ErrorCode::CredentialError,
			CliError::Output(_) => ErrorCode::InternalError,
			CliError::Cadview(err) => match err {
				E::LoginTimeout { .. } => ErrorCode::Timeout,
				E::LoginFlow { .. } => ErrorCode::LoginFailed,
				E::CredentialParse(_) | E::CredentialMissing { .. } => ErrorCode::CredentialError,
				E::Unauthenticated | E::NotAuthorized { .. } => ErrorCode::AuthError,
				E::Transport { .. } | E::Decode { .. } => ErrorCode::ApiError,
				E::InvalidRecord(_) | E::Config(_) => ErrorCode::InvalidInput,
				E::AlreadyInitialized => ErrorCode::SessionError,
				E::Browser(_) => ErrorCode::BrowserError,
				E::Cancelled => ErrorCode::Cancelled,
			},
		}
	}
}
