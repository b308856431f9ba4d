//! Error types for session, login, and API operations.

use std::time::Duration;

use cadview_runtime::BrowserError;
use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
	/// A login step other than an element wait outlived the absolute deadline.
	#[error("login did not complete within {timeout:?} (stuck at {step})")]
	LoginTimeout { step: &'static str, timeout: Duration },

	/// A required page element never became interactable.
	#[error("login flow failed at {step}: {source}")]
	LoginFlow {
		step: &'static str,
		#[source]
		source: BrowserError,
	},

	#[error("credential entry could not be decoded: {0}")]
	CredentialParse(String),

	#[error("no oidc.user entry in local storage of {origin}")]
	CredentialMissing { origin: String },

	#[error("session has no credential")]
	Unauthenticated,

	/// The server answered with an HTML page or an auth status instead of JSON.
	#[error("not authorized: {url}")]
	NotAuthorized { url: String },

	#[error("transport error for {url}: {reason}")]
	Transport { url: String, status: Option<u16>, reason: String },

	#[error("invalid record: {0}")]
	InvalidRecord(String),

	#[error("session already initialized")]
	AlreadyInitialized,

	#[error("unexpected response shape from {url}: {source}")]
	Decode {
		url: String,
		#[source]
		source: serde_json::Error,
	},

	#[error(transparent)]
	Browser(#[from] BrowserError),

	#[error("operation cancelled")]
	Cancelled,

	#[error("invalid configuration: {0}")]
	Config(String),
}

impl Error {
	/// Whether the failure means the credential should be replaced.
	pub fn is_auth_failure(&self) -> bool {
		matches!(self, Error::NotAuthorized { .. } | Error::Unauthenticated)
	}

	/// Short stable name of the variant, used for log fields and CLI codes.
	pub fn kind(&self) -> &'static str {
		match self {
			Error::LoginTimeout { .. } => "login_timeout",
			Error::LoginFlow { .. } => "login_flow",
			Error::CredentialParse(_) => "credential_parse",
			Error::CredentialMissing { .. } => "credential_missing",
			Error::Unauthenticated => "unauthenticated",
			Error::NotAuthorized { .. } => "not_authorized",
			Error::Transport { .. } => "transport",
			Error::InvalidRecord(_) => "invalid_record",
			Error::AlreadyInitialized => "already_initialized",
			Error::Decode { .. } => "decode",
			Error::Browser(_) => "browser",
			Error::Cancelled => "cancelled",
			Error::Config(_) => "config",
		}
	}
}
