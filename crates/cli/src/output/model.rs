use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Current schema version for command output.
pub const SCHEMA_VERSION: u32 = 1;

/// The result envelope returned by all commands.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandResult<T: Serialize> {
	#[serde(skip_serializing_if = "Option::is_none")]
	pub schema_version: Option<u32>,
	pub ok: bool,
	pub command: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub data: Option<T>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub error: Option<CommandError>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub duration_ms: Option<u64>,
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	pub diagnostics: Vec<Diagnostic>,
}

/// Error information for failed commands.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandError {
	pub code: ErrorCode,
	pub message: String,
}

/// Standardized error codes for programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
	LoginFailed,
	Timeout,
	CredentialError,
	AuthError,
	ApiError,
	BrowserError,
	SessionError,
	InvalidInput,
	IoError,
	Cancelled,
	InternalError,
}

impl std::fmt::Display for ErrorCode {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			ErrorCode::LoginFailed => write!(f, "LOGIN_FAILED"),
			ErrorCode::Timeout => write!(f, "TIMEOUT"),
			ErrorCode::CredentialError => write!(f, "CREDENTIAL_ERROR"),
			ErrorCode::AuthError => write!(f, "AUTH_ERROR"),
			ErrorCode::ApiError => write!(f, "API_ERROR"),
			ErrorCode::BrowserError => write!(f, "BROWSER_ERROR"),
			ErrorCode::SessionError => write!(f, "SESSION_ERROR"),
			ErrorCode::InvalidInput => write!(f, "INVALID_INPUT"),
			ErrorCode::IoError => write!(f, "IO_ERROR"),
			ErrorCode::Cancelled => write!(f, "CANCELLED"),
			ErrorCode::InternalError => write!(f, "INTERNAL_ERROR"),
		}
	}
}

/// Diagnostic message attached to a command result.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostic {
	pub level: DiagnosticLevel,
	pub message: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub source: Option<String>,
}

impl Diagnostic {
	pub fn warning(message: impl Into<String>, source: impl Into<String>) -> Self {
		Self {
			level: DiagnosticLevel::Warning,
			message: message.into(),
			source: Some(source.into()),
		}
	}
}

/// Diagnostic severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticLevel {
	Info,
	Warning,
	Error,
}

/// What a command hands back to the envelope printer.
#[derive(Debug)]
pub struct CommandOutput {
	pub data: serde_json::Value,
	pub diagnostics: Vec<Diagnostic>,
}

impl CommandOutput {
	pub fn new<T: Serialize>(data: &T) -> Result<Self> {
		Ok(Self {
			data: serde_json::to_value(data)?,
			diagnostics: Vec::new(),
		})
	}

	pub fn with_diagnostics(mut self, diagnostics: Vec<Diagnostic>) -> Self {
		self.diagnostics.extend(diagnostics);
		self
	}
}
