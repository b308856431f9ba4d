use std::io::{self, Write};
use std::time::Instant;

use serde::Serialize;

use crate::output::format::OutputFormat;
use crate::output::model::{CommandError, CommandResult, Diagnostic, DiagnosticLevel, ErrorCode, SCHEMA_VERSION};

/// Builder for constructing command results.
pub struct ResultBuilder<T: Serialize> {
	schema_version: Option<u32>,
	command: String,
	data: Option<T>,
	error: Option<CommandError>,
	start_time: Instant,
	diagnostics: Vec<Diagnostic>,
}

impl<T: Serialize> ResultBuilder<T> {
	pub fn new(command: impl Into<String>) -> Self {
		Self {
			schema_version: Some(SCHEMA_VERSION),
			command: command.into(),
			data: None,
			error: None,
			start_time: Instant::now(),
			diagnostics: Vec::new(),
		}
	}

	pub fn data(mut self, data: T) -> Self {
		self.data = Some(data);
		self
	}

	pub fn error(mut self, code: ErrorCode, message: impl Into<String>) -> Self {
		self.error = Some(CommandError { code, message: message.into() });
		self
	}

	pub fn diagnostic(mut self, level: DiagnosticLevel, message: impl Into<String>) -> Self {
		self.diagnostics.push(Diagnostic {
			level,
			message: message.into(),
			source: None,
		});
		self
	}

	pub fn diagnostics(mut self, diagnostics: Vec<Diagnostic>) -> Self {
		self.diagnostics.extend(diagnostics);
		self
	}

	pub fn build(self) -> CommandResult<T> {
		let ok = self.error.is_none() && self.data.is_some();

		CommandResult {
			schema_version: self.schema_version,
			ok,
			command: self.command,
			data: self.data,
			error: self.error,
			duration_ms: Some(self.start_time.elapsed().as_millis() as u64),
			diagnostics: self.diagnostics,
		}
	}
}

/// Print a command result to stdout in the specified format.
pub fn print_result<T: Serialize>(result: &CommandResult<T>, format: OutputFormat) {
	match format {
		OutputFormat::Json => {
			if let Ok(json) = serde_json::to_string_pretty(result) {
				println!("{json}");
			}
		}
		OutputFormat::Ndjson => {
			if let Ok(json) = serde_json::to_string(result) {
				println!("{json}");
			}
		}
		OutputFormat::Text => {
			print_result_text(result);
		}
	}
}

fn print_result_text<T: Serialize>(result: &CommandResult<T>) {
	let mut stdout = io::stdout().lock();

	if result.ok {
		if let Some(ref data) = result.data {
			if let Ok(json) = serde_json::to_string_pretty(data) {
				let _ = writeln!(stdout, "{json}");
			}
		}
	} else if let Some(ref error) = result.error {
		let _ = writeln!(stdout, "Error [{}]: {}", error.code, error.message);
	}

	for diag in &result.diagnostics {
		let prefix = match diag.level {
			DiagnosticLevel::Info => "info",
			DiagnosticLevel::Warning => "warning",
			DiagnosticLevel::Error => "error",
		};
		if let Some(ref source) = diag.source {
			let _ = writeln!(stdout, "[{prefix}:{source}] {}", diag.message);
		} else {
			let _ = writeln!(stdout, "[{prefix}] {}", diag.message);
		}
	}

	if let Some(duration_ms) = result.duration_ms {
		let _ = writeln!(stdout, "Completed in {duration_ms}ms");
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn ok_requires_data_and_no_error() {
		let ok = ResultBuilder::new("ping").data(true).build();
		assert!(ok.ok);
		assert_eq!(ok.command, "ping");
		assert!(ok.duration_ms.is_some());

		let failed = ResultBuilder::<bool>::new("ping").error(ErrorCode::AuthError, "not authorized").build();
		assert!(!failed.ok);
	}

	#[test]
	fn envelope_uses_camel_case_and_skips_empty_fields() {
		let result = ResultBuilder::new("call")
			.data(serde_json::json!({ "callId": 1 }))
			.diagnostic(DiagnosticLevel::Warning, "logs unavailable")
			.build();
		let json = serde_json::to_value(&result).unwrap();
		assert_eq!(json["schemaVersion"], 1);
		assert_eq!(json["ok"], true);
		assert!(json.get("error").is_none());
		assert!(json["durationMs"].is_u64());
		assert_eq!(json["diagnostics"][0]["level"], "warning");

		let failed = ResultBuilder::<()>::new("call").error(ErrorCode::InvalidInput, "bad id").build();
		let json = serde_json::to_value(&failed).unwrap();
		assert_eq!(json["error"]["code"], "INVALID_INPUT");
		assert!(json.get("data").is_none());
		assert!(json.get("diagnostics").is_none());
	}
}
