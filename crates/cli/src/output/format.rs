use clap::ValueEnum;

/// Output format for CLI results.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
	/// Pretty-printed JSON (default)
	#[default]
	Json,
	/// One JSON document per line (streaming)
	Ndjson,
	/// Human-readable text
	Text,
}

impl std::fmt::Display for OutputFormat {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			OutputFormat::Json => write!(f, "json"),
			OutputFormat::Ndjson => write!(f, "ndjson"),
			OutputFormat::Text => write!(f, "text"),
		}
	}
}
