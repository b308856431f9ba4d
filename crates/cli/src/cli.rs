use std::path::PathBuf;
use std::time::Duration;

use chrono::{NaiveDate, NaiveDateTime};
use clap::{ArgAction, Args, Parser, Subcommand};

use crate::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(name = "cadview")]
#[command(about = "CADView session harvester - log in through Chrome and pull dispatch records")]
#[command(version)]
pub struct Cli {
	#[command(flatten)]
	pub global: GlobalArgs,

	#[command(subcommand)]
	pub command: Commands,
}

/// Flags shared by every subcommand.
#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
	/// Increase verbosity (-v info, -vv debug, -vvv trace)
	#[arg(short, long, global = true, action = ArgAction::Count)]
	pub verbose: u8,

	/// Alias for -vv
	#[arg(long, global = true)]
	pub debug: bool,

	/// Output format
	#[arg(short = 'f', long, global = true, value_enum, default_value_t = OutputFormat::Json)]
	pub format: OutputFormat,

	/// CADView login URL; the API is served below it
	#[arg(long, global = true, env = "CADVIEW_URL", value_name = "URL")]
	pub url: Option<String>,

	/// Serve API calls from this base instead of the login URL
	#[arg(long, global = true, env = "CADVIEW_API_BASE", value_name = "URL")]
	pub api_base: Option<String>,

	#[arg(long, global = true, env = "CADVIEW_USERNAME")]
	pub username: Option<String>,

	#[arg(long, global = true, env = "CADVIEW_PASSWORD", hide_env_values = true)]
	pub password: Option<String>,

	/// Local agency code, mapped to the ORI search filter
	#[arg(long, global = true, env = "CADVIEW_FDID")]
	pub fdid: Option<String>,

	/// Attach to a running browser (http://host:port or ws:// page URL)
	#[arg(long, global = true, env = "CADVIEW_CDP_ENDPOINT", value_name = "URL")]
	pub cdp_endpoint: Option<String>,

	/// Chrome binary to launch
	#[arg(long, global = true, env = "CHROME_PATH", value_name = "PATH")]
	pub chrome: Option<PathBuf>,

	/// Show the browser window during login
	#[arg(long, global = true)]
	pub headful: bool,

	/// Absolute login timeout in seconds
	#[arg(long, global = true, default_value_t = 60, value_name = "SECS")]
	pub timeout: u64,

	/// Use a saved credential (from `login --save`) instead of logging in
	#[arg(long, global = true, value_name = "FILE")]
	pub credential: Option<PathBuf>,
}

impl GlobalArgs {
	pub fn verbosity(&self) -> u8 {
		if self.debug { self.verbose.max(2) } else { self.verbose }
	}

	pub fn login_timeout(&self) -> Duration {
		Duration::from_secs(self.timeout)
	}
}

#[derive(Subcommand, Debug)]
pub enum Commands {
	/// Log in through the browser and print a credential summary
	Login {
		/// Print the full credential for hand-off to another process
		#[arg(long)]
		reveal: bool,

		/// Write the credential as JSON to FILE (use with --credential later)
		#[arg(long, value_name = "FILE")]
		save: Option<PathBuf>,
	},

	/// List active calls
	Active {
		/// Assemble each call with its sub-resources
		#[arg(long)]
		details: bool,
	},

	/// Search cleared calls in a time window
	Cleared {
		/// Window start, e.g. 2022-10-13T00:00:00 (a bare date means midnight)
		#[arg(long, value_parser = parse_datetime)]
		from: NaiveDateTime,

		/// Window end, e.g. 2022-10-14T23:59:59
		#[arg(long, value_parser = parse_datetime)]
		to: NaiveDateTime,

		/// ORI filter; resolved from --fdid when omitted
		#[arg(long)]
		ori: Option<String>,

		#[arg(long)]
		details: bool,
	},

	/// Fetch one call with incidents, units, unit logs, narratives, and logs
	Call { id: i64 },

	/// List jurisdictions available to the cleared-call search
	Oris,

	/// Check that the credential is still accepted
	Ping,

	/// Run the liveness loop until Ctrl-C, printing each status change
	Watch {
		/// Seconds between checks
		#[arg(long, default_value_t = 15)]
		interval: u64,
	},
}

impl Commands {
	pub fn name(&self) -> &'static str {
		match self {
			Commands::Login { .. } => "login",
			Commands::Active { .. } => "active",
			Commands::Cleared { .. } => "cleared",
			Commands::Call { .. } => "call",
			Commands::Oris => "oris",
			Commands::Ping => "ping",
			Commands::Watch { .. } => "watch",
		}
	}
}

/// Accepts `YYYY-MM-DDTHH:MM:SS`, `YYYY-MM-DD HH:MM:SS`, or `YYYY-MM-DD`.
pub fn parse_datetime(raw: &str) -> Result<NaiveDateTime, String> {
	for format in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"] {
		if let Ok(at) = NaiveDateTime::parse_from_str(raw, format) {
			return Ok(at);
		}
	}
	NaiveDate::parse_from_str(raw, "%Y-%m-%d")
		.ok()
		.and_then(|date| date.and_hms_opt(0, 0, 0))
		.ok_or_else(|| format!("expected YYYY-MM-DDTHH:MM:SS, got {raw:?}"))
}
