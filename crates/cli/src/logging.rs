//! Tracing subscriber setup for the CLI.

use tracing_subscriber::EnvFilter;

/// Installs a stderr subscriber.
///
/// `RUST_LOG` wins when set; otherwise `verbosity` picks the level of the
/// `cadview` targets while dependencies stay at `warn`.
pub fn init_logging(verbosity: u8) {
	let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directives(verbosity)));
	let _ = tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).with_target(true).try_init();
}

fn default_directives(verbosity: u8) -> String {
	let level = match verbosity {
		0 => "warn",
		1 => "info",
		2 => "debug",
		_ => "trace",
	};
	format!("warn,cadview={level}")
}
