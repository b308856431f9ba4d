//! Chrome discovery, launch, and DevTools endpoint probing.

mod finder;
mod probe;

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use tempfile::TempDir;
use tokio::process::{Child, Command};
use tracing::{debug, info};

pub use finder::find_chrome_executable;
pub use probe::{DevToolsVersion, TargetInfo, fetch_version, fetch_version_at, page_target};

use crate::error::{BrowserError, Result};
use crate::process::free_port;

/// How to start a dedicated Chrome for a login.
#[derive(Debug, Clone)]
pub struct LaunchOptions {
	/// Explicit browser binary; discovered from `PATH` and well-known
	/// install locations when `None`.
	pub executable: Option<PathBuf>,
	pub headless: bool,
	/// Additional command-line switches appended after the defaults.
	pub extra_args: Vec<String>,
	/// How long to wait for the DevTools endpoint to come up.
	pub startup_timeout: Duration,
}

impl Default for LaunchOptions {
	fn default() -> Self {
		Self {
			executable: None,
			headless: true,
			extra_args: Vec::new(),
			startup_timeout: Duration::from_secs(10),
		}
	}
}

/// A Chrome process owned by this crate.
///
/// The process runs on a throwaway profile directory and is killed when the
/// handle is dropped.
#[derive(Debug)]
pub struct ChromeProcess {
	child: Child,
	port: u16,
	_profile: TempDir,
}

impl ChromeProcess {
	pub fn port(&self) -> u16 {
		self.port
	}

	/// HTTP base of the DevTools endpoint, e.g. `http://127.0.0.1:9222`.
	pub fn devtools_base(&self) -> String {
		format!("http://127.0.0.1:{}", self.port)
	}

	pub fn pid(&self) -> Option<u32> {
		self.child.id()
	}

	/// Terminates the process and waits for it to exit.
	pub async fn kill(&mut self) -> Result<()> {
		self.child.kill().await?;
		Ok(())
	}
}

pub(crate) fn launch_args(port: u16, profile: &std::path::Path, options: &LaunchOptions) -> Vec<String> {
	let mut args = vec![
		format!("--remote-debugging-port={port}"),
		format!("--user-data-dir={}", profile.display()),
		"--no-first-run".to_string(),
		"--no-default-browser-check".to_string(),
		"--disable-background-networking".to_string(),
		"--disable-sync".to_string(),
		"--enable-features=PrivacySandboxAdsAPIsOverride".to_string(),
	];
	if options.headless {
		args.push("--headless=new".to_string());
	}
	args.extend(options.extra_args.iter().cloned());
	args.push("about:blank".to_string());
	args
}

/// Launches Chrome with remote debugging on a free local port.
pub async fn launch_chrome(options: &LaunchOptions) -> Result<(ChromeProcess, DevToolsVersion)> {
	let executable = match &options.executable {
		Some(path) => path.clone(),
		None => find_chrome_executable().ok_or_else(|| {
			BrowserError::Launch(
				"could not find a Chrome/Chromium executable; \
				 install Chrome or pass its path explicitly"
					.into(),
			)
		})?,
	};

	let port = free_port()?;
	let profile = tempfile::Builder::new().prefix("cadview-profile-").tempdir()?;
	let args = launch_args(port, profile.path(), options);

	info!(target = "cadview.launch", executable = %executable.display(), port, headless = options.headless, "launching browser");

	let mut child = Command::new(&executable)
		.args(&args)
		.stdin(Stdio::null())
		.stdout(Stdio::null())
		.stderr(Stdio::null())
		.kill_on_drop(true)
		.spawn()
		.map_err(|e| BrowserError::Launch(format!("failed to launch {}: {e}", executable.display())))?;

	let poll = Duration::from_millis(200);
	let max_attempts = (options.startup_timeout.as_millis() / poll.as_millis()).max(1);
	let mut last_error = "endpoint not reachable".to_string();

	for _ in 0..max_attempts {
		tokio::time::sleep(poll).await;

		if let Ok(Some(status)) = child.try_wait() {
			return Err(BrowserError::Launch(format!(
				"browser exited before its debugging endpoint became available (status: {status})"
			)));
		}

		match fetch_version(port).await {
			Ok(version) => {
				debug!(target = "cadview.launch", browser = ?version.browser, "DevTools endpoint ready");
				return Ok((
					ChromeProcess {
						child,
						port,
						_profile: profile,
					},
					version,
				));
			}
			Err(e) => last_error = e.to_string(),
		}
	}

	Err(BrowserError::Launch(format!(
		"browser started but its debugging endpoint on port {port} never answered: {last_error}"
	)))
}
