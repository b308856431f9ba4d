//! Browser-driven login and credential harvesting.

use std::sync::Arc;
use std::time::Duration;

use cadview_protocol::{Credential, OIDC_STORAGE_PREFIX};
use cadview_runtime::{Browser, BrowserError};
use parking_lot::Mutex;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use url::Url;

use crate::config::LoginSelectors;
use crate::error::{Error, Result};

/// Slack past the absolute deadline so element waits, which are bounded by
/// the deadline themselves, report as flow failures instead of timeouts.
const DEADLINE_GRACE: Duration = Duration::from_secs(2);

/// Drives the login form and reads the OIDC credential out of local storage.
pub struct CredentialExtractor {
	browser: Arc<dyn Browser>,
	selectors: LoginSelectors,
	cancel: CancellationToken,
}

impl CredentialExtractor {
	pub fn new(browser: Arc<dyn Browser>, selectors: LoginSelectors) -> Self {
		Self {
			browser,
			selectors,
			cancel: CancellationToken::new(),
		}
	}

	/// Aborts the login with [`Error::Cancelled`] once `cancel` fires.
	pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
		self.cancel = cancel;
		self
	}

	/// Logs in at `login_url` and returns the harvested credential.
	///
	/// The whole sequence shares one absolute `timeout`. Element waits get the
	/// time that is left, so a login page that never shows the dashboard
	/// fails with [`Error::LoginFlow`] rather than hanging.
	pub async fn login(&self, login_url: &Url, username: &str, password: &str, timeout: Duration) -> Result<Credential> {
		let deadline = Instant::now() + timeout;
		let progress = Progress::default();
		let flow = self.run(login_url, username, password, deadline, &progress);

		let outcome = tokio::select! {
			biased;
			_ = self.cancel.cancelled() => Err(Error::Cancelled),
			outcome = tokio::time::timeout(timeout + DEADLINE_GRACE, flow) => match outcome {
				Ok(outcome) => outcome,
				Err(_) => Err(Error::LoginTimeout { step: progress.current(), timeout }),
			},
		};
		if let Err(err) = &outcome {
			warn!(target = "cadview.login", url = %login_url, step = progress.current(), error = %err, "login failed");
		}
		outcome
	}

	async fn run(&self, login_url: &Url, username: &str, password: &str, deadline: Instant, progress: &Progress) -> Result<Credential> {
		let selectors = &self.selectors;

		progress.enter("navigate");
		info!(target = "cadview.login", url = %login_url, "loading login page");
		self.browser.navigate(login_url.as_str()).await?;

		progress.enter("username field");
		self.wait_visible(&selectors.username, deadline, progress.current()).await?;
		self.type_into(&selectors.username, username, progress.current()).await?;
		progress.enter("password field");
		self.type_into(&selectors.password, password, progress.current()).await?;

		progress.enter("submit");
		info!(target = "cadview.login", %username, "submitting login form");
		self.browser.submit(&selectors.submit).await.map_err(|e| flow_error(progress.current(), e))?;

		progress.enter("dashboard");
		info!(target = "cadview.login", "waiting for dashboard");
		self.wait_visible(&selectors.dashboard, deadline, progress.current()).await?;

		progress.enter("local storage");
		let origin = storage_origin(login_url);
		info!(target = "cadview.login", %origin, "reading local storage");
		let entries = self.browser.local_storage(&origin).await?;
		debug!(target = "cadview.login", entries = entries.len(), "local storage read");

		let credential = credential_from_entries(&entries, &origin)?;
		info!(
			target = "cadview.login",
			token = %credential.fingerprint(),
			expires_at = credential.expires_at,
			auth_time = credential.profile.auth_time,
			"credential captured"
		);
		Ok(credential)
	}

	async fn wait_visible(&self, selector: &str, deadline: Instant, step: &'static str) -> Result<()> {
		let remaining = deadline.saturating_duration_since(Instant::now());
		if remaining.is_zero() {
			return Err(Error::LoginFlow {
				step,
				source: BrowserError::NotVisible {
					selector: selector.to_string(),
					timeout: Duration::ZERO,
				},
			});
		}
		self.browser.wait_visible(selector, remaining).await.map_err(|e| flow_error(step, e))
	}

	async fn type_into(&self, selector: &str, text: &str, step: &'static str) -> Result<()> {
		self.browser.send_keys(selector, text).await.map_err(|e| flow_error(step, e))
	}
}

/// Last login step entered, readable while the flow is suspended.
#[derive(Default)]
struct Progress(Mutex<&'static str>);

impl Progress {
	fn enter(&self, step: &'static str) {
		*self.0.lock() = step;
	}

	fn current(&self) -> &'static str {
		*self.0.lock()
	}
}

/// Element failures are flow errors; anything else passes through unchanged.
fn flow_error(step: &'static str, err: BrowserError) -> Error {
	match err {
		BrowserError::NotVisible { .. } | BrowserError::ElementNotFound { .. } => Error::LoginFlow { step, source: err },
		other => Error::Browser(other),
	}
}

/// Local storage origin of the login page, e.g. `https://cad.example/`.
fn storage_origin(login_url: &Url) -> String {
	format!("{}/", login_url.origin().ascii_serialization())
}

/// Picks the first `oidc.user:*` entry and decodes it.
pub(crate) fn credential_from_entries(entries: &[(String, String)], origin: &str) -> Result<Credential> {
	let (key, value) = entries
		.iter()
		.find(|(key, _)| key.starts_with(OIDC_STORAGE_PREFIX))
		.ok_or_else(|| Error::CredentialMissing { origin: origin.to_string() })?;

	let credential = Credential::from_storage_value(value).map_err(|e| Error::CredentialParse(format!("{key}: {e}")))?;
	if !credential.is_usable() {
		return Err(Error::CredentialParse(format!("{key}: token type or access token is empty")));
	}
	Ok(credential)
}
