//! Session configuration.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use url::Url;

use crate::error::{Error, Result};

/// Absolute bound on the browser-driven login.
pub const DEFAULT_LOGIN_TIMEOUT: Duration = Duration::from_secs(60);

/// Sleep between liveness checks.
pub const DEFAULT_LIVENESS_INTERVAL: Duration = Duration::from_secs(15);

/// XPath selectors of the login form and the post-login landing page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginSelectors {
	pub username: String,
	pub password: String,
	pub submit: String,
	/// Visible only once the login succeeded.
	pub dashboard: String,
}

impl Default for LoginSelectors {
	fn default() -> Self {
		Self {
			username: "//input[@id='Username']".to_string(),
			password: "//input[@id='passwordField']".to_string(),
			submit: "//button[@id='loginbtn']".to_string(),
			dashboard: "//*[contains(., 'Dashboard')]".to_string(),
		}
	}
}

/// How the login browser is obtained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrowserOptions {
	pub headless: bool,
	/// Chrome binary; discovered from `CHROME_PATH` and well-known locations when unset.
	pub executable: Option<PathBuf>,
	/// Attach to this DevTools endpoint instead of launching a browser.
	pub cdp_endpoint: Option<String>,
}

impl Default for BrowserOptions {
	fn default() -> Self {
		Self {
			headless: true,
			executable: None,
			cdp_endpoint: None,
		}
	}
}

/// Everything a [`Session`](crate::Session) needs except the credential.
#[derive(Clone)]
pub struct SessionConfig {
	login_url: Url,
	api_base: Option<Url>,
	username: String,
	password: String,
	fdid: Option<String>,
	login_timeout: Duration,
	liveness_interval: Duration,
	selectors: LoginSelectors,
	browser: BrowserOptions,
}

impl SessionConfig {
	/// Creates a configuration for the CADView instance at `login_url`.
	///
	/// The API is served below the same URL (`{login_url}/api/...`) unless
	/// [`with_api_base`](Self::with_api_base) overrides it.
	pub fn new(login_url: &str) -> Result<Self> {
		let login_url = parse_http_url(login_url)?;
		Ok(Self {
			login_url,
			api_base: None,
			username: String::new(),
			password: String::new(),
			fdid: None,
			login_timeout: DEFAULT_LOGIN_TIMEOUT,
			liveness_interval: DEFAULT_LIVENESS_INTERVAL,
			selectors: LoginSelectors::default(),
			browser: BrowserOptions::default(),
		})
	}

	pub fn with_api_base(mut self, api_base: &str) -> Result<Self> {
		self.api_base = Some(parse_http_url(api_base)?);
		Ok(self)
	}

	pub fn with_credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
		self.username = username.into();
		self.password = password.into();
		self
	}

	pub fn with_fdid(mut self, fdid: impl Into<String>) -> Self {
		self.fdid = Some(fdid.into());
		self
	}

	pub fn with_login_timeout(mut self, timeout: Duration) -> Self {
		self.login_timeout = timeout;
		self
	}

	pub fn with_liveness_interval(mut self, interval: Duration) -> Self {
		self.liveness_interval = interval;
		self
	}

	pub fn with_selectors(mut self, selectors: LoginSelectors) -> Self {
		self.selectors = selectors;
		self
	}

	pub fn with_browser(mut self, browser: BrowserOptions) -> Self {
		self.browser = browser;
		self
	}

	pub fn login_url(&self) -> &Url {
		&self.login_url
	}

	/// Base URL the `api/` paths are appended to.
	pub fn api_base(&self) -> &Url {
		self.api_base.as_ref().unwrap_or(&self.login_url)
	}

	pub fn username(&self) -> &str {
		&self.username
	}

	pub fn password(&self) -> &str {
		&self.password
	}

	pub fn fdid(&self) -> Option<&str> {
		self.fdid.as_deref()
	}

	pub fn login_timeout(&self) -> Duration {
		self.login_timeout
	}

	pub fn liveness_interval(&self) -> Duration {
		self.liveness_interval
	}

	pub fn selectors(&self) -> &LoginSelectors {
		&self.selectors
	}

	pub fn browser(&self) -> &BrowserOptions {
		&self.browser
	}

	/// Checks that a browser login can be attempted with this configuration.
	pub fn validate_for_login(&self) -> Result<()> {
		if self.username.is_empty() {
			return Err(Error::Config("username is required for browser login".into()));
		}
		if self.password.is_empty() {
			return Err(Error::Config("password is required for browser login".into()));
		}
		if self.login_timeout.is_zero() {
			return Err(Error::Config("login timeout must be positive".into()));
		}
		Ok(())
	}
}

impl fmt::Debug for SessionConfig {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("SessionConfig")
			.field("login_url", &self.login_url.as_str())
			.field("api_base", &self.api_base.as_ref().map(Url::as_str))
			.field("username", &self.username)
			.field("password", &if self.password.is_empty() { "" } else { "<redacted>" })
			.field("fdid", &self.fdid)
			.field("login_timeout", &self.login_timeout)
			.field("liveness_interval", &self.liveness_interval)
			.field("selectors", &self.selectors)
			.field("browser", &self.browser)
			.finish()
	}
}

fn parse_http_url(raw: &str) -> Result<Url> {
	let url = Url::parse(raw).map_err(|e| Error::Config(format!("invalid URL {raw:?}: {e}")))?;
	match url.scheme() {
		"http" | "https" => Ok(url),
		other => Err(Error::Config(format!("unsupported URL scheme {other:?} in {raw:?}"))),
	}
}
