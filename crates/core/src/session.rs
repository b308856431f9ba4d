//! Session lifecycle: one-time login, lazy initialization, credential hand-off.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use cadview_protocol::{Call, Credential, Ori, fdid_to_ori};
use cadview_runtime::{Browser, CdpBrowser, LaunchOptions};
use chrono::NaiveDateTime;
use parking_lot::Mutex;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::assemble::{CompositeRecord, RecordAssembler};
use crate::client::{ApiClient, CredentialCell};
use crate::config::{BrowserOptions, SessionConfig};
use crate::error::{Error, Result};
use crate::liveness::{LivenessHandle, LivenessMonitor, LivenessStatus};
use crate::login::CredentialExtractor;
use crate::traffic::TrafficCorrelator;

/// Lifecycle of a [`Session`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
	Uninitialized,
	Initializing,
	Ready,
	Cancelled,
}

/// Opens the browser used for one login.
#[async_trait]
pub trait BrowserFactory: Send + Sync {
	async fn open(&self, options: &BrowserOptions) -> Result<Arc<dyn Browser>>;
}

/// Launches headless Chrome, or attaches to a configured DevTools endpoint.
#[derive(Debug, Default, Clone, Copy)]
pub struct CdpBrowserFactory;

#[async_trait]
impl BrowserFactory for CdpBrowserFactory {
	async fn open(&self, options: &BrowserOptions) -> Result<Arc<dyn Browser>> {
		let browser = match &options.cdp_endpoint {
			Some(endpoint) => {
				info!(target = "cadview.session", %endpoint, "attaching to running browser");
				CdpBrowser::connect(endpoint).await?
			}
			None => {
				let launch = LaunchOptions {
					executable: options.executable.clone(),
					headless: options.headless,
					..LaunchOptions::default()
				};
				CdpBrowser::launch(&launch).await?
			}
		};
		Ok(Arc::new(browser))
	}
}

/// An authenticated connection to one CADView instance.
///
/// Entry points that need a credential log in on first use. Concurrent first
/// callers share a single login.
pub struct Session {
	config: SessionConfig,
	credential: Arc<CredentialCell>,
	client: ApiClient,
	assembler: RecordAssembler,
	factory: Arc<dyn BrowserFactory>,
	state: Mutex<SessionState>,
	init_lock: tokio::sync::Mutex<()>,
	cancel: CancellationToken,
	liveness: Mutex<Option<LivenessHandle>>,
	traffic: Mutex<Option<Arc<TrafficCorrelator>>>,
}

impl Session {
	/// Creates a session that logs in through Chrome.
	pub fn new(config: SessionConfig) -> Result<Self> {
		Self::with_browser_factory(config, Arc::new(CdpBrowserFactory))
	}

	pub fn with_browser_factory(config: SessionConfig, factory: Arc<dyn BrowserFactory>) -> Result<Self> {
		let credential = Arc::new(CredentialCell::new());
		let client = ApiClient::new(config.api_base().clone(), Arc::clone(&credential))?;
		Ok(Self::from_parts(config, credential, client, factory))
	}

	fn from_parts(config: SessionConfig, credential: Arc<CredentialCell>, client: ApiClient, factory: Arc<dyn BrowserFactory>) -> Self {
		Self {
			config,
			credential,
			assembler: RecordAssembler::new(client.clone()),
			client,
			factory,
			state: Mutex::new(SessionState::Uninitialized),
			init_lock: tokio::sync::Mutex::new(()),
			cancel: CancellationToken::new(),
			liveness: Mutex::new(None),
			traffic: Mutex::new(None),
		}
	}

	/// A fresh, uninitialized session with this session's configuration.
	///
	/// The credential is not copied; see [`transfer_credential_from`](Self::transfer_credential_from).
	pub fn make_copy(&self) -> Session {
		let credential = Arc::new(CredentialCell::new());
		let client = self.client.with_credential(Arc::clone(&credential));
		Self::from_parts(self.config.clone(), credential, client, Arc::clone(&self.factory))
	}

	pub fn config(&self) -> &SessionConfig {
		&self.config
	}

	pub fn state(&self) -> SessionState {
		*self.state.lock()
	}

	pub fn credential(&self) -> Option<Arc<Credential>> {
		self.credential.current()
	}

	pub fn client(&self) -> &ApiClient {
		&self.client
	}

	/// Traffic recorded during the most recent browser login.
	pub fn traffic(&self) -> Option<Arc<TrafficCorrelator>> {
		self.traffic.lock().clone()
	}

	/// Logs in through the browser.
	///
	/// Fails with [`Error::AlreadyInitialized`] when called again after
	/// success, leaving the existing credential in place. A failed attempt
	/// returns the session to [`SessionState::Uninitialized`].
	pub async fn initialize(&self) -> Result<()> {
		let _guard = self.init_lock.lock().await;
		self.initialize_locked().await
	}

	/// Initializes unless already ready.
	pub async fn ensure_initialized(&self) -> Result<()> {
		match self.state() {
			SessionState::Ready => return Ok(()),
			SessionState::Cancelled => return Err(Error::Cancelled),
			SessionState::Uninitialized | SessionState::Initializing => {}
		}
		let _guard = self.init_lock.lock().await;
		match self.state() {
			SessionState::Ready => Ok(()),
			SessionState::Cancelled => Err(Error::Cancelled),
			SessionState::Uninitialized | SessionState::Initializing => self.initialize_locked().await,
		}
	}

	async fn initialize_locked(&self) -> Result<()> {
		{
			let mut state = self.state.lock();
			match *state {
				SessionState::Cancelled => return Err(Error::Cancelled),
				SessionState::Ready | SessionState::Initializing => return Err(Error::AlreadyInitialized),
				SessionState::Uninitialized => *state = SessionState::Initializing,
			}
		}
		info!(target = "cadview.session", url = %self.config.login_url(), "initializing session");

		match self.browser_login().await {
			Ok(credential) => {
				let fingerprint = credential.fingerprint();
				self.credential.replace(credential);
				let mut state = self.state.lock();
				if *state == SessionState::Cancelled {
					return Err(Error::Cancelled);
				}
				*state = SessionState::Ready;
				info!(target = "cadview.session", token = %fingerprint, "session ready");
				Ok(())
			}
			Err(err) => {
				let mut state = self.state.lock();
				if *state == SessionState::Initializing {
					*state = SessionState::Uninitialized;
				}
				Err(err)
			}
		}
	}

	async fn browser_login(&self) -> Result<Credential> {
		self.config.validate_for_login()?;
		let browser = self.factory.open(self.config.browser()).await?;
		let traffic = Arc::new(TrafficCorrelator::new());

		let events = match browser.network_events().await {
			Ok(events) => events,
			Err(err) => {
				release(browser.as_ref()).await;
				return Err(err.into());
			}
		};
		traffic.attach(events, Arc::clone(&browser));

		let extractor = CredentialExtractor::new(Arc::clone(&browser), self.config.selectors().clone()).with_cancellation(self.cancel.child_token());
		let outcome = extractor
			.login(self.config.login_url(), self.config.username(), self.config.password(), self.config.login_timeout())
			.await;

		if outcome.is_ok() {
			traffic.drain().await;
		} else {
			traffic.detach();
		}
		release(browser.as_ref()).await;
		*self.traffic.lock() = Some(traffic);
		outcome
	}

	/// Installs an externally obtained credential and marks the session ready.
	pub fn set_credential(&self, credential: Credential) -> Result<()> {
		if !credential.is_usable() {
			return Err(Error::CredentialParse("token type or access token is empty".into()));
		}
		let mut state = self.state.lock();
		if *state == SessionState::Cancelled {
			return Err(Error::Cancelled);
		}
		info!(target = "cadview.session", token = %credential.fingerprint(), "credential installed");
		self.credential.replace(credential);
		*state = SessionState::Ready;
		Ok(())
	}

	/// Reuses `other`'s credential without a browser login of our own.
	pub fn transfer_credential_from(&self, other: &Session) -> Result<()> {
		let credential = other.credential().ok_or(Error::Unauthenticated)?;
		self.set_credential(Credential::clone(&credential))
	}

	/// Cancels an in-flight login and the liveness loop. Entry points fail
	/// with [`Error::Cancelled`] afterwards.
	pub fn cancel(&self) {
		*self.state.lock() = SessionState::Cancelled;
		self.cancel.cancel();
		if let Some(handle) = self.liveness.lock().as_ref() {
			handle.cancel();
		}
		info!(target = "cadview.session", "session cancelled");
	}

	pub fn is_cancelled(&self) -> bool {
		self.cancel.is_cancelled()
	}

	pub async fn active_calls(&self) -> Result<Vec<Call>> {
		self.ensure_initialized().await?;
		self.client.active_calls().await
	}

	pub async fn cleared_calls(&self, from: NaiveDateTime, to: NaiveDateTime, ori: &str) -> Result<Vec<Call>> {
		self.ensure_initialized().await?;
		self.client.search_cleared_calls(from, to, ori).await
	}

	pub async fn oris(&self) -> Result<Vec<Ori>> {
		self.ensure_initialized().await?;
		self.client.oris().await
	}

	/// ORI search filter of the configured FDID, if one is configured and known.
	pub async fn configured_ori(&self) -> Result<Option<String>> {
		let Some(fdid) = self.config.fdid() else {
			return Ok(None);
		};
		let oris = self.oris().await?;
		let ori = fdid_to_ori(&oris, fdid).map(str::to_owned);
		if ori.is_none() {
			warn!(target = "cadview.session", %fdid, known = oris.len(), "FDID has no matching ORI");
		}
		Ok(ori)
	}

	pub async fn fetch_composite(&self, call_id: i64) -> Result<CompositeRecord> {
		if call_id == 0 {
			return Err(Error::InvalidRecord("call id 0 identifies no call".into()));
		}
		self.ensure_initialized().await?;
		self.assembler.fetch_composite(call_id).await
	}

	pub async fn ping(&self) -> Result<bool> {
		self.ensure_initialized().await?;
		self.client.ping().await
	}

	pub async fn is_authorized(&self) -> Result<bool> {
		self.ensure_initialized().await?;
		self.client.is_authorized().await
	}

	/// Starts (or restarts) the liveness loop and returns its status feed.
	///
	/// `interval` defaults to the configured liveness interval.
	pub async fn start_liveness(&self, interval: Option<Duration>) -> Result<watch::Receiver<LivenessStatus>> {
		self.ensure_initialized().await?;
		let interval = interval.unwrap_or(self.config.liveness_interval());
		let handle = LivenessMonitor::new(Arc::new(self.client.clone()), interval).spawn(self.cancel.child_token());
		let status = handle.subscribe();
		if let Some(previous) = self.liveness.lock().replace(handle) {
			debug!(target = "cadview.session", "replacing running liveness loop");
			previous.cancel();
		}
		Ok(status)
	}

	/// Stops the liveness loop, if one runs, and waits for it to exit.
	pub async fn stop_liveness(&self) {
		let handle = self.liveness.lock().take();
		if let Some(handle) = handle {
			handle.stop().await;
		}
	}
}

impl Drop for Session {
	fn drop(&mut self) {
		self.cancel.cancel();
	}
}

async fn release(browser: &dyn Browser) {
	if let Err(err) = browser.close().await {
		warn!(target = "cadview.session", error = %err, "failed to close browser");
	}
}
