//! Bearer-authenticated access to the CADView REST API.
//!
//! Every read goes through [`ApiClient::authorized_get`], which attaches the
//! current credential and classifies the reply. The upstream answers an
//! expired token with its HTML login page rather than a status code, so a
//! markup or empty body counts as [`Error::NotAuthorized`].

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use cadview_protocol::{Call, CallScoped, Credential, Ori, SubResource};
use chrono::NaiveDateTime;
use parking_lot::RwLock;
use reqwest::StatusCode;
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use serde::de::DeserializeOwned;
use tracing::{debug, trace};
use url::Url;

use crate::dates::format_search_date;
use crate::error::{Error, Result};
use crate::liveness::Probe;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Atomically replaceable credential snapshot shared by a session's clients.
#[derive(Debug, Default)]
pub struct CredentialCell(RwLock<Option<Arc<Credential>>>);

impl CredentialCell {
	pub fn new() -> Self {
		Self::default()
	}

	/// Current snapshot. Callers hold it for the duration of one request.
	pub fn current(&self) -> Option<Arc<Credential>> {
		self.0.read().clone()
	}

	/// Installs `credential`, returning the previous snapshot.
	pub fn replace(&self, credential: Credential) -> Option<Arc<Credential>> {
		self.0.write().replace(Arc::new(credential))
	}

	pub fn clear(&self) -> Option<Arc<Credential>> {
		self.0.write().take()
	}

	pub fn is_set(&self) -> bool {
		self.0.read().is_some()
	}
}

/// HTTP client for the `api/` endpoints below a CADView base URL.
#[derive(Clone)]
pub struct ApiClient {
	http: reqwest::Client,
	base: Url,
	credential: Arc<CredentialCell>,
}

impl ApiClient {
	pub fn new(base: Url, credential: Arc<CredentialCell>) -> Result<Self> {
		let http = reqwest::Client::builder()
			.timeout(REQUEST_TIMEOUT)
			.user_agent(concat!("cadview-rs/", env!("CARGO_PKG_VERSION")))
			.build()
			.map_err(|e| Error::Config(format!("failed to build HTTP client: {e}")))?;
		Ok(Self::with_http(http, base, credential))
	}

	/// Uses a caller-configured `reqwest` client.
	pub fn with_http(http: reqwest::Client, base: Url, credential: Arc<CredentialCell>) -> Self {
		Self { http, base, credential }
	}

	/// Same HTTP client and base, reading from another credential cell.
	pub fn with_credential(&self, credential: Arc<CredentialCell>) -> Self {
		Self {
			http: self.http.clone(),
			base: self.base.clone(),
			credential,
		}
	}

	pub fn base(&self) -> &Url {
		&self.base
	}

	pub fn credential(&self) -> &Arc<CredentialCell> {
		&self.credential
	}

	/// Builds `{base}/api/{path}?{query}`.
	pub fn endpoint(&self, path: &str, query: &[(&str, &str)]) -> Result<Url> {
		let mut url = self.base.clone();
		url.set_query(None);
		url.set_fragment(None);
		url.path_segments_mut()
			.map_err(|()| Error::Config(format!("API base {} cannot carry a path", self.base)))?
			.pop_if_empty()
			.push("api")
			.extend(path.split('/'));
		if !query.is_empty() {
			url.query_pairs_mut().extend_pairs(query.iter().copied());
		}
		Ok(url)
	}

	/// GETs `url` with the bearer header and returns the raw body.
	pub async fn authorized_get(&self, url: &Url) -> Result<Vec<u8>> {
		let credential = self.credential.current().ok_or(Error::Unauthenticated)?;
		trace!(target = "cadview.api", %url, token = %credential.fingerprint(), "GET");

		let response = self
			.http
			.get(url.clone())
			.header(AUTHORIZATION, credential.authorization_value())
			.header(ACCEPT, "application/json")
			.send()
			.await
			.map_err(|e| transport(url, None, &e))?;

		let status = response.status();
		let content_type = response.headers().get(CONTENT_TYPE).and_then(|value| value.to_str().ok()).map(str::to_owned);
		let body = response.bytes().await.map_err(|e| transport(url, Some(status), &e))?;

		classify_response(url.as_str(), status, content_type.as_deref(), &body)?;
		debug!(target = "cadview.api", %url, status = status.as_u16(), bytes = body.len(), "response accepted");
		Ok(body.to_vec())
	}

	/// GETs `path` and decodes the JSON body.
	pub async fn get_json<T: DeserializeOwned>(&self, path: &str, query: &[(&str, &str)]) -> Result<T> {
		let url = self.endpoint(path, query)?;
		let body = self.authorized_get(&url).await?;
		serde_json::from_slice(&body).map_err(|source| Error::Decode { url: url.to_string(), source })
	}

	pub async fn ping(&self) -> Result<bool> {
		self.get_json("CadView/Ping", &[]).await
	}

	pub async fn is_authorized(&self) -> Result<bool> {
		self.get_json("CadView/IsAuthorized", &[]).await
	}

	/// Jurisdictions selectable in the cleared-call search.
	pub async fn oris(&self) -> Result<Vec<Ori>> {
		self.get_json("CadView/GetOrisForClearedCallSearch", &[]).await
	}

	pub async fn active_calls(&self) -> Result<Vec<Call>> {
		self.get_json("Call/GetActiveCalls", &[]).await
	}

	/// Cleared (closed) calls between `from` and `to`, canceled calls included.
	pub async fn search_cleared_calls(&self, from: NaiveDateTime, to: NaiveDateTime, ori: &str) -> Result<Vec<Call>> {
		let url = self.cleared_calls_url(from, to, ori)?;
		let body = self.authorized_get(&url).await?;
		serde_json::from_slice(&body).map_err(|source| Error::Decode { url: url.to_string(), source })
	}

	/// URL of a cleared-call search; parameters keep the order the API documents.
	pub fn cleared_calls_url(&self, from: NaiveDateTime, to: NaiveDateTime, ori: &str) -> Result<Url> {
		let from = format_search_date(from);
		let to = format_search_date(to);
		self.endpoint(
			"Call/SearchClearedCalls",
			&[("fromDate", from.as_str()), ("toDate", to.as_str()), ("ori", ori), ("includeCanceledCalls", "true")],
		)
	}

	/// Full record of one call. List endpoints only return partial records.
	pub async fn call(&self, call_id: i64) -> Result<Call> {
		let id = call_id.to_string();
		self.get_json("Call/GetCall", &[("id", id.as_str())]).await
	}

	/// One sub-resource collection of `call_id`, as returned by the API.
	pub async fn sub_resource<T>(&self, kind: SubResource, call_id: i64) -> Result<Vec<T>>
	where
		T: DeserializeOwned + CallScoped,
	{
		let id = call_id.to_string();
		let path = format!("Call/{}", kind.endpoint());
		self.get_json(&path, &[("id", id.as_str())]).await
	}
}

#[async_trait]
impl Probe for ApiClient {
	async fn check(&self) -> Result<()> {
		self.ping().await.map(|_| ())
	}
}

fn transport(url: &Url, status: Option<StatusCode>, err: &reqwest::Error) -> Error {
	Error::Transport {
		url: url.to_string(),
		status: status.map(|s| s.as_u16()),
		reason: err.to_string(),
	}
}

/// Decides whether a reply carries usable data.
///
/// Auth statuses and HTML content types are checked before other failure
/// statuses; the body test runs last and skips leading whitespace.
pub fn classify_response(url: &str, status: StatusCode, content_type: Option<&str>, body: &[u8]) -> Result<()> {
	let not_authorized = || Error::NotAuthorized { url: url.to_string() };

	if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
		return Err(not_authorized());
	}
	if content_type.is_some_and(|ct| ct.to_ascii_lowercase().starts_with("text/html")) {
		return Err(not_authorized());
	}
	if !status.is_success() {
		return Err(Error::Transport {
			url: url.to_string(),
			status: Some(status.as_u16()),
			reason: format!("unexpected status {status}"),
		});
	}
	match body.iter().find(|b| !b.is_ascii_whitespace()) {
		None | Some(b'<') => Err(not_authorized()),
		Some(_) => Ok(()),
	}
}
