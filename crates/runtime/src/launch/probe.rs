//! DevTools HTTP endpoint probing and target discovery.

use std::time::Duration;

use serde::Deserialize;

use crate::error::{BrowserError, Result};

const PROBE_TIMEOUT: Duration = Duration::from_millis(400);

/// `/json/version` response subset.
#[derive(Debug, Clone, Deserialize)]
pub struct DevToolsVersion {
	#[serde(rename = "webSocketDebuggerUrl")]
	pub web_socket_debugger_url: String,
	#[serde(rename = "Browser")]
	pub browser: Option<String>,
}

/// One `/json/list` entry.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetInfo {
	pub id: String,
	#[serde(rename = "type")]
	pub kind: String,
	#[serde(default)]
	pub url: String,
	#[serde(default)]
	pub web_socket_debugger_url: Option<String>,
}

fn client() -> Result<reqwest::Client> {
	reqwest::Client::builder()
		.timeout(PROBE_TIMEOUT)
		.build()
		.map_err(|e| BrowserError::Launch(format!("failed to create HTTP client: {e}")))
}

/// Resolves `/json/version` for a local `port`, trying each loopback name.
pub async fn fetch_version(port: u16) -> Result<DevToolsVersion> {
	let mut last_error = "no response".to_string();

	for base in [
		format!("http://127.0.0.1:{port}"),
		format!("http://localhost:{port}"),
		format!("http://[::1]:{port}"),
	] {
		match fetch_version_at(&base).await {
			Ok(version) => return Ok(version),
			Err(e) => last_error = e.to_string(),
		}
	}

	Err(BrowserError::Launch(format!("no DevTools endpoint on port {port}: {last_error}")))
}

/// Resolves `/json/version` under an HTTP base such as `http://host:9222`.
pub async fn fetch_version_at(base: &str) -> Result<DevToolsVersion> {
	let url = format!("{}/json/version", base.trim_end_matches('/'));
	let response = client()?.get(&url).send().await.map_err(|e| BrowserError::Launch(format!("{url}: {e}")))?;
	if !response.status().is_success() {
		return Err(BrowserError::Launch(format!("{url}: unexpected status {}", response.status())));
	}
	response.json().await.map_err(|e| BrowserError::Launch(format!("{url}: malformed response: {e}")))
}

/// Returns a page target under `base`, opening a blank tab if none exists.
pub async fn page_target(base: &str) -> Result<TargetInfo> {
	let base = base.trim_end_matches('/');
	let client = client()?;

	let list_url = format!("{base}/json/list");
	let targets: Vec<TargetInfo> = client
		.get(&list_url)
		.send()
		.await
		.map_err(|e| BrowserError::Launch(format!("{list_url}: {e}")))?
		.json()
		.await
		.map_err(|e| BrowserError::Launch(format!("{list_url}: malformed response: {e}")))?;

	if let Some(page) = targets.into_iter().find(|t| t.kind == "page" && t.web_socket_debugger_url.is_some()) {
		return Ok(page);
	}

	// Recent Chrome builds reject GET for /json/new.
	let new_url = format!("{base}/json/new?about:blank");
	client
		.put(&new_url)
		.send()
		.await
		.map_err(|e| BrowserError::Launch(format!("{new_url}: {e}")))?
		.json()
		.await
		.map_err(|e| BrowserError::Launch(format!("{new_url}: malformed response: {e}")))
}
