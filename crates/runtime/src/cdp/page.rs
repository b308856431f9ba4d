//! [`Browser`] implementation over a DevTools page target.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use cadview_protocol::{NetworkEvent, RequestId};
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::sync::mpsc;
use tracing::{debug, info, trace};

use super::connection::CdpConnection;
use super::events::network_event;
use crate::browser::{Browser, StorageEntry};
use crate::error::{BrowserError, Result};
use crate::launch::{self, ChromeProcess, LaunchOptions};

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// A single Chrome tab driven over CDP.
pub struct CdpBrowser {
	connection: Arc<CdpConnection>,
	process: tokio::sync::Mutex<Option<ChromeProcess>>,
	network_enabled: AtomicBool,
	poll_interval: Duration,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResponseBody {
	body: String,
	#[serde(default)]
	base64_encoded: bool,
}

impl CdpBrowser {
	/// Attaches to a page WebSocket (`ws://.../devtools/page/<id>`).
	pub async fn attach(page_ws_url: &str) -> Result<Self> {
		let connection = CdpConnection::connect(page_ws_url).await?;
		let browser = Self {
			connection: Arc::new(connection),
			process: tokio::sync::Mutex::new(None),
			network_enabled: AtomicBool::new(false),
			poll_interval: POLL_INTERVAL,
		};
		for domain in ["Page", "Runtime", "DOMStorage"] {
			browser.connection.send(&format!("{domain}.enable"), json!({})).await?;
		}
		Ok(browser)
	}

	/// Connects to an already running browser.
	///
	/// `endpoint` is either a page WebSocket URL or the HTTP base of a
	/// DevTools endpoint (`http://127.0.0.1:9222`), in which case a page
	/// target is picked or opened.
	pub async fn connect(endpoint: &str) -> Result<Self> {
		if endpoint.starts_with("ws://") || endpoint.starts_with("wss://") {
			return Self::attach(endpoint).await;
		}
		let target = launch::page_target(endpoint).await?;
		let ws_url = target
			.web_socket_debugger_url
			.ok_or_else(|| BrowserError::Launch(format!("page target {} exposes no WebSocket URL", target.id)))?;
		info!(target = "cadview.cdp", endpoint, page = %target.id, "attached to existing browser");
		Self::attach(&ws_url).await
	}

	/// Launches a dedicated Chrome and attaches to its first tab.
	pub async fn launch(options: &LaunchOptions) -> Result<Self> {
		let (process, version) = launch::launch_chrome(options).await?;
		debug!(target = "cadview.cdp", browser = ?version.browser, "browser launched");
		let target = launch::page_target(&process.devtools_base()).await?;
		let ws_url = target
			.web_socket_debugger_url
			.ok_or_else(|| BrowserError::Launch(format!("page target {} exposes no WebSocket URL", target.id)))?;
		let browser = Self::attach(&ws_url).await?;
		*browser.process.lock().await = Some(process);
		Ok(browser)
	}

	/// Evaluates `expression` in the page and returns its JSON value.
	pub async fn evaluate(&self, expression: &str) -> Result<Value> {
		let reply = self
			.connection
			.send(
				"Runtime.evaluate",
				json!({
					"expression": expression,
					"returnByValue": true,
					"awaitPromise": true,
				}),
			)
			.await?;

		if let Some(details) = reply.get("exceptionDetails") {
			let message = details
				.pointer("/exception/description")
				.or_else(|| details.get("text"))
				.and_then(Value::as_str)
				.unwrap_or("unknown exception");
			return Err(BrowserError::JsException(message.to_string()));
		}
		Ok(reply.pointer("/result/value").cloned().unwrap_or(Value::Null))
	}

	/// Runs `body` with `node` bound to the first XPath match of `selector`.
	async fn with_node(&self, selector: &str, body: &str) -> Result<Value> {
		self.evaluate(&xpath_script(selector, body)).await
	}

	async fn enable_network(&self) -> Result<()> {
		if !self.network_enabled.swap(true, Ordering::SeqCst) {
			if let Err(e) = self.connection.send("Network.enable", json!({})).await {
				self.network_enabled.store(false, Ordering::SeqCst);
				return Err(e);
			}
		}
		Ok(())
	}
}

/// Wraps `body` in an IIFE where `node` is the first match of `selector`.
fn xpath_script(selector: &str, body: &str) -> String {
	// serde_json escaping yields a valid JavaScript string literal.
	let literal = Value::String(selector.to_string()).to_string();
	format!(
		"(() => {{ const node = document.evaluate({literal}, document, null, XPathResult.FIRST_ORDERED_NODE_TYPE, null).singleNodeValue; {body} }})()"
	)
}

const VISIBLE_BODY: &str = "if (!node) return false; \
	const el = node.nodeType === Node.ELEMENT_NODE ? node : node.parentElement; \
	if (!el) return false; \
	const rect = el.getBoundingClientRect(); \
	const style = window.getComputedStyle(el); \
	return rect.width > 0 && rect.height > 0 && style.visibility !== 'hidden' && style.display !== 'none';";

const FOCUS_BODY: &str = "if (!node) return false; node.focus(); if ('value' in node) { node.value = ''; } return true;";

const SUBMIT_BODY: &str = "if (!node) return false; \
	const form = node.tagName === 'FORM' ? node : node.form; \
	if (form) { if (form.requestSubmit) { form.requestSubmit(); } else { form.submit(); } } else { node.click(); } \
	return true;";

fn storage_origin_forms(origin: &str) -> (String, String) {
	let trimmed = origin.trim_end_matches('/').to_string();
	(format!("{trimmed}/"), trimmed)
}

#[async_trait]
impl Browser for CdpBrowser {
	async fn navigate(&self, url: &str) -> Result<()> {
		let reply = self.connection.send("Page.navigate", json!({ "url": url })).await?;
		if let Some(reason) = reply.get("errorText").and_then(Value::as_str) {
			return Err(BrowserError::Navigation {
				url: url.to_string(),
				reason: reason.to_string(),
			});
		}
		Ok(())
	}

	async fn wait_visible(&self, selector: &str, timeout: Duration) -> Result<()> {
		let deadline = tokio::time::Instant::now() + timeout;
		loop {
			match self.with_node(selector, VISIBLE_BODY).await {
				Ok(Value::Bool(true)) => return Ok(()),
				Ok(_) => {}
				// Evaluation races page navigations; the next poll sees the new document.
				Err(BrowserError::Cdp { message, .. }) | Err(BrowserError::JsException(message)) => {
					trace!(target = "cadview.cdp", selector, error = %message, "visibility probe failed");
				}
				Err(e) => return Err(e),
			}
			if tokio::time::Instant::now() + self.poll_interval > deadline {
				return Err(BrowserError::NotVisible {
					selector: selector.to_string(),
					timeout,
				});
			}
			tokio::time::sleep(self.poll_interval).await;
		}
	}

	async fn send_keys(&self, selector: &str, text: &str) -> Result<()> {
		if self.with_node(selector, FOCUS_BODY).await? != Value::Bool(true) {
			return Err(BrowserError::ElementNotFound { selector: selector.to_string() });
		}
		self.connection.send("Input.insertText", json!({ "text": text })).await?;
		Ok(())
	}

	async fn submit(&self, selector: &str) -> Result<()> {
		if self.with_node(selector, SUBMIT_BODY).await? != Value::Bool(true) {
			return Err(BrowserError::ElementNotFound { selector: selector.to_string() });
		}
		Ok(())
	}

	async fn local_storage(&self, origin: &str) -> Result<Vec<StorageEntry>> {
		let (storage_key, security_origin) = storage_origin_forms(origin);
		let reply = match self
			.connection
			.send(
				"DOMStorage.getDOMStorageItems",
				json!({ "storageId": { "storageKey": storage_key, "isLocalStorage": true } }),
			)
			.await
		{
			Ok(reply) => reply,
			// Older Chrome builds only understand `securityOrigin`.
			Err(BrowserError::Cdp { .. }) => {
				self.connection
					.send(
						"DOMStorage.getDOMStorageItems",
						json!({ "storageId": { "securityOrigin": security_origin, "isLocalStorage": true } }),
					)
					.await?
			}
			Err(e) => return Err(e),
		};

		let entries: Vec<Vec<String>> = serde_json::from_value(reply.get("entries").cloned().unwrap_or(Value::Array(Vec::new())))
			.map_err(|e| BrowserError::Protocol(format!("malformed DOM storage entries: {e}")))?;
		Ok(entries
			.into_iter()
			.filter_map(|pair| {
				let mut pair = pair.into_iter();
				Some((pair.next()?, pair.next().unwrap_or_default()))
			})
			.collect())
	}

	async fn response_body(&self, request_id: &RequestId) -> Result<Vec<u8>> {
		let reply = self.connection.send("Network.getResponseBody", json!({ "requestId": request_id })).await?;
		let body: ResponseBody = serde_json::from_value(reply).map_err(|e| BrowserError::Protocol(format!("malformed response body reply: {e}")))?;
		if body.base64_encoded {
			STANDARD
				.decode(body.body.as_bytes())
				.map_err(|e| BrowserError::Protocol(format!("invalid base64 body for {request_id}: {e}")))
		} else {
			Ok(body.body.into_bytes())
		}
	}

	async fn network_events(&self) -> Result<mpsc::UnboundedReceiver<NetworkEvent>> {
		// Subscribe before enabling so the first requests are not lost.
		let events = self.connection.subscribe_map(network_event);
		self.enable_network().await?;
		Ok(events)
	}

	async fn close(&self) -> Result<()> {
		if let Some(mut process) = self.process.lock().await.take() {
			info!(target = "cadview.cdp", pid = ?process.pid(), "terminating browser");
			process.kill().await?;
		}
		Ok(())
	}
}
