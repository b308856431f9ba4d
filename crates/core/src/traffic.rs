//! Correlation of browser network events into completed HTTP exchanges.
//!
//! The browser reports `request-will-be-sent`, `response-received`, and
//! `loading-finished` per request id. Events for one id arrive in order but
//! ids interleave freely, and bodies have to be fetched with a separate call
//! after loading finishes. [`TrafficCorrelator`] keeps three indexes behind one
//! lock and tracks every body fetch so callers can wait on a barrier before
//! reading results. The barrier first flushes events still queued for the
//! pump, so nothing delivered before [`TrafficCorrelator::drain`] is lost.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use cadview_protocol::{NetworkEvent, RequestId};
use cadview_runtime::Browser;
use parking_lot::Mutex;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, trace, warn};

const STATIC_ASSET_SUFFIXES: [&str; 4] = [".css", ".js", ".svg", ".woff2"];

/// Whether `url` is noise that should never be indexed.
pub fn is_unwanted_traffic(url: &str) -> bool {
	!url.starts_with("http") || STATIC_ASSET_SUFFIXES.iter().any(|suffix| url.ends_with(suffix))
}

/// One observed request/response pair.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrafficExchange {
	pub request_url: String,
	/// Final URL after redirects; set by `response-received`.
	pub response_url: Option<String>,
	pub status: Option<u16>,
	/// Absent until the body fetch succeeds, and forever if it fails.
	pub body: Option<Vec<u8>>,
}

#[derive(Default)]
struct Indexes {
	/// Request URL to the latest request id that asked for it.
	requests: HashMap<String, RequestId>,
	exchanges: HashMap<RequestId, TrafficExchange>,
	/// Final URL to the most recent body served for it.
	bodies: HashMap<String, Vec<u8>>,
}

/// Event pump spawned by [`TrafficCorrelator::attach`].
struct Pump {
	flush: oneshot::Sender<()>,
	task: JoinHandle<()>,
}

/// Thread-safe store of exchanges observed during a browser session.
#[derive(Default)]
pub struct TrafficCorrelator {
	indexes: Mutex<Indexes>,
	fetches: TaskTracker,
	pump: Mutex<Option<Pump>>,
}

impl TrafficCorrelator {
	pub fn new() -> Self {
		Self::default()
	}

	/// Records a request. Returns `false` when the URL was filtered out.
	pub fn on_request_started(&self, url: &str, request_id: &RequestId) -> bool {
		if is_unwanted_traffic(url) {
			trace!(target = "cadview.traffic", %url, "ignoring request");
			return false;
		}
		debug!(target = "cadview.traffic", %url, %request_id, "request started");

		let mut indexes = self.indexes.lock();
		indexes.requests.insert(url.to_string(), request_id.clone());
		indexes.exchanges.insert(
			request_id.clone(),
			TrafficExchange {
				request_url: url.to_string(),
				..TrafficExchange::default()
			},
		);
		true
	}

	/// Resolves the final URL of a request. Returns `false` when filtered out.
	///
	/// A filtered final URL (a redirect onto a static asset) evicts the
	/// exchange so that no index ever references it.
	pub fn on_response_resolved(&self, request_id: &RequestId, url: &str, status: u16, headers: &BTreeMap<String, String>) -> bool {
		let mut indexes = self.indexes.lock();
		if is_unwanted_traffic(url) {
			if let Some(evicted) = indexes.exchanges.remove(request_id) {
				if indexes.requests.get(&evicted.request_url) == Some(request_id) {
					indexes.requests.remove(&evicted.request_url);
				}
			}
			trace!(target = "cadview.traffic", %url, %request_id, "ignoring response");
			return false;
		}
		debug!(
			target = "cadview.traffic",
			%url,
			%request_id,
			status,
			content_type = headers.get("content-type").or_else(|| headers.get("Content-Type")).map(String::as_str),
			"response received"
		);

		let exchange = indexes.exchanges.entry(request_id.clone()).or_insert_with(|| TrafficExchange {
			request_url: url.to_string(),
			..TrafficExchange::default()
		});
		exchange.response_url = Some(url.to_string());
		exchange.status = Some(status);
		true
	}

	/// Attaches a fetched body, or records that it could not be fetched.
	///
	/// Returns the final URL the body was indexed under.
	pub fn on_body_available(&self, request_id: &RequestId, body: Option<Vec<u8>>) -> Option<String> {
		let mut guard = self.indexes.lock();
		let indexes = &mut *guard;
		let Some(exchange) = indexes.exchanges.get_mut(request_id) else {
			return None;
		};
		let url = exchange.response_url.clone()?;
		match body {
			Some(body) => {
				exchange.body = Some(body.clone());
				indexes.bodies.insert(url.clone(), body);
				Some(url)
			}
			None => {
				exchange.body = None;
				None
			}
		}
	}

	/// Final URL of `request_id`, if its response was seen and kept.
	pub fn response_url(&self, request_id: &RequestId) -> Option<String> {
		self.indexes.lock().exchanges.get(request_id).and_then(|exchange| exchange.response_url.clone())
	}

	/// Consumes `events` in order and fetches bodies from `browser`.
	///
	/// The pump runs until the event stream closes, [`drain`](Self::drain)
	/// flushes it, or [`detach`](Self::detach) drops it. Attaching again
	/// replaces the previous pump.
	pub fn attach(self: &Arc<Self>, mut events: mpsc::UnboundedReceiver<NetworkEvent>, browser: Arc<dyn Browser>) {
		let correlator = Arc::clone(self);
		let (flush, mut flushed) = oneshot::channel();
		let task = tokio::spawn(async move {
			loop {
				tokio::select! {
					biased;
					event = events.recv() => match event {
						Some(event) => correlator.route(event, &browser),
						None => {
							trace!(target = "cadview.traffic", "network event stream closed");
							break;
						}
					},
					_ = &mut flushed => {
						let mut routed = 0usize;
						while let Ok(event) = events.try_recv() {
							correlator.route(event, &browser);
							routed += 1;
						}
						trace!(target = "cadview.traffic", routed, "event queue flushed");
						break;
					}
				}
			}
		});
		if let Some(previous) = self.pump.lock().replace(Pump { flush, task }) {
			previous.task.abort();
		}
	}

	/// Stops the pump without routing queued events.
	pub fn detach(&self) {
		if let Some(pump) = self.pump.lock().take() {
			pump.task.abort();
		}
	}

	fn route(self: &Arc<Self>, event: NetworkEvent, browser: &Arc<dyn Browser>) {
		match event {
			NetworkEvent::RequestWillBeSent { request_id, url } => {
				self.on_request_started(&url, &request_id);
			}
			NetworkEvent::ResponseReceived {
				request_id,
				url,
				status,
				headers,
			} => {
				self.on_response_resolved(&request_id, &url, status, &headers);
			}
			NetworkEvent::LoadingFinished { request_id } => {
				if self.response_url(&request_id).is_none() {
					return;
				}
				let correlator = Arc::clone(self);
				let browser = Arc::clone(browser);
				self.fetches.spawn(async move {
					let body = match browser.response_body(&request_id).await {
						Ok(body) => Some(body),
						Err(err) => {
							debug!(target = "cadview.traffic", %request_id, error = %err, "response body unavailable");
							None
						}
					};
					if let Some(url) = correlator.on_body_available(&request_id, body) {
						trace!(target = "cadview.traffic", %url, %request_id, "body captured");
					}
				});
			}
		}
	}

	/// Routes every event already queued for the pump, stops it, then waits
	/// until every body fetch has finished.
	pub async fn drain(&self) {
		let pump = self.pump.lock().take();
		if let Some(Pump { flush, task }) = pump {
			// An already finished pump has dropped its receiver; nothing is queued.
			let _ = flush.send(());
			if let Err(err) = task.await {
				warn!(target = "cadview.traffic", error = %err, "event pump failed");
			}
		}
		self.fetches.close();
		self.fetches.wait().await;
		self.fetches.reopen();
		info!(
			target = "cadview.traffic",
			exchanges = self.exchange_count(),
			bodies = self.body_count(),
			"network traffic settled"
		);
	}

	/// Number of body fetches still running.
	pub fn in_flight(&self) -> usize {
		self.fetches.len()
	}

	/// Most recent body served for the final URL `url`.
	pub fn body(&self, url: &str) -> Option<Vec<u8>> {
		self.indexes.lock().bodies.get(url).cloned()
	}

	pub fn exchange(&self, request_id: &RequestId) -> Option<TrafficExchange> {
		self.indexes.lock().exchanges.get(request_id).cloned()
	}

	/// Latest request id issued for the request URL `url`.
	pub fn request_id_for(&self, url: &str) -> Option<RequestId> {
		self.indexes.lock().requests.get(url).cloned()
	}

	/// Sorted final URLs of every kept exchange.
	pub fn urls(&self) -> Vec<String> {
		let indexes = self.indexes.lock();
		let mut urls: Vec<String> = indexes.exchanges.values().filter_map(|exchange| exchange.response_url.clone()).collect();
		urls.sort();
		urls.dedup();
		urls
	}

	pub fn exchange_count(&self) -> usize {
		self.indexes.lock().exchanges.len()
	}

	pub fn body_count(&self) -> usize {
		self.indexes.lock().bodies.len()
	}
}
