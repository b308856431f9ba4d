//! JSON-RPC connection to one DevTools target.
//!
//! # Message Flow
//!
//! 1. Caller invokes [`CdpConnection::send`] with a method and params
//! 2. The connection allocates an id and parks a oneshot sender under it
//! 3. The command is serialized and written to the WebSocket
//! 4. The reader task receives the response and completes the oneshot
//!
//! Messages without an `id` are events; they are handed to every live
//! subscriber on the reader task, so an event is queued before any response
//! that follows it on the wire completes.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{debug, trace, warn};

use crate::error::{BrowserError, Result};

/// Default time a command may wait for its response.
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(30);

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type Callbacks = Arc<Mutex<HashMap<u64, oneshot::Sender<Result<Value>>>>>;
/// Delivers one event; returns `false` once the receiving side is gone.
type Sink = Box<dyn FnMut(&CdpEvent) -> bool + Send>;
type Subscribers = Arc<Mutex<Vec<Sink>>>;

/// An event pushed by the browser.
#[derive(Debug, Clone, PartialEq)]
pub struct CdpEvent {
	/// Event method name (e.g. `"Network.loadingFinished"`).
	pub method: String,
	pub params: Value,
}

#[derive(Debug, Serialize)]
struct Command<'a> {
	id: u64,
	method: &'a str,
	params: Value,
}

#[derive(Debug, Deserialize)]
struct ErrorPayload {
	code: i64,
	message: String,
	#[serde(default)]
	data: Option<String>,
}

/// Discriminated union of inbound messages; responses carry an `id`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Inbound {
	Response {
		id: u64,
		#[serde(default)]
		result: Option<Value>,
		#[serde(default)]
		error: Option<ErrorPayload>,
	},
	Event {
		method: String,
		#[serde(default)]
		params: Value,
	},
}

/// Command/response correlation over a DevTools WebSocket.
///
/// Thread-safe; share it behind an `Arc`. Dropping the connection stops the
/// reader task and fails every pending command with
/// [`BrowserError::ConnectionClosed`].
pub struct CdpConnection {
	last_id: AtomicU64,
	callbacks: Callbacks,
	subscribers: Subscribers,
	writer: tokio::sync::Mutex<SplitSink<WsStream, Message>>,
	reader: JoinHandle<()>,
	command_timeout: Duration,
}

impl CdpConnection {
	/// Connects to a target WebSocket such as
	/// `ws://127.0.0.1:9222/devtools/page/<id>`.
	pub async fn connect(ws_url: &str) -> Result<Self> {
		debug!(target = "cadview.cdp", url = ws_url, "connecting to DevTools");

		let (stream, _) = tokio_tungstenite::connect_async(ws_url).await.map_err(|e| BrowserError::ConnectionFailed {
			url: ws_url.to_string(),
			reason: e.to_string(),
		})?;
		let (writer, reader) = stream.split();

		let callbacks: Callbacks = Arc::new(Mutex::new(HashMap::new()));
		let subscribers: Subscribers = Arc::new(Mutex::new(Vec::new()));
		let reader = tokio::spawn(read_loop(reader, Arc::clone(&callbacks), Arc::clone(&subscribers)));

		Ok(Self {
			last_id: AtomicU64::new(1),
			callbacks,
			subscribers,
			writer: tokio::sync::Mutex::new(writer),
			reader,
			command_timeout: DEFAULT_COMMAND_TIMEOUT,
		})
	}

	/// Sends `method` and awaits its result.
	pub async fn send(&self, method: &str, params: Value) -> Result<Value> {
		let id = self.last_id.fetch_add(1, Ordering::SeqCst);
		let payload = serde_json::to_string(&Command { id, method, params }).map_err(|e| BrowserError::Protocol(format!("failed to serialize {method}: {e}")))?;

		// Register before writing so a fast response cannot miss its slot.
		let (tx, rx) = oneshot::channel();
		self.callbacks.lock().insert(id, tx);

		trace!(target = "cadview.cdp", id, method, "sending command");
		if let Err(e) = self.writer.lock().await.send(Message::Text(payload.into())).await {
			self.callbacks.lock().remove(&id);
			return Err(BrowserError::Protocol(format!("failed to send {method}: {e}")));
		}

		match tokio::time::timeout(self.command_timeout, rx).await {
			Ok(Ok(result)) => result,
			Ok(Err(_)) => Err(BrowserError::ConnectionClosed),
			Err(_) => {
				self.callbacks.lock().remove(&id);
				Err(BrowserError::Timeout {
					method: method.to_string(),
					duration: self.command_timeout,
				})
			}
		}
	}

	/// Returns a channel receiving `map(event)` for every event from now on
	/// that `map` accepts.
	///
	/// `map` runs on the reader task, in wire order.
	pub fn subscribe_map<T, F>(&self, map: F) -> mpsc::UnboundedReceiver<T>
	where
		T: Send + 'static,
		F: Fn(&CdpEvent) -> Option<T> + Send + 'static,
	{
		let (tx, rx) = mpsc::unbounded_channel();
		self.subscribers.lock().push(Box::new(move |event| match map(event) {
			Some(item) => tx.send(item).is_ok(),
			None => !tx.is_closed(),
		}));
		rx
	}

	/// Number of commands still awaiting a response.
	pub fn pending(&self) -> usize {
		self.callbacks.lock().len()
	}
}

impl Drop for CdpConnection {
	fn drop(&mut self) {
		self.reader.abort();
		fail_pending(&self.callbacks);
	}
}

async fn read_loop(mut reader: SplitStream<WsStream>, callbacks: Callbacks, subscribers: Subscribers) {
	while let Some(frame) = reader.next().await {
		let text = match frame {
			Ok(Message::Text(text)) => text.to_string(),
			Ok(Message::Binary(bytes)) => match String::from_utf8(bytes.to_vec()) {
				Ok(text) => text,
				Err(_) => continue,
			},
			Ok(Message::Close(_)) => {
				debug!(target = "cadview.cdp", "DevTools closed the connection");
				break;
			}
			Ok(_) => continue,
			Err(e) => {
				warn!(target = "cadview.cdp", error = %e, "DevTools read failed; stopping reader");
				break;
			}
		};

		match serde_json::from_str::<Inbound>(&text) {
			Ok(Inbound::Response { id, result, error }) => {
				let Some(tx) = callbacks.lock().remove(&id) else {
					debug!(target = "cadview.cdp", id, "response for unknown command");
					continue;
				};
				let outcome = match error {
					Some(err) => Err(BrowserError::Cdp {
						code: err.code,
						message: match err.data {
							Some(data) => format!("{} ({data})", err.message),
							None => err.message,
						},
					}),
					None => Ok(result.unwrap_or(Value::Null)),
				};
				let _ = tx.send(outcome);
			}
			Ok(Inbound::Event { method, params }) => {
				let event = CdpEvent { method, params };
				subscribers.lock().retain_mut(|deliver| deliver(&event));
			}
			Err(e) => warn!(target = "cadview.cdp", error = %e, "unparseable DevTools message"),
		}
	}

	fail_pending(&callbacks);
	subscribers.lock().clear();
}

fn fail_pending(callbacks: &Callbacks) {
	for (_, tx) in callbacks.lock().drain() {
		let _ = tx.send(Err(BrowserError::ConnectionClosed));
	}
}

#[cfg(test)]
mod tests {
	use serde_json::json;
	use tokio::net::TcpListener;

	use super::*;

	/// Accepts one WebSocket client and answers each command with
	/// `{"echo": <method>}`, emitting an event before the first answer.
	async fn spawn_fake_devtools() -> String {
		let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
		let addr = listener.local_addr().unwrap();

		tokio::spawn(async move {
			let (stream, _) = listener.accept().await.unwrap();
			let ws = tokio_tungstenite::accept_async(stream).await.unwrap();
			let (mut tx, mut rx) = ws.split();
			let mut first = true;

			while let Some(Ok(Message::Text(text))) = rx.next().await {
				let command: Value = serde_json::from_str(&text).unwrap();
				if first {
					let event = json!({"method": "Network.loadingFinished", "params": {"requestId": "7.1"}});
					tx.send(Message::Text(event.to_string().into())).await.unwrap();
					first = false;
				}
				let reply = if command["method"] == "Broken.method" {
					json!({"id": command["id"], "error": {"code": -32601, "message": "'Broken.method' wasn't found"}})
				} else {
					json!({"id": command["id"], "result": {"echo": command["method"]}})
				};
				tx.send(Message::Text(reply.to_string().into())).await.unwrap();
			}
		});

		format!("ws://{addr}")
	}

	#[tokio::test]
	async fn correlates_responses_and_dispatches_events() {
		let url = spawn_fake_devtools().await;
		let connection = CdpConnection::connect(&url).await.unwrap();
		let mut events = connection.subscribe_map(|event| Some(event.clone()));

		let result = connection.send("Page.enable", json!({})).await.unwrap();
		assert_eq!(result["echo"], "Page.enable");

		// Events that precede a reply on the wire are queued before the reply completes.
		let event = events.try_recv().expect("event queued ahead of the reply");
		assert_eq!(event.method, "Network.loadingFinished");
		assert_eq!(event.params["requestId"], "7.1");
		assert_eq!(connection.pending(), 0);
	}

	#[tokio::test]
	async fn surfaces_cdp_errors() {
		let url = spawn_fake_devtools().await;
		let connection = CdpConnection::connect(&url).await.unwrap();

		let err = connection.send("Broken.method", json!({})).await.unwrap_err();
		assert!(matches!(err, BrowserError::Cdp { code: -32601, .. }), "unexpected error: {err}");
	}

	#[tokio::test]
	async fn connect_failure_names_the_url() {
		let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
		let addr = listener.local_addr().unwrap();
		drop(listener);

		let err = CdpConnection::connect(&format!("ws://{addr}")).await.err().unwrap();
		assert!(matches!(err, BrowserError::ConnectionFailed { .. }));
	}
}
