//! Remote-control contract for the login browser.

use std::time::Duration;

use async_trait::async_trait;
use cadview_protocol::{NetworkEvent, RequestId};
use tokio::sync::mpsc;

use crate::error::Result;

/// One `(key, value)` pair of an origin's local storage, in browser order.
pub type StorageEntry = (String, String);

/// The operations the login flow needs from a browser.
///
/// Selectors are XPath expressions. Implementations must be shareable across
/// tasks: network body fetches run concurrently with the login steps.
#[async_trait]
pub trait Browser: Send + Sync {
	/// Starts navigation to `url`. Does not wait for the load event.
	async fn navigate(&self, url: &str) -> Result<()>;

	/// Polls until `selector` matches a visible element or `timeout` elapses.
	async fn wait_visible(&self, selector: &str, timeout: Duration) -> Result<()>;

	/// Focuses `selector` and types `text` into it.
	async fn send_keys(&self, selector: &str, text: &str) -> Result<()>;

	/// Submits the form owning `selector`.
	async fn submit(&self, selector: &str) -> Result<()>;

	/// Reads every local storage entry of `origin` (e.g. `https://host/`).
	async fn local_storage(&self, origin: &str) -> Result<Vec<StorageEntry>>;

	/// Fetches the response body of a finished request.
	async fn response_body(&self, request_id: &RequestId) -> Result<Vec<u8>>;

	/// Subscribes to network lifecycle events from now on.
	async fn network_events(&self) -> Result<mpsc::UnboundedReceiver<NetworkEvent>>;

	/// Releases the browser. Owned browser processes are terminated.
	async fn close(&self) -> Result<()>;
}
