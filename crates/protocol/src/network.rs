//! Browser network lifecycle events.
//!
//! The browser reports three events per HTTP exchange, in order for a given
//! request id but interleaved across concurrent requests:
//! request-will-be-sent, response-received, loading-finished.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Ephemeral request identifier issued by the browser.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(pub String);

impl RequestId {
	pub fn new(id: impl Into<String>) -> Self {
		Self(id.into())
	}

	pub fn as_str(&self) -> &str {
		&self.0
	}
}

impl fmt::Display for RequestId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

impl From<&str> for RequestId {
	fn from(id: &str) -> Self {
		Self(id.to_string())
	}
}

/// One network lifecycle notification from the browser.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NetworkEvent {
	RequestWillBeSent {
		request_id: RequestId,
		url: String,
	},
	ResponseReceived {
		request_id: RequestId,
		/// Final URL after redirects.
		url: String,
		status: u16,
		headers: BTreeMap<String, String>,
	},
	LoadingFinished {
		request_id: RequestId,
	},
}
