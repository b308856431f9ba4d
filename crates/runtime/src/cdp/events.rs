//! Mapping of raw `Network.*` CDP events to [`NetworkEvent`].

use std::collections::BTreeMap;

use cadview_protocol::{NetworkEvent, RequestId};
use serde::Deserialize;
use serde_json::Value;

use super::connection::CdpEvent;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RequestWillBeSent {
	request_id: RequestId,
	request: RequestInfo,
}

#[derive(Deserialize)]
struct RequestInfo {
	url: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResponseReceived {
	request_id: RequestId,
	response: ResponseInfo,
}

#[derive(Deserialize)]
struct ResponseInfo {
	url: String,
	status: f64,
	#[serde(default)]
	headers: serde_json::Map<String, Value>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LoadingFinished {
	request_id: RequestId,
}

/// Converts a DevTools event into a [`NetworkEvent`].
///
/// Returns `None` for events outside the three tracked kinds and for
/// payloads that do not match the expected shape.
pub fn network_event(event: &CdpEvent) -> Option<NetworkEvent> {
	let params = event.params.clone();
	match event.method.as_str() {
		"Network.requestWillBeSent" => {
			let sent: RequestWillBeSent = serde_json::from_value(params).ok()?;
			Some(NetworkEvent::RequestWillBeSent {
				request_id: sent.request_id,
				url: sent.request.url,
			})
		}
		"Network.responseReceived" => {
			let received: ResponseReceived = serde_json::from_value(params).ok()?;
			let headers: BTreeMap<String, String> = received
				.response
				.headers
				.into_iter()
				.map(|(name, value)| {
					let value = match value {
						Value::String(s) => s,
						other => other.to_string(),
					};
					(name, value)
				})
				.collect();
			Some(NetworkEvent::ResponseReceived {
				request_id: received.request_id,
				url: received.response.url,
				status: received.response.status as u16,
				headers,
			})
		}
		"Network.loadingFinished" => {
			let finished: LoadingFinished = serde_json::from_value(params).ok()?;
			Some(NetworkEvent::LoadingFinished { request_id: finished.request_id })
		}
		_ => None,
	}
}
