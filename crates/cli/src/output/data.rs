use std::path::PathBuf;

use cadview::{Call, CompositeRecord, Credential, LivenessStatus, Ori};
use serde::Serialize;

/// Result data for the login command.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginData {
	pub token_type: String,
	/// Tail of the access token; the full token is only shown with `--reveal`.
	pub token: String,
	pub scope: String,
	pub expires_at: i64,
	pub auth_time: i64,
	pub subject: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub credential: Option<Credential>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub saved_to: Option<PathBuf>,
	pub observed_urls: usize,
}

/// Result data for call listings.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CallsData {
	pub count: usize,
	pub calls: Vec<Call>,
}

/// Result data for listings assembled with `--details`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordsData {
	pub count: usize,
	pub records: Vec<CompositeRecord>,
}

/// Result data for the oris command.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrisData {
	pub oris: Vec<Ori>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub fdid: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub resolved_ori: Option<String>,
}

/// Result data for the ping command.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PingData {
	pub alive: bool,
	pub authorized: bool,
}

/// Final result of the watch command.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WatchData {
	pub updates: usize,
	pub last_status: LivenessStatus,
}
