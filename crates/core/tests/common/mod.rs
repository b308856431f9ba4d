//! Shared fixtures: a mock CADView API and a scripted browser.
#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use axum::Router;
use axum::extract::{Path, RawQuery, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use cadview::{BrowserFactory, BrowserOptions, Credential, SessionConfig};
use cadview_protocol::{NetworkEvent, RequestId};
use cadview_runtime::{Browser, BrowserError, StorageEntry};
use parking_lot::Mutex;
use serde_json::json;
use tokio::sync::mpsc;

pub const GOOD_TOKEN: &str = "good-token-591039";
pub const CALL_ID: i64 = 591039;

pub fn good_credential() -> Credential {
	Credential {
		token_type: "Bearer".into(),
		access_token: GOOD_TOKEN.into(),
		scope: "openid cadviewapi".into(),
		expires_at: 1_700_000_000,
		..Credential::default()
	}
}

/// Request log and fault switches of the mock API.
#[derive(Default)]
pub struct MockApi {
	hits: AtomicUsize,
	paths: Mutex<Vec<String>>,
	queries: Mutex<HashMap<String, String>>,
	failing: Mutex<HashSet<String>>,
}

impl MockApi {
	pub fn hits(&self) -> usize {
		self.hits.load(Ordering::SeqCst)
	}

	pub fn paths(&self) -> Vec<String> {
		self.paths.lock().clone()
	}

	/// Raw query string of the last request to `endpoint`.
	pub fn query_of(&self, endpoint: &str) -> Option<String> {
		self.queries.lock().get(endpoint).cloned()
	}

	/// Makes `endpoint` (e.g. `GetCallLog`) answer 500.
	pub fn fail(&self, endpoint: &str) {
		self.failing.lock().insert(endpoint.to_string());
	}
}

/// Starts the mock API and returns `(base_url, state)`; the API lives under `{base}/api`.
pub async fn spawn_api() -> (String, Arc<MockApi>) {
	let state = Arc::new(MockApi::default());
	let app = Router::new().route("/cv/api/{*rest}", get(api_handler)).with_state(Arc::clone(&state));
	let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind mock api");
	let addr = listener.local_addr().expect("mock api address");
	tokio::spawn(async move { axum::serve(listener, app).await.expect("mock api server") });
	(format!("http://{addr}/cv"), state)
}

fn json_response(status: StatusCode, body: impl Into<String>) -> Response {
	(status, [(header::CONTENT_TYPE, "application/json; charset=utf-8")], body.into()).into_response()
}

async fn api_handler(State(state): State<Arc<MockApi>>, Path(rest): Path<String>, RawQuery(query): RawQuery, headers: HeaderMap) -> Response {
	state.hits.fetch_add(1, Ordering::SeqCst);
	state.paths.lock().push(rest.clone());
	let endpoint = rest.rsplit('/').next().unwrap_or_default().to_string();
	if let Some(query) = &query {
		state.queries.lock().insert(endpoint.clone(), query.clone());
	}

	let authorized = headers.get(header::AUTHORIZATION).and_then(|v| v.to_str().ok()) == Some(&*format!("Bearer {GOOD_TOKEN}"));
	if !authorized {
		// The upstream serves its login page instead of an auth status.
		return (StatusCode::OK, [(header::CONTENT_TYPE, "text/html")], "<!DOCTYPE html><html>Login</html>").into_response();
	}
	if state.failing.lock().contains(&endpoint) {
		return json_response(StatusCode::INTERNAL_SERVER_ERROR, r#"{"message":"boom"}"#);
	}

	let id: i64 = query
		.as_deref()
		.and_then(|q| q.split('&').find_map(|pair| pair.strip_prefix("id=")))
		.and_then(|id| id.parse().ok())
		.unwrap_or_default();

	let body = match endpoint.as_str() {
		"Ping" | "IsAuthorized" => json!(true),
		"GetOrisForClearedCallSearch" => json!([
			{ "oriId": "28", "value": "07001", "agencyName": "Station 1" },
			{ "oriId": "31", "value": "07002", "agencyName": "Station 2" },
		]),
		"GetActiveCalls" | "SearchClearedCalls" => json!([{ "callId": CALL_ID, "callNumber": 2201, "callStatus": "Dispatched" }]),
		"GetCall" => json!({
			"callId": id,
			"callNumber": 2201,
			"callType": "EMS",
			"location": "100 MAIN ST",
			"createDateTime": "10/13/2022 17:04:05",
			"allowedOri": ["28"],
		}),
		"GetCallIncidents" => json!([{ "id": "i-1", "incidentNumber": "22-001", "ori": "28" }]),
		"GetCallUnits" => json!([{ "id": "u-1", "unitNumber": "M12", "dispatchDateTime": "10/13/2022 17:05:00" }]),
		"GetCallUnitLogs" => json!([{ "id": "ul-1", "unitNumber": "M12", "status": "ENRT" }]),
		"GetCallNarratives" => json!([{ "id": "n-1", "narrative": "caller reports fall" }]),
		"GetCallLog" => json!([{ "id": "l-1", "actionDescription": "Call created" }]),
		"Empty" => return json_response(StatusCode::OK, ""),
		"Markup" => return json_response(StatusCode::OK, "<html>session expired</html>"),
		"Shape" => json!({ "unexpected": ["shape"] }),
		_ => return json_response(StatusCode::NOT_FOUND, "{}"),
	};
	json_response(StatusCode::OK, body.to_string())
}

/// What the scripted browser does during a login.
#[derive(Clone)]
pub struct Script {
	pub dashboard_appears: bool,
	pub storage: Vec<StorageEntry>,
	pub events: Vec<NetworkEvent>,
	/// Sent while local storage is read, right before the login completes.
	pub late_events: Vec<NetworkEvent>,
	pub bodies: HashMap<RequestId, Vec<u8>>,
	pub body_delay: Duration,
	/// Delay before `navigate` returns.
	pub navigate_delay: Duration,
}

impl Default for Script {
	fn default() -> Self {
		Self {
			dashboard_appears: true,
			storage: vec![
				("theme".into(), "dark".into()),
				(
					"oidc.user:https://cad.example/:cadview".into(),
					serde_json::to_string(&good_credential()).expect("credential json"),
				),
			],
			events: Vec::new(),
			late_events: Vec::new(),
			bodies: HashMap::new(),
			body_delay: Duration::ZERO,
			navigate_delay: Duration::ZERO,
		}
	}
}

/// In-memory [`Browser`] that replays a [`Script`] and records every action.
pub struct ScriptedBrowser {
	script: Script,
	dashboard_selector: String,
	actions: Mutex<Vec<String>>,
	events_tx: Mutex<Option<mpsc::UnboundedSender<NetworkEvent>>>,
}

impl ScriptedBrowser {
	pub fn new(script: Script) -> Self {
		Self {
			script,
			dashboard_selector: cadview::LoginSelectors::default().dashboard,
			actions: Mutex::new(Vec::new()),
			events_tx: Mutex::new(None),
		}
	}

	pub fn actions(&self) -> Vec<String> {
		self.actions.lock().clone()
	}

	fn record(&self, action: String) {
		self.actions.lock().push(action);
	}
}

#[async_trait]
impl Browser for ScriptedBrowser {
	async fn navigate(&self, url: &str) -> cadview_runtime::Result<()> {
		self.record(format!("navigate {url}"));
		tokio::time::sleep(self.script.navigate_delay).await;
		Ok(())
	}

	async fn wait_visible(&self, selector: &str, timeout: Duration) -> cadview_runtime::Result<()> {
		self.record(format!("wait {selector}"));
		if selector == self.dashboard_selector && !self.script.dashboard_appears {
			tokio::time::sleep(timeout.min(Duration::from_millis(50))).await;
			return Err(BrowserError::NotVisible {
				selector: selector.to_string(),
				timeout,
			});
		}
		Ok(())
	}

	async fn send_keys(&self, selector: &str, text: &str) -> cadview_runtime::Result<()> {
		self.record(format!("keys {selector} {text}"));
		Ok(())
	}

	async fn submit(&self, selector: &str) -> cadview_runtime::Result<()> {
		self.record(format!("submit {selector}"));
		Ok(())
	}

	async fn local_storage(&self, origin: &str) -> cadview_runtime::Result<Vec<StorageEntry>> {
		self.record(format!("storage {origin}"));
		if let Some(tx) = self.events_tx.lock().as_ref() {
			for event in &self.script.late_events {
				let _ = tx.send(event.clone());
			}
		}
		Ok(self.script.storage.clone())
	}

	async fn response_body(&self, request_id: &RequestId) -> cadview_runtime::Result<Vec<u8>> {
		tokio::time::sleep(self.script.body_delay).await;
		self.script.bodies.get(request_id).cloned().ok_or_else(|| BrowserError::Cdp {
			code: -32000,
			message: format!("No resource with given identifier found: {request_id}"),
		})
	}

	async fn network_events(&self) -> cadview_runtime::Result<mpsc::UnboundedReceiver<NetworkEvent>> {
		let (tx, rx) = mpsc::unbounded_channel();
		for event in &self.script.events {
			let _ = tx.send(event.clone());
		}
		*self.events_tx.lock() = Some(tx);
		Ok(rx)
	}

	async fn close(&self) -> cadview_runtime::Result<()> {
		self.record("close".to_string());
		self.events_tx.lock().take();
		Ok(())
	}
}

/// Hands out scripted browsers and counts logins.
pub struct ScriptedFactory {
	script: Script,
	opened: AtomicUsize,
	last: Mutex<Option<Arc<ScriptedBrowser>>>,
}

impl ScriptedFactory {
	pub fn new(script: Script) -> Arc<Self> {
		Arc::new(Self {
			script,
			opened: AtomicUsize::new(0),
			last: Mutex::new(None),
		})
	}

	pub fn opened(&self) -> usize {
		self.opened.load(Ordering::SeqCst)
	}

	pub fn last_browser(&self) -> Option<Arc<ScriptedBrowser>> {
		self.last.lock().clone()
	}
}

#[async_trait]
impl BrowserFactory for ScriptedFactory {
	async fn open(&self, _options: &BrowserOptions) -> cadview::Result<Arc<dyn Browser>> {
		self.opened.fetch_add(1, Ordering::SeqCst);
		let browser = Arc::new(ScriptedBrowser::new(self.script.clone()));
		*self.last.lock() = Some(Arc::clone(&browser));
		Ok(browser)
	}
}

/// Configuration pointing the login at `https://cad.example/` and the API at `api_base`.
pub fn config(api_base: &str) -> SessionConfig {
	SessionConfig::new("https://cad.example/NewWorld.CadView")
		.expect("login url")
		.with_api_base(api_base)
		.expect("api base")
		.with_credentials("dispatcher", "correct horse")
		.with_fdid("07001")
		.with_login_timeout(Duration::from_secs(5))
}
