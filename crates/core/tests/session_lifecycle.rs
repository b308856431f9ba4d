mod common;

use std::time::Duration;

use cadview::{Error, Session, SessionState};
use common::{CALL_ID, Script, ScriptedFactory, config, good_credential, spawn_api};

#[tokio::test]
async fn second_initialize_is_rejected_and_keeps_state() {
	let (base, _api) = spawn_api().await;
	let factory = ScriptedFactory::new(Script::default());
	let session = Session::with_browser_factory(config(&base), factory.clone()).unwrap();

	assert_eq!(session.state(), SessionState::Uninitialized);
	session.initialize().await.expect("first initialize");
	assert_eq!(session.state(), SessionState::Ready);
	let first = session.credential().expect("credential after login");

	assert!(matches!(session.initialize().await, Err(Error::AlreadyInitialized)));
	assert_eq!(session.state(), SessionState::Ready);
	assert!(std::sync::Arc::ptr_eq(&first, &session.credential().unwrap()));
	assert_eq!(factory.opened(), 1);

	let browser = factory.last_browser().unwrap();
	assert_eq!(browser.actions().last().map(String::as_str), Some("close"));
	assert!(session.traffic().is_some());
}

#[tokio::test]
async fn entry_points_initialize_once_on_first_use() {
	let (base, _api) = spawn_api().await;
	let factory = ScriptedFactory::new(Script::default());
	let session = Session::with_browser_factory(config(&base), factory.clone()).unwrap();

	let calls = session.active_calls().await.expect("active calls");
	assert_eq!(calls[0].call_id, CALL_ID);
	assert!(session.ping().await.unwrap());
	let record = session.fetch_composite(CALL_ID).await.unwrap();
	assert!(record.is_complete());
	assert_eq!(session.configured_ori().await.unwrap().as_deref(), Some("28"));

	assert_eq!(factory.opened(), 1);
}

#[tokio::test]
async fn concurrent_first_use_shares_one_login() {
	let (base, _api) = spawn_api().await;
	let factory = ScriptedFactory::new(Script::default());
	let session = Session::with_browser_factory(config(&base), factory.clone()).unwrap();

	let (a, b, c) = tokio::join!(session.active_calls(), session.oris(), session.ping());
	a.unwrap();
	b.unwrap();
	c.unwrap();
	assert_eq!(factory.opened(), 1);
}

#[tokio::test]
async fn failed_login_returns_to_uninitialized() {
	let (base, _api) = spawn_api().await;
	let factory = ScriptedFactory::new(Script {
		dashboard_appears: false,
		..Script::default()
	});
	let session = Session::with_browser_factory(config(&base), factory.clone()).unwrap();

	assert!(matches!(session.initialize().await, Err(Error::LoginFlow { .. })));
	assert_eq!(session.state(), SessionState::Uninitialized);
	assert!(session.credential().is_none());

	// Retrying is allowed after a failure.
	assert!(matches!(session.active_calls().await, Err(Error::LoginFlow { .. })));
	assert_eq!(factory.opened(), 2);
}

#[tokio::test]
async fn transplanted_credential_serves_a_browserless_session() {
	let (base, api) = spawn_api().await;
	let factory = ScriptedFactory::new(Script::default());
	let primary = Session::with_browser_factory(config(&base), factory.clone()).unwrap();
	primary.initialize().await.unwrap();

	let secondary = primary.make_copy();
	assert_eq!(secondary.state(), SessionState::Uninitialized);
	assert!(secondary.credential().is_none());
	assert_eq!(secondary.config().username(), "dispatcher");

	secondary.transfer_credential_from(&primary).expect("hand-off");
	assert_eq!(secondary.state(), SessionState::Ready);

	let hits_before = api.hits();
	let calls = secondary.active_calls().await.expect("secondary can call the API");
	assert_eq!(calls.len(), 1);
	assert_eq!(api.hits(), hits_before + 1);
	assert_eq!(factory.opened(), 1, "secondary never drives a browser");
}

#[tokio::test]
async fn handoff_from_unauthenticated_session_fails() {
	let (base, _api) = spawn_api().await;
	let factory = ScriptedFactory::new(Script::default());
	let empty = Session::with_browser_factory(config(&base), factory.clone()).unwrap();
	let other = empty.make_copy();
	assert!(matches!(other.transfer_credential_from(&empty), Err(Error::Unauthenticated)));
	assert_eq!(other.state(), SessionState::Uninitialized);
}

#[tokio::test]
async fn composite_of_call_zero_needs_no_login() {
	let (base, api) = spawn_api().await;
	let factory = ScriptedFactory::new(Script::default());
	let session = Session::with_browser_factory(config(&base), factory.clone()).unwrap();

	assert!(matches!(session.fetch_composite(0).await, Err(Error::InvalidRecord(_))));
	assert_eq!(api.hits(), 0);
	assert_eq!(factory.opened(), 0);
}

#[tokio::test]
async fn cancelled_session_refuses_work() {
	let (base, _api) = spawn_api().await;
	let factory = ScriptedFactory::new(Script::default());
	let session = Session::with_browser_factory(config(&base), factory.clone()).unwrap();
	session.set_credential(good_credential()).unwrap();

	let mut status = session.start_liveness(Some(Duration::from_millis(10))).await.unwrap();
	tokio::time::timeout(Duration::from_secs(5), status.wait_for(|s| s.is_alive()))
		.await
		.expect("liveness reports")
		.unwrap();

	session.cancel();
	assert_eq!(session.state(), SessionState::Cancelled);
	assert!(matches!(session.active_calls().await, Err(Error::Cancelled)));
	assert!(matches!(session.set_credential(good_credential()), Err(Error::Cancelled)));

	tokio::time::timeout(Duration::from_secs(5), status.wait_for(|s| *s == cadview::LivenessStatus::Stopped))
		.await
		.expect("liveness stops on cancel")
		.unwrap();
	assert_eq!(factory.opened(), 0);
}

#[tokio::test]
async fn login_without_credentials_is_a_config_error() {
	let (base, _api) = spawn_api().await;
	let factory = ScriptedFactory::new(Script::default());
	let config = cadview::SessionConfig::new("https://cad.example/").unwrap().with_api_base(&base).unwrap();
	let session = Session::with_browser_factory(config, factory.clone()).unwrap();
	assert!(matches!(session.initialize().await, Err(Error::Config(_))));
	assert_eq!(factory.opened(), 0);
	assert_eq!(session.state(), SessionState::Uninitialized);
}

#[tokio::test]
async fn login_barrier_covers_events_delivered_with_local_storage() {
	use std::collections::{BTreeMap, HashMap};

	use cadview_protocol::{NetworkEvent, RequestId};

	let settings = "https://cad.example/NewWorld.CadView/api/CadView/GetAllUserSettings";
	let id = RequestId::from("41.7");
	let factory = ScriptedFactory::new(Script {
		late_events: vec![
			NetworkEvent::RequestWillBeSent {
				request_id: id.clone(),
				url: settings.to_string(),
			},
			NetworkEvent::ResponseReceived {
				request_id: id.clone(),
				url: settings.to_string(),
				status: 200,
				headers: BTreeMap::new(),
			},
			NetworkEvent::LoadingFinished { request_id: id.clone() },
		],
		bodies: HashMap::from([(id.clone(), br#"{"pageSize":50}"#.to_vec())]),
		body_delay: Duration::from_millis(20),
		..Script::default()
	});
	let (base, _api) = spawn_api().await;
	let session = Session::with_browser_factory(config(&base), factory).unwrap();

	session.initialize().await.expect("login");

	let traffic = session.traffic().expect("traffic recorded");
	assert_eq!(traffic.body(settings).as_deref(), Some(&br#"{"pageSize":50}"#[..]));
	assert_eq!(traffic.exchange_count(), 1);
	assert_eq!(traffic.in_flight(), 0);
}
