mod common;

use std::sync::Arc;

use cadview::{ApiClient, CredentialCell, Error, RecordAssembler, SubFetchOutcome, SubResource};
use common::{CALL_ID, good_credential, spawn_api};
use url::Url;

async fn assembler() -> (RecordAssembler, Arc<common::MockApi>) {
	let (base, api) = spawn_api().await;
	let cell = Arc::new(CredentialCell::new());
	cell.replace(good_credential());
	let client = ApiClient::new(Url::parse(&base).unwrap(), cell).unwrap();
	(RecordAssembler::new(client), api)
}

#[tokio::test]
async fn five_collections_stamped_with_call_id() {
	let (assembler, _api) = assembler().await;
	let record = assembler.fetch_composite(CALL_ID).await.expect("composite");

	assert_eq!(record.call_id(), CALL_ID);
	assert_eq!(record.incidents.len(), 1);
	assert_eq!(record.units.len(), 1);
	assert_eq!(record.unit_logs.len(), 1);
	assert_eq!(record.narratives.len(), 1);
	assert_eq!(record.logs.len(), 1);

	assert_eq!(record.incidents[0].call_id, CALL_ID);
	assert_eq!(record.units[0].call_id, CALL_ID);
	assert_eq!(record.unit_logs[0].call_id, CALL_ID);
	assert_eq!(record.narratives[0].call_id, CALL_ID);
	assert_eq!(record.logs[0].call_id, CALL_ID);

	assert!(record.is_complete());
	assert_eq!(record.trailing_error(), None);
	assert_eq!(record.entry_count(), 5);
}

#[tokio::test]
async fn failing_logs_leave_other_collections_populated() {
	let (assembler, api) = assembler().await;
	api.fail("GetCallLog");

	let record = assembler.fetch_composite(CALL_ID).await.expect("partial composite is still a result");
	assert!(record.logs.is_empty());
	assert_eq!(record.incidents.len(), 1);
	assert_eq!(record.units.len(), 1);
	assert_eq!(record.unit_logs.len(), 1);
	assert_eq!(record.narratives.len(), 1);

	assert_eq!(record.failed(), vec![SubResource::Logs]);
	let (kind, message) = record.trailing_error().expect("logs failed last");
	assert_eq!(kind, SubResource::Logs);
	assert!(message.contains("500"), "{message}");
	assert_eq!(record.outcome(SubResource::Units), Some(&SubFetchOutcome::Fetched { count: 1 }));
}

#[tokio::test]
async fn earlier_failure_is_not_the_trailing_error() {
	let (assembler, api) = assembler().await;
	api.fail("GetCallIncidents");

	let record = assembler.fetch_composite(CALL_ID).await.unwrap();
	assert!(record.incidents.is_empty());
	assert_eq!(record.logs.len(), 1);
	assert_eq!(record.trailing_error(), None);
	assert!(record.outcome(SubResource::Incidents).unwrap().is_failed());
}

#[tokio::test]
async fn call_id_zero_is_rejected_without_network() {
	let (assembler, api) = assembler().await;
	assert!(matches!(assembler.fetch_composite(0).await, Err(Error::InvalidRecord(_))));
	assert_eq!(api.hits(), 0);
}

#[tokio::test]
async fn failing_primary_record_fails_the_composite() {
	let (assembler, api) = assembler().await;
	api.fail("GetCall");
	assert!(matches!(assembler.fetch_composite(CALL_ID).await, Err(Error::Transport { .. })));
	assert_eq!(api.hits(), 1);
}

#[tokio::test]
async fn listed_call_is_reread_in_full() {
	let (assembler, api) = assembler().await;
	let listed = cadview::Call::with_id(CALL_ID);
	let record = assembler.fetch_composite_for(&listed).await.unwrap();
	assert_eq!(record.call.location.as_deref(), Some("100 MAIN ST"));
	assert_eq!(api.hits(), 6);
}
