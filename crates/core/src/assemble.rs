//! Fan-out of one call into its five sub-resource collections.

use std::collections::BTreeMap;

use cadview_protocol::{Call, CallLog, CallScoped, Incident, Narrative, SubResource, Unit, UnitLog};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use crate::client::ApiClient;
use crate::error::{Error, Result};

/// Result of one sub-resource fetch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SubFetchOutcome {
	Fetched { count: usize },
	Failed { message: String },
}

impl SubFetchOutcome {
	pub fn is_failed(&self) -> bool {
		matches!(self, Self::Failed { .. })
	}
}

/// A call with its (possibly partially populated) sub-resources.
///
/// A failed sub-fetch leaves its collection empty and records the failure
/// in `outcomes`; partial records are an expected result.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompositeRecord {
	pub call: Call,
	pub incidents: Vec<Incident>,
	pub units: Vec<Unit>,
	pub unit_logs: Vec<UnitLog>,
	pub narratives: Vec<Narrative>,
	pub logs: Vec<CallLog>,
	pub outcomes: BTreeMap<SubResource, SubFetchOutcome>,
}

impl CompositeRecord {
	pub fn call_id(&self) -> i64 {
		self.call.call_id
	}

	pub fn outcome(&self, kind: SubResource) -> Option<&SubFetchOutcome> {
		self.outcomes.get(&kind)
	}

	/// Sub-resources whose fetch failed, in issue order.
	pub fn failed(&self) -> Vec<SubResource> {
		SubResource::ALL.into_iter().filter(|kind| self.outcome(*kind).is_some_and(SubFetchOutcome::is_failed)).collect()
	}

	pub fn is_complete(&self) -> bool {
		SubResource::ALL.iter().all(|kind| matches!(self.outcome(*kind), Some(SubFetchOutcome::Fetched { .. })))
	}

	/// Failure of the last sub-fetch in issue order, if that one failed.
	///
	/// This is the single error the upstream client surfaced; the full
	/// picture is in [`outcomes`](Self::outcomes).
	pub fn trailing_error(&self) -> Option<(SubResource, &str)> {
		let last = *SubResource::ALL.last()?;
		match self.outcome(last)? {
			SubFetchOutcome::Failed { message } => Some((last, message.as_str())),
			SubFetchOutcome::Fetched { .. } => None,
		}
	}

	/// Total number of sub-resource entries.
	pub fn entry_count(&self) -> usize {
		self.incidents.len() + self.units.len() + self.unit_logs.len() + self.narratives.len() + self.logs.len()
	}
}

/// Builds [`CompositeRecord`]s through an [`ApiClient`].
#[derive(Clone)]
pub struct RecordAssembler {
	client: ApiClient,
}

impl RecordAssembler {
	pub fn new(client: ApiClient) -> Self {
		Self { client }
	}

	/// Reads call `call_id` and its five sub-resources.
	///
	/// Only the call itself can fail the operation. The sub-fetches run
	/// concurrently and each failure is recorded rather than returned.
	pub async fn fetch_composite(&self, call_id: i64) -> Result<CompositeRecord> {
		if call_id == 0 {
			return Err(Error::InvalidRecord("call id 0 identifies no call".into()));
		}
		let call = self.client.call(call_id).await?;

		let (incidents, units, unit_logs, narratives, logs) = tokio::join!(
			self.collect::<Incident>(SubResource::Incidents, call_id),
			self.collect::<Unit>(SubResource::Units, call_id),
			self.collect::<UnitLog>(SubResource::UnitLogs, call_id),
			self.collect::<Narrative>(SubResource::Narratives, call_id),
			self.collect::<CallLog>(SubResource::Logs, call_id),
		);

		let mut record = CompositeRecord {
			call,
			..CompositeRecord::default()
		};
		record.incidents = record.absorb(SubResource::Incidents, incidents);
		record.units = record.absorb(SubResource::Units, units);
		record.unit_logs = record.absorb(SubResource::UnitLogs, unit_logs);
		record.narratives = record.absorb(SubResource::Narratives, narratives);
		record.logs = record.absorb(SubResource::Logs, logs);

		info!(
			target = "cadview.assemble",
			call_id,
			entries = record.entry_count(),
			failed = record.failed().len(),
			"composite record assembled"
		);
		Ok(record)
	}

	/// Re-reads a listed call in full and assembles it.
	pub async fn fetch_composite_for(&self, call: &Call) -> Result<CompositeRecord> {
		self.fetch_composite(call.call_id).await
	}

	async fn collect<T>(&self, kind: SubResource, call_id: i64) -> Result<Vec<T>>
	where
		T: DeserializeOwned + CallScoped,
	{
		let mut entries: Vec<T> = self.client.sub_resource(kind, call_id).await?;
		for entry in &mut entries {
			entry.stamp_call_id(call_id);
		}
		Ok(entries)
	}
}

impl CompositeRecord {
	fn absorb<T>(&mut self, kind: SubResource, fetched: Result<Vec<T>>) -> Vec<T> {
		match fetched {
			Ok(entries) => {
				self.outcomes.insert(kind, SubFetchOutcome::Fetched { count: entries.len() });
				entries
			}
			Err(err) => {
				debug!(target = "cadview.assemble", call_id = self.call.call_id, sub_resource = %kind, error = %err, "sub-resource fetch failed");
				self.outcomes.insert(kind, SubFetchOutcome::Failed { message: err.to_string() });
				Vec::new()
			}
		}
	}
}
