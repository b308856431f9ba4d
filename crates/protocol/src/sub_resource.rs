//! Per-call sub-resources: logs, incidents, narratives, units, unit logs.
//!
//! The API does not embed the owning call id in these entries, so every type
//! carries a client-side `call_id` annotation that defaults to `0` and is
//! stamped after fetch via [`CallScoped`].

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::de::null_default;

/// The five sub-resource collections joined to a [`Call`](crate::Call).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubResource {
	Incidents,
	Units,
	UnitLogs,
	Narratives,
	Logs,
}

impl SubResource {
	/// Issue order of the upstream client.
	pub const ALL: [SubResource; 5] = [Self::Incidents, Self::Units, Self::UnitLogs, Self::Narratives, Self::Logs];

	/// Endpoint name under `api/Call/`.
	pub fn endpoint(self) -> &'static str {
		match self {
			Self::Incidents => "GetCallIncidents",
			Self::Units => "GetCallUnits",
			Self::UnitLogs => "GetCallUnitLogs",
			Self::Narratives => "GetCallNarratives",
			Self::Logs => "GetCallLog",
		}
	}

	pub fn as_str(self) -> &'static str {
		match self {
			Self::Incidents => "incidents",
			Self::Units => "units",
			Self::UnitLogs => "unit_logs",
			Self::Narratives => "narratives",
			Self::Logs => "logs",
		}
	}
}

impl fmt::Display for SubResource {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Entries that belong to exactly one call.
pub trait CallScoped {
	fn call_id(&self) -> i64;
	fn set_call_id(&mut self, call_id: i64);

	/// Stamps `call_id` unless the entry already carries one.
	fn stamp_call_id(&mut self, call_id: i64) {
		if self.call_id() == 0 {
			self.set_call_id(call_id);
		}
	}
}

macro_rules! call_scoped {
	($($ty:ty),+ $(,)?) => {
		$(
			impl CallScoped for $ty {
				fn call_id(&self) -> i64 {
					self.call_id
				}

				fn set_call_id(&mut self, call_id: i64) {
					self.call_id = call_id;
				}
			}
		)+
	};
}

call_scoped!(CallLog, Incident, Narrative, Unit, UnitLog);

/// Entry of `Call/GetCallLog`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CallLog {
	#[serde(rename = "call_id", deserialize_with = "null_default")]
	pub call_id: i64,
	#[serde(deserialize_with = "null_default")]
	pub id: String,
	pub log_date_time: Option<String>,
	/// e.g. `"Agency Context Added"`.
	pub action_description: Option<String>,
	pub description: Option<String>,
	pub first_name: Option<String>,
	pub last_name: Option<String>,
	pub machine: Option<String>,
}

/// Entry of `Call/GetCallIncidents`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Incident {
	#[serde(rename = "call_id", deserialize_with = "null_default")]
	pub call_id: i64,
	#[serde(deserialize_with = "null_default")]
	pub id: String,
	pub incident_number: Option<String>,
	pub ori: Option<String>,
	pub department: Option<String>,
	pub abbreviation: Option<String>,
	/// e.g. `"Fire"`.
	pub agency_type: Option<String>,
}

/// Entry of `Call/GetCallNarratives`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Narrative {
	#[serde(rename = "call_id", deserialize_with = "null_default")]
	pub call_id: i64,
	#[serde(deserialize_with = "null_default")]
	pub id: String,
	pub narrative: Option<String>,
	pub entered_date: Option<String>,
	pub first_name: Option<String>,
	pub last_name: Option<String>,
	pub machine: Option<String>,
	/// e.g. `"User Entry"`.
	pub narrative_type: Option<String>,
}

/// Entry of `Call/GetCallUnits`. Empty timestamps mean the unit never
/// reached that state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Unit {
	#[serde(rename = "call_id", deserialize_with = "null_default")]
	pub call_id: i64,
	#[serde(deserialize_with = "null_default")]
	pub id: String,
	pub ori: Option<String>,
	pub unit_number: Option<String>,
	pub dispatch_date_time: Option<String>,
	pub enroute_date_time: Option<String>,
	pub staged_date_time: Option<String>,
	pub at_patient_date_time: Option<String>,
	pub arrive_date_time: Option<String>,
	pub transport_date_time: Option<String>,
	pub at_hospital_date_time: Option<String>,
	pub depart_hospital_date_time: Option<String>,
	pub clear_date_time: Option<String>,
}

/// Entry of `Call/GetCallUnitLogs`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UnitLog {
	#[serde(rename = "call_id", deserialize_with = "null_default")]
	pub call_id: i64,
	#[serde(deserialize_with = "null_default")]
	pub id: String,
	pub log_date_time: Option<String>,
	/// e.g. `"Unit Status Change"`.
	pub action: Option<String>,
	pub description: Option<String>,
	pub unit_number: Option<String>,
	pub status: Option<String>,
	pub first_name: Option<String>,
	pub last_name: Option<String>,
	pub machine: Option<String>,
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn stamping_keeps_existing_call_id() {
		let mut entries: Vec<Unit> = serde_json::from_str(r#"[{"id":"3132121","unitNumber":"FM161"},{"id":"3132122","call_id":7}]"#).unwrap();
		for entry in &mut entries {
			entry.stamp_call_id(591039);
		}
		assert_eq!(entries[0].call_id, 591039);
		assert_eq!(entries[1].call_id, 7);
	}

	#[test]
	fn null_identifiers_decode_as_defaults() {
		let units: Vec<Unit> = serde_json::from_str(r#"[{"id":null,"call_id":null,"unitNumber":"M12"}]"#).unwrap();
		assert_eq!(units[0].id, "");
		assert_eq!(units[0].call_id, 0);
		assert_eq!(units[0].unit_number.as_deref(), Some("M12"));

		let logs: Vec<CallLog> = serde_json::from_str(r#"[{"id":null,"actionDescription":"Call Created"}]"#).unwrap();
		assert_eq!(logs[0].id, "");
		let incidents: Vec<Incident> = serde_json::from_str(r#"[{"id":null}]"#).unwrap();
		assert_eq!(incidents[0].id, "");
		let narratives: Vec<Narrative> = serde_json::from_str(r#"[{"id":null,"narrative":"pt conscious"}]"#).unwrap();
		assert_eq!(narratives[0].narrative.as_deref(), Some("pt conscious"));
		let unit_logs: Vec<UnitLog> = serde_json::from_str(r#"[{"id":null,"status":"AV"}]"#).unwrap();
		assert_eq!(unit_logs[0].id, "");
	}

	#[test]
	fn log_endpoint_is_singular() {
		assert_eq!(SubResource::Logs.endpoint(), "GetCallLog");
		assert_eq!(SubResource::UnitLogs.endpoint(), "GetCallUnitLogs");
	}

	#[test]
	fn serializes_stamp_in_snake_case() {
		let log = CallLog {
			call_id: 12,
			id: "19889617".into(),
			..CallLog::default()
		};
		let value = serde_json::to_value(&log).unwrap();
		assert_eq!(value["call_id"], 12);
		assert_eq!(value["id"], "19889617");
		assert!(value.get("callId").is_none());
	}
}
