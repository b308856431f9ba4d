//! Primary dispatch call record.

use serde::{Deserialize, Serialize};

use crate::de::null_default;

/// One dispatch call as returned by `Call/GetCall`, `Call/GetActiveCalls`
/// and `Call/SearchClearedCalls`.
///
/// List endpoints return partially populated records; only `Call/GetCall`
/// fills every field. `call_id` is the join key for all sub-resources.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Call {
	#[serde(deserialize_with = "null_default")]
	pub call_id: i64,
	pub call_number: Option<i64>,
	pub call_priority: Option<String>,
	/// Origin of the call, e.g. `"911"`.
	pub call_source: Option<String>,
	pub call_status: Option<String>,
	pub call_type: Option<String>,
	pub call_type_id: Option<i64>,
	pub common_name: Option<String>,
	pub closed_flag: Option<bool>,
	/// `M/D/YYYY HH:MM:SS`, local time of the dispatch center.
	#[serde(rename = "createDateTime")]
	pub created_date_time: Option<String>,
	pub dispatched_date_time: Option<String>,
	pub arrived_date_time: Option<String>,
	pub fire_call_type: Option<String>,
	pub fire_call_type_id: Option<String>,
	pub incident_number: Option<String>,
	pub latitude_y: Option<f64>,
	pub longitude_x: Option<f64>,
	pub location: Option<String>,
	pub nature_of_call: Option<String>,
	pub primary_unit: Option<String>,
	pub quadrant: Option<String>,
	/// Jurisdictions allowed to see this call, e.g. `["04040-561", "04090"]`.
	pub allowed_ori: Option<Vec<String>>,
}

impl Call {
	/// Returns a bare record carrying only its identifier.
	pub fn with_id(call_id: i64) -> Self {
		Self { call_id, ..Self::default() }
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn decodes_upstream_call_with_nulls() {
		let raw = r#"{
			"arrivedDateTime": null,
			"callId": 591039,
			"callNumber": 345,
			"callSource": "911",
			"callType": "Sick Person",
			"callTypeId": 110,
			"closedFlag": false,
			"createDateTime": "11/13/2022 10:25:54",
			"latitudeY": 41.902630758976,
			"longitudeX": -71.9467412712122,
			"location": "120 FREEDLEY RD, Pomfret",
			"allowedOri": ["04040-561", "04090"],
			"district": null,
			"agencyTypes": "Fire"
		}"#;

		let call: Call = serde_json::from_str(raw).unwrap();
		assert_eq!(call.call_id, 591039);
		assert_eq!(call.arrived_date_time, None);
		assert_eq!(call.created_date_time.as_deref(), Some("11/13/2022 10:25:54"));
		assert_eq!(call.call_type_id, Some(110));
		assert_eq!(call.allowed_ori.as_deref(), Some(&["04040-561".to_string(), "04090".to_string()][..]));
	}

	#[test]
	fn missing_identifier_defaults_to_zero() {
		let call: Call = serde_json::from_str(r#"{"callStatus":"Dispatched"}"#).unwrap();
		assert_eq!(call.call_id, 0);
		assert_eq!(call.call_status.as_deref(), Some("Dispatched"));
	}

	#[test]
	fn null_identifier_defaults_to_zero() {
		let calls: Vec<Call> = serde_json::from_str(r#"[{"callId":null,"callType":"EMS"},{"callId":7}]"#).unwrap();
		assert_eq!(calls[0].call_id, 0);
		assert_eq!(calls[0].call_type.as_deref(), Some("EMS"));
		assert_eq!(calls[1].call_id, 7);
	}
}
