//! Jurisdiction (ORI) lookup entries.

use serde::{Deserialize, Serialize};

use crate::de::null_default;

/// One entry of `CadView/GetOrisForClearedCallSearch`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Ori {
	/// Internal ORI used as the cleared-call search filter, e.g. `"26"`.
	#[serde(rename = "oriId", deserialize_with = "null_default")]
	pub ori: String,
	/// Locally-known agency code (FDID), e.g. `"04040"`.
	#[serde(rename = "value", deserialize_with = "null_default")]
	pub fdid: String,
	pub agency_name: Option<String>,
}

/// Resolves the search ORI for a locally-known agency code.
pub fn fdid_to_ori<'a>(oris: &'a [Ori], fdid: &str) -> Option<&'a str> {
	oris.iter().find(|entry| entry.fdid == fdid).map(|entry| entry.ori.as_str())
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn resolves_fdid() {
		let oris: Vec<Ori> = serde_json::from_str(
			r#"[
				{"oriId": "26", "value": "04040", "agencyName": "Urban Renewal Technician Team"},
				{"oriId": "28", "value": "04042", "agencyName": null},
				{"oriId": null, "value": null}
			]"#,
		)
		.unwrap();

		assert_eq!(fdid_to_ori(&oris, "04042"), Some("28"));
		assert_eq!(fdid_to_ori(&oris, "99999"), None);
		assert_eq!(oris[1].agency_name, None);
		assert_eq!(oris[2], Ori::default());
	}
}
