//! OIDC session credential stored by the web client under `oidc.user:*`.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Local storage key prefix of the serialized OIDC user object.
pub const OIDC_STORAGE_PREFIX: &str = "oidc.user:";

/// Bearer credential harvested from the browser's local storage.
///
/// The value is treated as an immutable snapshot: a new login produces a new
/// `Credential`, it is never edited in place.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Credential {
	pub id_token: String,
	pub session_state: String,
	pub access_token: String,
	pub token_type: String,
	pub scope: String,
	/// Expiry as unix seconds.
	pub expires_at: i64,
	pub profile: CredentialProfile,
}

/// Identity claims embedded in the OIDC user object.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CredentialProfile {
	/// Unix seconds of the interactive authentication.
	pub auth_time: i64,
	pub idp: String,
	pub s_hash: String,
	pub sid: String,
	pub sub: String,
}

impl Credential {
	/// Decodes the JSON value of an `oidc.user:*` storage entry.
	pub fn from_storage_value(value: &str) -> serde_json::Result<Self> {
		serde_json::from_str(value)
	}

	/// Whether both halves of the `Authorization` header are present.
	pub fn is_usable(&self) -> bool {
		!self.token_type.trim().is_empty() && !self.access_token.trim().is_empty()
	}

	/// Value of the `Authorization` header: `<token_type> <access_token>`.
	pub fn authorization_value(&self) -> String {
		format!("{} {}", self.token_type, self.access_token)
	}

	/// Whether the credential has expired at `now` (unix seconds).
	///
	/// A zero `expires_at` means the storage entry carried no expiry.
	pub fn is_expired_at(&self, now: i64) -> bool {
		self.expires_at != 0 && self.expires_at <= now
	}

	/// Short, non-reversible label of the access token for log lines.
	pub fn fingerprint(&self) -> String {
		let tail: String = self.access_token.chars().rev().take(6).collect::<Vec<_>>().into_iter().rev().collect();
		format!("…{tail}")
	}
}

impl fmt::Debug for Credential {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Credential")
			.field("token_type", &self.token_type)
			.field("access_token", &self.fingerprint())
			.field("scope", &self.scope)
			.field("expires_at", &self.expires_at)
			.field("profile", &self.profile)
			.finish_non_exhaustive()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	const STORAGE_VALUE: &str = r#"{
		"id_token": "eyJhbGciOi.id",
		"session_state": "abc.def",
		"access_token": "eyJhbGciOi.access.token123456",
		"token_type": "Bearer",
		"scope": "openid cadviewapi.consumer",
		"expires_at": 1668358000,
		"profile": { "auth_time": 1668357100, "idp": "local", "sid": "S1", "sub": "42" }
	}"#;

	#[test]
	fn decodes_storage_entry() {
		let credential = Credential::from_storage_value(STORAGE_VALUE).unwrap();
		assert!(credential.is_usable());
		assert_eq!(credential.authorization_value(), "Bearer eyJhbGciOi.access.token123456");
		assert_eq!(credential.profile.auth_time, 1668357100);
		assert_eq!(credential.profile.sub, "42");
		assert_eq!(credential.profile.s_hash, "");
	}

	#[test]
	fn debug_output_hides_token() {
		let credential = Credential::from_storage_value(STORAGE_VALUE).unwrap();
		let debug = format!("{credential:?}");
		assert!(!debug.contains("eyJhbGciOi.access"));
		assert!(debug.contains("123456"));
	}

	#[test]
	fn expiry_checks() {
		let credential = Credential {
			expires_at: 100,
			..Credential::default()
		};
		assert!(!credential.is_expired_at(99));
		assert!(credential.is_expired_at(100));
		assert!(!Credential::default().is_expired_at(i64::MAX));
	}

	#[test]
	fn empty_token_is_not_usable() {
		let credential = Credential {
			token_type: "Bearer".into(),
			..Credential::default()
		};
		assert!(!credential.is_usable());
	}
}
