//! Decoding helpers for the API's loose JSON.

use serde::{Deserialize, Deserializer};

/// Decodes `null` as the field's default. Pair with `#[serde(default)]` so a
/// missing key decodes the same way.
pub(crate) fn null_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
	D: Deserializer<'de>,
	T: Default + Deserialize<'de>,
{
	Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}
