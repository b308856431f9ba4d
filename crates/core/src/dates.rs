//! Date formats spoken by the CADView API.

use chrono::{NaiveDateTime, ParseResult};

/// Search parameter format: `10/13/2022,12:00:00 AM`.
pub const SEARCH_DATE_FORMAT: &str = "%-m/%-d/%Y,%I:%M:%S %p";

/// Timestamp format inside records: `10/13/2022 17:04:05`.
pub const RECORD_DATE_FORMAT: &str = "%m/%d/%Y %H:%M:%S";

/// Renders a bound of a cleared-call search.
pub fn format_search_date(at: NaiveDateTime) -> String {
	at.format(SEARCH_DATE_FORMAT).to_string()
}

/// Parses a record timestamp. Month and day may omit their leading zero.
pub fn parse_record_date(raw: &str) -> ParseResult<NaiveDateTime> {
	NaiveDateTime::parse_from_str(raw.trim(), RECORD_DATE_FORMAT)
}
