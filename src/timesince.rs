//! Human readable durations, like "3 days, 2 hours".

use chrono::{DateTime, Utc};


const MINUTE: i64 = 60;
const HOUR: i64 = 60 * MINUTE;
const DAY: i64 = 24 * HOUR;
const WEEK: i64 = 7 * DAY;
const MONTH: i64 = 30 * DAY;
const YEAR: i64 = 365 * DAY;

const CHUNKS: [(i64, &str, &str); 6] = [
	(YEAR, "year", "years"),
	(MONTH, "month", "months"),
	(WEEK, "week", "weeks"),
	(DAY, "day", "days"),
	(HOUR, "hour", "hours"),
	(MINUTE, "minute", "minutes"),
];


fn format_chunk(count: i64, singular: &str, plural: &str) -> String {
	format!("{} {}", count, if count == 1 { singular } else { plural })
}

/// Formats the time between `from` and `now` using the largest unit that fits,
/// followed by the next smaller unit if it is not zero. Spans shorter than a
/// minute, or negative spans, come out as "0 minutes".
pub fn timesince(from: DateTime<Utc>, now: DateTime<Utc>) -> String {
	let since = (now - from).num_seconds();
	if since <= 0 {
		return format_chunk(0, "minute", "minutes");
	}

	let found = CHUNKS
		.iter()
		.enumerate()
		.find(|(_, (seconds, ..))| since / seconds != 0);
	let (i, &(seconds, singular, plural)) = match found {
		Some(f) => f,
		None => return format_chunk(0, "minute", "minutes"),
	};

	let count = since / seconds;
	let mut result = format_chunk(count, singular, plural);
	if let Some(&(seconds2, singular2, plural2)) = CHUNKS.get(i + 1) {
		let count2 = (since - seconds * count) / seconds2;
		if count2 != 0 {
			result.push_str(", ");
			result.push_str(&format_chunk(count2, singular2, plural2));
		}
	}
	result
}


#[cfg(test)]
mod tests {
	use chrono::{Duration, TimeZone};

	use super::*;

	fn since(span: Duration) -> String {
		let now = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
		timesince(now - span, now)
	}

	#[test]
	fn test_single_units() {
		assert_eq!(since(Duration::minutes(1)), "1 minute");
		assert_eq!(since(Duration::minutes(5)), "5 minutes");
		assert_eq!(since(Duration::hours(1)), "1 hour");
		assert_eq!(since(Duration::days(1)), "1 day");
		assert_eq!(since(Duration::weeks(2)), "2 weeks");
		assert_eq!(since(Duration::days(30)), "1 month");
		assert_eq!(since(Duration::days(365)), "1 year");
	}

	#[test]
	fn test_two_adjacent_units() {
		assert_eq!(since(Duration::days(365 + 60)), "1 year, 2 months");
		assert_eq!(since(Duration::hours(26)), "1 day, 2 hours");
		assert_eq!(since(Duration::minutes(61)), "1 hour, 1 minute");
		// Only adjacent units are shown, so the minutes are dropped here.
		assert_eq!(since(Duration::days(1) + Duration::minutes(5)), "1 day");
	}

	#[test]
	fn test_tiny_and_negative_spans() {
		assert_eq!(since(Duration::seconds(30)), "0 minutes");
		assert_eq!(since(Duration::zero()), "0 minutes");
		assert_eq!(since(Duration::minutes(-10)), "0 minutes");
	}
}
