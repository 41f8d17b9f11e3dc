//! Flux query construction.
//!
//! Builds the literal query and delete-predicate strings sent to InfluxDB.
//! All functions interpolate identifiers directly, so every identifier
//! argument must already be encoded via [`crate::codec`] — the codec is the
//! only safety net against malformed queries, and nothing here re-encodes.

use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};

/// The single field name under which sample values are stored.
pub const VALUE_FIELD: &str = "value";

/// Lookback window for catalog discovery scans.
///
/// Bounded on purpose: an unbounded scan over all history is the most
/// expensive query this adapter can issue, and five years covers any
/// retention period the backend is realistically configured with.
const SCAN_LOOKBACK: &str = "-5y";

/// Minimum downsampling step that maps to a server-side aggregate window.
const MIN_STEP: Duration = Duration::from_secs(1);

/// Builds the catalog-discovery query.
///
/// Enumerates the distinct tag-key sets per measurement over the fixed
/// lookback window. The result rows carry each series' group key, which is
/// what the catalog decodes metrics from.
#[must_use]
pub fn scan_query(bucket: &str) -> String {
    format!(
        "from(bucket:\"{bucket}\")\n  |> range(start:{SCAN_LOOKBACK})\n  |> keys()"
    )
}

/// Builds a sample-retrieval query for one measurement over `[start, end)`.
///
/// Selects only the [`VALUE_FIELD`] column. Timestamps are serialized as
/// RFC 3339 UTC with millisecond precision, the fixed textual format
/// InfluxDB's `range` filter expects.
///
/// A `step` of at least one second appends an `aggregateWindow` stage that
/// downsamples server-side using the mean; smaller steps (including zero)
/// return raw samples.
#[must_use]
pub fn range_query(
    bucket: &str,
    measurement: &str,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    step: Duration,
) -> String {
    let mut query = format!(
        "from(bucket:\"{bucket}\")\n  |> range(start:{start}, stop:{stop})\n  \
         |> filter(fn:(r) => r._measurement == \"{measurement}\")\n  \
         |> filter(fn: (r) => r._field == \"{VALUE_FIELD}\")",
        start = format_timestamp(start),
        stop = format_timestamp(end),
    );
    if step >= MIN_STEP {
        query.push_str(&format!(
            "\n  |> aggregateWindow(every: {}s, fn: mean, createEmpty: false)",
            step.as_secs()
        ));
    }
    query
}

/// Builds the delete predicate for one measurement.
///
/// Bucket and organization scoping happen at the call site; the predicate
/// itself is a plain equality on the measurement name.
#[must_use]
pub fn delete_predicate(measurement: &str) -> String {
    format!("_measurement=\"{measurement}\"")
}

fn format_timestamp(time: DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    #[test]
    fn scan_query_is_bounded_and_enumerates_keys() {
        let query = scan_query("metrics");
        assert_eq!(
            query,
            "from(bucket:\"metrics\")\n  |> range(start:-5y)\n  |> keys()"
        );
    }

    #[test]
    fn range_query_selects_value_field_in_utc() {
        let query = range_query("metrics", "node1.cpu", at(1_000), at(2_000), Duration::ZERO);
        assert_eq!(
            query,
            "from(bucket:\"metrics\")\n  \
             |> range(start:1970-01-01T00:16:40.000Z, stop:1970-01-01T00:33:20.000Z)\n  \
             |> filter(fn:(r) => r._measurement == \"node1.cpu\")\n  \
             |> filter(fn: (r) => r._field == \"value\")"
        );
    }

    #[test]
    fn range_query_preserves_millisecond_precision() {
        let start = Utc.timestamp_millis_opt(1_500).unwrap();
        let query = range_query("b", "m", start, at(2), Duration::ZERO);
        assert!(query.contains("start:1970-01-01T00:00:01.500Z"), "{query}");
    }

    #[test]
    fn step_of_a_second_or_more_adds_aggregate_window() {
        let query = range_query("b", "m", at(0), at(10), Duration::from_secs(30));
        assert!(
            query.ends_with("|> aggregateWindow(every: 30s, fn: mean, createEmpty: false)"),
            "{query}"
        );
    }

    #[test]
    fn sub_second_step_returns_raw_samples() {
        let query = range_query("b", "m", at(0), at(10), Duration::from_millis(500));
        assert!(!query.contains("aggregateWindow"));
    }

    #[test]
    fn delete_predicate_is_measurement_equality() {
        assert_eq!(delete_predicate("node1.cpu"), "_measurement=\"node1.cpu\"");
    }
}
