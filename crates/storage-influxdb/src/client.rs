//! The InfluxDB service seam: write, query, delete.
//!
//! [`InfluxApi`] is the opaque backend collaborator the adapter drives.
//! Production uses [`HttpApi`](crate::http::HttpApi); tests inject a mock.
//! The types here mirror the backend's wire model: a [`DataPoint`] going
//! in, [`FluxRecord`]s coming back.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use timeseries_storage::StorageResult;

/// Write/query/delete service against one InfluxDB bucket.
///
/// Implementations are safe for concurrent use once constructed; the
/// adapter holds a single instance for its entire lifetime.
#[async_trait]
pub trait InfluxApi: Send + Sync {
    /// Writes a single point.
    #[must_use = "backend calls may fail and errors must be handled"]
    async fn write_point(&self, point: &DataPoint) -> StorageResult<()>;

    /// Executes a Flux query and returns the flattened result records.
    #[must_use = "backend calls may fail and errors must be handled"]
    async fn query(&self, flux: &str) -> StorageResult<Vec<FluxRecord>>;

    /// Deletes all points matching the predicate, scoped to the configured
    /// bucket and organization.
    #[must_use = "backend calls may fail and errors must be handled"]
    async fn delete(&self, predicate: &str) -> StorageResult<()>;
}

/// A single point to write: measurement, tags, numeric fields, and a
/// millisecond-precision timestamp.
#[derive(Debug, Clone, PartialEq)]
pub struct DataPoint {
    measurement: String,
    tags: BTreeMap<String, String>,
    fields: BTreeMap<String, f64>,
    timestamp_ms: i64,
}

impl DataPoint {
    /// Creates a point for `measurement` at the given epoch-millisecond
    /// timestamp.
    #[must_use]
    pub fn new(measurement: impl Into<String>, timestamp_ms: i64) -> Self {
        Self {
            measurement: measurement.into(),
            tags: BTreeMap::new(),
            fields: BTreeMap::new(),
            timestamp_ms,
        }
    }

    /// Adds a tag. Duplicate keys replace the earlier value.
    #[must_use]
    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    /// Adds a numeric field.
    #[must_use]
    pub fn with_field(mut self, key: impl Into<String>, value: f64) -> Self {
        self.fields.insert(key.into(), value);
        self
    }

    /// Returns the measurement name.
    #[must_use]
    pub fn measurement(&self) -> &str {
        &self.measurement
    }

    /// Returns the tag map.
    #[must_use]
    pub fn tags(&self) -> &BTreeMap<String, String> {
        &self.tags
    }

    /// Returns the field map.
    #[must_use]
    pub fn fields(&self) -> &BTreeMap<String, f64> {
        &self.fields
    }

    /// Returns the timestamp in epoch milliseconds.
    #[must_use]
    pub fn timestamp_ms(&self) -> i64 {
        self.timestamp_ms
    }

    /// Serializes the point to InfluxDB line protocol with millisecond
    /// precision.
    ///
    /// Measurement names escape commas and spaces; tag keys, tag values,
    /// and field keys escape commas, equals signs, and spaces — the
    /// characters the line protocol reserves.
    #[must_use]
    pub fn line_protocol(&self) -> String {
        let mut line = escape_measurement(&self.measurement);
        for (key, value) in &self.tags {
            line.push(',');
            line.push_str(&escape_component(key));
            line.push('=');
            line.push_str(&escape_component(value));
        }
        line.push(' ');
        let fields: Vec<String> = self
            .fields
            .iter()
            .map(|(key, value)| format!("{}={}", escape_component(key), value))
            .collect();
        line.push_str(&fields.join(","));
        line.push(' ');
        line.push_str(&self.timestamp_ms.to_string());
        line
    }
}

fn escape_measurement(name: &str) -> String {
    name.replace(',', "\\,").replace(' ', "\\ ")
}

fn escape_component(component: &str) -> String {
    component.replace(',', "\\,").replace('=', "\\=").replace(' ', "\\ ")
}

/// One flattened result record from a Flux query.
///
/// Exposes the record's generic column/value map plus distinguished
/// accessors for the `_time` and `_value` columns, pre-parsed into their
/// natural types when present and well-formed.
#[derive(Debug, Clone, PartialEq)]
pub struct FluxRecord {
    values: BTreeMap<String, String>,
    time: Option<DateTime<Utc>>,
    value: Option<f64>,
}

impl FluxRecord {
    /// Builds a record from a raw column/value map, deriving the `_time`
    /// and `_value` accessors from the corresponding columns.
    #[must_use]
    pub fn from_values(values: BTreeMap<String, String>) -> Self {
        let time = values
            .get("_time")
            .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
            .map(|parsed| parsed.with_timezone(&Utc));
        let value = values.get("_value").and_then(|raw| raw.parse::<f64>().ok());
        Self { values, time, value }
    }

    /// Returns the full column/value map.
    #[must_use]
    pub fn values(&self) -> &BTreeMap<String, String> {
        &self.values
    }

    /// Returns the record timestamp, if the `_time` column is present and
    /// parseable.
    #[must_use]
    pub fn time(&self) -> Option<DateTime<Utc>> {
        self.time
    }

    /// Returns the record's numeric value, if the `_value` column is
    /// present and parseable.
    #[must_use]
    pub fn value(&self) -> Option<f64> {
        self.value
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn line_protocol_shape() {
        let point = DataPoint::new("node1.cpu", 1_700_000_000_123)
            .with_tag("intrinsic_resourceId", "r1")
            .with_field("value", 42.0);
        assert_eq!(
            point.line_protocol(),
            "node1.cpu,intrinsic_resourceId=r1 value=42 1700000000123"
        );
    }

    #[test]
    fn line_protocol_escapes_reserved_characters() {
        let point = DataPoint::new("my measurement,x", 0)
            .with_tag("a key", "v=1,2")
            .with_field("value", 1.5);
        assert_eq!(
            point.line_protocol(),
            "my\\ measurement\\,x,a\\ key=v\\=1\\,2 value=1.5 0"
        );
    }

    #[test]
    fn line_protocol_multiple_fields_sorted() {
        let point = DataPoint::new("m", 7).with_field("b", 2.0).with_field("a", 1.0);
        assert_eq!(point.line_protocol(), "m a=1,b=2 7");
    }

    #[test]
    fn record_derives_time_and_value() {
        let mut values = BTreeMap::new();
        values.insert("_time".to_owned(), "2024-05-01T12:00:00.250Z".to_owned());
        values.insert("_value".to_owned(), "42.5".to_owned());
        values.insert("_measurement".to_owned(), "node1.cpu".to_owned());

        let record = FluxRecord::from_values(values);
        assert_eq!(record.value(), Some(42.5));
        let time = record.time().unwrap();
        assert_eq!(time.timestamp_millis(), 1_714_564_800_250);
    }

    #[test]
    fn record_tolerates_missing_or_malformed_columns() {
        let mut values = BTreeMap::new();
        values.insert("_value".to_owned(), "not-a-number".to_owned());
        let record = FluxRecord::from_values(values);
        assert_eq!(record.time(), None);
        assert_eq!(record.value(), None);
    }
}
