//! Core data model: metrics, tags, samples, and fetch requests.
//!
//! A [`Metric`] is identified by an opaque string key and owns two disjoint
//! tag sets: *intrinsic* tags describe the metric's identity, *meta* tags
//! carry auxiliary metadata. Within each set, tag keys are unique. Metrics
//! are immutable once built — construct them with [`Metric::builder`] or
//! let a backend reconstruct them from stored records.

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A `(key, value)` string pair attached to a [`Metric`].
///
/// Tag keys must be non-empty. Whether a tag is intrinsic or meta is not a
/// property of the tag itself but of the set it lives in on the metric.
#[derive(
    Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct Tag {
    key: String,
    value: String,
}

impl Tag {
    /// Creates a new tag.
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self { key: key.into(), value: value.into() }
    }

    /// Returns the tag key.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Returns the tag value.
    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }
}

/// An immutable metric: an opaque key plus intrinsic and meta tag sets.
///
/// Equality, ordering, and hashing cover the key and both tag sets, so two
/// independently decoded copies of the same metric compare equal and
/// deduplicate in set containers.
///
/// # Example
///
/// ```
/// use timeseries_storage::{Metric, Tag};
///
/// let metric = Metric::builder("node1.cpu")
///     .tag("resourceId", "r1")
///     .meta_tag("unit", "percent")
///     .build();
///
/// assert_eq!(metric.key(), "node1.cpu");
/// assert!(metric.matches(&[Tag::new("resourceId", "r1")]));
/// assert!(metric.matches(&[Tag::new("unit", "percent")]));
/// assert!(!metric.matches(&[Tag::new("resourceId", "other")]));
/// ```
#[derive(
    Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct Metric {
    key: String,
    tags: BTreeMap<String, String>,
    meta_tags: BTreeMap<String, String>,
}

impl Metric {
    /// Starts building a metric with the given key.
    #[must_use]
    pub fn builder(key: impl Into<String>) -> MetricBuilder {
        MetricBuilder {
            key: key.into(),
            tags: BTreeMap::new(),
            meta_tags: BTreeMap::new(),
        }
    }

    /// Returns the metric key.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Returns the intrinsic (identity) tags, keyed by tag key.
    #[must_use]
    pub fn tags(&self) -> &BTreeMap<String, String> {
        &self.tags
    }

    /// Returns the meta (auxiliary) tags, keyed by tag key.
    #[must_use]
    pub fn meta_tags(&self) -> &BTreeMap<String, String> {
        &self.meta_tags
    }

    /// Returns true if the tag appears, by exact key and value match, in
    /// either the intrinsic or the meta tag set.
    #[must_use]
    pub fn has_tag(&self, tag: &Tag) -> bool {
        self.tags.get(tag.key()).map(String::as_str) == Some(tag.value())
            || self.meta_tags.get(tag.key()).map(String::as_str) == Some(tag.value())
    }

    /// Returns true if every tag in `filter` appears in either tag set.
    ///
    /// An empty filter matches every metric.
    #[must_use]
    pub fn matches(&self, filter: &[Tag]) -> bool {
        filter.iter().all(|tag| self.has_tag(tag))
    }
}

/// Builder for [`Metric`].
///
/// Within a set, inserting a duplicate tag key replaces the earlier value;
/// the uniqueness invariant holds structurally.
#[derive(Debug)]
pub struct MetricBuilder {
    key: String,
    tags: BTreeMap<String, String>,
    meta_tags: BTreeMap<String, String>,
}

impl MetricBuilder {
    /// Adds an intrinsic tag.
    #[must_use]
    pub fn tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    /// Adds a meta tag.
    #[must_use]
    pub fn meta_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.meta_tags.insert(key.into(), value.into());
        self
    }

    /// Builds the metric.
    #[must_use]
    pub fn build(self) -> Metric {
        Metric { key: self.key, tags: self.tags, meta_tags: self.meta_tags }
    }
}

/// A single numeric observation: a metric, a timestamp, and a value.
///
/// Timestamps carry millisecond resolution end to end. Immutable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    metric: Metric,
    time: DateTime<Utc>,
    value: f64,
}

impl Sample {
    /// Creates a new sample.
    #[must_use]
    pub fn new(metric: Metric, time: DateTime<Utc>, value: f64) -> Self {
        Self { metric, time, value }
    }

    /// Returns the metric this sample belongs to.
    #[must_use]
    pub fn metric(&self) -> &Metric {
        &self.metric
    }

    /// Returns the sample timestamp.
    #[must_use]
    pub fn time(&self) -> DateTime<Utc> {
        self.time
    }

    /// Returns the sample value.
    #[must_use]
    pub fn value(&self) -> f64 {
        self.value
    }
}

/// A request for samples of one metric over a half-open time range
/// `[start, end)`.
///
/// `step` requests server-side downsampling: backends aggregate samples
/// into windows of this width (mean) when the step is at least one second.
/// A zero step (the default) returns raw samples.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FetchRequest {
    metric: Metric,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    #[serde(default)]
    step: Duration,
}

impl FetchRequest {
    /// Creates a request for raw samples over `[start, end)`.
    #[must_use]
    pub fn new(metric: Metric, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { metric, start, end, step: Duration::ZERO }
    }

    /// Sets the downsampling step.
    #[must_use]
    pub fn with_step(mut self, step: Duration) -> Self {
        self.step = step;
        self
    }

    /// Returns the requested metric.
    #[must_use]
    pub fn metric(&self) -> &Metric {
        &self.metric
    }

    /// Returns the inclusive start of the range.
    #[must_use]
    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    /// Returns the exclusive end of the range.
    #[must_use]
    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    /// Returns the downsampling step.
    #[must_use]
    pub fn step(&self) -> Duration {
        self.step
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_tag_key_last_wins() {
        let metric = Metric::builder("m").tag("a", "1").tag("a", "2").build();
        assert_eq!(metric.tags().get("a").map(String::as_str), Some("2"));
        assert_eq!(metric.tags().len(), 1);
    }

    #[test]
    fn same_key_different_classification_is_distinguishable() {
        let metric = Metric::builder("m").tag("a", "1").meta_tag("a", "2").build();
        assert_eq!(metric.tags().get("a").map(String::as_str), Some("1"));
        assert_eq!(metric.meta_tags().get("a").map(String::as_str), Some("2"));
        // Lookup by (key, value) finds each in its own set.
        assert!(metric.has_tag(&Tag::new("a", "1")));
        assert!(metric.has_tag(&Tag::new("a", "2")));
    }

    #[test]
    fn empty_filter_matches() {
        let metric = Metric::builder("m").build();
        assert!(metric.matches(&[]));
    }

    #[test]
    fn decoded_duplicates_compare_equal() {
        let a = Metric::builder("m").tag("x", "1").meta_tag("y", "2").build();
        let b = Metric::builder("m").meta_tag("y", "2").tag("x", "1").build();
        assert_eq!(a, b);

        let mut set = std::collections::BTreeSet::new();
        set.insert(a);
        set.insert(b);
        assert_eq!(set.len(), 1);
    }
}
