//! Shared test utilities for time-series storage testing.
//!
//! Feature-gated behind `testutil` to keep helpers out of production
//! builds. Enable in `[dev-dependencies]`:
//!
//! ```toml
//! [dev-dependencies]
//! timeseries-storage = { path = "../storage", features = ["testutil"] }
//! ```

use chrono::{DateTime, TimeZone, Utc};

use crate::types::{Metric, Sample};

/// Creates a metric with the given key and intrinsic tags.
#[must_use]
pub fn make_metric(key: &str, tags: &[(&str, &str)]) -> Metric {
    let mut builder = Metric::builder(key);
    for (k, v) in tags {
        builder = builder.tag(*k, *v);
    }
    builder.build()
}

/// Creates a timestamp at the given number of seconds past a fixed epoch.
///
/// Deterministic across runs; useful when tests compare absolute times.
///
/// # Panics
///
/// Panics if `secs` is outside chrono's representable range.
#[must_use]
#[allow(clippy::expect_used)]
pub fn at_secs(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(secs, 0).single().expect("timestamp in range")
}

/// Creates a sample for `metric` at `at_secs(secs)`.
#[must_use]
pub fn make_sample(metric: &Metric, secs: i64, value: f64) -> Sample {
    Sample::new(metric.clone(), at_secs(secs), value)
}
