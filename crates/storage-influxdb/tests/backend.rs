//! Integration tests for `InfluxBackend` against a mock service.
//!
//! Covers the adapter's observable contracts: the store/fetch round trip,
//! catalog caching (single-flight and TTL expiry), tag classification,
//! partial-write behavior, and delete predicate construction.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use std::{collections::BTreeMap, sync::Arc, time::Duration};

use chrono::{DateTime, TimeZone, Utc};
use timeseries_storage::{FetchRequest, Metric, Sample, StorageError, Tag, TimeSeriesStorage};
use timeseries_storage_influxdb::{
    testutil::MockApi, FluxRecord, InfluxBackend, InfluxConfig,
};

fn config() -> InfluxConfig {
    InfluxConfig::builder()
        .url("http://localhost:9999")
        .org("acme")
        .bucket("metrics")
        .token("test-token")
        .identity_marker("node")
        .build()
        .expect("valid test config")
}

fn config_with_ttl(ttl: Duration) -> InfluxConfig {
    InfluxConfig::builder()
        .url("http://localhost:9999")
        .org("acme")
        .bucket("metrics")
        .token("test-token")
        .identity_marker("node")
        .catalog_ttl(ttl)
        .build()
        .expect("valid test config")
}

fn backend(api: &Arc<MockApi>, config: &InfluxConfig) -> Arc<InfluxBackend> {
    Arc::new(InfluxBackend::from_api(
        Arc::clone(api) as Arc<dyn timeseries_storage_influxdb::InfluxApi>,
        config,
    ))
}

fn record(entries: &[(&str, &str)]) -> FluxRecord {
    let values: BTreeMap<String, String> =
        entries.iter().map(|(k, v)| ((*k).to_owned(), (*v).to_owned())).collect();
    FluxRecord::from_values(values)
}

fn at_ms(ms: i64) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(ms).unwrap()
}

// ============================================================================
// Store / fetch round trip
// ============================================================================

#[tokio::test]
async fn store_then_fetch_round_trip() {
    let api = Arc::new(MockApi::new());
    let backend = backend(&api, &config());

    let metric = Metric::builder("node1.cpu").tag("resourceId", "r1").build();
    let t = at_ms(1_700_000_000_000);

    backend.store(vec![Sample::new(metric.clone(), t, 42.0)]).await.unwrap();

    // The write carries the encoded measurement, classified tag, and the
    // single value field at millisecond precision.
    let points = api.points();
    assert_eq!(points.len(), 1);
    assert_eq!(points[0].measurement(), "node1.cpu");
    assert_eq!(
        points[0].tags().get("intrinsic_resourceId").map(String::as_str),
        Some("r1")
    );
    assert_eq!(points[0].fields().get("value"), Some(&42.0));
    assert_eq!(points[0].timestamp_ms(), 1_700_000_000_000);

    // Fetch over [T-1s, T+1s) returns exactly that sample, bound to the
    // metric object the caller supplied.
    api.set_records(vec![record(&[
        ("_time", "2023-11-14T22:13:20.000Z"),
        ("_value", "42"),
        ("_field", "value"),
        ("_measurement", "node1.cpu"),
    ])]);

    let request = FetchRequest::new(
        metric.clone(),
        t - chrono::Duration::seconds(1),
        t + chrono::Duration::seconds(1),
    );
    let samples = backend.get_timeseries(&request).await.unwrap();
    assert_eq!(samples.len(), 1);
    assert_eq!(samples[0].value(), 42.0);
    assert_eq!(samples[0].time(), t);
    assert_eq!(samples[0].metric(), &metric);

    // The range query is scoped to the one measurement and the value field.
    let query = api.queries().pop().unwrap();
    assert!(query.contains("r._measurement == \"node1.cpu\""), "{query}");
    assert!(query.contains("r._field == \"value\""), "{query}");
    assert!(query.contains("start:2023-11-14T22:13:19.000Z"), "{query}");
    assert!(query.contains("stop:2023-11-14T22:13:21.000Z"), "{query}");
}

#[tokio::test]
async fn store_encodes_tag_values_and_classifications() {
    let api = Arc::new(MockApi::new());
    let backend = backend(&api, &config());

    // Same raw key under both classifications, plus a colon in a value.
    let metric = Metric::builder("node1.\"cpu\"")
        .tag("a", "1")
        .tag("path", "snmp:1:cpu")
        .meta_tag("a", "2")
        .build();

    backend.store(vec![Sample::new(metric, at_ms(0), 1.0)]).await.unwrap();

    let points = api.points();
    assert_eq!(points.len(), 1);
    // Quotes are stripped from the measurement name.
    assert_eq!(points[0].measurement(), "node1.cpu");
    // Both classifications survive side by side.
    assert_eq!(points[0].tags().get("intrinsic_a").map(String::as_str), Some("1"));
    assert_eq!(points[0].tags().get("meta_a").map(String::as_str), Some("2"));
    // Colons are placeholder-encoded.
    assert_eq!(
        points[0].tags().get("intrinsic_path").map(String::as_str),
        Some("snmp%3A1%3Acpu")
    );
}

#[tokio::test]
async fn fetch_with_step_requests_server_side_aggregation() {
    let api = Arc::new(MockApi::new());
    let backend = backend(&api, &config());
    let metric = Metric::builder("node1.cpu").build();

    let raw = FetchRequest::new(metric.clone(), at_ms(0), at_ms(60_000));
    backend.get_timeseries(&raw).await.unwrap();
    assert!(!api.queries().pop().unwrap().contains("aggregateWindow"));

    let stepped = FetchRequest::new(metric, at_ms(0), at_ms(60_000))
        .with_step(Duration::from_secs(30));
    backend.get_timeseries(&stepped).await.unwrap();
    let query = api.queries().pop().unwrap();
    assert!(
        query.contains("aggregateWindow(every: 30s, fn: mean, createEmpty: false)"),
        "{query}"
    );
}

// ============================================================================
// Partial writes
// ============================================================================

#[tokio::test]
async fn failed_store_leaves_prefix_written() {
    let api = Arc::new(MockApi::new());
    api.fail_writes_after(1);
    let backend = backend(&api, &config());

    let metric = Metric::builder("node1.cpu").build();
    let samples = vec![
        Sample::new(metric.clone(), at_ms(1), 1.0),
        Sample::new(metric.clone(), at_ms(2), 2.0),
        Sample::new(metric, at_ms(3), 3.0),
    ];

    let err = backend.store(samples).await.unwrap_err();
    assert!(matches!(err, StorageError::Backend { .. }));
    // No rollback: the first sample was written before the failure.
    assert_eq!(api.points().len(), 1);
    assert_eq!(api.points()[0].timestamp_ms(), 1);
}

// ============================================================================
// Catalog: single-flight and expiry
// ============================================================================

#[tokio::test(flavor = "multi_thread")]
async fn concurrent_metrics_calls_share_one_scan() {
    let api = Arc::new(MockApi::new());
    api.set_records(vec![record(&[
        ("_measurement", "node1.cpu"),
        ("intrinsic_resourceId", "r1"),
    ])]);
    // The delay keeps the first scan in flight while the other callers
    // arrive, so coalescing is actually exercised.
    api.set_query_delay(Duration::from_millis(100));
    let backend = backend(&api, &config());

    let tasks: Vec<_> = (0..8)
        .map(|_| {
            let backend = Arc::clone(&backend);
            tokio::spawn(async move { backend.metrics(&[]).await })
        })
        .collect();

    let results = futures::future::join_all(tasks).await;
    let expected =
        vec![Metric::builder("node1.cpu").tag("resourceId", "r1").build()];
    for result in results {
        assert_eq!(result.unwrap().unwrap(), expected);
    }
    assert_eq!(api.query_count(), 1, "all callers must share one scan");
}

#[tokio::test(flavor = "multi_thread")]
async fn concurrent_metrics_calls_share_one_error() {
    let api = Arc::new(MockApi::new());
    api.set_fail_queries(true);
    api.set_query_delay(Duration::from_millis(100));
    let backend = backend(&api, &config());

    let tasks: Vec<_> = (0..4)
        .map(|_| {
            let backend = Arc::clone(&backend);
            tokio::spawn(async move { backend.metrics(&[]).await })
        })
        .collect();

    for result in futures::future::join_all(tasks).await {
        let err = result.unwrap().unwrap_err();
        assert!(matches!(err, StorageError::Backend { .. }));
    }
    assert_eq!(api.query_count(), 1, "the failing scan must also be shared");
}

#[tokio::test]
async fn cached_catalog_serves_without_rescanning_until_expiry() {
    let api = Arc::new(MockApi::new());
    api.set_records(vec![record(&[("_measurement", "node1.cpu")])]);
    let backend = backend(&api, &config_with_ttl(Duration::from_secs(1)));

    backend.metrics(&[]).await.unwrap();
    backend.metrics(&[]).await.unwrap();
    assert_eq!(api.query_count(), 1, "within the TTL the cache answers");

    tokio::time::sleep(Duration::from_millis(1_300)).await;

    backend.metrics(&[]).await.unwrap();
    assert_eq!(api.query_count(), 2, "after expiry exactly one new scan runs");
}

// ============================================================================
// Catalog: decoding and filtering
// ============================================================================

#[tokio::test]
async fn catalog_keeps_same_key_under_both_classifications() {
    let api = Arc::new(MockApi::new());
    api.set_records(vec![record(&[
        ("_measurement", "node1.cpu"),
        ("intrinsic_a", "1"),
        ("meta_a", "2"),
    ])]);
    let backend = backend(&api, &config());

    let metrics = backend.metrics(&[]).await.unwrap();
    assert_eq!(metrics.len(), 1);
    assert_eq!(metrics[0].tags().get("a").map(String::as_str), Some("1"));
    assert_eq!(metrics[0].meta_tags().get("a").map(String::as_str), Some("2"));
}

#[tokio::test]
async fn catalog_filter_matches_either_tag_set() {
    let api = Arc::new(MockApi::new());
    api.set_records(vec![
        record(&[
            ("_measurement", "node1.cpu"),
            ("intrinsic_host", "h1"),
            ("meta_dc", "eu"),
        ]),
        record(&[("_measurement", "node2.cpu"), ("intrinsic_host", "h2")]),
    ]);
    let backend = backend(&api, &config());

    let all = backend.metrics(&[]).await.unwrap();
    assert_eq!(all.len(), 2);

    let eu = backend.metrics(&[Tag::new("dc", "eu")]).await.unwrap();
    assert_eq!(eu.len(), 1);
    assert_eq!(eu[0].key(), "node1.cpu");

    let missing = backend.metrics(&[Tag::new("host", "h9")]).await.unwrap();
    assert!(missing.is_empty());
}

#[tokio::test]
async fn catalog_tolerates_malformed_record() {
    let api = Arc::new(MockApi::new());
    api.set_records(vec![record(&[
        ("_measurement", "node1.cpu"),
        ("intrinsic_resourceId", "r1"),
        ("intrinsic_broken", "%zz"),
    ])]);
    let backend = backend(&api, &config());

    let metrics = backend.metrics(&[]).await.unwrap();
    assert_eq!(metrics.len(), 1, "one bad tag must not drop the metric");
    assert_eq!(metrics[0].tags().get("resourceId").map(String::as_str), Some("r1"));
    assert!(!metrics[0].tags().contains_key("broken"));
}

#[tokio::test]
async fn catalog_scan_uses_bounded_lookback() {
    let api = Arc::new(MockApi::new());
    let backend = backend(&api, &config());

    backend.metrics(&[]).await.unwrap();
    let query = api.queries().pop().unwrap();
    assert!(query.contains("from(bucket:\"metrics\")"), "{query}");
    assert!(query.contains("range(start:-5y)"), "{query}");
    assert!(query.contains("keys()"), "{query}");
}

// ============================================================================
// Delete
// ============================================================================

#[tokio::test]
async fn delete_issues_measurement_predicate() {
    let api = Arc::new(MockApi::new());
    let backend = backend(&api, &config());

    // The quote would otherwise break out of the predicate literal.
    let metric = Metric::builder("node1.\"cpu\"").build();
    backend.delete(&metric).await.unwrap();

    assert_eq!(api.deletes(), vec!["_measurement=\"node1.cpu\"".to_owned()]);
}
