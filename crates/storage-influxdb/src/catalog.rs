//! Cached metric catalog.
//!
//! [`MetricCatalog`] maintains an eventually consistent local view of every
//! metric known to the backend. The full catalog is loaded by one scan
//! query and cached with a TTL; concurrent callers that find the cache
//! expired share a single in-flight reload (single-flight), so a stampede
//! of callers can never trigger a stampede of scans — the scan, with its
//! fixed multi-year lookback, is the most expensive call this adapter
//! makes.
//!
//! # Failure policy
//!
//! A failed scan fails the reload for every waiter. The previous entry has
//! already expired and is not served as a degraded fallback; this trades
//! availability under backend failure for consistency. Errors are not
//! cached, so the next caller retries.

use std::{collections::BTreeSet, sync::Arc};

use moka::future::Cache;
use tracing::{debug, warn};

use timeseries_storage::{Metric, StorageError, StorageResult, Tag};

use crate::{
    client::{FluxRecord, InfluxApi},
    codec::{self, TagClass},
    flux,
};

/// The backend column carrying the measurement name.
const MEASUREMENT_COLUMN: &str = "_measurement";

/// Cached, single-flight catalog of all metrics in one bucket.
pub struct MetricCatalog {
    api: Arc<dyn InfluxApi>,
    cache: Cache<(), Arc<Vec<Metric>>>,
    bucket: String,
    identity_marker: String,
}

impl MetricCatalog {
    /// Creates a catalog over the given service.
    ///
    /// `bucket` must already be encoded for query interpolation. The TTL is
    /// measured from successful load completion; `capacity` bounds the
    /// entry count (one logical entry today).
    #[must_use]
    pub fn new(
        api: Arc<dyn InfluxApi>,
        bucket: String,
        identity_marker: String,
        ttl: std::time::Duration,
        capacity: u64,
    ) -> Self {
        let cache = Cache::builder().max_capacity(capacity).time_to_live(ttl).build();
        Self { api, cache, bucket, identity_marker }
    }

    /// Returns all known metrics whose combined tag sets contain every tag
    /// in `filter`. An empty filter returns the full catalog.
    ///
    /// Serves from cache when the entry is fresh; otherwise triggers at
    /// most one backend scan regardless of how many callers arrive
    /// concurrently, all of whom observe that scan's result or its error.
    pub async fn metrics(&self, filter: &[Tag]) -> StorageResult<Vec<Metric>> {
        let all = self
            .cache
            .try_get_with((), self.load_all())
            .await
            .map_err(|err: Arc<StorageError>| {
                StorageError::backend_with_shared_source("metric catalog reload failed", err)
            })?;

        Ok(all.iter().filter(|metric| metric.matches(filter)).cloned().collect())
    }

    /// Loads the full catalog from the backend.
    async fn load_all(&self) -> StorageResult<Arc<Vec<Metric>>> {
        let query = flux::scan_query(&self.bucket);
        let records = self.api.query(&query).await?;

        // BTreeSet both deduplicates identical decoded metrics and keeps
        // the catalog in a deterministic order.
        let mut metrics = BTreeSet::new();
        for record in &records {
            if let Some(metric) = self.metric_from_record(record) {
                metrics.insert(metric);
            }
        }

        debug!(
            records = records.len(),
            metrics = metrics.len(),
            "metric catalog reloaded"
        );
        Ok(Arc::new(metrics.into_iter().collect()))
    }

    /// Reconstructs a metric from one scan record, or `None` if the record
    /// does not belong to this adapter.
    ///
    /// A record is a candidate iff its measurement column is present and
    /// contains the identity marker; measurements written by other tenants
    /// of the bucket are skipped. Tag columns without a recognized class
    /// prefix are backend-internal and ignored. A tag value that fails the
    /// reversibility check is dropped — the metric survives with its
    /// remaining tags.
    fn metric_from_record(&self, record: &FluxRecord) -> Option<Metric> {
        let measurement = record.values().get(MEASUREMENT_COLUMN)?;
        if !measurement.contains(&self.identity_marker) {
            return None;
        }

        let mut builder = Metric::builder(measurement.clone());
        for (column, raw_value) in record.values() {
            let Some((class, key)) = codec::unclassify_tag_key(column) else {
                continue;
            };
            match codec::checked_decode_tag_value(raw_value) {
                Some(value) => {
                    builder = match class {
                        TagClass::Intrinsic => builder.tag(key, value),
                        TagClass::Meta => builder.meta_tag(key, value),
                    };
                },
                None => {
                    warn!(
                        measurement = %measurement,
                        column = %column,
                        "dropping tag with irreversible value"
                    );
                },
            }
        }
        Some(builder.build())
    }
}

impl std::fmt::Debug for MetricCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetricCatalog")
            .field("bucket", &self.bucket)
            .field("identity_marker", &self.identity_marker)
            .field("cached_entries", &self.cache.entry_count())
            .finish_non_exhaustive()
    }
}
