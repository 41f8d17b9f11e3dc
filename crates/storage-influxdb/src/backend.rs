//! InfluxDB-backed implementation of [`TimeSeriesStorage`].
//!
//! [`InfluxBackend`] composes the codec, the Flux query builder, the metric
//! catalog, and the backend service into the facade the host system calls.
//!
//! # Design choices
//!
//! - The measurement column carries the (encoded) metric key.
//! - Tag keys are prefixed with their classification (`intrinsic_` /
//!   `meta_`) so the flat tag namespace keeps both sets apart.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};

use timeseries_storage::{
    FetchRequest, Metric, Sample, StorageResult, Tag, TimeSeriesStorage,
};

use crate::{
    catalog::MetricCatalog,
    client::{DataPoint, InfluxApi},
    codec::{self, TagClass},
    config::InfluxConfig,
    flux,
    http::HttpApi,
};

/// InfluxDB 2.x implementation of [`TimeSeriesStorage`].
///
/// The backend owns a single client session for its entire lifetime;
/// dropping the backend releases it. All operations are safe to call
/// concurrently — the only shared mutable state is the metric catalog
/// cache, which enforces its own single-flight reload contract.
///
/// # Example
///
/// ```no_run
/// use timeseries_storage::TimeSeriesStorage;
/// use timeseries_storage_influxdb::{InfluxBackend, InfluxConfig};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = InfluxConfig::builder()
///     .url("http://localhost:9999")
///     .org("acme")
///     .bucket("metrics")
///     .token("secret-token")
///     .build()?;
///
/// let backend = InfluxBackend::new(config)?;
/// let metrics = backend.metrics(&[]).await?;
/// # Ok(())
/// # }
/// ```
pub struct InfluxBackend {
    api: Arc<dyn InfluxApi>,
    catalog: MetricCatalog,
    bucket: String,
}

impl InfluxBackend {
    /// Creates a backend connected over HTTP.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Config`](timeseries_storage::StorageError)
    /// if the HTTP client cannot be constructed. Connection problems only
    /// surface on the first operation; the InfluxDB API is stateless per
    /// request.
    pub fn new(config: InfluxConfig) -> StorageResult<Self> {
        let api = Arc::new(HttpApi::new(&config)?);
        Ok(Self::from_api(api, &config))
    }

    /// Creates a backend over an existing service implementation.
    ///
    /// This is the injection seam for tests and for callers that share one
    /// client across several backends.
    #[must_use]
    pub fn from_api(api: Arc<dyn InfluxApi>, config: &InfluxConfig) -> Self {
        // Sanitize the bucket name once; every query interpolates it.
        let bucket = codec::encode_metric_key(config.bucket());
        let catalog = MetricCatalog::new(
            Arc::clone(&api),
            bucket.clone(),
            config.identity_marker().to_owned(),
            config.catalog_ttl(),
            config.catalog_capacity(),
        );
        info!(bucket = %bucket, "initialized InfluxDB time-series backend");
        Self { api, catalog, bucket }
    }

    /// Encodes one sample as a write-ready point.
    fn point_for(sample: &Sample) -> DataPoint {
        let metric = sample.metric();
        let mut point = DataPoint::new(
            codec::encode_metric_key(metric.key()),
            sample.time().timestamp_millis(),
        );
        for (key, value) in metric.tags() {
            point = point.with_tag(
                codec::classify_tag_key(TagClass::Intrinsic, key),
                codec::encode_tag_value(value),
            );
        }
        for (key, value) in metric.meta_tags() {
            point = point.with_tag(
                codec::classify_tag_key(TagClass::Meta, key),
                codec::encode_tag_value(value),
            );
        }
        point.with_field(flux::VALUE_FIELD, sample.value())
    }
}

#[async_trait]
impl TimeSeriesStorage for InfluxBackend {
    async fn store(&self, samples: Vec<Sample>) -> StorageResult<()> {
        // Writes are independent per sample: a failure part-way leaves the
        // prefix written, per the trait contract.
        for sample in &samples {
            self.api.write_point(&Self::point_for(sample)).await?;
        }
        Ok(())
    }

    async fn metrics(&self, filter: &[Tag]) -> StorageResult<Vec<Metric>> {
        self.catalog.metrics(filter).await
    }

    async fn get_timeseries(&self, request: &FetchRequest) -> StorageResult<Vec<Sample>> {
        let query = flux::range_query(
            &self.bucket,
            &codec::encode_metric_key(request.metric().key()),
            request.start(),
            request.end(),
            request.step(),
        );
        let records = self.api.query(&query).await?;

        // Each row binds to the caller's metric object: the query is
        // scoped to exactly one measurement, so identity is not re-derived
        // from row tags.
        let samples: Vec<Sample> = records
            .iter()
            .filter_map(|record| match (record.time(), record.value()) {
                (Some(time), Some(value)) => {
                    Some(Sample::new(request.metric().clone(), time, value))
                },
                _ => {
                    debug!("skipping result row without time or value");
                    None
                },
            })
            .collect();
        Ok(samples)
    }

    async fn delete(&self, metric: &Metric) -> StorageResult<()> {
        let predicate = flux::delete_predicate(&codec::encode_metric_key(metric.key()));
        self.api.delete(&predicate).await
    }
}

impl std::fmt::Debug for InfluxBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InfluxBackend")
            .field("bucket", &self.bucket)
            .field("catalog", &self.catalog)
            .finish_non_exhaustive()
    }
}
