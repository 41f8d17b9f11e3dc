//! Time-series storage trait definition.
//!
//! [`TimeSeriesStorage`] is the seam between the host system and a concrete
//! backend. Implementations are expected to be thread-safe (`Send + Sync`)
//! and callable concurrently; any internal caching or connection pooling is
//! the implementation's concern.

use async_trait::async_trait;

use crate::{
    error::StorageResult,
    types::{FetchRequest, Metric, Sample, Tag},
};

/// Abstract storage for metrics and their samples.
///
/// # Operations
///
/// | Method | Description |
/// |--------|-------------|
/// | [`store`](TimeSeriesStorage::store) | Persist a batch of samples |
/// | [`metrics`](TimeSeriesStorage::metrics) | List known metrics, filtered by tag |
/// | [`get_timeseries`](TimeSeriesStorage::get_timeseries) | Fetch samples for one metric over a time range |
/// | [`delete`](TimeSeriesStorage::delete) | Remove a metric and its samples |
#[async_trait]
pub trait TimeSeriesStorage: Send + Sync {
    /// Persists the given samples.
    ///
    /// Writes are independent per sample — there is no atomic batch
    /// guarantee. If the call fails partway, a prefix of the list may have
    /// been written and the rest is unknown; callers must treat a failed
    /// `store` as at-least-partially-effectful.
    #[must_use = "storage operations may fail and errors must be handled"]
    async fn store(&self, samples: Vec<Sample>) -> StorageResult<()>;

    /// Returns all known metrics whose combined tag sets contain every tag
    /// in `filter` (exact key and value match, in either the intrinsic or
    /// the meta set). An empty filter returns every metric.
    #[must_use = "storage operations may fail and errors must be handled"]
    async fn metrics(&self, filter: &[Tag]) -> StorageResult<Vec<Metric>>;

    /// Fetches samples for the requested metric over `[start, end)`.
    ///
    /// Returned samples are bound to the metric object supplied in the
    /// request: implementations trust the caller's metric identity and do
    /// not re-derive it from stored rows. The query is already scoped to
    /// exactly one metric, so a mismatch would indicate caller error, not
    /// something this layer silently repairs.
    #[must_use = "storage operations may fail and errors must be handled"]
    async fn get_timeseries(&self, request: &FetchRequest) -> StorageResult<Vec<Sample>>;

    /// Deletes the metric and all of its samples.
    #[must_use = "storage operations may fail and errors must be handled"]
    async fn delete(&self, metric: &Metric) -> StorageResult<()>;
}
