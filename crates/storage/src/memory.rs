//! In-memory time-series storage.
//!
//! [`MemoryStorage`] keeps everything in a [`BTreeMap`] behind a
//! [`parking_lot::RwLock`]. It exists for tests and development; data is
//! lost when the process exits.
//!
//! # Limitations
//!
//! - No persistence, no eviction.
//! - The [`FetchRequest`] `step` is ignored; raw samples are always
//!   returned. Downsampling is a backend-side concern this implementation
//!   does not model.

use std::{collections::BTreeMap, sync::Arc};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;

use crate::{
    error::StorageResult,
    storage::TimeSeriesStorage,
    types::{FetchRequest, Metric, Sample, Tag},
};

/// In-memory [`TimeSeriesStorage`] backed by a [`BTreeMap`].
///
/// Cheaply cloneable via [`Arc`]; all clones share the same data.
///
/// # Example
///
/// ```
/// use chrono::Utc;
/// use timeseries_storage::{MemoryStorage, Metric, Sample, TimeSeriesStorage};
///
/// # tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap().block_on(async {
/// let storage = MemoryStorage::new();
/// let metric = Metric::builder("node1.cpu").tag("resourceId", "r1").build();
///
/// storage.store(vec![Sample::new(metric.clone(), Utc::now(), 42.0)]).await.unwrap();
/// let metrics = storage.metrics(&[]).await.unwrap();
/// assert_eq!(metrics, vec![metric]);
/// # });
/// ```
#[derive(Clone, Default)]
pub struct MemoryStorage {
    data: Arc<RwLock<BTreeMap<Metric, Vec<(DateTime<Utc>, f64)>>>>,
}

impl MemoryStorage {
    /// Creates an empty in-memory storage.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of distinct metrics currently stored.
    #[must_use]
    pub fn metric_count(&self) -> usize {
        self.data.read().len()
    }
}

#[async_trait]
impl TimeSeriesStorage for MemoryStorage {
    async fn store(&self, samples: Vec<Sample>) -> StorageResult<()> {
        let mut data = self.data.write();
        for sample in samples {
            data.entry(sample.metric().clone())
                .or_default()
                .push((sample.time(), sample.value()));
        }
        Ok(())
    }

    async fn metrics(&self, filter: &[Tag]) -> StorageResult<Vec<Metric>> {
        let data = self.data.read();
        Ok(data.keys().filter(|m| m.matches(filter)).cloned().collect())
    }

    async fn get_timeseries(&self, request: &FetchRequest) -> StorageResult<Vec<Sample>> {
        let data = self.data.read();
        let mut points: Vec<(DateTime<Utc>, f64)> = data
            .get(request.metric())
            .map(|points| {
                points
                    .iter()
                    .copied()
                    .filter(|(time, _)| *time >= request.start() && *time < request.end())
                    .collect()
            })
            .unwrap_or_default();
        points.sort_by_key(|(time, _)| *time);

        Ok(points
            .into_iter()
            .map(|(time, value)| Sample::new(request.metric().clone(), time, value))
            .collect())
    }

    async fn delete(&self, metric: &Metric) -> StorageResult<()> {
        self.data.write().remove(metric);
        Ok(())
    }
}
