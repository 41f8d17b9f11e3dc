//! Mock [`InfluxApi`] for testing adapter behavior without a server.
//!
//! Feature-gated behind `testutil`. [`MockApi`] records every call,
//! returns canned query results, and can inject failures and latency —
//! latency is what makes single-flight tests actually overlap.

use std::{
    sync::atomic::{AtomicBool, Ordering},
    time::Duration,
};

use async_trait::async_trait;
use parking_lot::Mutex;

use timeseries_storage::{StorageError, StorageResult};

use crate::client::{DataPoint, FluxRecord, InfluxApi};

/// Recording, failure-injectable [`InfluxApi`] implementation.
#[derive(Default)]
pub struct MockApi {
    records: Mutex<Vec<FluxRecord>>,
    queries: Mutex<Vec<String>>,
    points: Mutex<Vec<DataPoint>>,
    deletes: Mutex<Vec<String>>,
    fail_queries: AtomicBool,
    write_budget: Mutex<Option<usize>>,
    query_delay: Mutex<Duration>,
}

impl MockApi {
    /// Creates a mock that answers every query with no records.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the records returned by every subsequent query.
    pub fn set_records(&self, records: Vec<FluxRecord>) {
        *self.records.lock() = records;
    }

    /// Makes every subsequent query fail (or succeed again).
    pub fn set_fail_queries(&self, fail: bool) {
        self.fail_queries.store(fail, Ordering::SeqCst);
    }

    /// Delays every query by `delay` before responding.
    pub fn set_query_delay(&self, delay: Duration) {
        *self.query_delay.lock() = delay;
    }

    /// Makes writes fail once `budget` points have been accepted.
    pub fn fail_writes_after(&self, budget: usize) {
        *self.write_budget.lock() = Some(budget);
    }

    /// Returns the number of queries issued so far.
    #[must_use]
    pub fn query_count(&self) -> usize {
        self.queries.lock().len()
    }

    /// Returns every query string issued so far.
    #[must_use]
    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().clone()
    }

    /// Returns every point written so far.
    #[must_use]
    pub fn points(&self) -> Vec<DataPoint> {
        self.points.lock().clone()
    }

    /// Returns every delete predicate issued so far.
    #[must_use]
    pub fn deletes(&self) -> Vec<String> {
        self.deletes.lock().clone()
    }
}

#[async_trait]
impl InfluxApi for MockApi {
    async fn write_point(&self, point: &DataPoint) -> StorageResult<()> {
        let mut points = self.points.lock();
        if let Some(budget) = *self.write_budget.lock() {
            if points.len() >= budget {
                return Err(StorageError::backend("injected write failure"));
            }
        }
        points.push(point.clone());
        Ok(())
    }

    async fn query(&self, flux: &str) -> StorageResult<Vec<FluxRecord>> {
        self.queries.lock().push(flux.to_owned());

        let delay = *self.query_delay.lock();
        if delay > Duration::ZERO {
            tokio::time::sleep(delay).await;
        }

        if self.fail_queries.load(Ordering::SeqCst) {
            return Err(StorageError::backend("injected query failure"));
        }
        Ok(self.records.lock().clone())
    }

    async fn delete(&self, predicate: &str) -> StorageResult<()> {
        self.deletes.lock().push(predicate.to_owned());
        Ok(())
    }
}
