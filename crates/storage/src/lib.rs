//! Abstract time-series storage model for metric data.
//!
//! This crate defines the [`TimeSeriesStorage`] trait and the data model it
//! operates on: metrics identified by an opaque key plus classified tag
//! sets, and numeric samples over time. Concrete backends (the InfluxDB
//! adapter, the in-memory implementation) implement the trait; host code
//! programs against it.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Host System                            │
//! │        (collectors, persistence layer, query API)           │
//! ├─────────────────────────────────────────────────────────────┤
//! │                  timeseries-storage                         │
//! │                TimeSeriesStorage trait                      │
//! │        (store, metrics, get_timeseries, delete)             │
//! ├──────────────┬──────────────────────────────────────────────┤
//! │ MemoryStorage│        InfluxBackend                         │
//! │   (testing)  │  (in timeseries-storage-influxdb)            │
//! └──────────────┴──────────────────────────────────────────────┘
//! ```
//!
//! # Quick Start
//!
//! ```
//! use chrono::Utc;
//! use timeseries_storage::{MemoryStorage, Metric, Sample, Tag, TimeSeriesStorage};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let storage = MemoryStorage::new();
//!
//!     let metric = Metric::builder("node1.cpu")
//!         .tag("resourceId", "r1")
//!         .meta_tag("unit", "percent")
//!         .build();
//!
//!     storage.store(vec![Sample::new(metric.clone(), Utc::now(), 42.0)]).await?;
//!
//!     let found = storage.metrics(&[Tag::new("resourceId", "r1")]).await?;
//!     assert_eq!(found, vec![metric]);
//!
//!     Ok(())
//! }
//! ```
//!
//! # Error Handling
//!
//! All operations return [`StorageResult<T>`]. Backends map their internal
//! errors to [`StorageError`]; see the [`error`] module for the taxonomy.

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod memory;
pub mod storage;
#[cfg(any(test, feature = "testutil"))]
#[allow(clippy::expect_used)]
pub mod testutil;
pub mod types;

pub use error::{BoxError, ConfigError, StorageError, StorageResult};
pub use memory::MemoryStorage;
pub use storage::TimeSeriesStorage;
pub use types::{FetchRequest, Metric, MetricBuilder, Sample, Tag};
