//! InfluxDB 2.x backed implementation of
//! [`TimeSeriesStorage`](timeseries_storage::TimeSeriesStorage).
//!
//! This crate adapts the abstract metric/tag/sample model onto InfluxDB's
//! flat namespace of measurements, tags, and fields:
//!
//! - the measurement column carries the (encoded) metric key;
//! - tag keys are prefixed with their classification (`intrinsic_` /
//!   `meta_`) so identity and metadata tags stay apart;
//! - tag values are percent-encoded so colons round-trip losslessly;
//! - the set of known metrics is discovered by scanning the bucket's tag
//!   index and cached with TTL + single-flight reload.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Host System                            │
//! ├─────────────────────────────────────────────────────────────┤
//! │                    InfluxBackend                            │
//! │            (implements TimeSeriesStorage)                   │
//! ├─────────────┬───────────────┬───────────────────────────────┤
//! │    codec    │  flux builder │        MetricCatalog          │
//! │ (key/value/ │ (scan, range, │  (moka cache, TTL,            │
//! │  tag class) │  delete)      │   single-flight reload)       │
//! ├─────────────┴───────────────┴───────────────────────────────┤
//! │                  InfluxApi trait                            │
//! │          HttpApi (reqwest)  │  MockApi (testutil)           │
//! ├─────────────────────────────────────────────────────────────┤
//! │                     InfluxDB 2.x                            │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Quick Start
//!
//! ```no_run
//! use chrono::Utc;
//! use timeseries_storage::{Metric, Sample, TimeSeriesStorage};
//! use timeseries_storage_influxdb::{InfluxBackend, InfluxConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = InfluxConfig::builder()
//!         .url("http://localhost:9999")
//!         .org("acme")
//!         .bucket("metrics")
//!         .token("secret-token")
//!         .build()?;
//!     let backend = InfluxBackend::new(config)?;
//!
//!     let metric = Metric::builder("node1.cpu").tag("resourceId", "r1").build();
//!     backend.store(vec![Sample::new(metric, Utc::now(), 42.0)]).await?;
//!
//!     Ok(())
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod backend;
mod catalog;
mod config;
mod http;

pub mod client;
pub mod codec;
pub mod flux;
#[cfg(any(test, feature = "testutil"))]
pub mod testutil;

pub use backend::InfluxBackend;
pub use catalog::MetricCatalog;
pub use client::{DataPoint, FluxRecord, InfluxApi};
pub use codec::TagClass;
pub use config::{InfluxConfig, InfluxConfigBuilder};
pub use http::HttpApi;
