//! Configuration for the InfluxDB backend.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use timeseries_storage::ConfigError;

/// Default request timeout for backend calls.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default time-to-live for the metric catalog cache.
const DEFAULT_CATALOG_TTL: Duration = Duration::from_secs(60);

/// Minimum allowed catalog TTL.
const MIN_CATALOG_TTL: Duration = Duration::from_secs(1);

/// Default maximum number of catalog cache entries.
///
/// The catalog holds one logical entry today; the bound exists so the
/// cache abstraction stays LRU-ready for finer-grained entries later.
const DEFAULT_CATALOG_CAPACITY: u64 = 16;

/// Default identity marker for catalog discovery.
///
/// Only measurements whose name contains this marker are treated as
/// adapter-owned metrics during a catalog scan; everything else in the
/// bucket is ignored. The default matches the key namespace the host
/// system embeds in its metric keys.
const DEFAULT_IDENTITY_MARKER: &str = "resourceId";

/// Configuration for [`InfluxBackend`](crate::InfluxBackend).
///
/// # Example
///
/// ```
/// use timeseries_storage_influxdb::InfluxConfig;
///
/// let config = InfluxConfig::builder()
///     .url("http://localhost:9999")
///     .org("acme")
///     .bucket("metrics")
///     .token("secret-token")
///     .build()?;
/// # Ok::<(), timeseries_storage::ConfigError>(())
/// ```
#[derive(Clone, Serialize, Deserialize)]
pub struct InfluxConfig {
    /// Base URL of the InfluxDB instance.
    url: String,

    /// Organization name.
    org: String,

    /// Bucket all samples are written to and read from.
    bucket: String,

    /// API token.
    token: String,

    /// Request timeout for every backend call.
    #[serde(with = "humantime_serde", default = "default_timeout")]
    timeout: Duration,

    /// Time-to-live of the metric catalog cache, measured from successful
    /// load completion.
    #[serde(with = "humantime_serde", default = "default_catalog_ttl")]
    catalog_ttl: Duration,

    /// Maximum number of catalog cache entries.
    #[serde(default = "default_catalog_capacity")]
    catalog_capacity: u64,

    /// Substring of a measurement name that marks it as adapter-owned.
    #[serde(default = "default_identity_marker")]
    identity_marker: String,
}

fn default_timeout() -> Duration {
    DEFAULT_TIMEOUT
}

fn default_catalog_ttl() -> Duration {
    DEFAULT_CATALOG_TTL
}

fn default_catalog_capacity() -> u64 {
    DEFAULT_CATALOG_CAPACITY
}

fn default_identity_marker() -> String {
    DEFAULT_IDENTITY_MARKER.to_owned()
}

impl std::fmt::Debug for InfluxConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InfluxConfig")
            .field("url", &self.url)
            .field("org", &self.org)
            .field("bucket", &self.bucket)
            .field("token", &"<redacted>")
            .field("timeout", &self.timeout)
            .field("catalog_ttl", &self.catalog_ttl)
            .field("catalog_capacity", &self.catalog_capacity)
            .field("identity_marker", &self.identity_marker)
            .finish()
    }
}

impl InfluxConfig {
    /// Creates a new configuration builder.
    #[must_use]
    pub fn builder() -> InfluxConfigBuilder {
        InfluxConfigBuilder::default()
    }

    /// Returns the base URL.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Returns the organization name.
    #[must_use]
    pub fn org(&self) -> &str {
        &self.org
    }

    /// Returns the bucket name.
    #[must_use]
    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Returns the API token.
    #[must_use]
    pub fn token(&self) -> &str {
        &self.token
    }

    /// Returns the request timeout.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Returns the catalog cache TTL.
    #[must_use]
    pub fn catalog_ttl(&self) -> Duration {
        self.catalog_ttl
    }

    /// Returns the catalog cache capacity.
    #[must_use]
    pub fn catalog_capacity(&self) -> u64 {
        self.catalog_capacity
    }

    /// Returns the identity marker.
    #[must_use]
    pub fn identity_marker(&self) -> &str {
        &self.identity_marker
    }
}

/// Builder for [`InfluxConfig`].
#[derive(Debug)]
pub struct InfluxConfigBuilder {
    url: Option<String>,
    org: Option<String>,
    bucket: Option<String>,
    token: Option<String>,
    timeout: Duration,
    catalog_ttl: Duration,
    catalog_capacity: u64,
    identity_marker: String,
}

impl Default for InfluxConfigBuilder {
    fn default() -> Self {
        Self {
            url: None,
            org: None,
            bucket: None,
            token: None,
            timeout: DEFAULT_TIMEOUT,
            catalog_ttl: DEFAULT_CATALOG_TTL,
            catalog_capacity: DEFAULT_CATALOG_CAPACITY,
            identity_marker: DEFAULT_IDENTITY_MARKER.to_owned(),
        }
    }
}

impl InfluxConfigBuilder {
    /// Sets the base URL of the InfluxDB instance.
    #[must_use]
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Sets the organization name.
    #[must_use]
    pub fn org(mut self, org: impl Into<String>) -> Self {
        self.org = Some(org.into());
        self
    }

    /// Sets the bucket name.
    #[must_use]
    pub fn bucket(mut self, bucket: impl Into<String>) -> Self {
        self.bucket = Some(bucket.into());
        self
    }

    /// Sets the API token.
    #[must_use]
    pub fn token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Sets the request timeout. Default: 30 seconds.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the catalog cache TTL. Default: 60 seconds, minimum 1 second.
    #[must_use]
    pub fn catalog_ttl(mut self, ttl: Duration) -> Self {
        self.catalog_ttl = ttl;
        self
    }

    /// Sets the catalog cache capacity. Default: 16, minimum 1.
    #[must_use]
    pub fn catalog_capacity(mut self, capacity: u64) -> Self {
        self.catalog_capacity = capacity;
        self
    }

    /// Sets the identity marker used during catalog discovery.
    #[must_use]
    pub fn identity_marker(mut self, marker: impl Into<String>) -> Self {
        self.identity_marker = marker.into();
        self
    }

    /// Builds the configuration, validating all fields.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if `url`, `org`, `bucket`, or `token` is
    /// missing or empty, if `catalog_ttl` is under one second, or if
    /// `catalog_capacity` is zero.
    pub fn build(self) -> Result<InfluxConfig, ConfigError> {
        let url = required(self.url, "url")?;
        let org = required(self.org, "org")?;
        let bucket = required(self.bucket, "bucket")?;
        let token = required(self.token, "token")?;

        if self.catalog_ttl < MIN_CATALOG_TTL {
            return Err(ConfigError::BelowMinimum {
                field: "catalog_ttl",
                value: format!("{}ms", self.catalog_ttl.as_millis()),
                min: "1s".to_owned(),
            });
        }
        if self.catalog_capacity == 0 {
            return Err(ConfigError::BelowMinimum {
                field: "catalog_capacity",
                value: "0".to_owned(),
                min: "1".to_owned(),
            });
        }

        Ok(InfluxConfig {
            url,
            org,
            bucket,
            token,
            timeout: self.timeout,
            catalog_ttl: self.catalog_ttl,
            catalog_capacity: self.catalog_capacity,
            identity_marker: self.identity_marker,
        })
    }
}

fn required(value: Option<String>, field: &'static str) -> Result<String, ConfigError> {
    match value {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(ConfigError::Missing { field }),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rstest::rstest;

    use super::*;

    fn valid() -> InfluxConfigBuilder {
        InfluxConfig::builder()
            .url("http://localhost:9999")
            .org("acme")
            .bucket("metrics")
            .token("secret")
    }

    #[test]
    fn valid_config_builds_with_defaults() {
        let config = valid().build().unwrap();
        assert_eq!(config.url(), "http://localhost:9999");
        assert_eq!(config.timeout(), Duration::from_secs(30));
        assert_eq!(config.catalog_ttl(), Duration::from_secs(60));
        assert_eq!(config.catalog_capacity(), 16);
        assert_eq!(config.identity_marker(), "resourceId");
    }

    #[rstest]
    #[case::url("url")]
    #[case::org("org")]
    #[case::bucket("bucket")]
    #[case::token("token")]
    fn missing_required_field_is_rejected(#[case] field: &str) {
        let builder = match field {
            "url" => InfluxConfig::builder().org("o").bucket("b").token("t"),
            "org" => InfluxConfig::builder().url("u").bucket("b").token("t"),
            "bucket" => InfluxConfig::builder().url("u").org("o").token("t"),
            _ => InfluxConfig::builder().url("u").org("o").bucket("b"),
        };
        let err = builder.build().unwrap_err();
        assert!(err.to_string().contains(field), "{err}");
    }

    #[test]
    fn empty_required_field_is_rejected() {
        let result = valid().token("").build();
        assert!(result.is_err());
    }

    #[test]
    fn short_catalog_ttl_is_rejected() {
        let result = valid().catalog_ttl(Duration::from_millis(500)).build();
        assert!(result.is_err());
    }

    #[test]
    fn zero_catalog_capacity_is_rejected() {
        let result = valid().catalog_capacity(0).build();
        assert!(result.is_err());
    }

    #[test]
    fn debug_redacts_token() {
        let config = valid().build().unwrap();
        let debug = format!("{config:?}");
        assert!(!debug.contains("secret"));
        assert!(debug.contains("<redacted>"));
    }
}
