//! Storage error types and result alias.
//!
//! All backends map their internal failures to [`StorageError`]. Callers
//! cannot meaningfully recover differently per cause at this layer, so the
//! taxonomy is deliberately small: configuration failures (fatal at
//! construction), backend failures (any write/query/delete that did not
//! complete), and timeouts.
//!
//! # Example
//!
//! ```
//! use timeseries_storage::{StorageError, StorageResult};
//!
//! fn unreachable_backend() -> StorageResult<()> {
//!     Err(StorageError::backend("connection refused"))
//! }
//! ```

use std::sync::Arc;

use thiserror::Error;

/// A shared boxed error type for source chain tracking.
pub type BoxError = Arc<dyn std::error::Error + Send + Sync>;

/// Result type alias for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur during time-series storage operations.
///
/// Errors preserve their source chain via the `#[source]` attribute, so
/// debugging tools can display the full context.
///
/// # Non-exhaustive
///
/// New variants may be added in future minor releases without a
/// semver-breaking change. Downstream match expressions must include a
/// wildcard arm (`_ =>`).
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    /// A required connection parameter is missing or invalid.
    ///
    /// Raised at construction time; there is no point retrying.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration problem.
        message: String,
    },

    /// A write, query, or delete call against the backend failed.
    ///
    /// Covers connection failures, rejected queries, and non-success
    /// responses alike. There is no internal retry and no partial result.
    #[error("Backend error: {message}")]
    Backend {
        /// Description of the failure.
        message: String,
        /// The underlying error, when one exists.
        #[source]
        source: Option<BoxError>,
    },

    /// The operation exceeded its configured time limit.
    #[error("Operation timeout")]
    Timeout,
}

impl StorageError {
    /// Creates a new `Config` error with the given message.
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config { message: message.into() }
    }

    /// Creates a new `Backend` error with the given message.
    #[must_use]
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend { message: message.into(), source: None }
    }

    /// Creates a new `Backend` error with a message and source error.
    #[must_use]
    pub fn backend_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Backend { message: message.into(), source: Some(Arc::new(source)) }
    }

    /// Creates a new `Backend` error from an already-shared source.
    ///
    /// Single-flight reloads hand the same failure to every waiter as an
    /// `Arc`; this constructor preserves that sharing instead of
    /// re-boxing.
    #[must_use]
    pub fn backend_with_shared_source(message: impl Into<String>, source: BoxError) -> Self {
        Self::Backend { message: message.into(), source: Some(source) }
    }

    /// Creates a new `Timeout` error.
    #[must_use]
    pub fn timeout() -> Self {
        Self::Timeout
    }
}

/// Validation errors raised while building a configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required field was not provided or is empty.
    #[error("{field} is required and cannot be empty")]
    Missing {
        /// Name of the missing field.
        field: &'static str,
    },

    /// A field value is below its allowed minimum.
    #[error("{field} must be at least {min}, got {value}")]
    BelowMinimum {
        /// Name of the offending field.
        field: &'static str,
        /// The rejected value, formatted for display.
        value: String,
        /// The minimum allowed value, formatted for display.
        min: String,
    },
}

impl From<ConfigError> for StorageError {
    fn from(err: ConfigError) -> Self {
        StorageError::config(err.to_string())
    }
}
