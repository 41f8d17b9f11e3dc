//! HTTP implementation of [`InfluxApi`] over the InfluxDB v2 REST API.
//!
//! Three endpoints:
//!
//! - `POST /api/v2/write` — line protocol body, millisecond precision
//! - `POST /api/v2/query` — Flux in a JSON body, annotated-CSV response
//! - `POST /api/v2/delete` — JSON body with predicate and time window
//!
//! The client session is created once at construction and owned for the
//! adapter's lifetime; dropping the [`HttpApi`] releases it.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde_json::json;
use tracing::info;

use timeseries_storage::{StorageError, StorageResult};

use crate::{
    client::{DataPoint, FluxRecord, InfluxApi},
    config::InfluxConfig,
};

/// The delete endpoint requires an explicit time window; these bounds
/// cover everything a delete-by-measurement should remove.
const DELETE_START: &str = "1970-01-01T00:00:00Z";
const DELETE_STOP: &str = "2200-01-01T00:00:00Z";

/// InfluxDB v2 REST client.
pub struct HttpApi {
    http: reqwest::Client,
    url: String,
    org: String,
    bucket: String,
    token: String,
}

impl HttpApi {
    /// Creates a client from the given configuration.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Config`] if the underlying HTTP client
    /// cannot be constructed.
    pub fn new(config: &InfluxConfig) -> StorageResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|err| StorageError::config(format!("HTTP client: {err}")))?;

        info!(url = %config.url(), bucket = %config.bucket(), "initialized InfluxDB client");
        Ok(Self {
            http,
            url: config.url().trim_end_matches('/').to_owned(),
            org: config.org().to_owned(),
            bucket: config.bucket().to_owned(),
            token: config.token().to_owned(),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.url)
    }

    fn auth_header(&self) -> String {
        format!("Token {}", self.token)
    }

    /// Converts a transport error, distinguishing timeouts.
    fn transport_error(operation: &str, err: reqwest::Error) -> StorageError {
        if err.is_timeout() {
            StorageError::timeout()
        } else {
            StorageError::backend_with_source(format!("{operation} request failed"), err)
        }
    }

    /// Converts a non-success response into an error carrying the status
    /// and the response body.
    async fn status_error(operation: &str, response: reqwest::Response) -> StorageError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        StorageError::backend(format!("{operation} returned {status}: {body}"))
    }
}

#[async_trait]
impl InfluxApi for HttpApi {
    async fn write_point(&self, point: &DataPoint) -> StorageResult<()> {
        let response = self
            .http
            .post(self.endpoint("/api/v2/write"))
            .query(&[
                ("org", self.org.as_str()),
                ("bucket", self.bucket.as_str()),
                ("precision", "ms"),
            ])
            .header(reqwest::header::AUTHORIZATION, self.auth_header())
            .header(reqwest::header::CONTENT_TYPE, "text/plain; charset=utf-8")
            .body(point.line_protocol())
            .send()
            .await
            .map_err(|err| Self::transport_error("write", err))?;

        if !response.status().is_success() {
            return Err(Self::status_error("write", response).await);
        }
        Ok(())
    }

    async fn query(&self, flux: &str) -> StorageResult<Vec<FluxRecord>> {
        let body = json!({
            "query": flux,
            "type": "flux",
            "dialect": { "header": true, "annotations": [] },
        });

        let response = self
            .http
            .post(self.endpoint("/api/v2/query"))
            .query(&[("org", self.org.as_str())])
            .header(reqwest::header::AUTHORIZATION, self.auth_header())
            .header(reqwest::header::ACCEPT, "application/csv")
            .json(&body)
            .send()
            .await
            .map_err(|err| Self::transport_error("query", err))?;

        if !response.status().is_success() {
            return Err(Self::status_error("query", response).await);
        }

        let text = response.text().await.map_err(|err| Self::transport_error("query", err))?;
        Ok(parse_csv_tables(&text))
    }

    async fn delete(&self, predicate: &str) -> StorageResult<()> {
        let body = json!({
            "start": DELETE_START,
            "stop": DELETE_STOP,
            "predicate": predicate,
        });

        let response = self
            .http
            .post(self.endpoint("/api/v2/delete"))
            .query(&[("org", self.org.as_str()), ("bucket", self.bucket.as_str())])
            .header(reqwest::header::AUTHORIZATION, self.auth_header())
            .json(&body)
            .send()
            .await
            .map_err(|err| Self::transport_error("delete", err))?;

        if !response.status().is_success() {
            return Err(Self::status_error("delete", response).await);
        }
        Ok(())
    }
}

impl std::fmt::Debug for HttpApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpApi")
            .field("url", &self.url)
            .field("org", &self.org)
            .field("bucket", &self.bucket)
            .finish_non_exhaustive()
    }
}

/// Parses an annotated-CSV query response into flat records.
///
/// The response may contain several tables, each with its own header row,
/// separated by blank lines. Annotation rows start with `#` and are
/// skipped (annotations are not requested, but servers may send them).
/// Columns with an empty header name — the leading annotation column —
/// are dropped.
fn parse_csv_tables(text: &str) -> Vec<FluxRecord> {
    let mut records = Vec::new();
    let mut header: Option<Vec<String>> = None;

    for line in text.lines() {
        let line = line.trim_end_matches('\r');
        if line.is_empty() {
            header = None;
            continue;
        }
        if line.starts_with('#') {
            continue;
        }

        let fields = split_csv_line(line);
        match &header {
            None => header = Some(fields),
            Some(columns) => {
                let values: BTreeMap<String, String> = columns
                    .iter()
                    .zip(fields)
                    .filter(|(column, _)| !column.is_empty())
                    .map(|(column, field)| (column.clone(), field))
                    .collect();
                records.push(FluxRecord::from_values(values));
            },
        }
    }
    records
}

/// Splits one CSV line, honoring double-quoted fields with `""` escapes.
fn split_csv_line(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            if c == '"' {
                if chars.peek() == Some(&'"') {
                    current.push('"');
                    chars.next();
                } else {
                    in_quotes = false;
                }
            } else {
                current.push(c);
            }
        } else {
            match c {
                '"' => in_quotes = true,
                ',' => fields.push(std::mem::take(&mut current)),
                _ => current.push(c),
            }
        }
    }
    fields.push(current);
    fields
}
