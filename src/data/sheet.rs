//! Sheet API client
//!
//! Fetches shipment rows for a named sheet from the spreadsheet-backed HTTP API
//! and unwraps the payload into plain records.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde_json::Value;
use thiserror::Error;

use super::Record;

/// Base URL of the sheet data API
pub const DEFAULT_SHEET_API_URL: &str = "https://sheet-api.example.com/api/sheet-data";

/// Sheet holding the shipment (vận đơn) rows
pub const DEFAULT_SHEET_NAME: &str = "Van Don";

/// Upper bound for a single upstream request, in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 15;

/// Upper bound for a single upstream request
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(DEFAULT_TIMEOUT_SECS);

/// Errors that can occur when fetching sheet rows
///
/// Cloneable so one failed refresh can be reported to every caller waiting on it.
#[derive(Debug, Clone, Error)]
pub enum SheetError {
    /// Transport failure or timeout
    #[error("HTTP request failed: {0}")]
    Network(#[source] Arc<reqwest::Error>),

    /// The API answered with a non-2xx status
    #[error("Sheet API returned HTTP {0}")]
    HttpStatus(StatusCode),

    /// The body was not JSON, or held no row array
    #[error("Unexpected sheet API response: {0}")]
    Format(String),

    /// The API reported an error in its payload
    #[error("Sheet API error: {0}")]
    Upstream(String),
}

impl From<reqwest::Error> for SheetError {
    fn from(err: reqwest::Error) -> Self {
        SheetError::Network(Arc::new(err))
    }
}

/// Anything that can produce the full set of sheet rows.
///
/// The proxy is generic over this so the real HTTP client can be swapped for a
/// fake in tests.
pub trait RowSource: Send + Sync + 'static {
    /// Fetches every row, with no filtering applied
    fn fetch_rows(&self) -> impl Future<Output = Result<Vec<Record>, SheetError>> + Send;
}

/// Client for the sheet data API
#[derive(Debug, Clone)]
pub struct SheetClient {
    /// HTTP client, built with the request timeout
    http_client: Client,
    /// Endpoint URL (allows override for testing)
    base_url: String,
    /// Sheet to request rows for
    sheet: String,
}

impl SheetClient {
    /// Creates a client for the default endpoint and sheet
    pub fn new() -> Result<Self, SheetError> {
        Self::with_endpoint(DEFAULT_SHEET_API_URL, DEFAULT_SHEET_NAME, DEFAULT_TIMEOUT)
    }

    /// Creates a client for a custom endpoint, sheet and timeout
    pub fn with_endpoint(
        base_url: impl Into<String>,
        sheet: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, SheetError> {
        let http_client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http_client,
            base_url: base_url.into(),
            sheet: sheet.into(),
        })
    }

    /// The sheet this client reads
    pub fn sheet(&self) -> &str {
        &self.sheet
    }

    /// Fetches all rows of the sheet
    ///
    /// # Returns
    /// * `Ok(Vec<Record>)` - the unwrapped row array
    /// * `Err(SheetError)` - transport failure, timeout, non-2xx status,
    ///   malformed body or an error reported by the API
    pub async fn fetch(&self) -> Result<Vec<Record>, SheetError> {
        let response = self
            .http_client
            .get(&self.base_url)
            .query(&[("sheet", self.sheet.as_str())])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(SheetError::HttpStatus(status));
        }

        let body = response.text().await?;
        let payload: Value = serde_json::from_str(&body)
            .map_err(|e| SheetError::Format(format!("body is not JSON: {}", e)))?;

        unwrap_rows(payload)
    }
}

impl RowSource for SheetClient {
    async fn fetch_rows(&self) -> Result<Vec<Record>, SheetError> {
        self.fetch().await
    }
}

/// Extracts the row array from an API payload.
///
/// Accepts `{ "rows": [...] }`, `{ "data": [...] }` or a bare array. An object
/// with a non-null `error` field is reported as [`SheetError::Upstream`].
/// Array elements that are not objects are skipped.
pub fn unwrap_rows(payload: Value) -> Result<Vec<Record>, SheetError> {
    let rows = match payload {
        Value::Array(rows) => rows,
        Value::Object(mut object) => {
            match object.remove("error") {
                None | Some(Value::Null) => {}
                Some(Value::String(message)) => return Err(SheetError::Upstream(message)),
                Some(other) => return Err(SheetError::Upstream(other.to_string())),
            }

            match object.remove("rows").or_else(|| object.remove("data")) {
                Some(Value::Array(rows)) => rows,
                Some(_) => {
                    return Err(SheetError::Format("row field is not an array".to_string()))
                }
                None => {
                    return Err(SheetError::Format(
                        "expected `rows` or `data` array".to_string(),
                    ))
                }
            }
        }
        other => {
            return Err(SheetError::Format(format!(
                "expected an array or object, got {}",
                json_kind(&other)
            )))
        }
    };

    Ok(rows
        .into_iter()
        .filter_map(|row| match row {
            Value::Object(record) => Some(record),
            _ => None,
        })
        .collect())
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
