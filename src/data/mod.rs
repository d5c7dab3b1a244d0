//! Core data models for the shipment proxy
//!
//! Rows arrive from the sheet API as open JSON objects. Their shape is owned by
//! the spreadsheet, so a `Record` stays a generic ordered mapping and only the
//! keys used for filtering are named here.

pub mod sheet;

pub use sheet::{RowSource, SheetClient, SheetError};

use serde::Serialize;
use serde_json::{json, Map, Value};

/// A single sheet row: field name to string/number value, in sheet column order
pub type Record = Map<String, Value>;

/// Column holding the sales team (e.g. "HCM", "Hà Nội")
pub const TEAM_FIELD: &str = "Team";

/// Column holding the delivery status
pub const STATUS_FIELD: &str = "Trạng thái giao hàng";

/// Column holding the target market
pub const MARKET_FIELD: &str = "Thị trường";

/// Column holding the product name
pub const PRODUCT_FIELD: &str = "Mặt hàng";

/// Where the rows of a response came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DataSource {
    /// Fetched from the sheet API during this request
    Network,
    /// Served from the cache within its TTL
    Cache,
    /// Served from an expired cache entry after the upstream failed
    Stale,
    /// Upstream failed with nothing cached; fixed sample rows
    Mock,
}

impl DataSource {
    /// Whether the rows were served out of the cache cell
    pub fn is_cached(self) -> bool {
        matches!(self, DataSource::Cache | DataSource::Stale)
    }
}

/// Returns a field of a record as comparable text.
///
/// Strings are returned verbatim, numbers and booleans in their JSON form.
/// Missing fields, nulls, arrays and objects yield `None`.
pub fn field_text(record: &Record, field: &str) -> Option<String> {
    match record.get(field)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// The fixed two-row dataset served when neither upstream nor cache can answer
pub fn mock_records() -> Vec<Record> {
    let rows = [
        json!({
            "Mã đơn hàng": "MOCK-0001",
            "Ngày lên đơn": "2024-01-15",
            "Name*": "Nguyễn Văn A",
            "Phone*": "0900000001",
            TEAM_FIELD: "HCM",
            STATUS_FIELD: "Đang giao",
            MARKET_FIELD: "Việt Nam",
            PRODUCT_FIELD: "Sản phẩm A",
            "Tổng tiền VNĐ": 1_500_000
        }),
        json!({
            "Mã đơn hàng": "MOCK-0002",
            "Ngày lên đơn": "2024-01-16",
            "Name*": "Trần Thị B",
            "Phone*": "0900000002",
            TEAM_FIELD: "Hà Nội",
            STATUS_FIELD: "Giao thành công",
            MARKET_FIELD: "Việt Nam",
            PRODUCT_FIELD: "Sản phẩm B",
            "Tổng tiền VNĐ": 2_300_000
        }),
    ];

    rows.into_iter()
        .filter_map(|row| match row {
            Value::Object(map) => Some(map),
            _ => None,
        })
        .collect()
}
