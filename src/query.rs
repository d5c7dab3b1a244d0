//! Query parsing, filtering and pagination for sheet rows
//!
//! Filters and pagination are applied after the rows are obtained, so they work
//! the same on fresh, cached, stale or mock data.

use serde::Serialize;

use crate::data::{field_text, Record, MARKET_FIELD, PRODUCT_FIELD, STATUS_FIELD, TEAM_FIELD};

/// Page used when none (or an unusable one) is given
pub const DEFAULT_PAGE: usize = 1;

/// Page size used when none (or an unusable one) is given
pub const DEFAULT_LIMIT: usize = 100;

/// Largest page size a caller may request
pub const MAX_LIMIT: usize = 1000;

/// Filter value meaning "no filter" for team and status
const ALL: &str = "all";

/// Parsed request parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryParams {
    /// 1-based page number
    pub page: usize,
    /// Rows per page
    pub limit: usize,
    /// Exact match on the team column
    pub team: Option<String>,
    /// Exact match on the status column
    pub status: Option<String>,
    /// Allowed markets; empty means any
    pub market: Vec<String>,
    /// Allowed products; empty means any
    pub product: Vec<String>,
}

impl Default for QueryParams {
    fn default() -> Self {
        Self {
            page: DEFAULT_PAGE,
            limit: DEFAULT_LIMIT,
            team: None,
            status: None,
            market: Vec::new(),
            product: Vec::new(),
        }
    }
}

/// One page of filtered rows
#[derive(Debug, Clone, Serialize)]
pub struct Page {
    /// The page that was requested
    pub page: usize,
    /// Rows on this page
    pub items: Vec<Record>,
    /// Row count after filtering, before pagination
    pub total: usize,
    /// Number of pages at the requested limit
    pub total_pages: usize,
}

impl QueryParams {
    /// Parses a raw query string such as `page=2&limit=50&market=VN&market=TH`.
    ///
    /// `market` and `product` may repeat, and also accept the `market[]` form.
    /// For `team` and `status` the last occurrence wins. Missing, non-numeric,
    /// zero or negative `page`/`limit` fall back to the defaults, and `limit`
    /// is capped at [`MAX_LIMIT`]. Blank values are ignored.
    pub fn from_query(query: &str) -> Self {
        let mut params = Self::default();

        for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
            let value = value.trim();
            if value.is_empty() {
                continue;
            }

            match key.trim_end_matches("[]") {
                "page" => params.page = parse_positive(value).unwrap_or(DEFAULT_PAGE),
                "limit" => {
                    params.limit = parse_positive(value)
                        .map(|limit| limit.min(MAX_LIMIT))
                        .unwrap_or(DEFAULT_LIMIT)
                }
                "team" => params.team = Some(value.to_string()),
                "status" => params.status = Some(value.to_string()),
                "market" => params.market.push(value.to_string()),
                "product" => params.product.push(value.to_string()),
                _ => {}
            }
        }

        params
    }

    /// Whether a record passes every active filter
    pub fn matches(&self, record: &Record) -> bool {
        equals_filter(record, TEAM_FIELD, self.team.as_deref())
            && equals_filter(record, STATUS_FIELD, self.status.as_deref())
            && member_filter(record, MARKET_FIELD, &self.market)
            && member_filter(record, PRODUCT_FIELD, &self.product)
    }

    /// Filters `records` and cuts out the requested page.
    ///
    /// `start = (page-1)*limit`, `end = start+limit`, clamped to the filtered
    /// length. A page past the end is empty. No sorting is applied. A `limit`
    /// of zero is treated as one.
    pub fn apply(&self, records: &[Record]) -> Page {
        let filtered: Vec<&Record> = records.iter().filter(|r| self.matches(r)).collect();
        let total = filtered.len();

        let limit = self.limit.max(1);
        let start = self.page.saturating_sub(1).saturating_mul(limit);
        let items = filtered
            .into_iter()
            .skip(start)
            .take(limit)
            .cloned()
            .collect();

        Page {
            page: self.page,
            items,
            total,
            total_pages: total.div_ceil(limit),
        }
    }
}

fn parse_positive(value: &str) -> Option<usize> {
    value.parse::<usize>().ok().filter(|n| *n > 0)
}

fn equals_filter(record: &Record, field: &str, wanted: Option<&str>) -> bool {
    match wanted {
        None | Some(ALL) => true,
        Some(wanted) => field_text(record, field).as_deref() == Some(wanted),
    }
}

fn member_filter(record: &Record, field: &str, allowed: &[String]) -> bool {
    if allowed.is_empty() {
        return true;
    }
    match field_text(record, field) {
        Some(value) => allowed.iter().any(|a| *a == value),
        None => false,
    }
}
