//! Stale-while-revalidate proxy over the sheet API
//!
//! Layers the cache cell over an upstream [`RowSource`] and adds the last
//! resort: a fixed mock dataset when neither upstream nor cache can answer.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::cache::{CacheCell, Lookup};
use crate::data::{mock_records, DataSource, Record, RowSource, SheetError};

/// Rows obtained for one request, with where they came from
#[derive(Debug, Clone)]
pub struct Fetched {
    /// Unfiltered rows, shared with the cache when they came from it
    pub rows: Arc<Vec<Record>>,
    /// Which fallback layer produced the rows
    pub source: DataSource,
}

/// Cached fetch proxy
///
/// Owns its cache cell, so the hosting process decides its lifetime. One
/// instance is shared by all requests.
#[derive(Debug)]
pub struct VanDonProxy<S> {
    source: S,
    cache: CacheCell,
    /// Whether [`VanDonProxy::load`] may fall back to mock rows
    mock_fallback: bool,
}

impl<S: RowSource> VanDonProxy<S> {
    /// Creates a proxy over `source` with the mock fallback enabled
    pub fn new(source: S, cache: CacheCell) -> Self {
        Self {
            source,
            cache,
            mock_fallback: true,
        }
    }

    /// Enables or disables the mock dataset as the final fallback
    pub fn with_mock_fallback(mut self, enabled: bool) -> Self {
        self.mock_fallback = enabled;
        self
    }

    /// The cache cell backing this proxy
    pub fn cache(&self) -> &CacheCell {
        &self.cache
    }

    /// Returns the sheet rows, from cache when fresh.
    ///
    /// # Behavior
    /// - Fresh cache: returned without an upstream call
    /// - Otherwise fetches upstream and replaces the cache on success
    /// - On upstream failure returns the expired cache entry if available
    /// - Returns the upstream error only when nothing was ever cached
    pub async fn get_data(&self) -> Result<Fetched, SheetError> {
        let lookup = self
            .cache
            .get_or_refresh(|| self.source.fetch_rows())
            .await?;

        let fetched = match lookup {
            Lookup::Fresh(rows) => {
                debug!(rows = rows.len(), "cache hit");
                Fetched {
                    rows,
                    source: DataSource::Cache,
                }
            }
            Lookup::Refreshed(rows) => {
                info!(rows = rows.len(), "refreshed rows from sheet API");
                Fetched {
                    rows,
                    source: DataSource::Network,
                }
            }
            Lookup::Stale(rows) => {
                warn!(rows = rows.len(), "sheet API unavailable, serving stale cache");
                Fetched {
                    rows,
                    source: DataSource::Stale,
                }
            }
        };

        Ok(fetched)
    }

    /// Like [`get_data`](Self::get_data), but substitutes the mock dataset on
    /// failure unless the mock fallback is disabled.
    pub async fn load(&self) -> Result<Fetched, SheetError> {
        match self.get_data().await {
            Ok(fetched) => Ok(fetched),
            Err(err) if self.mock_fallback => {
                warn!(error = %err, "sheet API unavailable and cache empty, serving mock rows");
                Ok(Fetched {
                    rows: Arc::new(mock_records()),
                    source: DataSource::Mock,
                })
            }
            Err(err) => {
                warn!(error = %err, "sheet API unavailable and cache empty");
                Err(err)
            }
        }
    }
}
