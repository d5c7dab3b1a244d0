//! In-memory cache cell for the sheet rows
//!
//! Holds the last successful upstream payload together with its fetch time.
//! Expired entries stay readable so a failed refresh can fall back to them.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use chrono::{DateTime, Duration, Utc};
use tokio::sync::Mutex;

use crate::data::{Record, SheetError};

/// The populated state of the cell. Rows and timestamp are always set together.
#[derive(Debug, Clone)]
struct CacheEntry {
    /// The cached rows, shared read-only with in-flight requests
    rows: Arc<Vec<Record>>,
    /// When the rows were fetched
    fetched_at: DateTime<Utc>,
}

/// Outcome of the most recent refresh, guarded by the refresh gate
#[derive(Debug)]
struct LastAttempt<E> {
    /// Number of finished refresh attempts
    generation: u64,
    outcome: Option<Result<Arc<Vec<Record>>, E>>,
}

/// Result of reading from the cell, including freshness metadata
#[derive(Debug, Clone)]
pub struct CachedData {
    /// The cached rows
    pub rows: Arc<Vec<Record>>,
    /// When the rows were originally fetched
    pub cached_at: DateTime<Utc>,
    /// Whether the entry is older than the TTL
    pub is_expired: bool,
}

/// Outcome of [`CacheCell::get_or_refresh`]
#[derive(Debug, Clone)]
pub enum Lookup {
    /// Served from the cell without an upstream call of our own
    Fresh(Arc<Vec<Record>>),
    /// Freshly fetched and stored
    Refreshed(Arc<Vec<Record>>),
    /// The refresh failed and an expired entry was served instead
    Stale(Arc<Vec<Record>>),
}

/// A single process-wide slot holding the last fetched rows
///
/// The slot is either empty or fully populated, and it is only ever replaced
/// wholesale. Refreshes are gated so simultaneous misses share one upstream
/// call, and its outcome, instead of each fetching on their own.
#[derive(Debug)]
pub struct CacheCell<E = SheetError> {
    /// Current entry, `None` until the first successful fetch
    slot: RwLock<Option<CacheEntry>>,
    /// How long an entry is considered fresh
    ttl: Duration,
    /// Copy of `LastAttempt::generation`, readable before queueing on the gate
    attempts: AtomicU64,
    /// Held while a refresh is in flight
    refresh_gate: Mutex<LastAttempt<E>>,
}

impl<E: Clone> CacheCell<E> {
    /// Creates an empty cell with the given TTL
    pub fn new(ttl: std::time::Duration) -> Self {
        Self {
            slot: RwLock::new(None),
            ttl: Duration::from_std(ttl).unwrap_or(Duration::MAX),
            attempts: AtomicU64::new(0),
            refresh_gate: Mutex::new(LastAttempt {
                generation: 0,
                outcome: None,
            }),
        }
    }

    /// The configured TTL
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Reads the current entry, expired or not
    ///
    /// Returns `None` if nothing has been fetched yet.
    pub fn read(&self) -> Option<CachedData> {
        let slot = self.slot.read().unwrap_or_else(PoisonError::into_inner);
        slot.as_ref().map(|entry| CachedData {
            rows: Arc::clone(&entry.rows),
            cached_at: entry.fetched_at,
            is_expired: !self.is_fresh(entry.fetched_at),
        })
    }

    /// Replaces the entry with new rows stamped with the current time
    pub fn write(&self, rows: Vec<Record>) -> Arc<Vec<Record>> {
        let rows = Arc::new(rows);
        let entry = CacheEntry {
            rows: Arc::clone(&rows),
            fetched_at: Utc::now(),
        };
        *self.slot.write().unwrap_or_else(PoisonError::into_inner) = Some(entry);
        rows
    }

    /// Returns fresh rows, refreshing through `fetcher` when needed.
    ///
    /// 1. Fresh entry: returned without calling `fetcher`
    /// 2. Otherwise queue on the refresh gate. If an attempt finished while
    ///    we were queued, its outcome is shared instead of fetching again, so
    ///    no caller waits longer than one upstream call
    /// 3. Call `fetcher`; on success store and return the rows
    /// 4. On failure return the expired entry if there is one, else the error
    pub async fn get_or_refresh<F, Fut>(&self, fetcher: F) -> Result<Lookup, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Vec<Record>, E>>,
    {
        if let Some(rows) = self.fresh_rows() {
            return Ok(Lookup::Fresh(rows));
        }

        let seen = self.attempts.load(Ordering::Acquire);
        let mut last = self.refresh_gate.lock().await;

        if let Some(rows) = self.fresh_rows() {
            return Ok(Lookup::Fresh(rows));
        }

        if last.generation != seen {
            match &last.outcome {
                Some(Ok(rows)) => return Ok(Lookup::Fresh(Arc::clone(rows))),
                Some(Err(err)) => return self.stale_or(err.clone()),
                None => {}
            }
        }

        let outcome = fetcher().await.map(|rows| self.write(rows));

        last.generation += 1;
        last.outcome = Some(outcome.clone());
        self.attempts.store(last.generation, Ordering::Release);

        match outcome {
            Ok(rows) => Ok(Lookup::Refreshed(rows)),
            Err(err) => self.stale_or(err),
        }
    }

    fn stale_or(&self, err: E) -> Result<Lookup, E> {
        match self.read() {
            Some(stale) => Ok(Lookup::Stale(stale.rows)),
            None => Err(err),
        }
    }

    fn fresh_rows(&self) -> Option<Arc<Vec<Record>>> {
        self.read()
            .filter(|cached| !cached.is_expired)
            .map(|cached| cached.rows)
    }

    fn is_fresh(&self, fetched_at: DateTime<Utc>) -> bool {
        Utc::now() - fetched_at < self.ttl
    }
}
