//! Cache module for the upstream sheet rows
//!
//! This module provides an in-memory cache cell with a fixed TTL (time-to-live).
//! It supports graceful degradation by keeping expired entries readable, so the
//! proxy can serve stale rows when the sheet API is unavailable.

mod cell;

pub use cell::{CacheCell, CachedData, Lookup};
