//! Vandon shipment proxy library
//!
//! This module exposes the proxy, query and server modules for use in integration tests.

pub mod cache;
pub mod cli;
pub mod data;
pub mod proxy;
pub mod query;
pub mod server;
