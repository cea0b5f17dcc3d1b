//! Clubbook - investment club bookkeeping
//!
//! This library ingests brokerage CSV exports (trade history, position
//! snapshots, live prices) and manual entries, normalizes them into a SQLite
//! ledger of trades, contributions and snapshots, and keeps a short-lived
//! cache of live market quotes.

pub mod db;
pub mod error;
pub mod ingest;
pub mod quotes;
pub mod sheets;
pub mod utils;
