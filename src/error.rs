//! Error handling for Clubbook
//!
//! Defines custom error types and establishes a unified Result type
//! using anyhow for context chaining and error propagation.

use thiserror::Error;

/// Upstream collaborator errors (quote API, sheet fetch). Import and
/// database failures carry enough context as plain anyhow chains.
#[derive(Error, Debug)]
pub enum ClubError {
    #[error("quote error: {0}")]
    QuoteError(String),

    #[error("sheet error: {0}")]
    SheetError(String),
}

/// Result type alias for ledger operations
pub type Result<T> = anyhow::Result<T>;
