#![forbid(unsafe_code)]

//! Configuration errors.
//!
//! Only construction-time validation can fail. A layout pass itself never
//! returns an error: degenerate measurements produce a degenerate layout.

use thiserror::Error;

/// A caller contract violation detected at the configuration boundary.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// A column count of zero was supplied.
    #[error("column count must be at least 1")]
    ZeroColumns,
    /// A breakpoint was declared with an empty query string.
    #[error("breakpoint query must not be empty")]
    EmptyQuery,
    /// A breakpoint was declared with zero columns.
    #[error("breakpoint `{query}` declares zero columns")]
    ZeroBreakpointColumns { query: String },
    /// Neither breakpoints nor a default column count were configured.
    #[error("no breakpoints and no default column count configured")]
    NoColumnSource,
    /// The configuration document could not be decoded.
    #[error("invalid layout config: {0}")]
    Parse(String),
}

impl From<serde_json::Error> for ConfigError {
    fn from(err: serde_json::Error) -> Self {
        Self::Parse(err.to_string())
    }
}
