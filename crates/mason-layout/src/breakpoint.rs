#![forbid(unsafe_code)]

//! Breakpoint rules: a media query paired with the column count it selects.

use crate::columns::ColumnCount;
use crate::error::ConfigError;
use serde::Serialize;

/// A validated `(query, columns)` rule.
///
/// Rules are not required to be mutually exclusive. When two queries are
/// true at once, the resolver keeps whichever fired last.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct MasonryBreakpoint {
    query: String,
    columns: ColumnCount,
}

impl MasonryBreakpoint {
    /// Build a rule, rejecting an empty query or zero columns.
    pub fn new(query: impl Into<String>, columns: usize) -> Result<Self, ConfigError> {
        let query = query.into();
        if query.trim().is_empty() {
            return Err(ConfigError::EmptyQuery);
        }
        let columns = ColumnCount::new(columns)
            .map_err(|_| ConfigError::ZeroBreakpointColumns { query: query.clone() })?;
        Ok(Self { query, columns })
    }

    /// The media query string.
    #[must_use]
    pub fn query(&self) -> &str {
        &self.query
    }

    /// The column count selected while the query matches.
    #[must_use]
    pub fn columns(&self) -> ColumnCount {
        self.columns
    }
}
