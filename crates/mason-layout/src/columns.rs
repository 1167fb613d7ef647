#![forbid(unsafe_code)]

//! Column selection over a column-height vector.
//!
//! A column-height vector holds the running bottom offset of every column
//! at some point during a pass. Placement always goes to the
//! [`shortest`] column; the container is as tall as the [`longest`].
//!
//! # Invariants
//!
//! 1. Both selectors return the *first* index among equal candidates.
//! 2. Both run in O(columns) and never allocate.
//! 3. For a non-empty slice the returned index is always in bounds.
//!
//! # Failure Modes
//!
//! An empty slice has no meaningful answer; both functions return `0`.
//! The engine never calls them with an empty slice because
//! [`ColumnCount`] cannot be zero.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::num::NonZeroUsize;

/// Index of the shortest column, lowest index on ties.
#[must_use]
pub fn shortest(heights: &[f64]) -> usize {
    let mut best = 0;
    let mut record = f64::INFINITY;
    for (i, &h) in heights.iter().enumerate() {
        if h < record {
            record = h;
            best = i;
        }
    }
    best
}

/// Index of the longest column, lowest index on ties.
#[must_use]
pub fn longest(heights: &[f64]) -> usize {
    let mut best = 0;
    let mut record = f64::NEG_INFINITY;
    for (i, &h) in heights.iter().enumerate() {
        if h > record {
            record = h;
            best = i;
        }
    }
    best
}

/// A column count that is always at least one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "usize", into = "usize")]
pub struct ColumnCount(NonZeroUsize);

impl ColumnCount {
    /// A single column.
    pub const ONE: Self = Self(NonZeroUsize::MIN);

    /// Validate a raw column count.
    pub fn new(columns: usize) -> Result<Self, ConfigError> {
        NonZeroUsize::new(columns)
            .map(Self)
            .ok_or(ConfigError::ZeroColumns)
    }

    /// The raw count.
    #[must_use]
    pub const fn get(self) -> usize {
        self.0.get()
    }
}

impl Default for ColumnCount {
    fn default() -> Self {
        Self::ONE
    }
}

impl TryFrom<usize> for ColumnCount {
    type Error = ConfigError;

    fn try_from(columns: usize) -> Result<Self, Self::Error> {
        Self::new(columns)
    }
}

impl From<ColumnCount> for usize {
    fn from(columns: ColumnCount) -> Self {
        columns.get()
    }
}

impl From<NonZeroUsize> for ColumnCount {
    fn from(columns: NonZeroUsize) -> Self {
        Self(columns)
    }
}

impl fmt::Display for ColumnCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shortest_picks_minimum() {
        assert_eq!(shortest(&[50.0, 30.0, 20.0]), 2);
        assert_eq!(shortest(&[10.0, 30.0, 20.0]), 0);
    }

    #[test]
    fn shortest_ties_go_to_lowest_index() {
        assert_eq!(shortest(&[0.0, 0.0, 0.0]), 0);
        assert_eq!(shortest(&[50.0, 30.0, 30.0]), 1);
    }

    #[test]
    fn longest_picks_maximum() {
        assert_eq!(longest(&[50.0, 30.0, 30.0]), 0);
        assert_eq!(longest(&[5.0, 30.0, 7.0]), 1);
    }

    #[test]
    fn longest_ties_go_to_lowest_index() {
        assert_eq!(longest(&[10.0, 40.0, 40.0]), 1);
        assert_eq!(longest(&[0.0, 0.0]), 0);
    }

    #[test]
    fn single_column() {
        assert_eq!(shortest(&[123.0]), 0);
        assert_eq!(longest(&[123.0]), 0);
    }

    #[test]
    fn empty_slice_returns_zero() {
        assert_eq!(shortest(&[]), 0);
        assert_eq!(longest(&[]), 0);
    }

    #[test]
    fn column_count_rejects_zero() {
        assert_eq!(ColumnCount::new(0), Err(ConfigError::ZeroColumns));
        assert_eq!(ColumnCount::new(3).map(ColumnCount::get), Ok(3));
    }

    #[test]
    fn column_count_serde_round_trips_as_integer() {
        let c = ColumnCount::new(4).unwrap();
        assert_eq!(serde_json::to_string(&c).unwrap(), "4");
        let back: ColumnCount = serde_json::from_str("4").unwrap();
        assert_eq!(back, c);
        assert!(serde_json::from_str::<ColumnCount>("0").is_err());
    }
}
