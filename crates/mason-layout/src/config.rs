#![forbid(unsafe_code)]

//! Layout configuration.
//!
//! [`LayoutConfig`] is plain data: it deserializes from JSON, has sensible
//! defaults for every field, and can be overridden from the environment.
//! Nothing in it is trusted until [`LayoutConfig::validate`] turns it into
//! [`ColumnRules`].
//!
//! # Environment
//!
//! | Variable                | Effect                                      |
//! |-------------------------|---------------------------------------------|
//! | `MASON_FULL_LAYOUT`     | `1`/`true`/`yes` bypasses measurement reuse |
//! | `MASON_DEFAULT_COLUMNS` | default column count when no rule matches   |

use crate::breakpoint::MasonryBreakpoint;
use crate::columns::ColumnCount;
use crate::error::ConfigError;
use serde::{Deserialize, Serialize};

/// Env var enabling force-full layout.
pub const FULL_LAYOUT_ENV: &str = "MASON_FULL_LAYOUT";
/// Env var overriding the default column count.
pub const DEFAULT_COLUMNS_ENV: &str = "MASON_DEFAULT_COLUMNS";

/// Raw breakpoint rule as it appears in a config document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BreakpointConfig {
    pub query: String,
    pub columns: usize,
}

/// Unvalidated layout configuration.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// Re-measure every item on every pass.
    pub force_full_layout: bool,
    /// Column count used until a breakpoint matches.
    pub default_columns: Option<usize>,
    /// Breakpoint rules in registration order.
    pub breakpoints: Vec<BreakpointConfig>,
}

/// Validated column configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnRules {
    pub default_columns: ColumnCount,
    pub breakpoints: Vec<MasonryBreakpoint>,
}

impl LayoutConfig {
    /// Defaults with process environment overrides applied.
    #[must_use]
    pub fn from_env() -> Self {
        Self::default().with_env_lookup(|name| std::env::var(name).ok())
    }

    /// Apply overrides from an arbitrary variable lookup.
    ///
    /// Unparseable values are ignored with a warning; configuration from
    /// the environment never fails.
    #[must_use]
    pub fn with_env_lookup(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(raw) = lookup(FULL_LAYOUT_ENV) {
            self.force_full_layout = matches!(
                raw.trim().to_ascii_lowercase().as_str(),
                "1" | "true" | "yes"
            );
        }
        if let Some(raw) = lookup(DEFAULT_COLUMNS_ENV) {
            match raw.trim().parse::<usize>() {
                Ok(columns) => self.default_columns = Some(columns),
                Err(err) => tracing::warn!(
                    target: "mason.layout",
                    var = DEFAULT_COLUMNS_ENV,
                    value = %raw,
                    error = %err,
                    "ignoring unparseable env override"
                ),
            }
        }
        self
    }

    /// Decode from a JSON document. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Check every rule and resolve the default column count.
    ///
    /// With no explicit default, a config that has breakpoints falls back
    /// to a single column; a config with neither is rejected.
    pub fn validate(&self) -> Result<ColumnRules, ConfigError> {
        let breakpoints = self
            .breakpoints
            .iter()
            .map(|bp| MasonryBreakpoint::new(bp.query.clone(), bp.columns))
            .collect::<Result<Vec<_>, _>>()?;
        let default_columns = match self.default_columns {
            Some(columns) => ColumnCount::new(columns)?,
            None if breakpoints.is_empty() => return Err(ConfigError::NoColumnSource),
            None => ColumnCount::ONE,
        };
        Ok(ColumnRules {
            default_columns,
            breakpoints,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn defaults() {
        let cfg = LayoutConfig::default();
        assert!(!cfg.force_full_layout);
        assert_eq!(cfg.default_columns, None);
        assert!(cfg.breakpoints.is_empty());
    }

    #[test]
    fn env_enables_full_layout() {
        for value in ["1", "true", "YES", " True "] {
            let cfg = LayoutConfig::default().with_env_lookup(lookup(&[(FULL_LAYOUT_ENV, value)]));
            assert!(cfg.force_full_layout, "value {value:?}");
        }
        let cfg = LayoutConfig::default().with_env_lookup(lookup(&[(FULL_LAYOUT_ENV, "0")]));
        assert!(!cfg.force_full_layout);
    }

    #[test]
    fn env_default_columns() {
        let cfg = LayoutConfig::default().with_env_lookup(lookup(&[(DEFAULT_COLUMNS_ENV, "3")]));
        assert_eq!(cfg.default_columns, Some(3));

        let cfg = LayoutConfig::default().with_env_lookup(lookup(&[(DEFAULT_COLUMNS_ENV, "three")]));
        assert_eq!(cfg.default_columns, None);
    }

    #[test]
    fn json_partial_document() {
        let cfg = LayoutConfig::from_json(
            r#"{ "breakpoints": [ { "query": "(min-width: 1024px)", "columns": 4 } ] }"#,
        )
        .unwrap();
        assert!(!cfg.force_full_layout);
        assert_eq!(cfg.breakpoints.len(), 1);

        let rules = cfg.validate().unwrap();
        assert_eq!(rules.default_columns, ColumnCount::ONE);
        assert_eq!(rules.breakpoints[0].columns().get(), 4);
    }

    #[test]
    fn json_syntax_error_is_parse_error() {
        let err = LayoutConfig::from_json("{ nope").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn validate_rejects_missing_column_source() {
        assert_eq!(
            LayoutConfig::default().validate(),
            Err(ConfigError::NoColumnSource)
        );
    }

    #[test]
    fn validate_rejects_zero_default() {
        let cfg = LayoutConfig {
            default_columns: Some(0),
            ..Default::default()
        };
        assert_eq!(cfg.validate(), Err(ConfigError::ZeroColumns));
    }

    #[test]
    fn validate_rejects_bad_rule() {
        let cfg = LayoutConfig {
            default_columns: Some(2),
            breakpoints: vec![BreakpointConfig {
                query: "(max-width: 768px)".into(),
                columns: 0,
            }],
            ..Default::default()
        };
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::ZeroBreakpointColumns { .. })
        ));
    }
}
