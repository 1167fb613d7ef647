#![forbid(unsafe_code)]

//! Width-only media query parsing.
//!
//! Supported forms, combined with `and`:
//!
//! - `(min-width: 600px)`, `(max-width: 1023.98px)`
//! - `(width >= 1024px)`, `width<1024`, `(width > 0)`, `width <= 480px`
//! - the media types `all` and `screen`, optionally prefixed with `only`
//!
//! Lengths are CSS pixels; the `px` suffix is optional.

use thiserror::Error;

/// Why a query string could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryParseError {
    #[error("empty media query")]
    Empty,
    #[error("unbalanced parentheses in `{0}`")]
    Unbalanced(String),
    #[error("unsupported media feature `{0}`")]
    UnknownFeature(String),
    #[error("invalid length `{0}`")]
    InvalidLength(String),
}

/// One bound on the viewport width.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WidthBound {
    /// `width >= n`
    AtLeast(f64),
    /// `width <= n`
    AtMost(f64),
    /// `width > n`
    Above(f64),
    /// `width < n`
    Below(f64),
}

impl WidthBound {
    #[must_use]
    pub fn holds(self, width: f64) -> bool {
        match self {
            Self::AtLeast(n) => width >= n,
            Self::AtMost(n) => width <= n,
            Self::Above(n) => width > n,
            Self::Below(n) => width < n,
        }
    }
}

/// A parsed query: a conjunction of width bounds.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MediaCondition {
    bounds: Vec<WidthBound>,
}

impl MediaCondition {
    /// Parse a query string.
    pub fn parse(query: &str) -> Result<Self, QueryParseError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(QueryParseError::Empty);
        }
        let mut bounds = Vec::new();
        for term in split_and(query) {
            if let Some(bound) = parse_term(&term)? {
                bounds.push(bound);
            }
        }
        Ok(Self { bounds })
    }

    /// Whether every bound holds at `width`.
    #[must_use]
    pub fn matches(&self, width: f64) -> bool {
        self.bounds.iter().all(|b| b.holds(width))
    }

    #[must_use]
    pub fn bounds(&self) -> &[WidthBound] {
        &self.bounds
    }
}

/// Split on the `and` keyword, dropping whitespace inside each term.
fn split_and(query: &str) -> Vec<String> {
    let mut terms = vec![String::new()];
    for word in query.split_ascii_whitespace() {
        if word.eq_ignore_ascii_case("and") {
            terms.push(String::new());
        } else if let Some(last) = terms.last_mut() {
            last.push_str(word);
        }
    }
    terms
}

fn parse_term(term: &str) -> Result<Option<WidthBound>, QueryParseError> {
    let lower = term.to_ascii_lowercase();
    let inner = match (lower.starts_with('('), lower.ends_with(')')) {
        (true, true) => &lower[1..lower.len() - 1],
        (false, false) => lower.as_str(),
        _ => return Err(QueryParseError::Unbalanced(term.to_owned())),
    };
    if inner.is_empty() {
        return Err(QueryParseError::Empty);
    }
    if matches!(inner, "all" | "screen" | "onlyscreen" | "onlyall") {
        return Ok(None);
    }

    if let Some((feature, value)) = inner.split_once(':') {
        let make: fn(f64) -> WidthBound = match feature {
            "min-width" => WidthBound::AtLeast,
            "max-width" => WidthBound::AtMost,
            other => return Err(QueryParseError::UnknownFeature(other.to_owned())),
        };
        return Ok(Some(make(parse_length(value)?)));
    }

    let operators: [(&str, fn(f64) -> WidthBound); 4] = [
        (">=", WidthBound::AtLeast),
        ("<=", WidthBound::AtMost),
        (">", WidthBound::Above),
        ("<", WidthBound::Below),
    ];
    for (op, make) in operators {
        if let Some((feature, value)) = inner.split_once(op) {
            if feature != "width" {
                return Err(QueryParseError::UnknownFeature(feature.to_owned()));
            }
            return Ok(Some(make(parse_length(value)?)));
        }
    }
    Err(QueryParseError::UnknownFeature(inner.to_owned()))
}

fn parse_length(raw: &str) -> Result<f64, QueryParseError> {
    let trimmed = raw.trim();
    let number = trimmed.strip_suffix("px").unwrap_or(trimmed);
    match number.parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(value),
        _ => Err(QueryParseError::InvalidLength(raw.trim().to_owned())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bounds(query: &str) -> Vec<WidthBound> {
        MediaCondition::parse(query).unwrap().bounds().to_vec()
    }

    #[test]
    fn min_and_max_width() {
        assert_eq!(bounds("(min-width: 600px)"), vec![WidthBound::AtLeast(600.0)]);
        assert_eq!(bounds("(max-width:1023.98px)"), vec![WidthBound::AtMost(1023.98)]);
    }

    #[test]
    fn range_syntax() {
        assert_eq!(bounds("width>=1024"), vec![WidthBound::AtLeast(1024.0)]);
        assert_eq!(bounds("(width < 1024px)"), vec![WidthBound::Below(1024.0)]);
        assert_eq!(bounds("width > 0"), vec![WidthBound::Above(0.0)]);
        assert_eq!(bounds("width<=480"), vec![WidthBound::AtMost(480.0)]);
    }

    #[test]
    fn conjunction_and_media_types() {
        let cond = MediaCondition::parse("only screen and (min-width: 600px) and (max-width: 899px)")
            .unwrap();
        assert_eq!(cond.bounds().len(), 2);
        assert!(!cond.matches(599.0));
        assert!(cond.matches(600.0));
        assert!(cond.matches(899.0));
        assert!(!cond.matches(900.0));
        assert!(MediaCondition::parse("all").unwrap().matches(0.0));
    }

    #[test]
    fn case_insensitive() {
        assert_eq!(bounds("Screen AND (MIN-WIDTH: 10PX)"), vec![WidthBound::AtLeast(10.0)]);
    }

    #[test]
    fn malformed_queries() {
        assert_eq!(MediaCondition::parse("  "), Err(QueryParseError::Empty));
        assert!(matches!(
            MediaCondition::parse("(min-width: 600px"),
            Err(QueryParseError::Unbalanced(_))
        ));
        assert!(matches!(
            MediaCondition::parse("(orientation: portrait)"),
            Err(QueryParseError::UnknownFeature(_))
        ));
        assert!(matches!(
            MediaCondition::parse("(min-width: wide)"),
            Err(QueryParseError::InvalidLength(_))
        ));
        assert!(matches!(
            MediaCondition::parse("height>=10"),
            Err(QueryParseError::UnknownFeature(_))
        ));
    }

    #[test]
    fn thresholds_are_inclusive_or_strict() {
        let wide = MediaCondition::parse("width>=1024").unwrap();
        let narrow = MediaCondition::parse("width<1024").unwrap();
        for w in [0.0, 1023.0, 1024.0, 1600.0] {
            assert_ne!(wide.matches(w), narrow.matches(w), "width {w}");
        }
    }
}
