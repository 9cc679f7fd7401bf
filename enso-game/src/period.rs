//! Monthly period parsing for index tables.
//!
//! Date cells show up in several spellings across exported tables. The
//! strict formats are tried in a fixed order before a permissive fallback.
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A calendar month, ordered chronologically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct YearMonth {
    pub year: i32,
    pub month: u32,
}

impl YearMonth {
    /// Build a period, rejecting months outside `1..=12`.
    #[must_use]
    pub fn new(year: i32, month: u32) -> Option<Self> {
        (1..=12).contains(&month).then_some(Self { year, month })
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

const STRICT_PATTERNS: [&str; 4] = [
    r"^(\d{4})년\s*(\d{1,2})월$",
    r"^(\d{4})-(\d{1,2})$",
    r"^(\d{4})\.(\d{1,2})$",
    r"^(\d{4})/(\d{1,2})$",
];

const PERMISSIVE_PATTERN: &str = r"^(\d{4})\D+?(\d{1,2})(?:\D|$)";

/// Compiled in order: strict formats first, permissive fallback last.
static PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    STRICT_PATTERNS
        .iter()
        .chain(std::iter::once(&PERMISSIVE_PATTERN))
        .filter_map(|pattern| Regex::new(pattern).ok())
        .collect()
});

/// Parse a date cell into a [`YearMonth`].
///
/// Tries `YYYY년 MM월`, `YYYY-MM`, `YYYY.MM`, `YYYY/MM` in that order, then
/// falls back to any leading four-digit year followed by a separator and a
/// one or two digit month. Returns `None` when the cell is unusable.
#[must_use]
pub fn parse_period(raw: &str) -> Option<YearMonth> {
    let cleaned = raw.trim_start_matches('\u{feff}').trim();
    if cleaned.is_empty() {
        return None;
    }
    PATTERNS
        .iter()
        .find_map(|re| captures_to_period(re, cleaned))
}

fn captures_to_period(re: &Regex, text: &str) -> Option<YearMonth> {
    let caps = re.captures(text)?;
    let year = caps.get(1)?.as_str().parse().ok()?;
    let month = caps.get(2)?.as_str().parse().ok()?;
    YearMonth::new(year, month)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ym(year: i32, month: u32) -> Option<YearMonth> {
        YearMonth::new(year, month)
    }

    #[test]
    fn all_patterns_compile() {
        assert_eq!(PATTERNS.len(), STRICT_PATTERNS.len() + 1);
    }

    #[test]
    fn parses_every_observed_format() {
        assert_eq!(parse_period("2025년 07월"), ym(2025, 7));
        assert_eq!(parse_period("2025-07"), ym(2025, 7));
        assert_eq!(parse_period("2025.7"), ym(2025, 7));
        assert_eq!(parse_period("2025/12"), ym(2025, 12));
    }

    #[test]
    fn strips_bom_and_whitespace() {
        assert_eq!(parse_period("\u{feff}2024년 01월 "), ym(2024, 1));
    }

    #[test]
    fn permissive_fallback_accepts_full_dates() {
        assert_eq!(parse_period("2023-08-01"), ym(2023, 8));
        assert_eq!(parse_period("2023년8월"), ym(2023, 8));
        assert_eq!(parse_period("1999_3"), ym(1999, 3));
    }

    #[test]
    fn rejects_garbage_and_bad_months() {
        assert_eq!(parse_period(""), None);
        assert_eq!(parse_period("July 2024"), None);
        assert_eq!(parse_period("2024-13"), None);
        assert_eq!(parse_period("2024년 00월"), None);
    }

    #[test]
    fn display_is_zero_padded() {
        assert_eq!(YearMonth { year: 2025, month: 3 }.to_string(), "2025-03");
    }
}
