//! Answer comparison. Pure functions of (raw answer, expected value, comparator).
use serde::{Deserialize, Serialize};

use crate::numbers::format_fixed;
use crate::query::Expected;

/// How a raw answer is judged against the computed expectation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Comparator {
    /// Trimmed answer equals the rendered expectation.
    Exact {
        #[serde(default = "default_case_sensitive")]
        case_sensitive: bool,
    },
    /// Expectation rounded half away from zero to `decimals`, compared as text.
    Formatted { decimals: u8 },
    /// Parsed answer within `epsilon` of the expectation.
    Tolerance { epsilon: f64 },
    /// Trimmed answer is one of the expected choices.
    OneOf {
        #[serde(default)]
        case_sensitive: bool,
    },
    /// Any non-empty answer passes.
    Acknowledge,
}

const fn default_case_sensitive() -> bool {
    true
}

impl Comparator {
    #[must_use]
    pub const fn exact() -> Self {
        Self::Exact {
            case_sensitive: true,
        }
    }

    #[must_use]
    pub const fn tolerance(epsilon: f64) -> Self {
        Self::Tolerance { epsilon }
    }

    /// Expectation as shown to a player once they give up or succeed.
    #[must_use]
    pub fn render(&self, expected: &Expected) -> String {
        match (self, expected.as_f64()) {
            (Self::Formatted { decimals }, Some(value)) => format_fixed(value, *decimals),
            _ => expected.to_string(),
        }
    }
}

/// Judge `raw` against `expected`. Mismatched comparator and expectation
/// kinds, unparsable numbers and empty answers all reject.
#[must_use]
pub fn evaluate(comparator: &Comparator, expected: &Expected, raw: &str) -> bool {
    let answer = raw.trim();
    match comparator {
        Comparator::Acknowledge => !answer.is_empty(),
        Comparator::Exact { case_sensitive } => match expected {
            Expected::Choices(_) => false,
            _ => text_eq(answer, &expected.to_string(), *case_sensitive),
        },
        Comparator::Formatted { decimals } => expected
            .as_f64()
            .is_some_and(|value| answer == format_fixed(value, *decimals)),
        Comparator::Tolerance { epsilon } => {
            let Some(target) = expected.as_f64() else {
                return false;
            };
            parse_number(answer).is_some_and(|value| within_tolerance(value, target, *epsilon))
        }
        Comparator::OneOf { case_sensitive } => match expected {
            Expected::Choices(choices) => choices
                .iter()
                .any(|choice| text_eq(answer, choice.trim(), *case_sensitive)),
            Expected::Text(text) => text_eq(answer, text.trim(), *case_sensitive),
            Expected::Integer(_) | Expected::Number(_) => false,
        },
    }
}

/// Judge `raw` when the expectation may be missing, e.g. over an empty view.
/// Only [`Comparator::Acknowledge`] can pass without one.
#[must_use]
pub fn judge(comparator: &Comparator, expected: Option<&Expected>, raw: &str) -> bool {
    match (comparator, expected) {
        (Comparator::Acknowledge, _) => !raw.trim().is_empty(),
        (_, Some(expected)) => evaluate(comparator, expected, raw),
        (_, None) => false,
    }
}

/// `|value - expected| <= epsilon`, false for any non-finite input.
#[must_use]
pub fn within_tolerance(value: f64, expected: f64, epsilon: f64) -> bool {
    value.is_finite() && expected.is_finite() && (value - expected).abs() <= epsilon
}

fn parse_number(answer: &str) -> Option<f64> {
    answer.parse::<f64>().ok().filter(|value| value.is_finite())
}

fn text_eq(answer: &str, expected: &str, case_sensitive: bool) -> bool {
    if case_sensitive {
        answer == expected
    } else {
        answer.to_lowercase() == expected.to_lowercase()
    }
}
