//! Expected-answer computations over a [`DataView`].
//!
//! Every query is a pure function of the view it is handed, so a mission's
//! answer follows whatever year range or month the player has selected.
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::dataset::DataView;
use crate::numbers::{i64_to_f64, usize_to_f64, usize_to_i64};

/// ONI magnitude at which a month counts as El Niño or La Niña.
pub const DEFAULT_PHASE_THRESHOLD: f64 = 0.5;

/// The value a player's answer is judged against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Expected {
    Integer(i64),
    Number(f64),
    Text(String),
    Choices(Vec<String>),
}

impl Expected {
    /// Numeric reading, if the expectation has one.
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Integer(n) => Some(i64_to_f64(*n)),
            Self::Number(x) => Some(*x),
            Self::Text(_) | Self::Choices(_) => None,
        }
    }
}

impl fmt::Display for Expected {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer(n) => write!(f, "{n}"),
            Self::Number(x) => write!(f, "{x}"),
            Self::Text(text) => f.write_str(text),
            Self::Choices(choices) => f.write_str(&choices.join(" / ")),
        }
    }
}

/// ENSO phase of a single month.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    ElNino,
    LaNina,
    Neutral,
}

impl Phase {
    #[must_use]
    pub fn classify(value: f64, threshold: f64) -> Self {
        if value >= threshold {
            Self::ElNino
        } else if value <= -threshold {
            Self::LaNina
        } else {
            Self::Neutral
        }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::ElNino => "El Nino",
            Self::LaNina => "La Nina",
            Self::Neutral => "Neutral",
        }
    }
}

/// Declarative answer computation attached to a mission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Query {
    /// Most recent year present in the view.
    LatestYear,
    /// Months with a value at or above the threshold.
    CountAtLeast { threshold: f64 },
    /// Months with a value at or below the threshold.
    CountAtMost { threshold: f64 },
    Mean,
    MinValue,
    MaxValue,
    /// Year of the highest value; earliest wins on ties.
    YearOfMax,
    /// Year of the lowest value; earliest wins on ties.
    YearOfMin,
    ValueAt { year: i32, month: u32 },
    PhaseAt {
        year: i32,
        month: u32,
        #[serde(default = "default_phase_threshold")]
        threshold: f64,
    },
    /// A fixed answer that does not depend on the data.
    Literal { answer: Expected },
}

const fn default_phase_threshold() -> f64 {
    DEFAULT_PHASE_THRESHOLD
}

impl Query {
    /// Compute the expected answer, or `None` when the view cannot supply one.
    #[must_use]
    pub fn evaluate(&self, view: &DataView<'_>) -> Option<Expected> {
        match self {
            Self::Literal { answer } => Some(answer.clone()),
            Self::LatestYear => view
                .points()
                .map(|(period, _)| period.year)
                .max()
                .map(|year| Expected::Integer(i64::from(year))),
            Self::CountAtLeast { threshold } => {
                count_where(view, |value| value >= *threshold)
            }
            Self::CountAtMost { threshold } => count_where(view, |value| value <= *threshold),
            Self::Mean => {
                let (sum, n) = view
                    .points()
                    .fold((0.0, 0usize), |(sum, n), (_, value)| (sum + value, n + 1));
                (n > 0).then(|| Expected::Number(sum / usize_to_f64(n)))
            }
            Self::MinValue => view
                .points()
                .map(|(_, value)| value)
                .reduce(f64::min)
                .map(Expected::Number),
            Self::MaxValue => view
                .points()
                .map(|(_, value)| value)
                .reduce(f64::max)
                .map(Expected::Number),
            Self::YearOfMax => extreme_year(view, |candidate, best| candidate > best),
            Self::YearOfMin => extreme_year(view, |candidate, best| candidate < best),
            Self::ValueAt { year, month } => {
                value_at(view, *year, *month).map(Expected::Number)
            }
            Self::PhaseAt {
                year,
                month,
                threshold,
            } => value_at(view, *year, *month)
                .map(|value| Expected::Text(Phase::classify(value, *threshold).label().into())),
        }
    }
}

fn count_where(view: &DataView<'_>, pred: impl Fn(f64) -> bool) -> Option<Expected> {
    if view.is_empty() {
        return None;
    }
    let n = view.points().filter(|(_, value)| pred(*value)).count();
    Some(Expected::Integer(usize_to_i64(n)))
}

fn extreme_year(view: &DataView<'_>, better: impl Fn(f64, f64) -> bool) -> Option<Expected> {
    let mut best: Option<(i32, f64)> = None;
    for (period, value) in view.points() {
        match best {
            Some((_, current)) if !better(value, current) => {}
            _ => best = Some((period.year, value)),
        }
    }
    best.map(|(year, _)| Expected::Integer(i64::from(year)))
}

fn value_at(view: &DataView<'_>, year: i32, month: u32) -> Option<f64> {
    view.points()
        .find(|(period, _)| period.year == year && period.month == month)
        .map(|(_, value)| value)
}
