//! Per-identity progress through a mission set.
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use thiserror::Error;

use crate::numbers::usize_to_f64;

/// Hint tokens in award order. Mission sets are short, so this stays inline.
pub type Hints = SmallVec<[String; 4]>;

/// Broken bookkeeping detected on a progress record.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProgressError {
    #[error("mission ordinal {ordinal} is past the end of a {total}-mission set")]
    OrdinalPastEnd { ordinal: u32, total: u32 },
    #[error("{hints} hints recorded at mission ordinal {ordinal}")]
    HintCount { hints: usize, ordinal: u32 },
    #[error("progress at ordinal {ordinal} has no start time")]
    MissingStart { ordinal: u32 },
    #[error("progress that has not started carries timestamps")]
    UnstartedWithTimestamps,
    #[error("completion time does not match completion state")]
    CompletionMismatch,
}

/// Mutable record of one identity's run. Only the engine advances it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressState {
    pub identity: String,
    /// 0 before start, `1..=N` while playing, `N + 1` once complete.
    pub current_mission: u32,
    #[serde(default)]
    pub hints: Hints,
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
}

impl ProgressState {
    /// A record that has not started yet.
    #[must_use]
    pub fn fresh(identity: impl Into<String>) -> Self {
        Self {
            identity: identity.into(),
            current_mission: 0,
            hints: Hints::new(),
            started_at: None,
            completed_at: None,
        }
    }

    #[must_use]
    pub const fn is_started(&self) -> bool {
        self.current_mission > 0
    }

    /// Concatenated hints so far.
    #[must_use]
    pub fn passphrase_so_far(&self) -> String {
        self.hints.concat()
    }

    /// Time from start to completion, once both are known.
    #[must_use]
    pub fn elapsed(&self) -> Option<Duration> {
        Some(self.completed_at? - self.started_at?)
    }

    /// Fraction of missions completed, in `0.0..=1.0`.
    #[must_use]
    pub fn progress_ratio(&self, total: u32) -> f64 {
        if total == 0 {
            return 0.0;
        }
        (usize_to_f64(self.hints.len()) / f64::from(total)).clamp(0.0, 1.0)
    }

    /// Verify the record against a set of `total` missions.
    ///
    /// # Errors
    ///
    /// Returns the first broken rule: ordinal range, one hint per completed
    /// mission, start time while playing, completion time iff complete.
    pub fn check_invariants(&self, total: u32) -> Result<(), ProgressError> {
        let ordinal = self.current_mission;
        if ordinal > total.saturating_add(1) {
            return Err(ProgressError::OrdinalPastEnd { ordinal, total });
        }
        if ordinal == 0 {
            if !self.hints.is_empty() {
                return Err(ProgressError::HintCount {
                    hints: self.hints.len(),
                    ordinal,
                });
            }
            if self.started_at.is_some() || self.completed_at.is_some() {
                return Err(ProgressError::UnstartedWithTimestamps);
            }
            return Ok(());
        }
        let expected_hints = usize::try_from(ordinal - 1).unwrap_or(usize::MAX);
        if self.hints.len() != expected_hints {
            return Err(ProgressError::HintCount {
                hints: self.hints.len(),
                ordinal,
            });
        }
        if self.started_at.is_none() {
            return Err(ProgressError::MissingStart { ordinal });
        }
        if self.completed_at.is_some() != (ordinal == total.saturating_add(1)) {
            return Err(ProgressError::CompletionMismatch);
        }
        Ok(())
    }
}

/// Outcome of a single submission. Not persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionResult {
    pub accepted: bool,
    pub hint: Option<String>,
}

impl SubmissionResult {
    #[must_use]
    pub const fn accepted(hint: String) -> Self {
        Self {
            accepted: true,
            hint: Some(hint),
        }
    }

    #[must_use]
    pub const fn rejected() -> Self {
        Self {
            accepted: false,
            hint: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    #[test]
    fn fresh_state_is_consistent() {
        let state = ProgressState::fresh("dolphins");
        assert!(!state.is_started());
        assert_eq!(state.check_invariants(4), Ok(()));
        assert!(state.elapsed().is_none());
        assert!(state.progress_ratio(4).abs() < f64::EPSILON);
    }

    #[test]
    fn invariant_violations_are_reported() {
        let mut state = ProgressState::fresh("orcas");
        state.current_mission = 2;
        state.started_at = Some(at(0));
        assert_eq!(
            state.check_invariants(4),
            Err(ProgressError::HintCount {
                hints: 0,
                ordinal: 2
            })
        );
        state.hints.push("E".into());
        assert_eq!(state.check_invariants(4), Ok(()));

        state.completed_at = Some(at(10));
        assert_eq!(
            state.check_invariants(4),
            Err(ProgressError::CompletionMismatch)
        );

        state.current_mission = 9;
        assert!(matches!(
            state.check_invariants(4),
            Err(ProgressError::OrdinalPastEnd { .. })
        ));

        let mut unstarted = ProgressState::fresh("seals");
        unstarted.started_at = Some(at(0));
        assert_eq!(
            unstarted.check_invariants(4),
            Err(ProgressError::UnstartedWithTimestamps)
        );
    }

    #[test]
    fn completed_state_reports_elapsed_and_phrase() {
        let mut state = ProgressState::fresh("whales");
        state.current_mission = 3;
        state.hints.extend(["E".to_string(), "N".to_string()]);
        state.started_at = Some(at(0));
        state.completed_at = Some(at(125));
        assert_eq!(state.check_invariants(2), Ok(()));
        assert_eq!(state.passphrase_so_far(), "EN");
        assert_eq!(state.elapsed(), Some(Duration::seconds(125)));
        assert!((state.progress_ratio(2) - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn serializes_with_rfc3339_timestamps() {
        let mut state = ProgressState::fresh("rays");
        state.current_mission = 1;
        state.started_at = Some(at(0));
        let json = serde_json::to_string(&state).unwrap();
        assert!(json.contains("2023-11-14T22:13:20Z"));
        let back: ProgressState = serde_json::from_str(&json).unwrap();
        assert_eq!(back, state);
    }
}
