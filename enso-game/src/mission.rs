//! Mission definitions: declarative prompt, query, comparator and hint.
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::dataset::{DataView, ViewFilter};
use crate::evaluator::{Comparator, judge};
use crate::query::{DEFAULT_PHASE_THRESHOLD, Expected, Query};

/// The word spelled by the hints of every built-in mission set.
pub const PASSPHRASE: &str = "ENSO";

/// Nino 3.4 sea surface temperature column of the bundled monthly table.
pub const SEA_TEMPERATURE_COLUMN: &str = "nino3.4 수온 평균";

/// One quiz step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mission {
    pub ordinal: u32,
    pub title: String,
    pub prompt: String,
    /// Filter applied before the player narrows the view further.
    #[serde(default)]
    pub view: ViewFilter,
    pub query: Query,
    pub comparator: Comparator,
    pub hint: String,
}

impl Mission {
    /// Expected answer for the given view, if it can be computed.
    #[must_use]
    pub fn expected(&self, view: &DataView<'_>) -> Option<Expected> {
        self.query.evaluate(view)
    }

    /// Judge a raw answer against this mission over `view`.
    ///
    /// An empty view has no expected answer and rejects, except for
    /// open-ended missions that only ask for some answer.
    #[must_use]
    pub fn judge(&self, view: &DataView<'_>, raw: &str) -> bool {
        judge(&self.comparator, self.expected(view).as_ref(), raw)
    }
}

/// Errors raised when a mission set breaks its structural rules.
#[derive(Debug, Error, PartialEq)]
pub enum MissionConfigError {
    #[error("mission set has no missions")]
    Empty,
    #[error("mission at position {position} has ordinal {found}")]
    OrdinalGap { position: u32, found: u32 },
    #[error("mission {ordinal} has an empty hint")]
    EmptyHint { ordinal: u32 },
    #[error("hints spell {spelled:?} but the passphrase is {passphrase:?}")]
    PassphraseMismatch { spelled: String, passphrase: String },
    #[error("mission {ordinal} tolerance must be finite and non-negative (got {epsilon})")]
    InvalidTolerance { ordinal: u32, epsilon: f64 },
    #[error("mission {ordinal} offers no choices")]
    EmptyChoices { ordinal: u32 },
}

/// A fixed, ordered list of missions plus the passphrase their hints spell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MissionSet {
    pub name: String,
    #[serde(default = "default_passphrase")]
    pub passphrase: String,
    pub missions: Vec<Mission>,
}

fn default_passphrase() -> String {
    PASSPHRASE.to_string()
}

impl MissionSet {
    /// Load a mission set from JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON cannot be parsed into a mission set.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Number of missions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.missions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.missions.is_empty()
    }

    /// Mission at a 1-based ordinal.
    #[must_use]
    pub fn get(&self, ordinal: u32) -> Option<&Mission> {
        let idx = usize::try_from(ordinal.checked_sub(1)?).ok()?;
        self.missions.get(idx)
    }

    /// Check ordinals, hints and comparator parameters.
    ///
    /// # Errors
    ///
    /// Returns the first rule the set breaks.
    pub fn validate(&self) -> Result<(), MissionConfigError> {
        if self.missions.is_empty() {
            return Err(MissionConfigError::Empty);
        }
        for (position, mission) in (1u32..).zip(&self.missions) {
            if mission.ordinal != position {
                return Err(MissionConfigError::OrdinalGap {
                    position,
                    found: mission.ordinal,
                });
            }
            if mission.hint.trim().is_empty() {
                return Err(MissionConfigError::EmptyHint {
                    ordinal: mission.ordinal,
                });
            }
            if let Comparator::Tolerance { epsilon } = mission.comparator
                && !(epsilon.is_finite() && epsilon >= 0.0)
            {
                return Err(MissionConfigError::InvalidTolerance {
                    ordinal: mission.ordinal,
                    epsilon,
                });
            }
            if let Query::Literal {
                answer: Expected::Choices(choices),
            } = &mission.query
                && choices.is_empty()
            {
                return Err(MissionConfigError::EmptyChoices {
                    ordinal: mission.ordinal,
                });
            }
        }
        let spelled: String = self.missions.iter().map(|m| m.hint.as_str()).collect();
        if !spelled.eq_ignore_ascii_case(&self.passphrase) {
            return Err(MissionConfigError::PassphraseMismatch {
                spelled,
                passphrase: self.passphrase.clone(),
            });
        }
        Ok(())
    }

    /// The short decoder run: read the table, count phases, average the index.
    #[must_use]
    pub fn decoder() -> Self {
        Self {
            name: "ENSO decoder".to_string(),
            passphrase: default_passphrase(),
            missions: vec![
                Mission {
                    ordinal: 1,
                    title: "Most recent year".to_string(),
                    prompt: "What is the most recent year in the table?".to_string(),
                    view: ViewFilter::default(),
                    query: Query::LatestYear,
                    comparator: Comparator::exact(),
                    hint: "E".to_string(),
                },
                Mission {
                    ordinal: 2,
                    title: "Counting El Nino".to_string(),
                    prompt: "How many months have an ONI index of 0.5 or more?".to_string(),
                    view: ViewFilter::default(),
                    query: Query::CountAtLeast {
                        threshold: DEFAULT_PHASE_THRESHOLD,
                    },
                    comparator: Comparator::exact(),
                    hint: "N".to_string(),
                },
                Mission {
                    ordinal: 3,
                    title: "Counting La Nina".to_string(),
                    prompt: "How many months have an ONI index of -0.5 or less?".to_string(),
                    view: ViewFilter::default(),
                    query: Query::CountAtMost {
                        threshold: -DEFAULT_PHASE_THRESHOLD,
                    },
                    comparator: Comparator::exact(),
                    hint: "S".to_string(),
                },
                Mission {
                    ordinal: 4,
                    title: "Average ONI".to_string(),
                    prompt: "Enter the mean ONI index with exactly two decimals (e.g. 0.20, not 0.2)."
                        .to_string(),
                    view: ViewFilter::default(),
                    query: Query::Mean,
                    comparator: Comparator::Formatted { decimals: 2 },
                    hint: "O".to_string(),
                },
            ],
        }
    }

    /// The case-file run: explore sea temperatures, then hunt the strongest events.
    #[must_use]
    pub fn case_file() -> Self {
        Self {
            name: "El Nino case file".to_string(),
            passphrase: default_passphrase(),
            missions: vec![
                Mission {
                    ordinal: 1,
                    title: "Nino 3.4 sea temperatures".to_string(),
                    prompt: "Explore the August record. When was it warmest? (e.g. 2024)"
                        .to_string(),
                    view: ViewFilter {
                        column: Some(SEA_TEMPERATURE_COLUMN.to_string()),
                        years: None,
                        month: Some(8),
                    },
                    query: Query::YearOfMax,
                    comparator: Comparator::Acknowledge,
                    hint: "E".to_string(),
                },
                Mission {
                    ordinal: 2,
                    title: "Strongest index".to_string(),
                    prompt: "In which year does the index reach its highest value?".to_string(),
                    view: ViewFilter::default(),
                    query: Query::YearOfMax,
                    comparator: Comparator::exact(),
                    hint: "N".to_string(),
                },
                Mission {
                    ordinal: 3,
                    title: "Hunting La Nina".to_string(),
                    prompt: "In which year does the index reach its lowest value?".to_string(),
                    view: ViewFilter::default(),
                    query: Query::YearOfMin,
                    comparator: Comparator::exact(),
                    hint: "S".to_string(),
                },
                Mission {
                    ordinal: 4,
                    title: "Strongest La Nina year".to_string(),
                    prompt: "Looking at each year's minimum, which year had the strongest La Nina?"
                        .to_string(),
                    view: ViewFilter::default(),
                    query: Query::YearOfMin,
                    comparator: Comparator::exact(),
                    hint: "O".to_string(),
                },
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn built_in_sets_are_valid() {
        for set in [MissionSet::decoder(), MissionSet::case_file()] {
            assert_eq!(set.validate(), Ok(()), "{}", set.name);
            assert_eq!(set.len(), 4);
        }
    }

    #[test]
    fn case_file_opens_on_august_sea_temperatures() {
        let set = MissionSet::case_file();
        let first = &set.missions[0];
        assert_eq!(first.view.column.as_deref(), Some(SEA_TEMPERATURE_COLUMN));
        assert_eq!(first.view.month, Some(8));
        assert_eq!(first.comparator, Comparator::Acknowledge);
    }

    #[test]
    fn decoder_mean_prompt_shows_the_two_decimal_form() {
        let mean = &MissionSet::decoder().missions[3];
        assert_eq!(mean.comparator, Comparator::Formatted { decimals: 2 });
        assert!(mean.prompt.contains("e.g. 0.20"));
    }

    #[test]
    fn ordinals_must_be_contiguous() {
        let mut set = MissionSet::decoder();
        set.missions.remove(1);
        assert_eq!(
            set.validate(),
            Err(MissionConfigError::OrdinalGap {
                position: 2,
                found: 3
            })
        );
    }

    #[test]
    fn hints_must_spell_the_passphrase() {
        let mut set = MissionSet::decoder();
        set.missions[3].hint = "A".to_string();
        assert!(matches!(
            set.validate(),
            Err(MissionConfigError::PassphraseMismatch { .. })
        ));
    }

    #[test]
    fn tolerance_and_choice_parameters_are_checked() {
        let mut set = MissionSet::decoder();
        set.missions[3].comparator = Comparator::tolerance(-0.1);
        assert!(matches!(
            set.validate(),
            Err(MissionConfigError::InvalidTolerance { ordinal: 4, .. })
        ));

        let mut set = MissionSet::decoder();
        set.missions[0].query = Query::Literal {
            answer: Expected::Choices(Vec::new()),
        };
        assert_eq!(
            set.validate(),
            Err(MissionConfigError::EmptyChoices { ordinal: 1 })
        );
        assert_eq!(
            MissionSet {
                missions: Vec::new(),
                ..MissionSet::decoder()
            }
            .validate(),
            Err(MissionConfigError::Empty)
        );
    }

    #[test]
    fn lookup_by_ordinal() {
        let set = MissionSet::decoder();
        assert!(set.get(0).is_none());
        assert_eq!(set.get(1).map(|m| m.hint.as_str()), Some("E"));
        assert!(set.get(5).is_none());
    }

    #[test]
    fn mission_sets_load_from_json() {
        let json = r#"{
            "name": "quick",
            "missions": [
                {
                    "ordinal": 1,
                    "title": "Yes or no",
                    "prompt": "Is ENSO a Pacific pattern?",
                    "query": { "kind": "literal", "answer": ["yes", "y"] },
                    "comparator": { "kind": "one_of" },
                    "hint": "ENSO"
                }
            ]
        }"#;
        let set = MissionSet::from_json(json).unwrap();
        assert_eq!(set.passphrase, PASSPHRASE);
        assert_eq!(set.missions[0].view, ViewFilter::default());
        assert_eq!(
            set.missions[0].comparator,
            Comparator::OneOf {
                case_sensitive: false
            }
        );
        assert_eq!(set.validate(), Ok(()));
    }
}
