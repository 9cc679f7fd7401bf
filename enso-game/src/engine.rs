//! The mission engine: the only code that advances a [`ProgressState`].
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::ProgressStore;
use crate::dataset::DataView;
use crate::evaluator::{Comparator, judge};
use crate::mission::{Mission, MissionConfigError, MissionSet};
use crate::progress::{ProgressError, ProgressState, SubmissionResult};
use crate::store::{LeaderboardEntry, leaderboard};

/// Source of timestamps for start and completion times.
pub trait Clock {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// What `start` does when the identity already has a run in progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StartMode {
    /// Refuse with [`EngineError::AlreadyStarted`].
    #[default]
    Fresh,
    /// Hand back the existing run unchanged.
    Reuse,
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("{identity:?} has already started; reset or reuse the existing run")]
    AlreadyStarted { identity: String },
    #[error("{identity:?} has not started")]
    NotStarted { identity: String },
    #[error("mission ordinal {ordinal} is outside 1..={total}")]
    OutOfRange { ordinal: u32, total: u32 },
    #[error("stored progress for {identity:?} is inconsistent")]
    InvalidProgress {
        identity: String,
        #[source]
        source: ProgressError,
    },
    #[error(transparent)]
    Config(#[from] MissionConfigError),
    #[error("progress storage failed")]
    Storage(#[source] anyhow::Error),
}

fn storage_error<E>(err: E) -> EngineError
where
    E: std::error::Error + Send + Sync + 'static,
{
    EngineError::Storage(anyhow::Error::new(err))
}

/// Drives identities through a validated mission set.
#[derive(Debug)]
pub struct MissionEngine<S, C = SystemClock> {
    missions: MissionSet,
    store: S,
    clock: C,
}

impl<S: ProgressStore> MissionEngine<S> {
    /// Create an engine using wall-clock time.
    ///
    /// # Errors
    ///
    /// Returns an error if the mission set fails validation.
    pub fn new(missions: MissionSet, store: S) -> Result<Self, EngineError> {
        Self::with_clock(missions, store, SystemClock)
    }
}

impl<S: ProgressStore, C: Clock> MissionEngine<S, C> {
    /// Create an engine with an explicit clock.
    ///
    /// # Errors
    ///
    /// Returns an error if the mission set fails validation.
    pub fn with_clock(missions: MissionSet, store: S, clock: C) -> Result<Self, EngineError> {
        missions.validate()?;
        Ok(Self {
            missions,
            store,
            clock,
        })
    }

    #[must_use]
    pub const fn missions(&self) -> &MissionSet {
        &self.missions
    }

    /// Number of missions, `N`.
    #[must_use]
    pub fn total(&self) -> u32 {
        u32::try_from(self.missions.len()).unwrap_or(u32::MAX)
    }

    #[must_use]
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// Fetch an identity's stored run, checking its bookkeeping.
    ///
    /// # Errors
    ///
    /// Returns an error if storage fails or the stored record is inconsistent.
    pub fn load(&self, identity: &str) -> Result<Option<ProgressState>, EngineError> {
        let Some(state) = self.store.load(identity).map_err(storage_error)? else {
            return Ok(None);
        };
        state
            .check_invariants(self.total())
            .map_err(|source| EngineError::InvalidProgress {
                identity: identity.to_string(),
                source,
            })?;
        Ok(Some(state))
    }

    /// Begin a run at mission 1, stamping the start time once.
    ///
    /// A run that was reset starts over. A run already in progress is
    /// refused, or returned as-is with [`StartMode::Reuse`].
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::AlreadyStarted`] for an active run in
    /// [`StartMode::Fresh`], or a storage error.
    pub fn start(&self, identity: &str, mode: StartMode) -> Result<ProgressState, EngineError> {
        if let Some(existing) = self.load(identity)?
            && existing.is_started()
        {
            return match mode {
                StartMode::Reuse => {
                    log::info!(
                        "{identity}: resuming at mission {}",
                        existing.current_mission
                    );
                    Ok(existing)
                }
                StartMode::Fresh => Err(EngineError::AlreadyStarted {
                    identity: identity.to_string(),
                }),
            };
        }
        let mut state = ProgressState::fresh(identity);
        state.current_mission = 1;
        state.started_at = Some(self.clock.now());
        self.store.save(&state).map_err(storage_error)?;
        log::info!("{identity}: started {}", self.missions.name);
        Ok(state)
    }

    /// The mission the identity is currently on.
    ///
    /// Callers check [`Self::is_complete`] first; asking past the end is a bug.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::OutOfRange`] before start or after completion.
    pub fn current(&self, state: &ProgressState) -> Result<&Mission, EngineError> {
        self.missions
            .get(state.current_mission)
            .ok_or(EngineError::OutOfRange {
                ordinal: state.current_mission,
                total: self.total(),
            })
    }

    /// Judge `raw` for `mission` over `view`.
    ///
    /// On acceptance the hint is appended, the ordinal advances by one and
    /// the record is saved; `state` only changes once the save succeeds. A
    /// rejection leaves `state` untouched. Submitting a mission other than
    /// the current one, or over a view with no computable answer, rejects.
    ///
    /// # Errors
    ///
    /// Returns an error if the run has not started or is already complete,
    /// or if saving an accepted answer fails.
    pub fn submit(
        &self,
        state: &mut ProgressState,
        mission: &Mission,
        view: &DataView<'_>,
        raw: &str,
    ) -> Result<SubmissionResult, EngineError> {
        if !state.is_started() {
            return Err(EngineError::NotStarted {
                identity: state.identity.clone(),
            });
        }
        let current = self.current(state)?;
        if current != mission {
            log::warn!(
                "{}: submission for mission {} while on mission {}",
                state.identity,
                mission.ordinal,
                current.ordinal
            );
            return Ok(SubmissionResult::rejected());
        }
        let expected = mission.expected(view);
        if expected.is_none() && mission.comparator != Comparator::Acknowledge {
            log::warn!(
                "{}: mission {} has no answer over an empty {} view",
                state.identity,
                mission.ordinal,
                view.column()
            );
            return Ok(SubmissionResult::rejected());
        }
        let accepted = judge(&mission.comparator, expected.as_ref(), raw);
        log::debug!(
            "{}: mission {} answer {:?} vs {} -> {}",
            state.identity,
            mission.ordinal,
            raw.trim(),
            expected
                .as_ref()
                .map_or_else(|| "anything".to_string(), |e| mission.comparator.render(e)),
            if accepted { "accept" } else { "reject" }
        );
        if !accepted {
            return Ok(SubmissionResult::rejected());
        }

        let mut next = state.clone();
        next.hints.push(mission.hint.clone());
        next.current_mission += 1;
        if next.current_mission > self.total() {
            next.completed_at = Some(self.clock.now());
        }
        self.store.save(&next).map_err(storage_error)?;
        *state = next;
        log::info!(
            "{}: passed mission {} (hint {})",
            state.identity,
            mission.ordinal,
            mission.hint
        );
        Ok(SubmissionResult::accepted(mission.hint.clone()))
    }

    #[must_use]
    pub fn is_complete(&self, state: &ProgressState) -> bool {
        state.current_mission > self.total()
    }

    /// Case-insensitive match of the trimmed input against the passphrase.
    /// Always false before the run is complete.
    #[must_use]
    pub fn final_passphrase_check(&self, state: &ProgressState, raw: &str) -> bool {
        self.is_complete(state) && raw.trim().eq_ignore_ascii_case(&self.missions.passphrase)
    }

    /// Wipe an identity back to ordinal 0 with no hints or timestamps.
    ///
    /// # Errors
    ///
    /// Returns an error if saving fails.
    pub fn reset(&self, identity: &str) -> Result<ProgressState, EngineError> {
        let state = ProgressState::fresh(identity);
        self.store.save(&state).map_err(storage_error)?;
        log::info!("{identity}: progress reset");
        Ok(state)
    }

    /// Fraction of the set completed.
    #[must_use]
    pub fn progress(&self, state: &ProgressState) -> f64 {
        state.progress_ratio(self.total())
    }

    /// Ranked view over every stored run.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot list its records.
    pub fn leaderboard(&self) -> Result<Vec<LeaderboardEntry>, EngineError> {
        let states = self.store.list_all().map_err(storage_error)?;
        Ok(leaderboard(&states))
    }
}
