//! ENSO Mission Engine
//!
//! Platform-agnostic core of the ENSO cipher challenge: a linear run of
//! missions that ask questions about a monthly climate-index table and award
//! hint letters that spell the final passphrase.
//! This crate holds all quiz logic without UI, file or network dependencies.

pub mod dataset;
pub mod engine;
pub mod evaluator;
pub mod mission;
pub mod numbers;
pub mod period;
pub mod progress;
pub mod query;
pub mod source;
pub mod store;

// Re-export commonly used types
pub use dataset::{DataView, Dataset, DatasetError, Observation, ViewFilter};
pub use engine::{Clock, EngineError, MissionEngine, StartMode, SystemClock};
pub use evaluator::{Comparator, evaluate, judge, within_tolerance};
pub use mission::{Mission, MissionConfigError, MissionSet, PASSPHRASE, SEA_TEMPERATURE_COLUMN};
pub use period::{YearMonth, parse_period};
pub use progress::{Hints, ProgressError, ProgressState, SubmissionResult};
pub use query::{Expected, Phase, Query};
pub use source::CachedLoader;
pub use store::{LeaderboardEntry, MemoryStore, leaderboard};

/// Trait for abstracting dataset loading
/// Platform-specific implementations should provide this
pub trait DataLoader {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Load the index table from the platform-specific source
    ///
    /// # Errors
    ///
    /// Returns an error if the table cannot be read or has no usable rows.
    fn load_dataset(&self) -> Result<Dataset, Self::Error>;
}

/// Trait for abstracting progress persistence
/// Platform-specific implementations should provide this
pub trait ProgressStore {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Load one identity's progress
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store cannot be read.
    fn load(&self, identity: &str) -> Result<Option<ProgressState>, Self::Error>;

    /// Save one identity's progress, replacing any previous record
    ///
    /// # Errors
    ///
    /// Returns an error if the record cannot be written.
    fn save(&self, state: &ProgressState) -> Result<(), Self::Error>;

    /// Every stored record, for leaderboards
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store cannot be read.
    fn list_all(&self) -> Result<Vec<ProgressState>, Self::Error>;
}
