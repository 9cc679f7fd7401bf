//! Progress records persisted as a small CSV table, one row per team.
//!
//! Every save re-reads the whole file and rewrites it. Two processes saving
//! at the same moment can lose one write; the table is best-effort.
use chrono::{DateTime, Utc};
use enso_game::{Hints, ProgressState, ProgressStore};
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to access progress file {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write progress file {path}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
    #[error("progress file {path} line {line}: {reason}")]
    Malformed {
        path: PathBuf,
        line: u64,
        reason: String,
    },
}

/// One line of the progress file. Hints are a JSON array so any token text
/// survives a round trip.
#[derive(Debug, Serialize, Deserialize)]
struct ProgressRow {
    team: String,
    stage: u32,
    hints: String,
    start_time: Option<DateTime<Utc>>,
    end_time: Option<DateTime<Utc>>,
}

impl From<&ProgressState> for ProgressRow {
    fn from(state: &ProgressState) -> Self {
        Self {
            team: state.identity.clone(),
            stage: state.current_mission,
            hints: serde_json::to_string(&state.hints).unwrap_or_else(|_| "[]".to_string()),
            start_time: state.started_at,
            end_time: state.completed_at,
        }
    }
}

impl ProgressRow {
    fn into_state(self) -> Result<ProgressState, String> {
        let hints: Hints = if self.hints.trim().is_empty() {
            Hints::new()
        } else {
            serde_json::from_str(&self.hints).map_err(|err| format!("invalid hints: {err}"))?
        };
        Ok(ProgressState {
            identity: self.team,
            current_mission: self.stage,
            hints,
            started_at: self.start_time,
            completed_at: self.end_time,
        })
    }
}

/// Leaderboard file shared by every team playing on this machine.
#[derive(Debug, Clone)]
pub struct CsvProgressStore {
    path: PathBuf,
}

impl CsvProgressStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn malformed(&self, line: u64, reason: String) -> StoreError {
        StoreError::Malformed {
            path: self.path.clone(),
            line,
            reason,
        }
    }

    fn read_all(&self) -> Result<Vec<ProgressState>, StoreError> {
        let text = match std::fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => {
                return Err(StoreError::Io {
                    path: self.path.clone(),
                    source,
                });
            }
        };
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .from_reader(text.as_bytes());
        let mut rows = reader.deserialize::<ProgressRow>();
        let mut states = Vec::new();
        while let Some(result) = rows.next() {
            let row = result.map_err(|err| {
                let line = err.position().map_or(0, csv::Position::line);
                self.malformed(line, err.to_string())
            })?;
            let line = rows.reader().position().line();
            states.push(row.into_state().map_err(|reason| self.malformed(line, reason))?);
        }
        Ok(states)
    }

    fn write_all(&self, states: &[ProgressState]) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| StoreError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let csv_error = |source| StoreError::Csv {
            path: self.path.clone(),
            source,
        };
        let mut writer = csv::Writer::from_path(&self.path).map_err(csv_error)?;
        for state in states {
            writer.serialize(ProgressRow::from(state)).map_err(csv_error)?;
        }
        writer.flush().map_err(|source| StoreError::Io {
            path: self.path.clone(),
            source,
        })
    }
}

impl ProgressStore for CsvProgressStore {
    type Error = StoreError;

    fn load(&self, identity: &str) -> Result<Option<ProgressState>, Self::Error> {
        Ok(self
            .read_all()?
            .into_iter()
            .find(|state| state.identity == identity))
    }

    fn save(&self, state: &ProgressState) -> Result<(), Self::Error> {
        let mut states = self.read_all()?;
        match states.iter_mut().find(|s| s.identity == state.identity) {
            Some(existing) => *existing = state.clone(),
            None => states.push(state.clone()),
        }
        log::debug!(
            "saving {} at stage {} to {}",
            state.identity,
            state.current_mission,
            self.path.display()
        );
        self.write_all(&states)
    }

    fn list_all(&self) -> Result<Vec<ProgressState>, Self::Error> {
        self.read_all()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::temp_path;
    use chrono::TimeZone;

    const HEADER: &str = "team,stage,hints,start_time,end_time";

    fn sample(identity: &str, stage: u32) -> ProgressState {
        let mut state = ProgressState::fresh(identity);
        state.current_mission = stage;
        state.started_at = Some(Utc.with_ymd_and_hms(2025, 8, 21, 9, 30, 0).unwrap());
        for hint in ["E", "N", "S", "O"].into_iter().take(stage as usize - 1) {
            state.hints.push(hint.to_string());
        }
        state
    }

    #[test]
    fn missing_file_is_an_empty_store() {
        let store = CsvProgressStore::new(temp_path("absent.csv"));
        assert!(store.list_all().unwrap().is_empty());
        assert!(store.load("anyone").unwrap().is_none());
    }

    #[test]
    fn saves_replace_rows_per_team() {
        let path = temp_path("progress.csv");
        let store = CsvProgressStore::new(&path);
        store.save(&sample("Blue Marlins", 2)).unwrap();
        store.save(&sample("Red, \"Hot\" Corals", 1)).unwrap();
        let mut done = sample("Blue Marlins", 5);
        done.completed_at = Some(Utc.with_ymd_and_hms(2025, 8, 21, 9, 41, 5).unwrap());
        store.save(&done).unwrap();

        let all = store.list_all().unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(store.load("Blue Marlins").unwrap(), Some(done));
        assert_eq!(
            store.load("Red, \"Hot\" Corals").unwrap(),
            Some(sample("Red, \"Hot\" Corals", 1))
        );

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with(HEADER));
        assert!(text.contains("Blue Marlins,5,"));
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn team_names_with_line_breaks_do_not_corrupt_other_rows() {
        let path = temp_path("newline.csv");
        let store = CsvProgressStore::new(&path);
        store.save(&ProgressState::fresh("Tuna")).unwrap();
        store.save(&sample("Line\nBreak", 3)).unwrap();

        assert_eq!(store.list_all().unwrap().len(), 2);
        assert_eq!(
            store.load("Tuna").unwrap(),
            Some(ProgressState::fresh("Tuna"))
        );
        assert_eq!(
            store.load("Line\nBreak").unwrap(),
            Some(sample("Line\nBreak", 3))
        );
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn hints_keep_separator_characters() {
        let path = temp_path("hints.csv");
        let store = CsvProgressStore::new(&path);
        let mut state = sample("Squid", 1);
        state.current_mission = 3;
        state.hints.push("A|B".to_string());
        state.hints.push("C, \"D\"".to_string());
        store.save(&state).unwrap();

        let loaded = store.load("Squid").unwrap().unwrap();
        assert_eq!(loaded.hints.to_vec(), vec!["A|B", "C, \"D\""]);
        assert_eq!(loaded.check_invariants(4), Ok(()));
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn reset_rows_have_empty_fields() {
        let path = temp_path("reset.csv");
        let store = CsvProgressStore::new(&path);
        store.save(&ProgressState::fresh("Tuna")).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("Tuna,0,[],,"));
        assert_eq!(
            store.load("Tuna").unwrap(),
            Some(ProgressState::fresh("Tuna"))
        );
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn malformed_rows_are_reported_with_line_numbers() {
        let path = temp_path("broken.csv");
        std::fs::write(
            &path,
            format!("{HEADER}\nTuna,1,[],2025-08-21T09:30:00Z,\nSquid,x,,,\n"),
        )
        .unwrap();
        let err = CsvProgressStore::new(&path).list_all().unwrap_err();
        match err {
            StoreError::Malformed { line, .. } => assert_eq!(line, 3),
            other => panic!("unexpected error {other}"),
        }
        let _ = std::fs::remove_file(path);
    }
}
