//! In-memory progress storage and the read-only leaderboard view.
use chrono::Duration;
use std::cell::RefCell;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::convert::Infallible;
use std::rc::Rc;

use crate::ProgressStore;
use crate::progress::ProgressState;

/// Progress kept in process memory; last write wins per identity.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    records: Rc<RefCell<BTreeMap<String, ProgressState>>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl ProgressStore for MemoryStore {
    type Error = Infallible;

    fn load(&self, identity: &str) -> Result<Option<ProgressState>, Self::Error> {
        Ok(self.records.borrow().get(identity).cloned())
    }

    fn save(&self, state: &ProgressState) -> Result<(), Self::Error> {
        self.records
            .borrow_mut()
            .insert(state.identity.clone(), state.clone());
        Ok(())
    }

    fn list_all(&self) -> Result<Vec<ProgressState>, Self::Error> {
        Ok(self.records.borrow().values().cloned().collect())
    }
}

/// One row of the leaderboard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeaderboardEntry {
    pub rank: usize,
    pub identity: String,
    pub stage: u32,
    pub hints: String,
    pub elapsed: Option<Duration>,
}

/// Rank progress records: finished runs by elapsed time, then unfinished
/// runs by how far they got, then by identity.
#[must_use]
pub fn leaderboard(states: &[ProgressState]) -> Vec<LeaderboardEntry> {
    let mut ordered: Vec<&ProgressState> = states.iter().collect();
    ordered.sort_by(|a, b| compare_runs(a, b));
    ordered
        .into_iter()
        .enumerate()
        .map(|(idx, state)| LeaderboardEntry {
            rank: idx + 1,
            identity: state.identity.clone(),
            stage: state.current_mission,
            hints: state.passphrase_so_far(),
            elapsed: state.elapsed(),
        })
        .collect()
}

fn compare_runs(a: &ProgressState, b: &ProgressState) -> Ordering {
    match (a.elapsed(), b.elapsed()) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => b.current_mission.cmp(&a.current_mission),
    }
    .then_with(|| a.identity.cmp(&b.identity))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    fn finished(identity: &str, secs: i64) -> ProgressState {
        let mut state = ProgressState::fresh(identity);
        state.current_mission = 3;
        state.hints.extend(["E".to_string(), "N".to_string()]);
        state.started_at = Some(at(0));
        state.completed_at = Some(at(secs));
        state
    }

    fn playing(identity: &str, ordinal: u32) -> ProgressState {
        let mut state = ProgressState::fresh(identity);
        state.current_mission = ordinal;
        state.started_at = Some(at(0));
        state
    }

    #[test]
    fn memory_store_is_last_write_wins() {
        let store = MemoryStore::new();
        let mut state = playing("crabs", 1);
        store.save(&state).unwrap();
        state.current_mission = 2;
        store.save(&state).unwrap();
        assert_eq!(store.load("crabs").unwrap(), Some(state));
        assert_eq!(store.list_all().unwrap().len(), 1);
        assert!(store.load("lobsters").unwrap().is_none());
    }

    #[test]
    fn clones_share_records() {
        let store = MemoryStore::new();
        let other = store.clone();
        store.save(&playing("eels", 1)).unwrap();
        assert!(other.load("eels").unwrap().is_some());
    }

    #[test]
    fn leaderboard_orders_finished_then_furthest() {
        let states = vec![
            playing("anchovy", 2),
            finished("bonito", 300),
            playing("cod", 3),
            finished("dory", 120),
            playing("eel", 3),
        ];
        let board = leaderboard(&states);
        let names: Vec<&str> = board.iter().map(|e| e.identity.as_str()).collect();
        assert_eq!(names, vec!["dory", "bonito", "cod", "eel", "anchovy"]);
        assert_eq!(board[0].rank, 1);
        assert_eq!(board[0].elapsed, Some(Duration::seconds(120)));
        assert_eq!(board[0].hints, "EN");
        assert_eq!(board[4].elapsed, None);
    }
}
