use crate::STATE_VERSION;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

/// Resume checkpoint of a soak run.
///
/// Persisted after every completed batch round. `level_start` is `None` between levels; while a
/// level is in progress it holds the wall-clock start of that level so the level end survives a
/// restart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunState {
    pub version: u32,
    pub run_id: Uuid,
    pub current_concurrency_index: usize,
    #[serde(with = "time::serde::rfc3339::option")]
    pub level_start: Option<OffsetDateTime>,
    pub batch_count: u64,
    #[serde(with = "time::serde::rfc3339")]
    pub run_start: OffsetDateTime,
}

impl RunState {
    pub fn fresh(now: OffsetDateTime) -> Self {
        Self {
            version: STATE_VERSION,
            run_id: Uuid::new_v4(),
            current_concurrency_index: 0,
            level_start: None,
            batch_count: 0,
            run_start: now,
        }
    }

    pub fn level_in_progress(&self) -> bool {
        self.level_start.is_some()
    }

    /// Start of the current level, beginning a new level at `now` if none is in progress.
    pub fn begin_level(&mut self, now: OffsetDateTime) -> OffsetDateTime {
        match self.level_start {
            Some(start) => start,
            None => {
                self.level_start = Some(now);
                self.batch_count = 0;
                now
            }
        }
    }

    /// Claims the next batch number.
    pub fn next_batch(&mut self) -> u64 {
        self.batch_count += 1;
        self.batch_count
    }

    /// Clears the level fields and moves on to the following level.
    pub fn complete_level(&mut self) {
        self.current_concurrency_index += 1;
        self.level_start = None;
        self.batch_count = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn level_lifecycle() {
        let mut state = RunState::fresh(datetime!(2026-01-01 00:00 UTC));
        assert!(!state.level_in_progress());

        let start = state.begin_level(datetime!(2026-01-01 00:01 UTC));
        assert_eq!(start, datetime!(2026-01-01 00:01 UTC));
        assert_eq!(state.next_batch(), 1);
        assert_eq!(state.next_batch(), 2);

        // An in-progress level keeps its start and its count.
        let again = state.begin_level(datetime!(2026-01-02 00:00 UTC));
        assert_eq!(again, start);
        assert_eq!(state.batch_count, 2);

        state.complete_level();
        assert_eq!(state.current_concurrency_index, 1);
        assert_eq!(state.batch_count, 0);
        assert!(!state.level_in_progress());
    }

    #[test]
    fn serializes_with_rfc3339_timestamps() {
        let mut state = RunState::fresh(datetime!(2026-03-04 05:06:07 UTC));
        state.begin_level(datetime!(2026-03-04 06:00:00 UTC));
        state.next_batch();

        let json = serde_json::to_string(&state).unwrap();
        assert!(json.contains("\"run_start\":\"2026-03-04T05:06:07Z\""));
        assert!(json.contains("\"level_start\":\"2026-03-04T06:00:00Z\""));

        let back: RunState = serde_json::from_str(&json).unwrap();
        assert_eq!(back, state);
    }
}
