use tracing::{debug, info};

use crate::db::Database;
use crate::error::StudyResult;
use crate::identity::{require_owner, OwnerId};
use crate::models::StudySessionEvent;

pub struct StudyTracker<'a> {
    db: &'a Database,
}

impl<'a> StudyTracker<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Records one answered card.
    ///
    /// The study event is always appended. The card's counters are bumped only
    /// if it still exists and belongs to `owner`; otherwise the update is
    /// skipped without error. Returns whether the counters were updated.
    pub fn record_answer(
        &self,
        owner: Option<&OwnerId>,
        flashcard_id: i64,
        was_correct: bool,
        time_spent_secs: u32,
    ) -> StudyResult<bool> {
        let owner = require_owner(owner)?;

        let applied = self
            .db
            .record_answer(owner, flashcard_id, was_correct, time_spent_secs)?;

        if applied {
            info!(owner = %owner, id = flashcard_id, was_correct, time_spent_secs, "recorded answer");
        } else {
            debug!(
                owner = %owner,
                id = flashcard_id,
                "flashcard missing or not owned, stats update skipped"
            );
        }

        Ok(applied)
    }

    /// Newest first, optionally for a single card. Anonymous callers get nothing.
    pub fn list_events(
        &self,
        owner: Option<&OwnerId>,
        flashcard_id: Option<i64>,
    ) -> StudyResult<Vec<StudySessionEvent>> {
        match owner {
            Some(owner) => Ok(self.db.list_events(owner, flashcard_id)?),
            None => Ok(vec![]),
        }
    }
}
