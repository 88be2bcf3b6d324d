use chrono::Utc;
use rusqlite::{params, Connection, Result, Row, Transaction, TransactionBehavior};
use std::path::Path;
use std::time::Duration;

use crate::identity::OwnerId;
use crate::models::{Difficulty, Flashcard, NewCard, Origin, Overview, StudySessionEvent, Topic};

pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const FLASHCARD_COLUMNS: &str = "id, owner_id, topic, question, answer, difficulty, origin, \
                                 study_count, correct_count, created_at";

/// What happened to the owning topic when a flashcard was removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TopicRelease {
    Decremented,
    Removed,
    /// No topic row matched the card; the counter was left alone.
    Missing,
}

pub struct Database {
    conn: Connection,
}

impl Database {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open_with_busy_timeout(path, DEFAULT_BUSY_TIMEOUT)
    }

    pub fn open_with_busy_timeout<P: AsRef<Path>>(path: P, busy_timeout: Duration) -> Result<Self> {
        let conn = Connection::open(path)?;
        // Concurrent writers wait on the lock instead of failing with SQLITE_BUSY
        conn.busy_timeout(busy_timeout)?;
        Ok(Self { conn })
    }

    pub fn init(&self) -> Result<()> {
        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS topics (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                owner_id TEXT NOT NULL,
                name TEXT NOT NULL,
                flashcard_count INTEGER NOT NULL CHECK(flashcard_count > 0),
                created_at TEXT NOT NULL,
                UNIQUE(owner_id, name)
            );

            CREATE TABLE IF NOT EXISTS flashcards (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                owner_id TEXT NOT NULL,
                topic TEXT NOT NULL,
                question TEXT NOT NULL,
                answer TEXT NOT NULL,
                difficulty TEXT NOT NULL CHECK(difficulty IN ('easy', 'medium', 'hard')),
                origin TEXT NOT NULL CHECK(origin IN ('manual', 'ai')),
                study_count INTEGER NOT NULL DEFAULT 0 CHECK(study_count >= 0),
                correct_count INTEGER NOT NULL DEFAULT 0
                    CHECK(correct_count >= 0 AND correct_count <= study_count),
                created_at TEXT NOT NULL
            );

            -- Append-only; flashcard_id may outlive the card it points at
            CREATE TABLE IF NOT EXISTS study_events (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                owner_id TEXT NOT NULL,
                flashcard_id INTEGER NOT NULL,
                was_correct INTEGER NOT NULL,
                time_spent_secs INTEGER NOT NULL CHECK(time_spent_secs >= 0),
                created_at TEXT NOT NULL
            );

            CREATE VIRTUAL TABLE IF NOT EXISTS flashcards_fts USING fts5(
                question,
                content='flashcards',
                content_rowid='id',
                tokenize='porter unicode61'
            );

            CREATE TRIGGER IF NOT EXISTS flashcards_fts_insert AFTER INSERT ON flashcards BEGIN
                INSERT INTO flashcards_fts(rowid, question) VALUES (new.id, new.question);
            END;

            CREATE TRIGGER IF NOT EXISTS flashcards_fts_delete AFTER DELETE ON flashcards BEGIN
                INSERT INTO flashcards_fts(flashcards_fts, rowid, question)
                VALUES ('delete', old.id, old.question);
            END;

            CREATE INDEX IF NOT EXISTS idx_topics_owner ON topics(owner_id);
            CREATE INDEX IF NOT EXISTS idx_flashcards_owner ON flashcards(owner_id);
            CREATE INDEX IF NOT EXISTS idx_flashcards_owner_topic ON flashcards(owner_id, topic);
            CREATE INDEX IF NOT EXISTS idx_study_events_owner ON study_events(owner_id);
            CREATE INDEX IF NOT EXISTS idx_study_events_flashcard ON study_events(flashcard_id);
            "#,
        )?;

        Ok(())
    }

    // Takes the write lock up front so counter reads and writes in the
    // same transaction cannot interleave with another writer.
    fn begin_immediate(&self) -> Result<Transaction<'_>> {
        Transaction::new_unchecked(&self.conn, TransactionBehavior::Immediate)
    }

    // Flashcard + topic mutations

    /// Bumps the topic counter by `cards.len()` and inserts every card, all or nothing.
    pub fn insert_flashcards(
        &self,
        owner: &OwnerId,
        topic: &str,
        difficulty: Difficulty,
        origin: Origin,
        cards: &[NewCard],
    ) -> Result<Vec<i64>> {
        if cards.is_empty() {
            return Ok(vec![]);
        }

        let now = Utc::now().to_rfc3339();
        let tx = self.begin_immediate()?;

        tx.execute(
            r#"
            INSERT INTO topics (owner_id, name, flashcard_count, created_at)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(owner_id, name)
            DO UPDATE SET flashcard_count = flashcard_count + excluded.flashcard_count
            "#,
            params![owner.as_str(), topic, cards.len() as i64, now],
        )?;

        let mut ids = Vec::with_capacity(cards.len());
        {
            let mut stmt = tx.prepare(
                r#"
                INSERT INTO flashcards
                    (owner_id, topic, question, answer, difficulty, origin, created_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                "#,
            )?;
            for card in cards {
                let id = stmt.insert(params![
                    owner.as_str(),
                    topic,
                    card.question,
                    card.answer,
                    difficulty.as_str(),
                    origin.as_str(),
                    now
                ])?;
                ids.push(id);
            }
        }

        tx.commit()?;
        Ok(ids)
    }

    /// Removes an owned flashcard and releases its slot in the topic counter.
    /// Returns `None` when the card does not exist or belongs to someone else.
    pub fn remove_flashcard(
        &self,
        owner: &OwnerId,
        flashcard_id: i64,
    ) -> Result<Option<(Flashcard, TopicRelease)>> {
        let tx = self.begin_immediate()?;

        let card = match query_flashcard(&tx, owner, flashcard_id)? {
            Some(card) => card,
            None => return Ok(None),
        };

        let decremented = tx.execute(
            r#"
            UPDATE topics SET flashcard_count = flashcard_count - 1
            WHERE owner_id = ?1 AND name = ?2 AND flashcard_count > 1
            "#,
            params![owner.as_str(), card.topic],
        )?;

        let release = if decremented > 0 {
            TopicRelease::Decremented
        } else {
            let removed = tx.execute(
                "DELETE FROM topics WHERE owner_id = ?1 AND name = ?2",
                params![owner.as_str(), card.topic],
            )?;
            if removed > 0 {
                TopicRelease::Removed
            } else {
                TopicRelease::Missing
            }
        };

        tx.execute(
            "DELETE FROM flashcards WHERE id = ?1 AND owner_id = ?2",
            params![flashcard_id, owner.as_str()],
        )?;

        tx.commit()?;
        Ok(Some((card, release)))
    }

    // Study tracking

    /// Appends a study event and, if the card is owned by `owner`, bumps its counters.
    /// Returns whether the counters were updated.
    pub fn record_answer(
        &self,
        owner: &OwnerId,
        flashcard_id: i64,
        was_correct: bool,
        time_spent_secs: u32,
    ) -> Result<bool> {
        let now = Utc::now().to_rfc3339();
        let tx = self.begin_immediate()?;

        tx.execute(
            r#"
            INSERT INTO study_events (owner_id, flashcard_id, was_correct, time_spent_secs, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            params![owner.as_str(), flashcard_id, was_correct, time_spent_secs, now],
        )?;

        let updated = tx.execute(
            r#"
            UPDATE flashcards
            SET study_count = study_count + 1,
                correct_count = correct_count + ?1
            WHERE id = ?2 AND owner_id = ?3
            "#,
            params![was_correct as i64, flashcard_id, owner.as_str()],
        )?;

        tx.commit()?;
        Ok(updated > 0)
    }

    // Queries

    pub fn get_flashcard(&self, owner: &OwnerId, flashcard_id: i64) -> Result<Option<Flashcard>> {
        query_flashcard(&self.conn, owner, flashcard_id)
    }

    pub fn list_flashcards(&self, owner: &OwnerId, topic: Option<&str>) -> Result<Vec<Flashcard>> {
        if let Some(topic) = topic {
            let mut stmt = self.conn.prepare(&format!(
                "SELECT {} FROM flashcards WHERE owner_id = ?1 AND topic = ?2 ORDER BY id DESC",
                FLASHCARD_COLUMNS
            ))?;
            let rows = stmt.query_map(params![owner.as_str(), topic], flashcard_from_row)?;
            rows.collect::<Result<Vec<_>>>()
        } else {
            let mut stmt = self.conn.prepare(&format!(
                "SELECT {} FROM flashcards WHERE owner_id = ?1 ORDER BY id DESC",
                FLASHCARD_COLUMNS
            ))?;
            let rows = stmt.query_map(params![owner.as_str()], flashcard_from_row)?;
            rows.collect::<Result<Vec<_>>>()
        }
    }

    pub fn list_topics(&self, owner: &OwnerId) -> Result<Vec<Topic>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT id, owner_id, name, flashcard_count, created_at
            FROM topics
            WHERE owner_id = ?1
            ORDER BY id DESC
            "#,
        )?;

        let rows = stmt.query_map(params![owner.as_str()], |row| {
            Ok(Topic {
                id: row.get(0)?,
                owner_id: OwnerId::new(row.get::<_, String>(1)?),
                name: row.get(2)?,
                flashcard_count: row.get(3)?,
                created_at: row.get(4)?,
            })
        })?;

        rows.collect::<Result<Vec<_>>>()
    }

    /// Full-text query over question text. `match_expr` must already be a valid FTS5 expression.
    pub fn search_flashcards(
        &self,
        owner: &OwnerId,
        match_expr: &str,
        topic: Option<&str>,
        difficulty: Option<Difficulty>,
        limit: usize,
    ) -> Result<Vec<Flashcard>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT f.id, f.owner_id, f.topic, f.question, f.answer, f.difficulty, f.origin,
                   f.study_count, f.correct_count, f.created_at
            FROM flashcards_fts
            JOIN flashcards f ON f.id = flashcards_fts.rowid
            WHERE flashcards_fts MATCH ?1
              AND f.owner_id = ?2
              AND (?3 IS NULL OR f.topic = ?3)
              AND (?4 IS NULL OR f.difficulty = ?4)
            ORDER BY bm25(flashcards_fts), f.id DESC
            LIMIT ?5
            "#,
        )?;

        let rows = stmt.query_map(
            params![
                match_expr,
                owner.as_str(),
                topic,
                difficulty.map(|d| d.as_str()),
                limit as i64
            ],
            flashcard_from_row,
        )?;

        rows.collect::<Result<Vec<_>>>()
    }

    pub fn list_events(
        &self,
        owner: &OwnerId,
        flashcard_id: Option<i64>,
    ) -> Result<Vec<StudySessionEvent>> {
        let (query, params_vec): (&str, Vec<Box<dyn rusqlite::ToSql>>) = if let Some(fid) = flashcard_id {
            (
                r#"
                SELECT id, owner_id, flashcard_id, was_correct, time_spent_secs, created_at
                FROM study_events
                WHERE owner_id = ?1 AND flashcard_id = ?2
                ORDER BY id DESC
                "#,
                vec![Box::new(owner.as_str().to_string()), Box::new(fid)],
            )
        } else {
            (
                r#"
                SELECT id, owner_id, flashcard_id, was_correct, time_spent_secs, created_at
                FROM study_events
                WHERE owner_id = ?1
                ORDER BY id DESC
                "#,
                vec![Box::new(owner.as_str().to_string())],
            )
        };

        let mut stmt = self.conn.prepare(query)?;
        let params_refs: Vec<&dyn rusqlite::ToSql> = params_vec.iter().map(|b| b.as_ref()).collect();

        let rows = stmt.query_map(params_refs.as_slice(), |row| {
            Ok(StudySessionEvent {
                id: row.get(0)?,
                owner_id: OwnerId::new(row.get::<_, String>(1)?),
                flashcard_id: row.get(2)?,
                was_correct: row.get(3)?,
                time_spent_secs: row.get(4)?,
                created_at: row.get(5)?,
            })
        })?;

        rows.collect::<Result<Vec<_>>>()
    }

    pub fn overview(&self, owner: &OwnerId) -> Result<Overview> {
        let total_topics: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM topics WHERE owner_id = ?1",
            params![owner.as_str()],
            |row| row.get(0),
        )?;

        let (total_flashcards, ai_generated): (i64, i64) = self.conn.query_row(
            r#"
            SELECT COUNT(*), COALESCE(SUM(CASE WHEN origin = 'ai' THEN 1 ELSE 0 END), 0)
            FROM flashcards
            WHERE owner_id = ?1
            "#,
            params![owner.as_str()],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;

        let (total_answers, correct_answers): (i64, i64) = self.conn.query_row(
            r#"
            SELECT COUNT(*), COALESCE(SUM(was_correct), 0)
            FROM study_events
            WHERE owner_id = ?1
            "#,
            params![owner.as_str()],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;

        Ok(Overview {
            total_topics,
            total_flashcards,
            ai_generated,
            total_answers,
            correct_answers,
        })
    }
}

fn query_flashcard(conn: &Connection, owner: &OwnerId, flashcard_id: i64) -> Result<Option<Flashcard>> {
    let card = conn.query_row(
        &format!(
            "SELECT {} FROM flashcards WHERE id = ?1 AND owner_id = ?2",
            FLASHCARD_COLUMNS
        ),
        params![flashcard_id, owner.as_str()],
        flashcard_from_row,
    );

    match card {
        Ok(c) => Ok(Some(c)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e),
    }
}

fn flashcard_from_row(row: &Row<'_>) -> Result<Flashcard> {
    let difficulty_str: String = row.get(5)?;
    let origin_str: String = row.get(6)?;
    Ok(Flashcard {
        id: row.get(0)?,
        owner_id: OwnerId::new(row.get::<_, String>(1)?),
        topic: row.get(2)?,
        question: row.get(3)?,
        answer: row.get(4)?,
        difficulty: Difficulty::from_str(&difficulty_str).unwrap_or(Difficulty::Medium),
        origin: Origin::from_str(&origin_str).unwrap_or(Origin::Manual),
        study_count: row.get(7)?,
        correct_count: row.get(8)?,
        created_at: row.get(9)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup_db() -> Database {
        let db = Database::open(":memory:").expect("Failed to create in-memory database");
        db.init().expect("Failed to initialize database");
        db
    }

    fn alice() -> OwnerId {
        OwnerId::new("alice")
    }

    fn cards(n: usize) -> Vec<NewCard> {
        (0..n)
            .map(|i| NewCard::new(format!("Question {}", i), format!("Answer {}", i)))
            .collect()
    }

    fn topic_count(db: &Database, owner: &OwnerId, name: &str) -> Option<i64> {
        db.list_topics(owner)
            .unwrap()
            .into_iter()
            .find(|t| t.name == name)
            .map(|t| t.flashcard_count)
    }

    mod init_tests {
        use super::*;

        #[test]
        fn init_creates_tables() {
            let db = setup_db();
            for table in ["topics", "flashcards", "study_events", "flashcards_fts"] {
                let count: i64 = db
                    .conn
                    .query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| row.get(0))
                    .unwrap_or_else(|_| panic!("{} table should exist", table));
                assert_eq!(count, 0);
            }
        }

        #[test]
        fn init_is_idempotent() {
            let db = setup_db();
            db.insert_flashcards(&alice(), "Math", Difficulty::Easy, Origin::Manual, &cards(1))
                .unwrap();

            db.init().expect("Re-init should succeed");

            assert_eq!(db.list_flashcards(&alice(), None).unwrap().len(), 1);
        }
    }

    mod insert_tests {
        use super::*;

        #[test]
        fn creates_topic_with_count() {
            let db = setup_db();
            let ids = db
                .insert_flashcards(&alice(), "Bio", Difficulty::Medium, Origin::Ai, &cards(3))
                .unwrap();

            assert_eq!(ids.len(), 3);
            assert_eq!(topic_count(&db, &alice(), "Bio"), Some(3));
        }

        #[test]
        fn existing_topic_is_incremented() {
            let db = setup_db();
            db.insert_flashcards(&alice(), "Bio", Difficulty::Easy, Origin::Manual, &cards(2))
                .unwrap();
            db.insert_flashcards(&alice(), "Bio", Difficulty::Hard, Origin::Ai, &cards(3))
                .unwrap();

            assert_eq!(topic_count(&db, &alice(), "Bio"), Some(5));
            assert_eq!(db.list_topics(&alice()).unwrap().len(), 1);
        }

        #[test]
        fn new_cards_start_unstudied() {
            let db = setup_db();
            let ids = db
                .insert_flashcards(&alice(), "Math", Difficulty::Easy, Origin::Manual, &cards(1))
                .unwrap();

            let card = db.get_flashcard(&alice(), ids[0]).unwrap().unwrap();
            assert_eq!(card.study_count, 0);
            assert_eq!(card.correct_count, 0);
            assert_eq!(card.origin, Origin::Manual);
            assert_eq!(card.difficulty, Difficulty::Easy);
        }

        #[test]
        fn empty_batch_touches_nothing() {
            let db = setup_db();
            let ids = db
                .insert_flashcards(&alice(), "Math", Difficulty::Easy, Origin::Ai, &[])
                .unwrap();
            assert!(ids.is_empty());
            assert!(db.list_topics(&alice()).unwrap().is_empty());
        }

        #[test]
        fn same_topic_name_is_separate_per_owner() {
            let db = setup_db();
            let bob = OwnerId::new("bob");
            db.insert_flashcards(&alice(), "Math", Difficulty::Easy, Origin::Manual, &cards(2))
                .unwrap();
            db.insert_flashcards(&bob, "Math", Difficulty::Easy, Origin::Manual, &cards(1))
                .unwrap();

            assert_eq!(topic_count(&db, &alice(), "Math"), Some(2));
            assert_eq!(topic_count(&db, &bob, "Math"), Some(1));
        }
    }

    mod remove_tests {
        use super::*;

        #[test]
        fn decrements_when_siblings_remain() {
            let db = setup_db();
            let ids = db
                .insert_flashcards(&alice(), "Bio", Difficulty::Easy, Origin::Manual, &cards(3))
                .unwrap();

            let (card, release) = db.remove_flashcard(&alice(), ids[0]).unwrap().unwrap();
            assert_eq!(card.id, ids[0]);
            assert_eq!(release, TopicRelease::Decremented);
            assert_eq!(topic_count(&db, &alice(), "Bio"), Some(2));
        }

        #[test]
        fn removes_topic_with_last_card() {
            let db = setup_db();
            let ids = db
                .insert_flashcards(&alice(), "Math", Difficulty::Easy, Origin::Manual, &cards(1))
                .unwrap();

            let (_, release) = db.remove_flashcard(&alice(), ids[0]).unwrap().unwrap();
            assert_eq!(release, TopicRelease::Removed);
            assert!(db.list_topics(&alice()).unwrap().is_empty());
            assert!(db.get_flashcard(&alice(), ids[0]).unwrap().is_none());
        }

        #[test]
        fn foreign_card_is_not_removed() {
            let db = setup_db();
            let ids = db
                .insert_flashcards(&alice(), "Math", Difficulty::Easy, Origin::Manual, &cards(1))
                .unwrap();

            let result = db.remove_flashcard(&OwnerId::new("mallory"), ids[0]).unwrap();
            assert!(result.is_none());
            assert!(db.get_flashcard(&alice(), ids[0]).unwrap().is_some());
            assert_eq!(topic_count(&db, &alice(), "Math"), Some(1));
        }

        #[test]
        fn missing_topic_row_is_left_alone() {
            let db = setup_db();
            let ids = db
                .insert_flashcards(&alice(), "Math", Difficulty::Easy, Origin::Manual, &cards(1))
                .unwrap();
            db.conn
                .execute("DELETE FROM topics WHERE name = 'Math'", [])
                .unwrap();

            let (_, release) = db.remove_flashcard(&alice(), ids[0]).unwrap().unwrap();
            assert_eq!(release, TopicRelease::Missing);
            assert!(db.get_flashcard(&alice(), ids[0]).unwrap().is_none());
        }

        #[test]
        fn removed_card_leaves_search_index() {
            let db = setup_db();
            let ids = db
                .insert_flashcards(
                    &alice(),
                    "Bio",
                    Difficulty::Easy,
                    Origin::Manual,
                    &[NewCard::new("What is a mitochondrion?", "Powerhouse")],
                )
                .unwrap();
            db.remove_flashcard(&alice(), ids[0]).unwrap();

            let hits = db
                .search_flashcards(&alice(), "\"mitochondrion\"*", None, None, 20)
                .unwrap();
            assert!(hits.is_empty());
        }
    }

    mod answer_tests {
        use super::*;

        #[test]
        fn correct_answer_bumps_both_counters() {
            let db = setup_db();
            let ids = db
                .insert_flashcards(&alice(), "Math", Difficulty::Easy, Origin::Manual, &cards(1))
                .unwrap();

            assert!(db.record_answer(&alice(), ids[0], true, 4).unwrap());

            let card = db.get_flashcard(&alice(), ids[0]).unwrap().unwrap();
            assert_eq!(card.study_count, 1);
            assert_eq!(card.correct_count, 1);
        }

        #[test]
        fn incorrect_answer_bumps_study_count_only() {
            let db = setup_db();
            let ids = db
                .insert_flashcards(&alice(), "Math", Difficulty::Easy, Origin::Manual, &cards(1))
                .unwrap();

            db.record_answer(&alice(), ids[0], false, 9).unwrap();

            let card = db.get_flashcard(&alice(), ids[0]).unwrap().unwrap();
            assert_eq!(card.study_count, 1);
            assert_eq!(card.correct_count, 0);
        }

        #[test]
        fn unknown_card_still_records_event() {
            let db = setup_db();
            assert!(!db.record_answer(&alice(), 404, true, 1).unwrap());

            let events = db.list_events(&alice(), Some(404)).unwrap();
            assert_eq!(events.len(), 1);
            assert!(events[0].was_correct);
        }

        #[test]
        fn foreign_card_stats_untouched() {
            let db = setup_db();
            let ids = db
                .insert_flashcards(&alice(), "Math", Difficulty::Easy, Origin::Manual, &cards(1))
                .unwrap();

            let bob = OwnerId::new("bob");
            assert!(!db.record_answer(&bob, ids[0], true, 2).unwrap());

            let card = db.get_flashcard(&alice(), ids[0]).unwrap().unwrap();
            assert_eq!(card.study_count, 0);
            assert_eq!(db.list_events(&bob, None).unwrap().len(), 1);
            assert!(db.list_events(&alice(), None).unwrap().is_empty());
        }

        #[test]
        fn schema_rejects_correct_above_study() {
            let db = setup_db();
            let ids = db
                .insert_flashcards(&alice(), "Math", Difficulty::Easy, Origin::Manual, &cards(1))
                .unwrap();

            let result = db.conn.execute(
                "UPDATE flashcards SET correct_count = 1 WHERE id = ?1",
                params![ids[0]],
            );
            assert!(result.is_err());
        }
    }

    mod query_tests {
        use super::*;

        #[test]
        fn list_flashcards_newest_first() {
            let db = setup_db();
            let ids = db
                .insert_flashcards(&alice(), "Math", Difficulty::Easy, Origin::Manual, &cards(3))
                .unwrap();

            let listed: Vec<i64> = db
                .list_flashcards(&alice(), None)
                .unwrap()
                .iter()
                .map(|c| c.id)
                .collect();
            assert_eq!(listed, vec![ids[2], ids[1], ids[0]]);
        }

        #[test]
        fn list_flashcards_by_topic() {
            let db = setup_db();
            db.insert_flashcards(&alice(), "Math", Difficulty::Easy, Origin::Manual, &cards(2))
                .unwrap();
            db.insert_flashcards(&alice(), "Bio", Difficulty::Easy, Origin::Manual, &cards(1))
                .unwrap();

            let math = db.list_flashcards(&alice(), Some("Math")).unwrap();
            assert_eq!(math.len(), 2);
            assert!(math.iter().all(|c| c.topic == "Math"));
            assert!(db.list_flashcards(&alice(), Some("Art")).unwrap().is_empty());
        }

        #[test]
        fn list_topics_newest_first() {
            let db = setup_db();
            db.insert_flashcards(&alice(), "First", Difficulty::Easy, Origin::Manual, &cards(1))
                .unwrap();
            db.insert_flashcards(&alice(), "Second", Difficulty::Easy, Origin::Manual, &cards(1))
                .unwrap();

            let topics = db.list_topics(&alice()).unwrap();
            assert_eq!(topics[0].name, "Second");
            assert_eq!(topics[1].name, "First");
        }

        #[test]
        fn search_applies_filters() {
            let db = setup_db();
            db.insert_flashcards(
                &alice(),
                "Bio",
                Difficulty::Easy,
                Origin::Manual,
                &[NewCard::new("What does the cell membrane do?", "Controls entry")],
            )
            .unwrap();
            db.insert_flashcards(
                &alice(),
                "Bio",
                Difficulty::Hard,
                Origin::Manual,
                &[NewCard::new("Explain cell signalling", "Receptors")],
            )
            .unwrap();
            db.insert_flashcards(
                &alice(),
                "Chem",
                Difficulty::Easy,
                Origin::Manual,
                &[NewCard::new("What is a fuel cell?", "Electrochemical")],
            )
            .unwrap();

            let all = db.search_flashcards(&alice(), "\"cell\"*", None, None, 20).unwrap();
            assert_eq!(all.len(), 3);

            let bio = db
                .search_flashcards(&alice(), "\"cell\"*", Some("Bio"), None, 20)
                .unwrap();
            assert_eq!(bio.len(), 2);

            let bio_hard = db
                .search_flashcards(&alice(), "\"cell\"*", Some("Bio"), Some(Difficulty::Hard), 20)
                .unwrap();
            assert_eq!(bio_hard.len(), 1);
            assert_eq!(bio_hard[0].question, "Explain cell signalling");
        }

        #[test]
        fn search_is_owner_scoped_and_limited() {
            let db = setup_db();
            let many: Vec<NewCard> = (0..30)
                .map(|i| NewCard::new(format!("Enzyme question {}", i), "answer"))
                .collect();
            db.insert_flashcards(&alice(), "Bio", Difficulty::Easy, Origin::Ai, &many)
                .unwrap();

            let hits = db.search_flashcards(&alice(), "\"enzyme\"*", None, None, 20).unwrap();
            assert_eq!(hits.len(), 20);

            let bob = db
                .search_flashcards(&OwnerId::new("bob"), "\"enzyme\"*", None, None, 20)
                .unwrap();
            assert!(bob.is_empty());
        }

        #[test]
        fn overview_counts() {
            let db = setup_db();
            let ids = db
                .insert_flashcards(&alice(), "Math", Difficulty::Easy, Origin::Manual, &cards(2))
                .unwrap();
            db.insert_flashcards(&alice(), "Bio", Difficulty::Easy, Origin::Ai, &cards(3))
                .unwrap();
            db.record_answer(&alice(), ids[0], true, 1).unwrap();
            db.record_answer(&alice(), ids[0], false, 1).unwrap();

            let overview = db.overview(&alice()).unwrap();
            assert_eq!(overview.total_topics, 2);
            assert_eq!(overview.total_flashcards, 5);
            assert_eq!(overview.ai_generated, 3);
            assert_eq!(overview.total_answers, 2);
            assert_eq!(overview.correct_answers, 1);
        }

        #[test]
        fn overview_empty_owner() {
            let db = setup_db();
            assert_eq!(db.overview(&alice()).unwrap(), Overview::default());
        }
    }
}
