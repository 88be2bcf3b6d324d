//! Flashcard and topic records.
//!
//! Every create and delete goes through a single store transaction that also
//! adjusts the owning topic's `flashcard_count`, so the counter always matches
//! the number of live cards for that owner and topic name.

use tracing::{debug, info, warn};

use crate::db::{Database, TopicRelease};
use crate::error::{StudyError, StudyResult};
use crate::generation::{parse_generated_cards, GenerationRequest, TextGenerator};
use crate::identity::{require_owner, OwnerId};
use crate::models::{Difficulty, Flashcard, NewCard, Origin, Overview, Topic};

/// Maximum number of results a search returns.
pub const SEARCH_LIMIT: usize = 20;

pub struct Catalog<'a> {
    db: &'a Database,
}

impl<'a> Catalog<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    pub fn create_flashcard(
        &self,
        owner: Option<&OwnerId>,
        topic: &str,
        question: &str,
        answer: &str,
        difficulty: Difficulty,
    ) -> StudyResult<i64> {
        let owner = require_owner(owner)?;
        let topic = required("topic", topic)?;
        let card = NewCard::new(required("question", question)?, required("answer", answer)?);

        let ids = self
            .db
            .insert_flashcards(owner, topic, difficulty, Origin::Manual, &[card])?;
        let id = ids
            .into_iter()
            .next()
            .ok_or_else(|| StudyError::internal("store returned no id for the inserted flashcard"))?;

        info!(owner = %owner, topic, id, "created flashcard");
        Ok(id)
    }

    /// Inserts generated cards under one topic. Either every card is written and
    /// the topic grows by `items.len()`, or nothing changes.
    pub fn create_flashcards_batch(
        &self,
        owner: Option<&OwnerId>,
        topic: &str,
        difficulty: Difficulty,
        items: &[NewCard],
    ) -> StudyResult<Vec<i64>> {
        let owner = require_owner(owner)?;
        let topic = required("topic", topic)?;

        let cards = items
            .iter()
            .enumerate()
            .map(|(i, item)| {
                let question = required("question", &item.question)
                    .map_err(|_| StudyError::validation(format!("item {} has no question", i + 1)))?;
                let answer = required("answer", &item.answer)
                    .map_err(|_| StudyError::validation(format!("item {} has no answer", i + 1)))?;
                Ok(NewCard::new(question, answer))
            })
            .collect::<StudyResult<Vec<_>>>()?;

        if cards.is_empty() {
            debug!(owner = %owner, topic, "empty batch, nothing to insert");
            return Ok(vec![]);
        }

        let ids = self
            .db
            .insert_flashcards(owner, topic, difficulty, Origin::Ai, &cards)?;

        info!(owner = %owner, topic, count = ids.len(), "created flashcard batch");
        Ok(ids)
    }

    /// Asks the generator for cards and stores them as one batch.
    ///
    /// The generator runs before any store transaction is opened; a failed or
    /// malformed reply leaves the catalog untouched.
    pub fn generate_flashcards(
        &self,
        owner: Option<&OwnerId>,
        generator: &dyn TextGenerator,
        request: &GenerationRequest,
    ) -> StudyResult<Vec<i64>> {
        let owner = require_owner(owner)?;
        request.validate()?;

        info!(
            owner = %owner,
            topic = request.topic.trim(),
            count = request.count,
            generator = generator.name(),
            "requesting generated flashcards"
        );

        let output = generator.complete(request).map_err(|e| match e {
            StudyError::Generation(_) => e,
            other => StudyError::generation(other.to_string()),
        })?;
        let cards = parse_generated_cards(&output)?;

        if cards.len() != request.count as usize {
            debug!(
                requested = request.count,
                received = cards.len(),
                "generator returned a different number of cards"
            );
        }

        self.create_flashcards_batch(Some(owner), &request.topic, request.difficulty, &cards)
    }

    pub fn get_flashcard(
        &self,
        owner: Option<&OwnerId>,
        flashcard_id: i64,
    ) -> StudyResult<Option<Flashcard>> {
        match owner {
            Some(owner) => Ok(self.db.get_flashcard(owner, flashcard_id)?),
            None => Ok(None),
        }
    }

    /// Newest first. A blank topic means no topic filter.
    pub fn list_flashcards(
        &self,
        owner: Option<&OwnerId>,
        topic: Option<&str>,
    ) -> StudyResult<Vec<Flashcard>> {
        let Some(owner) = owner else {
            return Ok(vec![]);
        };
        let topic = non_blank(topic);
        Ok(self.db.list_flashcards(owner, topic)?)
    }

    pub fn list_topics(&self, owner: Option<&OwnerId>) -> StudyResult<Vec<Topic>> {
        match owner {
            Some(owner) => Ok(self.db.list_topics(owner)?),
            None => Ok(vec![]),
        }
    }

    /// Relevance-ranked match on question text, capped at [`SEARCH_LIMIT`].
    ///
    /// Callers should fall back to [`Catalog::list_flashcards`] for a blank
    /// term; if they don't, the result is empty.
    pub fn search_flashcards(
        &self,
        owner: Option<&OwnerId>,
        term: &str,
        topic: Option<&str>,
        difficulty: Option<Difficulty>,
    ) -> StudyResult<Vec<Flashcard>> {
        let Some(owner) = owner else {
            return Ok(vec![]);
        };
        let Some(match_expr) = fts_query(term) else {
            return Ok(vec![]);
        };

        debug!(owner = %owner, match_expr = %match_expr, "searching flashcards");
        Ok(self
            .db
            .search_flashcards(owner, &match_expr, non_blank(topic), difficulty, SEARCH_LIMIT)?)
    }

    /// List view helper: search when there is a term, list otherwise, and
    /// narrow by difficulty either way.
    pub fn browse_flashcards(
        &self,
        owner: Option<&OwnerId>,
        term: Option<&str>,
        topic: Option<&str>,
        difficulty: Option<Difficulty>,
    ) -> StudyResult<Vec<Flashcard>> {
        match non_blank(term) {
            Some(term) => self.search_flashcards(owner, term, topic, difficulty),
            None => {
                let cards = self.list_flashcards(owner, topic)?;
                Ok(match difficulty {
                    Some(d) => cards.into_iter().filter(|c| c.difficulty == d).collect(),
                    None => cards,
                })
            }
        }
    }

    pub fn delete_flashcard(&self, owner: Option<&OwnerId>, flashcard_id: i64) -> StudyResult<()> {
        let owner = require_owner(owner)?;

        let (card, release) = self
            .db
            .remove_flashcard(owner, flashcard_id)?
            .ok_or_else(|| StudyError::not_found(format!("flashcard {}", flashcard_id)))?;

        match release {
            TopicRelease::Decremented => {
                debug!(topic = %card.topic, "decremented topic count")
            }
            TopicRelease::Removed => info!(topic = %card.topic, "removed empty topic"),
            TopicRelease::Missing => warn!(
                owner = %owner,
                topic = %card.topic,
                "no topic row for deleted flashcard, count left unchanged"
            ),
        }

        info!(owner = %owner, id = flashcard_id, "deleted flashcard");
        Ok(())
    }

    pub fn overview(&self, owner: Option<&OwnerId>) -> StudyResult<Overview> {
        match owner {
            Some(owner) => Ok(self.db.overview(owner)?),
            None => Ok(Overview::default()),
        }
    }
}

fn required<'s>(field: &str, value: &'s str) -> StudyResult<&'s str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(StudyError::validation(format!("{} is required", field)))
    } else {
        Ok(trimmed)
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Builds an FTS5 expression that requires every word of `term` as a prefix.
///
/// Each word is quoted so user input can never inject FTS syntax. Words with no
/// letters or digits are dropped; `None` means nothing searchable remains.
pub fn fts_query(term: &str) -> Option<String> {
    let tokens: Vec<String> = term
        .split_whitespace()
        .filter(|t| t.chars().any(char::is_alphanumeric))
        .map(|t| format!("\"{}\"*", t.replace('"', "\"\"")))
        .collect();

    if tokens.is_empty() {
        None
    } else {
        Some(tokens.join(" "))
    }
}
