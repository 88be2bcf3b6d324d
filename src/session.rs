//! Caller-driven study sessions.
//!
//! A session walks a working set one card at a time:
//! `Presenting → AnswerRevealed → Presenting (next) | Complete`.
//! Nothing about the session itself is persisted; each answered card is
//! recorded through [`StudyTracker::record_answer`] as the session goes, so
//! abandoning a session simply keeps the answers already recorded.

use std::time::Instant;

use rand::seq::SliceRandom;
use rand::Rng;
use serde::Serialize;

use crate::error::{StudyError, StudyResult};
use crate::identity::OwnerId;
use crate::models::{accuracy_percent, Flashcard};
use crate::tracker::StudyTracker;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Presenting(usize),
    AnswerRevealed(usize),
    Complete,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SessionTally {
    pub correct: u32,
    pub incorrect: u32,
}

impl SessionTally {
    pub fn answered(&self) -> u32 {
        self.correct + self.incorrect
    }

    pub fn accuracy(&self) -> i64 {
        accuracy_percent(self.correct as i64, self.answered() as i64)
    }
}

pub struct StudySession {
    cards: Vec<Flashcard>,
    state: SessionState,
    tally: SessionTally,
    presented_at: Instant,
}

impl StudySession {
    pub fn new(cards: Vec<Flashcard>) -> StudyResult<Self> {
        if cards.is_empty() {
            return Err(StudyError::validation("no flashcards to study"));
        }
        Ok(Self {
            cards,
            state: SessionState::Presenting(0),
            tally: SessionTally::default(),
            presented_at: Instant::now(),
        })
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn tally(&self) -> SessionTally {
        self.tally
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_complete(&self) -> bool {
        self.state == SessionState::Complete
    }

    /// 1-based position of the current card, or `None` once complete.
    pub fn position(&self) -> Option<usize> {
        match self.state {
            SessionState::Presenting(i) | SessionState::AnswerRevealed(i) => Some(i + 1),
            SessionState::Complete => None,
        }
    }

    pub fn current(&self) -> Option<&Flashcard> {
        match self.state {
            SessionState::Presenting(i) | SessionState::AnswerRevealed(i) => self.cards.get(i),
            SessionState::Complete => None,
        }
    }

    pub fn reveal(&mut self) -> StudyResult<&Flashcard> {
        match self.state {
            SessionState::Presenting(i) => {
                self.state = SessionState::AnswerRevealed(i);
                Ok(&self.cards[i])
            }
            SessionState::AnswerRevealed(_) => {
                Err(StudyError::validation("answer is already revealed"))
            }
            SessionState::Complete => Err(StudyError::validation("session is complete")),
        }
    }

    /// Records the outcome for the revealed card and moves on.
    ///
    /// Time spent is measured from when the card was presented. If recording
    /// fails the session stays on the same card so the caller can retry.
    pub fn answer(
        &mut self,
        tracker: &StudyTracker<'_>,
        owner: Option<&OwnerId>,
        was_correct: bool,
    ) -> StudyResult<SessionState> {
        let index = match self.state {
            SessionState::AnswerRevealed(i) => i,
            SessionState::Presenting(_) => {
                return Err(StudyError::validation("reveal the answer first"))
            }
            SessionState::Complete => return Err(StudyError::validation("session is complete")),
        };

        let elapsed = u32::try_from(self.presented_at.elapsed().as_secs()).unwrap_or(u32::MAX);
        tracker.record_answer(owner, self.cards[index].id, was_correct, elapsed)?;

        if was_correct {
            self.tally.correct += 1;
        } else {
            self.tally.incorrect += 1;
        }

        self.state = if index + 1 < self.cards.len() {
            SessionState::Presenting(index + 1)
        } else {
            SessionState::Complete
        };
        self.presented_at = Instant::now();

        Ok(self.state)
    }
}

/// How a working set is ordered before a session starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WorkingSetOrder {
    /// As listed by the catalog, newest first.
    #[default]
    Newest,
    Shuffled,
    /// Weighted random order favouring unstudied and low-accuracy cards.
    WeakestFirst,
}

impl WorkingSetOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkingSetOrder::Newest => "newest",
            WorkingSetOrder::Shuffled => "shuffled",
            WorkingSetOrder::WeakestFirst => "weakest",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "newest" | "new" | "n" => Some(WorkingSetOrder::Newest),
            "shuffled" | "shuffle" | "random" | "r" => Some(WorkingSetOrder::Shuffled),
            "weakest" | "weakest-first" | "weak" | "w" => Some(WorkingSetOrder::WeakestFirst),
            _ => None,
        }
    }
}

// Low accuracy and few reviews both raise the weight
fn study_weight(card: &Flashcard) -> f64 {
    let miss_weight = 101.0 - card.accuracy() as f64;
    let novelty = 1.0 + 1.0 / (1.0 + card.study_count as f64);
    miss_weight * novelty
}

pub fn order_working_set<R: Rng + ?Sized>(
    mut cards: Vec<Flashcard>,
    order: WorkingSetOrder,
    rng: &mut R,
) -> Vec<Flashcard> {
    match order {
        WorkingSetOrder::Newest => cards,
        WorkingSetOrder::Shuffled => {
            cards.shuffle(rng);
            cards
        }
        WorkingSetOrder::WeakestFirst => {
            let mut ordered = Vec::with_capacity(cards.len());
            while !cards.is_empty() {
                let weights: Vec<f64> = cards.iter().map(study_weight).collect();
                let total_weight: f64 = weights.iter().sum();
                let mut random_point = rng.gen::<f64>() * total_weight;

                let mut picked = cards.len() - 1;
                for (i, weight) in weights.iter().enumerate() {
                    random_point -= weight;
                    if random_point <= 0.0 {
                        picked = i;
                        break;
                    }
                }
                ordered.push(cards.swap_remove(picked));
            }
            ordered
        }
    }
}
