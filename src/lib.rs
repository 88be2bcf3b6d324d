//! # studybuddy
//!
//! Flashcard study core. Cards are grouped into per-owner topics whose
//! `flashcard_count` is kept in step with the cards themselves, and every
//! answer during study updates the card's running accuracy.
//!
//! - [`catalog`] - create, list, search and delete flashcards and topics
//! - [`tracker`] - record answers and read study history
//! - [`session`] - the study loop state machine and working-set ordering
//! - [`generation`] - AI generation seam and reply validation
//! - [`identity`] - owner ids and the identity provider seam
//! - [`db`] - SQLite store
//! - [`config`] - TOML configuration

pub mod catalog;
pub mod config;
pub mod db;
pub mod error;
pub mod generation;
pub mod identity;
pub mod models;
pub mod session;
pub mod tracker;

pub use catalog::Catalog;
pub use config::Config;
pub use db::Database;
pub use error::{StudyError, StudyResult};
pub use identity::{IdentityProvider, OwnerId, StaticIdentity};
pub use tracker::StudyTracker;
