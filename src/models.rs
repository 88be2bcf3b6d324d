use serde::{Deserialize, Serialize};

use crate::identity::OwnerId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub const ALL: [Difficulty; 3] = [Difficulty::Easy, Difficulty::Medium, Difficulty::Hard];

    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "easy" | "e" => Some(Difficulty::Easy),
            "medium" | "m" => Some(Difficulty::Medium),
            "hard" | "h" => Some(Difficulty::Hard),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Difficulty::Easy => "Easy",
            Difficulty::Medium => "Medium",
            Difficulty::Hard => "Hard",
        }
    }

    // Guidance handed to the generator for each level
    pub fn generation_hint(&self) -> &'static str {
        match self {
            Difficulty::Easy => "Basic concepts and definitions",
            Difficulty::Medium => "Application and analysis questions",
            Difficulty::Hard => "Complex synthesis and evaluation questions",
        }
    }
}

// Whether a card was written by hand or produced by the generator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Origin {
    Manual,
    Ai,
}

impl Origin {
    pub fn as_str(&self) -> &'static str {
        match self {
            Origin::Manual => "manual",
            Origin::Ai => "ai",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "manual" => Some(Origin::Manual),
            "ai" | "ai-generated" | "ai_generated" => Some(Origin::Ai),
            _ => None,
        }
    }

    pub fn is_ai_generated(&self) -> bool {
        matches!(self, Origin::Ai)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Flashcard {
    pub id: i64,
    pub owner_id: OwnerId,
    pub topic: String,
    pub question: String,
    pub answer: String,
    pub difficulty: Difficulty,
    pub origin: Origin,
    pub study_count: i64,
    pub correct_count: i64,
    pub created_at: String,
}

impl Flashcard {
    /// Percentage of answers that were correct, rounded to the nearest whole number.
    pub fn accuracy(&self) -> i64 {
        accuracy_percent(self.correct_count, self.study_count)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Topic {
    pub id: i64,
    pub owner_id: OwnerId,
    pub name: String,
    pub flashcard_count: i64,
    pub created_at: String,
}

// One recorded answer; never updated once written
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudySessionEvent {
    pub id: i64,
    pub owner_id: OwnerId,
    pub flashcard_id: i64,
    pub was_correct: bool,
    pub time_spent_secs: u32,
    pub created_at: String,
}

/// A question/answer pair awaiting insertion, typically parsed from generator output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCard {
    pub question: String,
    pub answer: String,
}

impl NewCard {
    pub fn new(question: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            answer: answer.into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Overview {
    pub total_topics: i64,
    pub total_flashcards: i64,
    pub ai_generated: i64,
    pub total_answers: i64,
    pub correct_answers: i64,
}

impl Overview {
    pub fn accuracy(&self) -> i64 {
        accuracy_percent(self.correct_answers, self.total_answers)
    }
}

pub fn accuracy_percent(correct: i64, total: i64) -> i64 {
    if total <= 0 {
        0
    } else {
        ((correct as f64 / total as f64) * 100.0).round() as i64
    }
}

// JSON output wrapper for CLI
#[derive(Debug, Serialize)]
pub struct JsonOutput<T: Serialize> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T: Serialize> JsonOutput<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn err(msg: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(msg.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_card(study_count: i64, correct_count: i64) -> Flashcard {
        Flashcard {
            id: 1,
            owner_id: OwnerId::new("alice"),
            topic: "Math".to_string(),
            question: "2 + 2?".to_string(),
            answer: "4".to_string(),
            difficulty: Difficulty::Easy,
            origin: Origin::Manual,
            study_count,
            correct_count,
            created_at: "2026-01-01T00:00:00+00:00".to_string(),
        }
    }

    mod accuracy_tests {
        use super::*;

        #[test]
        fn unstudied_card_is_zero() {
            assert_eq!(make_card(0, 0).accuracy(), 0);
        }

        #[test]
        fn three_of_four() {
            assert_eq!(make_card(4, 3).accuracy(), 75);
        }

        #[test]
        fn rounds_to_nearest() {
            // 2/3 = 66.67
            assert_eq!(make_card(3, 2).accuracy(), 67);
            // 1/3 = 33.33
            assert_eq!(make_card(3, 1).accuracy(), 33);
            // 1/8 = 12.5
            assert_eq!(make_card(8, 1).accuracy(), 13);
        }

        #[test]
        fn perfect_score() {
            assert_eq!(make_card(10, 10).accuracy(), 100);
        }

        #[test]
        fn overview_accuracy() {
            let overview = Overview {
                total_answers: 8,
                correct_answers: 6,
                ..Default::default()
            };
            assert_eq!(overview.accuracy(), 75);
            assert_eq!(Overview::default().accuracy(), 0);
        }
    }

    mod difficulty_tests {
        use super::*;

        #[test]
        fn round_trips_through_str() {
            for d in Difficulty::ALL {
                assert_eq!(Difficulty::from_str(d.as_str()), Some(d));
            }
        }

        #[test]
        fn accepts_short_and_mixed_case() {
            assert_eq!(Difficulty::from_str("E"), Some(Difficulty::Easy));
            assert_eq!(Difficulty::from_str(" Medium "), Some(Difficulty::Medium));
            assert_eq!(Difficulty::from_str("HARD"), Some(Difficulty::Hard));
        }

        #[test]
        fn rejects_unknown() {
            assert!(Difficulty::from_str("extreme").is_none());
            assert!(Difficulty::from_str("").is_none());
        }

        #[test]
        fn serializes_lowercase() {
            let json = serde_json::to_string(&Difficulty::Medium).unwrap();
            assert_eq!(json, "\"medium\"");
        }
    }

    mod origin_tests {
        use super::*;

        #[test]
        fn parses_variants() {
            assert_eq!(Origin::from_str("manual"), Some(Origin::Manual));
            assert_eq!(Origin::from_str("AI"), Some(Origin::Ai));
            assert_eq!(Origin::from_str("ai-generated"), Some(Origin::Ai));
            assert!(Origin::from_str("robot").is_none());
        }

        #[test]
        fn ai_flag() {
            assert!(Origin::Ai.is_ai_generated());
            assert!(!Origin::Manual.is_ai_generated());
        }
    }

    mod json_output_tests {
        use super::*;

        #[test]
        fn ok_with_unit() {
            let output = JsonOutput::<()>::ok(());
            assert!(output.success);
            assert!(output.error.is_none());
        }

        #[test]
        fn err_with_message() {
            let output = JsonOutput::<()>::err("Flashcard not found");
            assert!(!output.success);
            assert!(output.data.is_none());
            assert_eq!(output.error, Some("Flashcard not found".to_string()));
        }

        #[test]
        fn serializes_card_payload() {
            let output = JsonOutput::ok(make_card(2, 1));
            let json = serde_json::to_value(&output).unwrap();
            assert_eq!(json["success"], true);
            assert_eq!(json["data"]["difficulty"], "easy");
            assert_eq!(json["data"]["origin"], "manual");
            assert_eq!(json["data"]["owner_id"], "alice");
        }
    }
}
