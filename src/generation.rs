//! Text-generation seam for AI-assisted flashcard creation.
//!
//! The core never talks to a model directly. A [`TextGenerator`] turns a
//! [`GenerationRequest`] into raw completion text; [`parse_generated_cards`]
//! then checks that text has the expected `[{question, answer}, ...]` shape
//! before anything is written to the store.

use std::io::ErrorKind;
use std::process::{Output, Stdio};
use std::time::Duration;

use serde::Deserialize;
use tokio::io::AsyncWriteExt;
use tokio::process::{ChildStdin, Command};
use tokio::time::Instant;
use tracing::debug;

use crate::error::{StudyError, StudyResult};
use crate::models::{Difficulty, NewCard};

/// Batch sizes a caller may ask the generator for.
pub const ALLOWED_COUNTS: [u32; 5] = [3, 5, 10, 15, 20];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    pub topic: String,
    pub count: u32,
    pub difficulty: Difficulty,
    pub context: Option<String>,
}

impl GenerationRequest {
    pub fn new(topic: impl Into<String>, count: u32, difficulty: Difficulty) -> Self {
        Self {
            topic: topic.into(),
            count,
            difficulty,
            context: None,
        }
    }

    /// Blank context is treated as no context.
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        let context = context.into();
        self.context = if context.trim().is_empty() {
            None
        } else {
            Some(context.trim().to_string())
        };
        self
    }

    pub fn validate(&self) -> StudyResult<()> {
        if self.topic.trim().is_empty() {
            return Err(StudyError::validation("topic is required"));
        }
        if !ALLOWED_COUNTS.contains(&self.count) {
            return Err(StudyError::validation(format!(
                "count must be one of {:?}, got {}",
                ALLOWED_COUNTS, self.count
            )));
        }
        Ok(())
    }
}

/// Produces completion text for a generation request.
pub trait TextGenerator {
    fn name(&self) -> &str;

    fn complete(&self, request: &GenerationRequest) -> StudyResult<String>;

    fn build_prompt(&self, request: &GenerationRequest) -> String {
        build_prompt(request)
    }
}

pub fn build_prompt(request: &GenerationRequest) -> String {
    let mut prompt = format!(
        "Write {} {} flashcards about \"{}\".\n",
        request.count,
        request.difficulty.as_str(),
        request.topic.trim()
    );

    if let Some(context) = &request.context {
        prompt.push_str("Additional context: ");
        prompt.push_str(context);
        prompt.push('\n');
    }

    prompt.push_str(&format!(
        "Level guidance ({}): {}.\n",
        request.difficulty.as_str(),
        request.difficulty.generation_hint()
    ));
    prompt.push_str("Keep questions clear and answers concise but complete.\n\n");
    prompt.push_str("Reply with only a JSON array of objects with \"question\" and \"answer\" fields:\n");
    prompt.push_str("[\n");
    prompt.push_str("  {\"question\": \"...\", \"answer\": \"...\"}\n");
    prompt.push_str("]\n");

    prompt
}

#[derive(Debug, Deserialize)]
struct GeneratedCard {
    question: String,
    answer: String,
}

/// Extracts and validates the JSON card array from generator output.
///
/// Tolerates prose or code fences around the array, but every entry must carry
/// a non-empty question and answer and the array must not be empty.
pub fn parse_generated_cards(output: &str) -> StudyResult<Vec<NewCard>> {
    let start = output.find('[');
    let end = output.rfind(']');

    let json_str = match (start, end) {
        (Some(start), Some(end)) if start < end => &output[start..=end],
        _ => return Err(StudyError::generation("reply does not contain a JSON array")),
    };

    let parsed: Vec<GeneratedCard> = serde_json::from_str(json_str)
        .map_err(|e| StudyError::generation(format!("reply is not a card array: {}", e)))?;

    if parsed.is_empty() {
        return Err(StudyError::generation("reply contained no flashcards"));
    }

    parsed
        .into_iter()
        .enumerate()
        .map(|(i, card)| {
            let question = card.question.trim();
            let answer = card.answer.trim();
            if question.is_empty() || answer.is_empty() {
                Err(StudyError::generation(format!(
                    "card {} is missing a question or answer",
                    i + 1
                )))
            } else {
                Ok(NewCard::new(question, answer))
            }
        })
        .collect()
}

/// Runs an external command per request: the prompt goes to stdin and the
/// completion is read from stdout.
#[derive(Debug, Clone)]
pub struct CommandGenerator {
    command: String,
    args: Vec<String>,
    timeout: Duration,
}

impl CommandGenerator {
    pub fn new(command: impl Into<String>, args: Vec<String>, timeout: Duration) -> Self {
        Self {
            command: command.into(),
            args,
            timeout,
        }
    }

    async fn run(&self, prompt: String) -> StudyResult<Output> {
        let mut child = Command::new(&self.command)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                StudyError::generation(format!("could not start '{}': {}", self.command, e))
            })?;

        let stdin = child.stdin.take();
        let exchange = async move {
            // Feed stdin while the output is drained so a chatty child cannot block on a full pipe
            let (written, output) = tokio::join!(write_prompt(stdin, prompt), child.wait_with_output());
            written?;
            output
        };

        // A deadline past what the clock can represent means no deadline
        let output = match Instant::now().checked_add(self.timeout) {
            Some(deadline) => tokio::time::timeout_at(deadline, exchange)
                .await
                .map_err(|_| {
                    StudyError::generation(format!(
                        "'{}' timed out after {:?}",
                        self.command, self.timeout
                    ))
                })?,
            None => exchange.await,
        };

        output.map_err(|e| {
            StudyError::generation(format!("failed to run '{}': {}", self.command, e))
        })
    }
}

impl TextGenerator for CommandGenerator {
    fn name(&self) -> &str {
        &self.command
    }

    fn complete(&self, request: &GenerationRequest) -> StudyResult<String> {
        let prompt = self.build_prompt(request);

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| StudyError::generation(format!("could not start runtime: {}", e)))?;
        let output = runtime.block_on(self.run(prompt))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(StudyError::generation(format!(
                "'{}' exited with {}: {}",
                self.command,
                output.status,
                stderr.trim()
            )));
        }

        let stdout = String::from_utf8(output.stdout).map_err(|e| {
            StudyError::generation(format!("'{}' replied with invalid UTF-8: {}", self.command, e))
        })?;

        if stdout.trim().is_empty() {
            return Err(StudyError::generation("no content generated"));
        }

        debug!(command = %self.command, bytes = stdout.len(), "generator replied");
        Ok(stdout)
    }
}

async fn write_prompt(stdin: Option<ChildStdin>, prompt: String) -> std::io::Result<()> {
    let Some(mut stdin) = stdin else {
        return Ok(());
    };
    match stdin.write_all(prompt.as_bytes()).await {
        // The child may exit without reading its input
        Err(e) if e.kind() == ErrorKind::BrokenPipe => Ok(()),
        result => result,
    }
}
