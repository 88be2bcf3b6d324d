use clap::{Parser, Subcommand};
use dialoguer::{theme::ColorfulTheme, Select};
use std::io::{self, Write};
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use studybuddy::config::{self, Config};
use studybuddy::generation::GenerationRequest;
use studybuddy::models::{Difficulty, Flashcard, JsonOutput};
use studybuddy::session::{order_working_set, StudySession, WorkingSetOrder};
use studybuddy::{Catalog, Database, IdentityProvider, OwnerId, StaticIdentity, StudyTracker};

#[derive(Parser)]
#[command(name = "studybuddy")]
#[command(about = "Flashcards with AI-assisted creation and per-card accuracy tracking")]
#[command(version)]
struct Cli {
    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Act as this user (overrides STUDYBUDDY_USER and the config file)
    #[arg(long, short, global = true)]
    user: Option<String>,

    /// Path to the config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Debug logging
    #[arg(long, short, global = true)]
    verbose: bool,

    /// Errors only
    #[arg(long, short, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database
    Init,

    /// Add a flashcard by hand
    Add {
        /// Topic name
        topic: String,

        /// Question text
        question: String,

        /// Answer text
        answer: String,

        /// Difficulty: easy/medium/hard
        #[arg(long, short, default_value = "medium")]
        difficulty: String,
    },

    /// Generate flashcards with the configured AI command
    Generate {
        /// Topic name
        topic: String,

        /// Number of cards: 3, 5, 10, 15 or 20
        #[arg(long, short = 'n', default_value_t = 5)]
        count: u32,

        /// Difficulty: easy/medium/hard
        #[arg(long, short, default_value = "medium")]
        difficulty: String,

        /// Extra context or focus areas for the generator
        #[arg(long, short)]
        context: Option<String>,
    },

    /// List flashcards, optionally searching question text
    List {
        /// Filter by topic
        #[arg(long, short)]
        topic: Option<String>,

        /// Search term
        #[arg(long, short)]
        search: Option<String>,

        /// Filter by difficulty
        #[arg(long, short)]
        difficulty: Option<String>,
    },

    /// List topics
    Topics,

    /// Show a flashcard with its study history
    Show {
        /// Flashcard ID
        id: i64,
    },

    /// Delete a flashcard
    Delete {
        /// Flashcard ID
        id: i64,
    },

    /// Record an answer for a flashcard
    Answer {
        /// Flashcard ID
        id: i64,

        /// Outcome: correct/incorrect
        #[arg(long, short)]
        outcome: String,

        /// Seconds spent on the card
        #[arg(long, short = 's', default_value_t = 0)]
        time: u32,
    },

    /// Run an interactive study session
    Study {
        /// Study one topic only
        #[arg(long, short)]
        topic: Option<String>,

        /// Card order: newest/shuffled/weakest
        #[arg(long, short, default_value = "newest")]
        order: String,
    },

    /// Show recorded answers
    History {
        /// Only answers for this flashcard
        #[arg(long)]
        card: Option<i64>,

        /// Maximum number of entries
        #[arg(long, short, default_value_t = 20)]
        limit: usize,
    },

    /// Show study statistics
    Stats,
}

fn resolve_user(cli_user: Option<&str>, config: &Config) -> Option<String> {
    cli_user
        .map(str::to_string)
        .or_else(|| std::env::var("STUDYBUDDY_USER").ok())
        .or_else(|| config.identity.user.clone())
}

fn parse_difficulty(s: &str) -> Result<Difficulty, String> {
    Difficulty::from_str(s)
        .ok_or_else(|| format!("Invalid difficulty '{}'. Use: easy, medium, or hard", s))
}

fn parse_outcome(s: &str) -> Option<bool> {
    match s.to_lowercase().as_str() {
        "correct" | "c" | "right" | "yes" | "y" | "1" => Some(true),
        "incorrect" | "i" | "wrong" | "no" | "n" | "0" => Some(false),
        _ => None,
    }
}

fn init_logging(cli: &Cli, config: &Config) {
    let log_level = if cli.quiet {
        "error".to_string()
    } else if cli.verbose {
        "debug".to_string()
    } else {
        config.general.log_level.clone()
    };

    // RUST_LOG, when set, replaces the computed level entirely
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("studybuddy={}", log_level)));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn main() {
    let cli = Cli::parse();
    let json = cli.json;

    if let Err(e) = run(cli) {
        if json {
            if let Ok(out) = serde_json::to_string(&JsonOutput::<()>::err(e.to_string())) {
                println!("{}", out);
            }
        } else {
            eprintln!("Error: {}", e);
        }
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let config_path = cli.config.clone().unwrap_or_else(config::default_config_path);
    let config = Config::load_or_default(&config_path)?;
    init_logging(&cli, &config);
    tracing::debug!("configuration loaded from: {}", config_path.display());

    let db_path = config.db_path();
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent).ok();
    }
    let db = Database::open_with_busy_timeout(&db_path, config.busy_timeout())?;
    db.init()?;

    let identity = StaticIdentity::new(resolve_user(cli.user.as_deref(), &config).as_deref());
    let owner = identity.resolve();
    let owner = owner.as_ref();

    let catalog = Catalog::new(&db);
    let tracker = StudyTracker::new(&db);

    match cli.command {
        Commands::Init => {
            if cli.json {
                println!("{}", serde_json::to_string(&JsonOutput::<()>::ok(()))?);
            } else {
                println!("Database initialized at: {}", db_path.display());
            }
        }

        Commands::Add {
            topic,
            question,
            answer,
            difficulty,
        } => {
            let difficulty = parse_difficulty(&difficulty)?;
            let id = catalog.create_flashcard(owner, &topic, &question, &answer, difficulty)?;

            if cli.json {
                println!(
                    "{}",
                    serde_json::to_string(&JsonOutput::ok(serde_json::json!({
                        "id": id,
                        "topic": topic.trim()
                    })))?
                );
            } else {
                println!("Added flashcard {} to '{}'.", id, topic.trim());
            }
        }

        Commands::Generate {
            topic,
            count,
            difficulty,
            context,
        } => {
            let difficulty = parse_difficulty(&difficulty)?;
            let mut request = GenerationRequest::new(topic.clone(), count, difficulty);
            if let Some(context) = context {
                request = request.with_context(context);
            }

            let generator = config.generation.generator();
            if !cli.json {
                println!("Generating {} {} flashcards about '{}'...", count, difficulty.as_str(), topic.trim());
            }
            let ids = catalog.generate_flashcards(owner, &generator, &request)?;

            if cli.json {
                println!("{}", serde_json::to_string(&JsonOutput::ok(&ids))?);
            } else {
                println!("Generated {} flashcards for '{}'.", ids.len(), topic.trim());
            }
        }

        Commands::List {
            topic,
            search,
            difficulty,
        } => {
            let difficulty = difficulty.as_deref().map(parse_difficulty).transpose()?;
            let cards =
                catalog.browse_flashcards(owner, search.as_deref(), topic.as_deref(), difficulty)?;

            if cli.json {
                println!("{}", serde_json::to_string(&JsonOutput::ok(&cards))?);
            } else if cards.is_empty() {
                if search.as_deref().map(str::trim).is_some_and(|s| !s.is_empty()) {
                    println!("No flashcards match. Try adjusting your search terms.");
                } else {
                    println!("No flashcards found. Create some to get started!");
                }
            } else {
                println!(
                    "{:<6} {:<16} {:<7} {:<4} {:>5} {:>6} QUESTION",
                    "ID", "TOPIC", "LEVEL", "AI", "SEEN", "ACC"
                );
                println!("{}", "-".repeat(90));
                for card in &cards {
                    print_card_row(card);
                }
                println!("\n{} cards", cards.len());
            }
        }

        Commands::Topics => {
            let topics = catalog.list_topics(owner)?;
            if cli.json {
                println!("{}", serde_json::to_string(&JsonOutput::ok(&topics))?);
            } else if topics.is_empty() {
                println!("No topics found.");
            } else {
                println!("{:<5} {:<40} CARDS", "ID", "TOPIC");
                println!("{}", "-".repeat(55));
                for topic in topics {
                    println!(
                        "{:<5} {:<40} {}",
                        topic.id,
                        truncate(&topic.name, 38),
                        topic.flashcard_count
                    );
                }
            }
        }

        Commands::Show { id } => {
            if let Some(card) = catalog.get_flashcard(owner, id)? {
                let events = tracker.list_events(owner, Some(id))?;

                if cli.json {
                    println!(
                        "{}",
                        serde_json::to_string(&JsonOutput::ok(serde_json::json!({
                            "flashcard": card,
                            "accuracy": card.accuracy(),
                            "history": events
                        })))?
                    );
                } else {
                    println!("Flashcard {}", card.id);
                    println!("Topic: {}", card.topic);
                    println!("Difficulty: {}", card.difficulty.label());
                    if card.origin.is_ai_generated() {
                        println!("Origin: AI generated");
                    }
                    println!();
                    println!("Q: {}", card.question);
                    println!("A: {}", card.answer);
                    println!();
                    println!(
                        "Studied: {} times ({}% accuracy)",
                        card.study_count,
                        card.accuracy()
                    );
                    for event in events.iter().take(10) {
                        println!(
                            "  {}  {:<9} {}s",
                            event.created_at,
                            if event.was_correct { "correct" } else { "incorrect" },
                            event.time_spent_secs
                        );
                    }
                }
            } else if cli.json {
                println!(
                    "{}",
                    serde_json::to_string(&JsonOutput::<()>::err("Flashcard not found"))?
                );
            } else {
                println!("Flashcard not found.");
            }
        }

        Commands::Delete { id } => {
            catalog.delete_flashcard(owner, id)?;
            if cli.json {
                println!("{}", serde_json::to_string(&JsonOutput::<()>::ok(()))?);
            } else {
                println!("Flashcard {} deleted.", id);
            }
        }

        Commands::Answer { id, outcome, time } => {
            let was_correct = parse_outcome(&outcome).ok_or_else(|| {
                format!("Invalid outcome '{}'. Use: correct or incorrect", outcome)
            })?;

            let applied = tracker.record_answer(owner, id, was_correct, time)?;

            if cli.json {
                println!(
                    "{}",
                    serde_json::to_string(&JsonOutput::ok(serde_json::json!({
                        "recorded": true,
                        "stats_updated": applied
                    })))?
                );
            } else {
                println!("Answer recorded for flashcard {}.", id);
                if let Some(card) = catalog.get_flashcard(owner, id)? {
                    println!(
                        "Studied {} times, {}% accuracy.",
                        card.study_count,
                        card.accuracy()
                    );
                }
            }
        }

        Commands::Study { topic, order } => {
            let order = WorkingSetOrder::from_str(&order).ok_or_else(|| {
                format!("Invalid order '{}'. Use: newest, shuffled, or weakest", order)
            })?;
            let cards = catalog.list_flashcards(owner, topic.as_deref())?;
            if cards.is_empty() {
                if cli.json {
                    println!(
                        "{}",
                        serde_json::to_string(&JsonOutput::ok(serde_json::json!({
                            "complete": false,
                            "correct": 0,
                            "incorrect": 0,
                            "accuracy": 0
                        })))?
                    );
                } else {
                    println!("No flashcards found for this topic.");
                }
                return Ok(());
            }

            let cards = order_working_set(cards, order, &mut rand::thread_rng());
            run_study(StudySession::new(cards)?, &tracker, owner, cli.json)?;
        }

        Commands::History { card, limit } => {
            let events = tracker.list_events(owner, card)?;
            let events: Vec<_> = events.into_iter().take(limit).collect();

            if cli.json {
                println!("{}", serde_json::to_string(&JsonOutput::ok(&events))?);
            } else if events.is_empty() {
                println!("No answers recorded yet.");
            } else {
                println!("{:<27} {:<6} {:<9} TIME", "WHEN", "CARD", "RESULT");
                println!("{}", "-".repeat(55));
                for event in events {
                    println!(
                        "{:<27} {:<6} {:<9} {}s",
                        truncate(&event.created_at, 25),
                        event.flashcard_id,
                        if event.was_correct { "correct" } else { "incorrect" },
                        event.time_spent_secs
                    );
                }
            }
        }

        Commands::Stats => {
            let overview = catalog.overview(owner)?;
            if cli.json {
                println!(
                    "{}",
                    serde_json::to_string(&JsonOutput::ok(serde_json::json!({
                        "total_topics": overview.total_topics,
                        "total_flashcards": overview.total_flashcards,
                        "ai_generated": overview.ai_generated,
                        "total_answers": overview.total_answers,
                        "accuracy": overview.accuracy()
                    })))?
                );
            } else {
                println!("=== Study Statistics ===");
                println!("Total topics: {}", overview.total_topics);
                println!("Total flashcards: {}", overview.total_flashcards);
                println!("AI generated: {}", overview.ai_generated);
                println!("Answers recorded: {}", overview.total_answers);
                println!("Overall accuracy: {}%", overview.accuracy());
            }
        }
    }

    Ok(())
}

fn run_study(
    mut session: StudySession,
    tracker: &StudyTracker<'_>,
    owner: Option<&OwnerId>,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let theme = ColorfulTheme::default();
    let total = session.len();
    // Card text goes to stderr under --json so stdout carries only the envelope
    let mut out = progress_writer(json);

    while let Some(card) = session.current() {
        writeln!(out)?;
        writeln!(
            out,
            "--- Card {}/{}  [{} | {}] ---",
            session.position().unwrap_or(total),
            total,
            card.topic,
            card.difficulty.label()
        )?;
        writeln!(out, "Q: {}", card.question)?;

        let action = Select::with_theme(&theme)
            .items(&["Show answer", "End session"])
            .default(0)
            .interact()?;
        if action == 1 {
            writeln!(out, "Session ended early.")?;
            break;
        }

        let card = session.reveal()?;
        writeln!(out, "A: {}", card.answer)?;

        let outcome = Select::with_theme(&theme)
            .with_prompt("How did you do?")
            .items(&["Got it right", "Got it wrong"])
            .default(0)
            .interact()?;
        session.answer(tracker, owner, outcome == 0)?;

        let tally = session.tally();
        writeln!(out, "Correct: {}  Incorrect: {}", tally.correct, tally.incorrect)?;
    }

    let tally = session.tally();
    if json {
        println!(
            "{}",
            serde_json::to_string(&JsonOutput::ok(serde_json::json!({
                "complete": session.is_complete(),
                "correct": tally.correct,
                "incorrect": tally.incorrect,
                "accuracy": tally.accuracy()
            })))?
        );
    } else {
        if session.is_complete() {
            println!("\nStudy session completed!");
        }
        println!(
            "Answered {} cards, {}% accuracy.",
            tally.answered(),
            tally.accuracy()
        );
    }

    Ok(())
}

fn progress_writer(json: bool) -> Box<dyn Write> {
    if json {
        Box::new(io::stderr())
    } else {
        Box::new(io::stdout())
    }
}

fn print_card_row(card: &Flashcard) {
    println!(
        "{:<6} {:<16} {:<7} {:<4} {:>5} {:>5}% {}",
        card.id,
        truncate(&card.topic, 14),
        card.difficulty.as_str(),
        if card.origin.is_ai_generated() { "yes" } else { "-" },
        card.study_count,
        card.accuracy(),
        truncate(&card.question, 48)
    );
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
