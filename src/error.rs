use thiserror::Error;

pub type StudyResult<T> = Result<T, StudyError>;

#[derive(Error, Debug)]
pub enum StudyError {
    #[error("Not authenticated")]
    Auth,

    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Failed to generate flashcards: {0}")]
    Generation(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Failed to parse config: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("Failed to write config: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl StudyError {
    pub fn validation<S: Into<String>>(msg: S) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_found<S: Into<String>>(msg: S) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn generation<S: Into<String>>(msg: S) -> Self {
        Self::Generation(msg.into())
    }

    pub fn internal<S: Into<String>>(msg: S) -> Self {
        Self::Internal(msg.into())
    }

    /// Errors the caller can act on directly, as opposed to infrastructure failures.
    pub fn is_user_actionable(&self) -> bool {
        matches!(
            self,
            StudyError::Auth
                | StudyError::Validation(_)
                | StudyError::NotFound(_)
                | StudyError::Generation(_)
        )
    }
}
